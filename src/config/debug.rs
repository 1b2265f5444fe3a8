//! Debugging feature flags.
//!
//! Toggle individual diagnostics here; keep them `false` by default so library
//! consumers stay quiet unless they opt in at compile time.

/// Emit per-source signal counts and timings after the leaf fan-out.
pub const PRINT_SOURCE_SUMMARY: bool = false;

/// Emit every cluster's members, span and score breakdown.
pub const PRINT_CLUSTER_DETAILS: bool = false;

/// Emit the best fractal match (and its overlap) for every discovered zone.
pub const PRINT_INHERITANCE_MATCHES: bool = false;

/// Emit snapshot load/save paths and sizes.
pub const PRINT_SNAPSHOT_IO: bool = false;
