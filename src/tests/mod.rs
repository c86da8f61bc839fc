//! End-to-end tests.
//!
//! These drive the full router against a dataset written to a temporary
//! directory, loaded through the same config and table store path the
//! binary uses.
