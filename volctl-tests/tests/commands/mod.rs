//! Command tests for volctl
//!
//! These tests drive the control-plane operations behind each CLI command
//! against file-backed stores in a temp directory.

mod cloudsnap;
mod creds;
mod drivers;
mod sched;
mod validate;
