//! Command-line front-end running sequential neural likelihood on built-in
//! toy simulators.

pub mod commands;
pub mod run_file;
pub mod simulators;
