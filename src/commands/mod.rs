//! # CLI Command Implementations
//!
//! Each subcommand lives in its own file with an `Args` struct derived using
//! `clap` and an `execute` function that calls into the `filedest` library.

pub mod copy;
