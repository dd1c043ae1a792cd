//! Utility modules for the portfolio generator.

pub mod exec;
pub mod fs;
pub mod workdir;
