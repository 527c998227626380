//! Command-line front end for junction lane repair.

pub mod cli;
pub mod commands;
pub mod files;
pub mod logging;
pub mod summary;
