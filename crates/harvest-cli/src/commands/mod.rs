//! CLI command implementations

pub mod capture;
pub mod clear;
pub mod status;
pub mod sync;
