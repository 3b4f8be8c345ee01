pub mod api;
pub mod commands;
pub mod config;
pub mod git;
pub mod retry;
pub mod runtime;
pub mod sfdx;
