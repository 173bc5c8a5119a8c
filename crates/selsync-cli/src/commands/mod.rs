//! Command handlers

pub mod config;
pub mod node;
pub mod run;
pub mod status;
pub mod sync;
