#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod persona;
pub mod provider;
pub mod render;
pub mod repl;
pub mod session;
pub mod tool;
