#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_inception, clippy::module_name_repetitions)]

pub mod common;
pub mod config;
pub mod errors;
pub mod execution;
pub mod memory;
pub mod pipeline;
pub mod program;
pub mod register;
pub mod system;
