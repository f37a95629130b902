pub mod carry;
pub mod carve;
pub mod chunk;
pub mod cli;
pub mod config;
pub mod constants;
pub mod host;
pub mod logging;
pub mod memory;
pub mod paths;
pub mod pipeline;
pub mod scanner;
