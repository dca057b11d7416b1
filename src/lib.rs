pub mod config;
pub mod fetch;
pub mod geography;
pub mod process;
