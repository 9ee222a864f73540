pub mod audit;
pub mod completions;
pub mod config;
pub mod preview;
pub mod send;
