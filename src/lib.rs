pub mod cli;
pub mod collector;
pub mod engine;
pub mod error;
pub mod identity;
pub mod model;
pub mod output;
pub mod privilege;
pub mod resolve;
pub mod source;
pub mod state;
pub mod tui;
