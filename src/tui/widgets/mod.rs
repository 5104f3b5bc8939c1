pub mod rate;

pub use rate::{format_bytes, format_duration, format_rate};
