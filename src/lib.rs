pub mod backtesting;
pub mod config;
pub mod core;
pub mod errors;
pub mod exchange;
pub mod models;
pub mod strategies;
#[cfg(test)]
pub mod test_helpers;
