pub mod data_loader;
pub mod report;
pub mod runner;
pub mod simulator;

pub use report::BacktestReport;
pub use runner::{BacktestRun, BacktestRunner};
pub use simulator::{BacktestResult, BacktestSimulator};
