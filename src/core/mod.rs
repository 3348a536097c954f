pub mod confidence;
pub mod entry;
pub mod levels;
pub mod risk;
pub mod structure;
pub mod swings;
pub mod trend;
