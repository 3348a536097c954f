pub mod assembler;
pub mod signals;

pub use assembler::{MarketSnapshot, SignalAssembler};
pub use signals::{Signal, SignalBuilder, SignalProvenance};
