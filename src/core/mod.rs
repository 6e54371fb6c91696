pub mod diagnostics;
pub mod equipment;
pub mod performance;
pub mod sizing;
pub mod units;
