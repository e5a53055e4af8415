pub mod fundamentals;
pub mod scores;
pub mod table;

pub use fundamentals::FundamentalsStore;
pub use scores::ScoreCache;
