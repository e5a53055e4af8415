pub mod assemble;
pub mod scorer;

pub use assemble::Assembler;
pub use scorer::RecommendationScorer;
