pub mod error;
pub mod instrument;
pub mod profile;
pub mod recommendation;
