pub mod calendar;
pub mod krx;
pub mod provider;
pub mod resolver;
pub mod yahoo;

pub use provider::{QuoteProvider, QuoteRow};
pub use resolver::TieredResolver;
