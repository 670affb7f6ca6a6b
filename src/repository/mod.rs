pub mod quote;
pub use quote::{InsertGuard, QuoteRepository};
