mod error;
pub use error::Error;
mod quote;
pub use quote::{ExchangeQuote, PersistedQuote, UpstreamEnvelope};
