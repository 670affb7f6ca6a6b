pub mod quote;
pub use quote::{RateStore, StoreConf};
