use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single exchange rate, kept as the decimal string the provider sent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExchangeQuote {
    pub bid: String,
}

/// Provider payload: currency pair (e.g. `USDBRL`) to its quote.
pub type UpstreamEnvelope = HashMap<String, ExchangeQuote>;

#[derive(Clone, Debug, PartialEq)]
pub struct PersistedQuote {
    pub id: i64,
    pub value: String,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::{ExchangeQuote, UpstreamEnvelope};
    use anyhow::Result;

    #[test]
    fn envelope_ignores_extra_fields() -> Result<()> {
        let body = r#"{"USDBRL": {"code": "USD", "codein": "BRL", "bid": "5.4714", "ask": "5.4744"}}"#;
        let envelope: UpstreamEnvelope = serde_json::from_str(body)?;
        assert_eq!(
            Some(&ExchangeQuote {
                bid: "5.4714".into()
            }),
            envelope.get("USDBRL")
        );
        Ok(())
    }

    #[test]
    fn serializes_as_bid() -> Result<()> {
        let quote = ExchangeQuote { bid: "5.00".into() };
        assert_eq!(r#"{"bid":"5.00"}"#, serde_json::to_string(&quote)?);
        Ok(())
    }
}
