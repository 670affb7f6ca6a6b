use crate::model::{Error, ExchangeQuote, UpstreamEnvelope};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

/// Quote provider at economia.awesomeapi.com.br.
pub struct AwesomeApi {
    conf: UpstreamConf,
    client: reqwest::Client,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpstreamConf {
    pub url: String,
    pub pair: String,
    pub timeout_ms: u64,
}

impl UpstreamConf {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl AwesomeApi {
    pub fn new(conf: UpstreamConf) -> AwesomeApi {
        AwesomeApi {
            conf: conf,
            client: reqwest::Client::new(),
        }
    }

    /// One attempt, cancelled once `upstream.timeout_ms` elapses.
    pub async fn fetch(&self) -> Result<ExchangeQuote, Error> {
        info!(url = %self.conf.url, "Fetching quote");

        let envelope = match timeout(self.conf.timeout(), self.request()).await {
            Ok(res) => res?,
            Err(_) => {
                warn!(timeout_ms = self.conf.timeout_ms, "Quote request timed out");
                return Err(Error::UpstreamUnavailable(format!(
                    "no response within {}ms",
                    self.conf.timeout_ms
                )));
            }
        };

        self.select(envelope)
    }

    async fn request(&self) -> Result<UpstreamEnvelope, Error> {
        let req = self
            .client
            .get(&self.conf.url)
            .build()
            .map_err(Error::from_reqwest)?;

        let res = self
            .client
            .execute(req)
            .await
            .and_then(|res| res.error_for_status())
            .map_err(Error::from_reqwest)?;

        let body = res.bytes().await.map_err(Error::from_reqwest)?;
        serde_json::from_slice(&body).map_err(|e| Error::DecodeFailed(e.to_string()))
    }

    fn select(&self, mut envelope: UpstreamEnvelope) -> Result<ExchangeQuote, Error> {
        match envelope.remove(&self.conf.pair) {
            Some(quote) if !quote.bid.trim().is_empty() => Ok(quote),
            Some(_) => Err(Error::DecodeFailed(format!(
                "{} quote has an empty bid",
                self.conf.pair
            ))),
            None => Err(Error::DecodeFailed(format!(
                "{} is missing from the response",
                self.conf.pair
            ))),
        }
    }
}
