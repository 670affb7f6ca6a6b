use crate::model::{Error, ExchangeQuote};
use serde::Deserialize;
use std::{fs, path::Path, time::Duration};
use tokio::time::timeout;
use tracing::info;

#[derive(Clone, Debug, Deserialize)]
pub struct ClientConf {
    pub url: String,
    pub output: String,
    pub timeout_ms: u64,
}

impl ClientConf {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Asks the quote service for the current rate and writes it to
/// `conf.output`. Nothing is written unless a quote was decoded.
pub async fn run(conf: &ClientConf) -> Result<ExchangeQuote, Error> {
    let quote = match timeout(conf.timeout(), request(&conf.url)).await {
        Ok(res) => res?,
        Err(_) => {
            return Err(Error::UpstreamUnavailable(format!(
                "no response within {}ms",
                conf.timeout_ms
            )))
        }
    };
    info!(bid = %quote.bid, "Received quote");

    write(Path::new(&conf.output), &quote)?;
    info!(output = %conf.output, "Quote saved");

    Ok(quote)
}

async fn request(url: &str) -> Result<ExchangeQuote, Error> {
    let client = reqwest::Client::new();
    let req = client.get(url).build().map_err(Error::from_reqwest)?;

    client
        .execute(req)
        .await
        .and_then(|res| res.error_for_status())
        .map_err(Error::from_reqwest)?
        .json::<ExchangeQuote>()
        .await
        .map_err(Error::from_reqwest)
}

fn write(path: &Path, quote: &ExchangeQuote) -> Result<(), Error> {
    fs::write(path, format!("Dólar: {}\n", quote.bid)).map_err(|e| Error::LocalWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}
