use crate::{client::ClientConf, provider::UpstreamConf, service::StoreConf};
use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::{env, path::Path};

#[derive(Clone, Debug, Deserialize)]
pub struct Conf {
    pub db_url: String,
    pub address: String,
    pub port: u16,
    pub upstream: UpstreamConf,
    pub store: StoreConf,
    pub client: ClientConf,
    pub migrations: Vec<Migration>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Migration {
    pub version: i16,
    pub up: String,
}

impl Conf {
    /// Embedded defaults, then `$DATA_DIR/cotacao.conf`, then `COTACAO_*` env vars.
    pub fn new() -> Result<Conf> {
        let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| ".".into());
        let custom_conf_path = Path::new(&data_dir).join("cotacao.conf");

        let figment = Conf::default_figment()
            .merge(Toml::file(custom_conf_path))
            .merge(Env::prefixed("COTACAO_").split("__"));

        Conf::from_figment(figment)
    }

    pub fn default_figment() -> Figment {
        let default_conf = include_str!("../cotacao.conf");
        Figment::new().merge(Toml::string(default_conf))
    }

    pub fn from_figment(figment: Figment) -> Result<Conf> {
        Ok(figment.extract()?)
    }
}
