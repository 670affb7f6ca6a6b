pub mod client;
pub mod conf;
pub mod controller;
pub mod db;
pub mod model;
pub mod provider;
pub mod repository;
pub mod service;

use anyhow::Result;
use conf::Conf;
use provider::AwesomeApi;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use repository::QuoteRepository;
use rocket::{catchers, routes, Build, Rocket};
use service::RateStore;

pub use model::Error;

/// Builds the server from `conf`: opens and migrates the database, then
/// seeds Rocket's own config with our address and port.
pub fn rocket(conf: &Conf) -> Result<Rocket<Build>> {
    let pool = db::connect(conf)?;
    let figment = rocket::Config::figment()
        .merge(("address", &conf.address))
        .merge(("port", conf.port));
    Ok(prepare(rocket::custom(figment), conf, pool))
}

pub fn prepare(
    rocket: Rocket<Build>,
    conf: &Conf,
    pool: Pool<SqliteConnectionManager>,
) -> Rocket<Build> {
    rocket
        .mount("/", routes![controller::quote::get])
        .register("/", catchers![controller::default_catcher])
        .manage(AwesomeApi::new(conf.upstream.clone()))
        .manage(RateStore::new(QuoteRepository::new(pool), &conf.store))
}
