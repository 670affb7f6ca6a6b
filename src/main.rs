use cotacao::{conf::Conf, db};
use std::{env, process::exit};
use tracing::error;

#[rocket::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let conf = Conf::new().unwrap_or_else(|e| {
        error!(%e, "Unable to load configuration");
        exit(1);
    });

    let args: Vec<String> = env::args().skip(1).collect();

    if let Some("db") = args.first().map(String::as_str) {
        db::cli(&conf, &args[1..]).unwrap_or_else(|e| {
            error!(%e, "Database command failed");
            exit(1);
        });
        return;
    }

    let rocket = cotacao::rocket(&conf).unwrap_or_else(|e| {
        error!(%e, "Unable to prepare server");
        exit(1);
    });

    if let Err(e) = rocket.launch().await {
        error!(%e, "Server failed");
        exit(1);
    }
}
