use crate::{
    model::{Error, ExchangeQuote},
    provider::AwesomeApi,
    service::RateStore,
};
use rocket::{
    get,
    request::Request,
    response::{self, Responder},
    serde::json::Json,
    State,
};
use tracing::{error, info};

#[get("/cotacao")]
pub async fn get(
    provider: &State<AwesomeApi>,
    store: &State<RateStore>,
) -> Result<QuoteResponse, Error> {
    let quote = provider.fetch().await?;
    info!(bid = %quote.bid, "Fetched quote");

    Ok(QuoteResponse {
        quote: quote,
        store: store.inner().clone(),
    })
}

/// JSON quote that starts persisting once the response has been built. The
/// save runs detached and may finish before the body reaches the caller.
pub struct QuoteResponse {
    quote: ExchangeQuote,
    store: RateStore,
}

impl<'r> Responder<'r, 'static> for QuoteResponse {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let QuoteResponse { quote, store } = self;
        let bid = quote.bid.clone();
        let response = Json(quote).respond_to(req)?;

        rocket::tokio::spawn(async move {
            match store.save(&bid).await {
                Ok(row) => info!(id = row.id, %bid, "Persisted quote"),
                Err(e) => error!(%e, %bid, "Failed to persist quote"),
            }
        });

        Ok(response)
    }
}

#[cfg(test)]
mod test {
    use crate::{
        model::ExchangeQuote,
        repository::QuoteRepository,
        test::{client, conf, repo, wait_for_rows, QUOTE_PATH},
    };
    use futures::join;
    use rocket::http::{ContentType, Status};
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    async fn upstream(template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(QUOTE_PATH))
            .respond_with(template)
            .mount(&server)
            .await;
        server
    }

    fn quote_body(bid: &str) -> String {
        format!(r#"{{"USDBRL": {{"code": "USD", "codein": "BRL", "bid": "{}"}}}}"#, bid)
    }

    fn url(server: &MockServer) -> String {
        format!("{}{}", server.uri(), QUOTE_PATH)
    }

    #[rocket::async_test]
    async fn get() {
        let server = upstream(ResponseTemplate::new(200).set_body_string(quote_body("5.4714"))).await;
        let (conf, _dir) = conf(&url(&server));
        let client = client(&conf).await;

        let res = client.get("/cotacao").dispatch().await;

        assert_eq!(res.status(), Status::Ok);
        assert_eq!(res.content_type(), Some(ContentType::JSON));
        let body = res.into_json::<ExchangeQuote>().await.unwrap();
        assert_eq!(
            ExchangeQuote {
                bid: "5.4714".into()
            },
            body
        );

        let repo = repo(&conf);
        wait_for_rows(&repo, 1).await;
        assert_eq!("5.4714", repo.latest().unwrap().unwrap().value);
    }

    #[rocket::async_test]
    async fn get_upstream_timeout() {
        let template = ResponseTemplate::new(200)
            .set_body_string(quote_body("5.4714"))
            .set_delay(Duration::from_millis(500));
        let server = upstream(template).await;
        let (conf, _dir) = conf(&url(&server));
        let client = client(&conf).await;

        let res = client.get("/cotacao").dispatch().await;

        assert_eq!(res.status(), Status::InternalServerError);
        assert_eq!(res.content_type(), Some(ContentType::Plain));
        let body = res.into_string().await.unwrap();
        assert!(body.starts_with("upstream unavailable"));

        rocket::tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(0, repo(&conf).count().unwrap());
    }

    #[rocket::async_test]
    async fn get_missing_pair() {
        let body = r#"{"EURBRL": {"bid": "6.01"}}"#;
        let server = upstream(ResponseTemplate::new(200).set_body_string(body)).await;
        let (conf, _dir) = conf(&url(&server));
        let client = client(&conf).await;

        let res = client.get("/cotacao").dispatch().await;

        assert_eq!(res.status(), Status::InternalServerError);
        let body = res.into_string().await.unwrap();
        assert!(body.contains("USDBRL"));

        rocket::tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(0, repo(&conf).count().unwrap());
    }

    #[rocket::async_test]
    async fn get_storage_failed() {
        let server = upstream(ResponseTemplate::new(200).set_body_string(quote_body("5.4714"))).await;
        let (conf, _dir) = conf(&url(&server));
        let client = client(&conf).await;
        rusqlite::Connection::open(&conf.db_url)
            .unwrap()
            .execute_batch("DROP TABLE quote")
            .unwrap();

        let res = client.get("/cotacao").dispatch().await;

        assert_eq!(res.status(), Status::Ok);
        let body = res.into_json::<ExchangeQuote>().await.unwrap();
        assert_eq!("5.4714", body.bid);
    }

    #[rocket::async_test]
    async fn get_store_locked() {
        let server = upstream(ResponseTemplate::new(200).set_body_string(quote_body("5.4714"))).await;
        let (mut conf, _dir) = conf(&url(&server));
        conf.store.timeout_ms = 20;
        let client = client(&conf).await;
        let locker = rusqlite::Connection::open(&conf.db_url).unwrap();
        locker.execute_batch("BEGIN EXCLUSIVE").unwrap();

        let res = client.get("/cotacao").dispatch().await;

        assert_eq!(res.status(), Status::Ok);
        let body = res.into_json::<ExchangeQuote>().await.unwrap();
        assert_eq!("5.4714", body.bid);

        rocket::tokio::time::sleep(Duration::from_millis(100)).await;
        locker.execute_batch("COMMIT").unwrap();
        rocket::tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(0, repo(&conf).count().unwrap());
    }

    #[rocket::async_test]
    async fn get_appends_one_row_per_request() {
        let server = upstream(ResponseTemplate::new(200).set_body_string(quote_body("5.4714"))).await;
        let (conf, _dir) = conf(&url(&server));
        let client = client(&conf).await;

        for _ in 0..5 {
            let res = client.get("/cotacao").dispatch().await;
            assert_eq!(res.status(), Status::Ok);
        }

        let repo = repo(&conf);
        wait_for_rows(&repo, 5).await;
        rocket::tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(5, repo.count().unwrap());
    }

    struct Sequence {
        bids: Vec<&'static str>,
        next: AtomicUsize,
    }

    impl Respond for Sequence {
        fn respond(&self, _: &Request) -> ResponseTemplate {
            let i = self.next.fetch_add(1, Ordering::SeqCst);
            ResponseTemplate::new(200)
                .set_body_string(quote_body(self.bids[i % self.bids.len()]))
                .set_delay(Duration::from_millis(50))
        }
    }

    #[rocket::async_test]
    async fn get_concurrent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(QUOTE_PATH))
            .respond_with(Sequence {
                bids: vec!["5.10", "5.20"],
                next: AtomicUsize::new(0),
            })
            .mount(&server)
            .await;
        let (conf, _dir) = conf(&url(&server));
        let client = client(&conf).await;

        let (first, second) = join!(
            client.get("/cotacao").dispatch(),
            client.get("/cotacao").dispatch()
        );

        let first = first.into_json::<ExchangeQuote>().await.unwrap();
        let second = second.into_json::<ExchangeQuote>().await.unwrap();
        let mut bids = vec![first.bid, second.bid];
        bids.sort();
        assert_eq!(vec!["5.10".to_string(), "5.20".to_string()], bids);

        let repo: QuoteRepository = repo(&conf);
        wait_for_rows(&repo, 2).await;
    }

    #[rocket::async_test]
    async fn unknown_route() {
        let (conf, _dir) = conf("http://127.0.0.1:1");
        let client = client(&conf).await;

        let res = client.get("/cotacoes").dispatch().await;

        assert_eq!(res.status(), Status::NotFound);
    }
}
