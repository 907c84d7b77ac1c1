use std::{fmt::Display, time::Duration};

use anyhow::{Result, anyhow};
use axum::{
    Json, Router,
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use rand::Rng as _;
use serde::Deserialize;
use serde_json::{Value, json};
use tempfile::TempDir;
use time::{OffsetDateTime, PrimitiveDateTime, macros::format_description};
use tokio::task::JoinHandle;
use tracing::{debug, error};
use tvshows_server::config::{Parser, ServerConfig};
use url::Url;

/// Query that makes the mock search service fail.
pub const FAILING_QUERY: &str = "service down";

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(5030..6030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

/// Shows known to the mock search service.
pub fn catalogue() -> Vec<Value> {
    vec![
        json!({
            "id": 1505, "name": "Scrubs: Interns", "type": "Scripted", "language": "English",
            "genres": ["Comedy"], "status": "Ended", "runtime": 5, "premiered": "2009-12-01",
            "officialSite": null, "schedule": {"time": "", "days": []},
            "rating": {"average": null}, "weight": 40, "network": null, "webChannel": {"id": 1},
            "summary": "<p>Web series.</p>"
        }),
        json!({
            "id": 72, "name": "Scrubs", "type": "Scripted", "language": "English",
            "genres": ["Comedy", "Medical"], "status": "Ended", "runtime": 30,
            "premiered": "2001-10-02", "officialSite": null,
            "schedule": {"time": "21:00", "days": ["Thursday"]},
            "rating": {"average": 8.3}, "weight": 95,
            "network": {"id": 1, "name": "NBC",
                "country": {"name": "United States", "code": "US", "timezone": "America/New_York"},
                "officialSite": "https://www.nbc.com/"},
            "summary": "<p>Hospital comedy.</p>",
            "_links": {"self": {"href": "https://api.tvmaze.com/shows/72"}}
        }),
        json!({
            "id": 59, "name": "ER", "type": "Scripted", "language": "English",
            "genres": ["Drama", "Medical"], "status": "Ended", "runtime": 60,
            "premiered": "1994-09-19", "officialSite": null,
            "schedule": {"time": "22:00", "days": ["Thursday"]},
            "rating": {"average": 8.1}, "weight": 90,
            "network": {"id": 1, "name": "NBC",
                "country": {"name": "United States", "code": "US", "timezone": "America/New_York"}},
            "summary": "<p>Emergency room drama.</p>"
        }),
        json!({
            "id": 83, "name": "House", "type": "Scripted", "language": "English",
            "genres": ["Drama", "Mystery", "Medical"], "status": "Ended", "runtime": 60,
            "premiered": "2004-11-16", "officialSite": "http://www.fox.com/house/",
            "schedule": {"time": "21:00", "days": ["Monday"]},
            "rating": {"average": 8.6}, "weight": 97,
            "network": {"id": 4, "name": "FOX", "country": null},
            "summary": "<p>Diagnostic medicine.</p>"
        }),
        json!({
            "id": 204, "name": "Kaiji", "type": "Animation", "language": "Japanese",
            "genres": ["Drama", "Thriller", "Anime"], "status": "Ended", "runtime": 25,
            "premiered": "2007-10-03", "officialSite": null,
            "schedule": {"time": "", "days": ["Tuesday"]},
            "rating": {"average": null}, "weight": 60,
            "network": {"id": 110, "name": "Nippon TV",
                "country": {"name": "Japan", "code": "JP", "timezone": "Asia/Tokyo"}},
            "summary": null
        }),
    ]
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: String,
}

async fn search_shows(Query(params): Query<SearchParams>) -> Response {
    if params.q == FAILING_QUERY {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let wanted = params.q.to_lowercase();
    let hits: Vec<Value> = catalogue()
        .into_iter()
        .filter(|show| {
            show["name"]
                .as_str()
                .is_some_and(|name| name.to_lowercase().contains(&wanted))
        })
        .map(|show| json!({"score": 0.9, "show": show}))
        .collect();
    debug!("Mock search for {} returned {} hits", params.q, hits.len());
    Json(hits).into_response()
}

/// Search service double serving [`catalogue`] on a local port.
pub struct MockSearch {
    pub url: Url,
    handle: JoinHandle<()>,
}

impl MockSearch {
    pub async fn start() -> Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let url = Url::parse(&format!("http://{}/", listener.local_addr()?))?;
        let app = Router::new().route("/search/shows", get(search_shows));
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Mock search service failed: {e}");
            }
        });
        Ok(MockSearch { url, handle })
    }
}

impl Drop for MockSearch {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
    #[allow(dead_code)]
    search: MockSearch,
}

pub async fn test_config(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let search = MockSearch::start().await?;
    let tmp_data_dir = TempDir::with_prefix(format!("{}_", test_name))?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?.to_string();
    let base_url = format!("http://localhost:{}", port);
    let args = &[
        "tvshows-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--base-url",
        &base_url,
        "--tvmaze-url",
        search.url.as_str(),
        "--tvmaze-timeout",
        "5s",
        "--default-page-size",
        "100",
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
            search,
        },
    ))
}

/// Starts the server in the background and waits until it answers `/health`.
pub async fn launch_env(args: ServerConfig) -> Result<reqwest::Client> {
    let health_url = args.base_url.join("health")?;
    tokio::spawn(async move {
        if let Err(e) = tvshows_server::run::run(args).await {
            error!("Server failed: {e}");
        }
    });

    let client = reqwest::Client::new();
    for _ in 0..50 {
        match client.get(health_url.clone()).send().await {
            Ok(response) if response.status().is_success() => return Ok(client),
            _ => tokio::time::sleep(Duration::from_millis(100)).await,
        }
    }
    Err(anyhow!("Server did not start"))
}

pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard, reqwest::Client)> {
    let (args, guard) = test_config(test_name).await?;
    let client = launch_env(args.clone()).await?;
    Ok((args, guard, client))
}

pub fn extend_url(url: &Url, segment: impl Display) -> Url {
    let mut url = url.clone();
    url.path_segments_mut()
        .expect("base URL")
        .push(&segment.to_string());
    url
}

/// Imports `name` and returns the response body, asserting 201 Created.
pub async fn import_show(client: &reqwest::Client, base_url: &Url, name: &str) -> Result<Value> {
    let api_url = base_url.join("tv-shows/import")?;
    let response = client
        .post(api_url)
        .query(&[("name", name)])
        .send()
        .await?;
    if response.status() != StatusCode::CREATED {
        return Err(anyhow!(
            "Import of {name} failed with {}: {}",
            response.status(),
            response.text().await?
        ));
    }
    Ok(response.json().await?)
}

pub fn parse_stamp(stamp: &str) -> Result<OffsetDateTime> {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    Ok(PrimitiveDateTime::parse(stamp, format)?.assume_utc())
}
