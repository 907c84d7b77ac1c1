use std::time::Duration;

use serde::Deserialize;
use time::PrimitiveDateTime;
use tracing::{debug, info};
use tvshows_dal::{
    show::{now_stamp, Network, Rating, Schedule, Show},
    store::ShowStore,
};
use url::Url;

use crate::error::{ApiError, ApiResult};

/// Client of the show-search service (TVMaze compatible).
#[derive(Debug, Clone)]
pub struct ShowSearch {
    http_client: reqwest::Client,
    search_url: Url,
}

impl ShowSearch {
    pub fn new(base_url: &Url, timeout: Duration) -> crate::error::Result<Self> {
        let http_client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()?;
        let search_url = base_url.join("search/shows")?;
        Ok(Self {
            http_client,
            search_url,
        })
    }

    pub async fn search(&self, name: &str) -> ApiResult<Vec<SearchHit>> {
        debug!("Searching shows for {name}");
        let hits = self
            .http_client
            .get(self.search_url.clone())
            .query(&[("q", name)])
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<SearchHit>>()
            .await?;
        Ok(hits)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub show: FoundShow,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FoundSchedule {
    #[serde(default)]
    time: String,
    #[serde(default)]
    days: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FoundRating {
    #[serde(default)]
    average: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct FoundNetwork {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    country: Option<serde_json::Value>,
}

/// A show as returned by the search service. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct FoundShow {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type", default)]
    show_type: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    runtime: Option<i64>,
    #[serde(default)]
    premiered: Option<String>,
    #[serde(rename = "officialSite", default)]
    official_site: Option<String>,
    #[serde(default)]
    schedule: Option<FoundSchedule>,
    #[serde(default)]
    rating: Option<FoundRating>,
    #[serde(default)]
    weight: Option<i64>,
    #[serde(default)]
    network: Option<FoundNetwork>,
    #[serde(default)]
    summary: Option<String>,
}

impl FoundShow {
    pub fn into_show(self, last_update: PrimitiveDateTime) -> Show {
        let schedule = self.schedule.unwrap_or_default();
        Show {
            tvmaze_id: self.id,
            name: self.name,
            show_type: self.show_type,
            language: self.language,
            genres: self.genres,
            status: self.status,
            runtime: self.runtime,
            premiered: self.premiered,
            official_site: self.official_site,
            schedule: Schedule {
                time: schedule.time,
                days: schedule.days,
            },
            rating: Rating {
                average: self.rating.and_then(|r| r.average),
            },
            weight: self.weight,
            network: self.network.map(|n| Network {
                id: n.id,
                name: n.name,
                country: n.country,
            }),
            summary: self.summary,
            last_update,
        }
    }
}

/// First hit whose name equals `name`, ignoring case.
pub fn exact_match(hits: Vec<SearchHit>, name: &str) -> Option<FoundShow> {
    let wanted = name.to_lowercase();
    hits.into_iter()
        .map(|hit| hit.show)
        .find(|show| show.name.to_lowercase() == wanted)
}

pub async fn import_show(store: &ShowStore, search: &ShowSearch, name: &str) -> ApiResult<Show> {
    if name.trim().is_empty() {
        return Err(ApiError::InvalidQuery("POST requires a name key".to_string()));
    }

    let hits = search.search(name).await?;
    let found = exact_match(hits, name)
        .ok_or_else(|| ApiError::ResourceNotFound(format!("Show {name} does not exist.")))?;

    let _guard = store.lock_for_update().await;
    if store.find(found.id).await?.is_some() {
        return Err(ApiError::ResourceNotFound(format!(
            "Show {name} already exists in the database."
        )));
    }
    let show = found.into_show(now_stamp());
    store.append_one(&show).await?;
    info!("Imported show {} ({})", show.name, show.tvmaze_id);
    Ok(show)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use super::*;

    fn hits() -> Vec<SearchHit> {
        serde_json::from_value(json!([
            {"score": 17.2, "show": {"id": 10, "name": "Scrubs Spin-off", "genres": []}},
            {"score": 16.1, "show": {
                "id": 1,
                "url": "https://www.tvmaze.com/shows/1/scrubs",
                "name": "Scrubs",
                "type": "Scripted",
                "language": "English",
                "genres": ["Comedy", "Medical"],
                "status": "Ended",
                "runtime": 30,
                "premiered": "2001-10-02",
                "officialSite": null,
                "schedule": {"time": "21:00", "days": ["Thursday"]},
                "rating": {"average": 8.3},
                "weight": 95,
                "network": {
                    "id": 1,
                    "name": "NBC",
                    "country": {"name": "United States", "code": "US", "timezone": "America/New_York"},
                    "officialSite": "https://www.nbc.com/"
                },
                "webChannel": null,
                "summary": "<p>Comedy</p>",
                "_links": {"self": {"href": "https://api.tvmaze.com/shows/1"}}
            }},
            {"score": 10.0, "show": {"id": 2, "name": "SCRUBS", "genres": []}}
        ]))
        .unwrap()
    }

    #[test]
    fn test_exact_match_first_only() {
        let found = exact_match(hits(), "scrubs").unwrap();
        assert_eq!(found.id, 1);
        assert!(exact_match(hits(), "Scrub").is_none());
    }

    #[test]
    fn test_into_show() {
        let stamp = datetime!(2021-03-21 20:58:06);
        let show = exact_match(hits(), "Scrubs").unwrap().into_show(stamp);
        assert_eq!(show.tvmaze_id, 1);
        assert_eq!(show.show_type.as_deref(), Some("Scripted"));
        assert_eq!(show.genres, vec!["Comedy", "Medical"]);
        assert_eq!(show.schedule.days, vec!["Thursday"]);
        assert_eq!(show.rating_average(), Some(8.3));
        let network = show.network.unwrap();
        assert_eq!(network.name.as_deref(), Some("NBC"));
        assert_eq!(network.country.unwrap()["code"], "US");
        assert_eq!(show.last_update, stamp);
    }

    #[test]
    fn test_sparse_show() {
        let show = exact_match(hits(), "SCRUBS spin-off")
            .unwrap()
            .into_show(datetime!(2021-03-21 20:58:06));
        assert_eq!(show.tvmaze_id, 10);
        assert!(show.network.is_none());
        assert_eq!(show.schedule, Schedule::default());
        assert_eq!(show.rating.average, None);
    }

    #[test]
    fn test_search_url() {
        let base = Url::parse("https://api.tvmaze.com").unwrap();
        let search = ShowSearch::new(&base, Duration::from_secs(5)).unwrap();
        assert_eq!(search.search_url.as_str(), "https://api.tvmaze.com/search/shows");
    }
}
