use serde::Serialize;
use serde_json::{Map, Value};
use time::PrimitiveDateTime;
use url::Url;

pub mod shows;
pub mod statistics;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Link {
    pub href: String,
}

impl From<Url> for Link {
    fn from(url: Url) -> Self {
        Link {
            href: url.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Links {
    #[serde(rename = "self")]
    pub self_link: Link,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<Link>,
}

impl Links {
    pub fn self_only(self_link: impl Into<Link>) -> Self {
        Links {
            self_link: self_link.into(),
            previous: None,
            next: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Page {
    pub page: u32,
    pub page_size: u32,
    #[serde(rename = "tv-shows")]
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<Object>))]
    pub tv_shows: Vec<Map<String, Value>>,
    #[serde(rename = "_links")]
    pub links: Links,
}

/// Reply to writes that keep the show: its id, new stamp and link.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ShowStamp {
    pub id: i64,
    #[serde(rename = "tvmaze-id", skip_serializing_if = "Option::is_none")]
    pub tvmaze_id: Option<i64>,
    #[serde(rename = "last-update", with = "tvshows_dal::show::stamp")]
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub last_update: PrimitiveDateTime,
    #[serde(rename = "_links")]
    pub links: Links,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Removed {
    pub message: String,
    pub id: i64,
}
