use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    str::FromStr,
};

use serde::Serialize;
use time::{Duration, PrimitiveDateTime};
use tvshows_dal::show::Show;

use crate::error::{ApiError, ApiResult};

/// Genres treated as themes in the genre breakdown, all others are sub-genres.
pub const THEMES: [&str; 6] = ["Adventure", "Action", "Drama", "Comedy", "Thriller", "Horror"];

pub const RECENT_WINDOW: Duration = Duration::hours(24);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Language,
    Genres,
    Status,
    Type,
}

impl FromStr for Dimension {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "language" => Ok(Dimension::Language),
            "genres" => Ok(Dimension::Genres),
            "status" => Ok(Dimension::Status),
            "type" => Ok(Dimension::Type),
            other => Err(ApiError::InvalidQuery(format!(
                "BY parameter must be either language, genres, status, or type; got {other}"
            ))),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Language => "language",
            Dimension::Genres => "genres",
            Dimension::Status => "status",
            Dimension::Type => "type",
        };
        f.write_str(name)
    }
}

impl Dimension {
    fn value_of(self, show: &Show) -> Option<&str> {
        match self {
            Dimension::Language => show.language.as_deref(),
            Dimension::Status => show.status.as_deref(),
            Dimension::Type => show.show_type.as_deref(),
            Dimension::Genres => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Image,
}

impl FromStr for Format {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Format::Json),
            "image" => Ok(Format::Image),
            other => Err(ApiError::InvalidQuery(format!(
                "FORMAT parameter must be either json or image; got {other}"
            ))),
        }
    }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn percentages(counts: &BTreeMap<String, usize>) -> BTreeMap<String, f64> {
    let total: usize = counts.values().sum();
    counts
        .iter()
        .map(|(key, count)| (key.clone(), round1(*count as f64 * 100.0 / total as f64)))
        .collect()
}

/// Share of shows per value of `by`, shows without a value left out.
pub fn proportions(shows: &[Show], by: Dimension) -> BTreeMap<String, f64> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for value in shows.iter().filter_map(|show| by.value_of(show)) {
        *counts.entry(value.to_string()).or_default() += 1;
    }
    percentages(&counts)
}

/// Counts of (theme, sub-genre) pairs, each show contributing every pair of
/// its own themes and sub-genres once.
pub fn genre_pairs(shows: &[Show]) -> BTreeMap<String, BTreeMap<String, usize>> {
    let mut pairs: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for show in shows {
        let (themes, subs): (BTreeSet<&str>, BTreeSet<&str>) = show
            .genres
            .iter()
            .map(String::as_str)
            .partition(|g| THEMES.contains(g));
        for theme in &themes {
            for sub in &subs {
                *pairs
                    .entry(theme.to_string())
                    .or_default()
                    .entry(sub.to_string())
                    .or_default() += 1;
            }
        }
    }
    pairs
}

pub fn genre_proportions(
    pairs: &BTreeMap<String, BTreeMap<String, usize>>,
) -> BTreeMap<String, BTreeMap<String, f64>> {
    pairs
        .iter()
        .map(|(theme, subs)| (theme.clone(), percentages(subs)))
        .collect()
}

pub fn updated_since(shows: &[Show], since: PrimitiveDateTime) -> usize {
    shows.iter().filter(|s| s.last_update >= since).count()
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Snapshot {
    pub total: usize,
    #[serde(rename = "total-updated")]
    pub total_updated: usize,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub values: serde_json::Value,
}

pub fn snapshot(shows: &[Show], by: Dimension, now: PrimitiveDateTime) -> ApiResult<Snapshot> {
    let values = match by {
        Dimension::Genres => serde_json::to_value(genre_proportions(&genre_pairs(shows)))?,
        _ => serde_json::to_value(proportions(shows, by))?,
    };
    Ok(Snapshot {
        total: shows.len(),
        total_updated: updated_since(shows, now - RECENT_WINDOW),
        values,
    })
}

/// Renders the breakdown as PNG. Genres become one stacked bar of pair counts
/// per theme, with sub-genres keeping the same segment position in every bar.
pub fn render_chart(shows: &[Show], by: Dimension) -> crate::error::Result<Vec<u8>> {
    match by {
        Dimension::Genres => {
            let pairs = genre_pairs(shows);
            let series: Vec<String> = pairs
                .values()
                .flat_map(|subs| subs.keys())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .cloned()
                .collect();
            let stacks: Vec<Vec<f64>> = pairs
                .values()
                .map(|subs| {
                    series
                        .iter()
                        .map(|sub| subs.get(sub).copied().unwrap_or(0) as f64)
                        .collect()
                })
                .collect();
            let themes: Vec<String> = pairs.into_keys().collect();
            let labels = tvshows_chart::Labels {
                title: "Sub-genre of TV shows by theme",
                y_axis: "Count",
                categories: &themes,
            };
            tvshows_chart::stacked_bar_chart(labels, &series, &stacks)
        }
        _ => {
            let (categories, values): (Vec<String>, Vec<f64>) =
                proportions(shows, by).into_iter().unzip();
            let title = format!("TV shows by {by}");
            let labels = tvshows_chart::Labels {
                title: &title,
                y_axis: "percent",
                categories: &categories,
            };
            tvshows_chart::bar_chart(labels, &values)
        }
    }
}
