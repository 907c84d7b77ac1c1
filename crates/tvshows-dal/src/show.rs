use garde::Validate;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sqlx::Row;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

use crate::ChosenRow;

time::serde::format_description!(
    last_update_format,
    PrimitiveDateTime,
    "[year]-[month]-[day] [hour]:[minute]:[second]"
);

/// Serde adapter for `last-update` stamps carried outside of [`Show`].
pub mod stamp {
    use serde::{Deserializer, Serializer};
    use time::PrimitiveDateTime;

    pub fn serialize<S: Serializer>(
        value: &PrimitiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        super::last_update_format::serialize(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<PrimitiveDateTime, D::Error> {
        super::last_update_format::deserialize(deserializer)
    }
}

pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Current UTC time truncated to whole seconds, as stored in `last-update`.
pub fn now_stamp() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    let now = now - Duration::nanoseconds(now.nanosecond() as i64);
    PrimitiveDateTime::new(now.date(), now.time())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default, deny_unknown_fields)]
pub struct Schedule {
    #[garde(length(max = 5))]
    pub time: String,
    #[garde(custom(valid_weekdays))]
    pub days: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default, deny_unknown_fields)]
pub struct Rating {
    #[garde(range(min = 0.0, max = 10.0))]
    pub average: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default, deny_unknown_fields)]
pub struct Network {
    #[garde(range(min = 0))]
    pub id: Option<i64>,
    #[garde(length(max = 255))]
    pub name: Option<String>,
    #[garde(skip)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub country: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Show {
    #[serde(rename = "tvmaze-id")]
    pub tvmaze_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub show_type: Option<String>,
    pub language: Option<String>,
    pub genres: Vec<String>,
    pub status: Option<String>,
    pub runtime: Option<i64>,
    pub premiered: Option<String>,
    #[serde(rename = "officialSite")]
    pub official_site: Option<String>,
    pub schedule: Schedule,
    pub rating: Rating,
    pub weight: Option<i64>,
    pub network: Option<Network>,
    pub summary: Option<String>,
    #[serde(rename = "last-update", with = "last_update_format")]
    #[cfg_attr(feature = "openapi", schema(value_type = String, example = "2021-03-21 20:58:06"))]
    pub last_update: PrimitiveDateTime,
}

impl Show {
    pub fn rating_average(&self) -> Option<f64> {
        self.rating.average
    }

    /// Applies validated patch fields and stamps `last-update`, which never moves backwards.
    pub fn apply_patch(&mut self, patch: ShowPatch, now: PrimitiveDateTime) {
        let ShowPatch {
            name,
            show_type,
            language,
            genres,
            status,
            runtime,
            premiered,
            official_site,
            schedule,
            rating,
            weight,
            network,
            summary,
        } = patch;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(show_type) = show_type {
            self.show_type = show_type;
        }
        if let Some(language) = language {
            self.language = language;
        }
        if let Some(genres) = genres {
            self.genres = genres;
        }
        if let Some(status) = status {
            self.status = status;
        }
        if let Some(runtime) = runtime {
            self.runtime = runtime;
        }
        if let Some(premiered) = premiered {
            self.premiered = premiered;
        }
        if let Some(official_site) = official_site {
            self.official_site = official_site;
        }
        if let Some(schedule) = schedule {
            self.schedule = schedule;
        }
        if let Some(rating) = rating {
            self.rating = rating;
        }
        if let Some(weight) = weight {
            self.weight = weight;
        }
        if let Some(network) = network {
            self.network = network;
        }
        if let Some(summary) = summary {
            self.summary = summary;
        }
        self.last_update = self.last_update.max(now);
    }
}

fn json_column<T: DeserializeOwned>(row: &ChosenRow, column: &str) -> Result<T, sqlx::Error> {
    let text: String = row.try_get(column)?;
    serde_json::from_str(&text).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

impl sqlx::FromRow<'_, ChosenRow> for Show {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        let network = match row.try_get::<Option<String>, _>("network")? {
            Some(_) => json_column(row, "network")?,
            None => None,
        };
        Ok(Show {
            tvmaze_id: row.try_get("tvmaze_id")?,
            name: row.try_get("name")?,
            show_type: row.try_get("type")?,
            language: row.try_get("language")?,
            genres: json_column(row, "genres")?,
            status: row.try_get("status")?,
            runtime: row.try_get("runtime")?,
            premiered: row.try_get("premiered")?,
            official_site: row.try_get("official_site")?,
            schedule: json_column(row, "schedule")?,
            rating: json_column(row, "rating")?,
            weight: row.try_get("weight")?,
            network,
            summary: row.try_get("summary")?,
            last_update: row.try_get("last_update")?,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("id and tvmaze-id cannot be changed")]
    ImmutableId,
    #[error("Patch body must be a JSON object")]
    NotAnObject,
    #[error("{0} cannot be null")]
    NullField(&'static str),
    #[error("{0}")]
    InvalidShape(#[from] serde_json::Error),
    #[error("{0}")]
    InvalidValue(#[from] garde::Report),
}

/// Mutable fields of a show. Unknown keys, identifier keys and badly shaped
/// structured fields are all rejected when parsing. Nullable columns use a
/// double option, so an explicit `null` clears the stored value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(deny_unknown_fields)]
pub struct ShowPatch {
    #[garde(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[serde(rename = "type", default, with = "::serde_with::rust::double_option")]
    #[garde(length(max = 64))]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub show_type: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[garde(length(max = 64))]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub language: Option<Option<String>>,
    #[garde(custom(valid_genres))]
    pub genres: Option<Vec<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[garde(length(max = 64))]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub status: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[garde(range(min = 0))]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<i64>))]
    pub runtime: Option<Option<i64>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[garde(custom(iso_date))]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub premiered: Option<Option<String>>,
    #[serde(rename = "officialSite", default, with = "::serde_with::rust::double_option")]
    #[garde(url)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub official_site: Option<Option<String>>,
    #[garde(dive)]
    pub schedule: Option<Schedule>,
    #[garde(dive)]
    pub rating: Option<Rating>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[garde(range(min = 0, max = 100))]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<i64>))]
    pub weight: Option<Option<i64>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[garde(dive)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Network>))]
    pub network: Option<Option<Network>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[garde(length(max = 10000))]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub summary: Option<Option<String>>,
}

/// Keys whose columns cannot hold `null`.
const REQUIRED_KEYS: [&str; 4] = ["name", "genres", "schedule", "rating"];

impl ShowPatch {
    pub fn from_json(body: serde_json::Value) -> Result<Self, PatchError> {
        let fields = body.as_object().ok_or(PatchError::NotAnObject)?;
        if fields.contains_key("id") || fields.contains_key("tvmaze-id") {
            return Err(PatchError::ImmutableId);
        }
        if let Some(key) = REQUIRED_KEYS
            .iter()
            .find(|key| fields.get(**key).is_some_and(serde_json::Value::is_null))
        {
            return Err(PatchError::NullField(*key));
        }
        let patch: ShowPatch = serde_json::from_value(body)?;
        patch.validate()?;
        Ok(patch)
    }
}

fn valid_genres(value: &Option<Vec<String>>, _ctx: &()) -> garde::Result {
    if let Some(genres) = value {
        if genres.iter().any(|g| g.trim().is_empty() || g.len() > 64) {
            return Err(garde::Error::new(
                "genres must be non-empty names of at most 64 characters",
            ));
        }
    }
    Ok(())
}

fn valid_weekdays(value: &Vec<String>, _ctx: &()) -> garde::Result {
    match value.iter().find(|d| !WEEKDAYS.contains(&d.as_str())) {
        Some(day) => Err(garde::Error::new(format!("{day} is not a weekday"))),
        None => Ok(()),
    }
}

fn iso_date(value: &Option<Option<String>>, _ctx: &()) -> garde::Result {
    if let Some(Some(date)) = value {
        time::Date::parse(date, time::macros::format_description!("[year]-[month]-[day]"))
            .map_err(|_| garde::Error::new("premiered must be a date in YYYY-MM-DD format"))?;
    }
    Ok(())
}
