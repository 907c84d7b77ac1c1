use axum::{
    extract::Query,
    response::{IntoResponse, Response},
    Json,
};
use garde::Validate;
use http::{header, StatusCode};
use serde::Deserialize;
use tvshows_dal::{show::now_stamp, store::ShowStore};

use crate::{
    error::ApiResult,
    state::AppState,
    stats::{self, Dimension, Format},
    validate::Garde,
};

#[derive(Debug, Clone, Validate, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct StatisticsQuery {
    /// One of language, genres, status, type
    #[garde(length(max = 32))]
    by: Option<String>,
    /// json or image
    #[garde(length(max = 32))]
    format: Option<String>,
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/statistics", tag = "TV Shows", params(StatisticsQuery),
responses((status = StatusCode::OK, description = "Breakdown of stored shows as JSON or PNG chart", body = stats::Snapshot))))]
pub async fn statistics(
    store: ShowStore,
    Garde(Query(query)): Garde<Query<StatisticsQuery>>,
) -> ApiResult<Response> {
    let by: Dimension = query.by.as_deref().unwrap_or("language").parse()?;
    let format: Format = query.format.as_deref().unwrap_or("json").parse()?;
    let shows = store.load_all().await?;

    match format {
        Format::Json => {
            let snapshot = stats::snapshot(&shows, by, now_stamp())?;
            Ok((StatusCode::OK, Json(snapshot)).into_response())
        }
        Format::Image => {
            let png = tokio::task::spawn_blocking(move || stats::render_chart(&shows, by))
                .await
                .map_err(anyhow::Error::from)??;
            Ok((StatusCode::OK, [(header::CONTENT_TYPE, "image/png")], png).into_response())
        }
    }
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/statistics", axum::routing::get(statistics))
}
