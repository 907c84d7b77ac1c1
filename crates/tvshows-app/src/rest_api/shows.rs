use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing, Json,
};
use garde::Validate;
use http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use tvshows_dal::{
    show::{now_stamp, ShowPatch},
    store::ShowStore,
};

use super::{Link, Links, Page, Removed, ShowStamp};
use crate::{
    error::{ApiError, ApiResult},
    import,
    listing::{self, ListQuery, Listing},
    state::AppState,
    validate::{Garde, JsonBody, PathParam},
};

fn show_link(state: &AppState, id: i64) -> ApiResult<Link> {
    Ok(state.build_url(&format!("tv-shows/{id}"))?.into())
}

fn page_link(state: &AppState, listing: &Listing, page: u32) -> ApiResult<Link> {
    let mut url = state.build_url("tv-shows")?;
    url.query_pairs_mut()
        .append_pair("order_by", &listing.order_by)
        .append_pair("page", &page.to_string())
        .append_pair("page_size", &listing.page_size.to_string())
        .append_pair("filter", &listing.filter);
    Ok(url.into())
}

fn not_found(id: i64) -> ApiError {
    ApiError::ResourceNotFound(format!("Show with id {id} does not exist"))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "", tag = "TV Shows", params(ListQuery),
responses((status = StatusCode::OK, description = "Sorted, paged and projected shows", body = Page))))]
pub async fn list(
    store: ShowStore,
    State(state): State<AppState>,
    Garde(Query(query)): Garde<Query<ListQuery>>,
) -> ApiResult<impl IntoResponse> {
    let listing = query.into_listing(state.config().default_page_size)?;
    let shows = store.load_all().await?;
    let slice = listing.apply(shows)?;
    let links = Links {
        self_link: page_link(&state, &listing, listing.page)?,
        previous: slice
            .has_previous
            .then(|| page_link(&state, &listing, listing.page - 1))
            .transpose()?,
        next: slice
            .has_next
            .then(|| page_link(&state, &listing, listing.page + 1))
            .transpose()?,
    };
    Ok((
        StatusCode::OK,
        Json(Page {
            page: listing.page,
            page_size: listing.page_size,
            tv_shows: slice.rows,
            links,
        }),
    ))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/{id}", tag = "TV Shows",
params(("id" = i64, Path, description = "TVMaze identifier of the show")),
responses((status = StatusCode::OK, description = "Show with links to its neighbours", body = tvshows_dal::show::Show))))]
pub async fn get(
    PathParam(id): PathParam<i64>,
    store: ShowStore,
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    let mut shows = store.load_all().await?;
    shows.sort_by_key(|s| s.tvmaze_id);
    let pos = shows
        .binary_search_by_key(&id, |s| s.tvmaze_id)
        .map_err(|_| not_found(id))?;

    let previous = pos
        .checked_sub(1)
        .map(|i| show_link(&state, shows[i].tvmaze_id))
        .transpose()?;
    let next = shows
        .get(pos + 1)
        .map(|s| show_link(&state, s.tvmaze_id))
        .transpose()?;
    let links = Links {
        self_link: show_link(&state, id)?,
        previous,
        next,
    };

    let mut record = listing::show_to_json(&shows[pos])?;
    record.insert("_links".to_string(), serde_json::to_value(links)?);
    Ok((StatusCode::OK, Json(record)))
}

#[cfg_attr(feature = "openapi", utoipa::path(patch, path = "/{id}", tag = "TV Shows",
params(("id" = i64, Path, description = "TVMaze identifier of the show")), request_body = ShowPatch,
responses((status = StatusCode::OK, description = "Updated show stamp", body = ShowStamp))))]
pub async fn patch(
    PathParam(id): PathParam<i64>,
    store: ShowStore,
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> ApiResult<impl IntoResponse> {
    let _guard = store.lock_for_update().await;
    let mut shows = store.load_all().await?;
    let show = shows
        .iter_mut()
        .find(|s| s.tvmaze_id == id)
        .ok_or_else(|| not_found(id))?;
    let patch = ShowPatch::from_json(body)?;
    show.apply_patch(patch, now_stamp());
    let last_update = show.last_update;
    store.replace_all(&shows).await?;
    info!("Updated show {id}");

    Ok((
        StatusCode::OK,
        Json(ShowStamp {
            id,
            tvmaze_id: None,
            last_update,
            links: Links::self_only(show_link(&state, id)?),
        }),
    ))
}

#[cfg_attr(feature = "openapi", utoipa::path(delete, path = "/{id}", tag = "TV Shows",
params(("id" = i64, Path, description = "TVMaze identifier of the show")),
responses((status = StatusCode::OK, description = "Show removed", body = Removed))))]
pub async fn delete(PathParam(id): PathParam<i64>, store: ShowStore) -> ApiResult<impl IntoResponse> {
    let _guard = store.lock_for_update().await;
    let mut shows = store.load_all().await?;
    let before = shows.len();
    shows.retain(|s| s.tvmaze_id != id);
    if shows.len() == before {
        return Err(not_found(id));
    }
    store.replace_all(&shows).await?;
    info!("Removed show {id}");

    Ok((
        StatusCode::OK,
        Json(Removed {
            message: format!("The TV show with id {id} was removed from the database"),
            id,
        }),
    ))
}

#[derive(Debug, Clone, Validate, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct ImportQuery {
    #[garde(length(max = 255))]
    name: Option<String>,
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/import", tag = "TV Shows", params(ImportQuery),
responses((status = StatusCode::CREATED, description = "Show imported from the search service", body = ShowStamp))))]
pub async fn import_by_name(
    store: ShowStore,
    State(state): State<AppState>,
    Garde(Query(query)): Garde<Query<ImportQuery>>,
) -> ApiResult<impl IntoResponse> {
    let name = query.name.unwrap_or_default();
    let show = import::import_show(&store, state.search(), &name).await?;
    let id = show.tvmaze_id;

    Ok((
        StatusCode::CREATED,
        Json(ShowStamp {
            id,
            tvmaze_id: Some(id),
            last_update: show.last_update,
            links: Links::self_only(show_link(&state, id)?),
        }),
    ))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", routing::get(list))
        .route("/import", routing::post(import_by_name))
        .route(
            "/{id}",
            routing::get(get).patch(patch).delete(delete),
        )
        .merge(super::statistics::router())
}

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;
    #[derive(utoipa::OpenApi)]
    #[openapi(paths(list, get, patch, delete, import_by_name, super::statistics::statistics))]
    struct ApiDocs;
    ApiDocs::openapi()
}
