use crate::error::{ApiError, ApiResult};

use super::{Order, SortField};

/// Keys a listed show can be projected to, in the order of the show JSON.
pub const SHOW_COLUMNS: [&str; 16] = [
    "id",
    "tvmaze-id",
    "name",
    "type",
    "language",
    "genres",
    "status",
    "runtime",
    "premiered",
    "officialSite",
    "schedule",
    "rating",
    "weight",
    "network",
    "summary",
    "last-update",
];

pub(super) fn parse_ordering(orderings: &str) -> ApiResult<Vec<Order>> {
    orderings
        .split(',')
        .map(|term| {
            let mut chars = term.chars();
            let descending = match chars.next() {
                Some('+') | Some(' ') => false,
                Some('-') => true,
                other => {
                    let found = other.map(String::from).unwrap_or_default();
                    return Err(ApiError::InvalidQuery(format!(
                        "order_by must begin with + or -; {found} found"
                    )));
                }
            };
            let field: SortField = chars.as_str().parse()?;
            Ok(if descending {
                Order::Desc(field)
            } else {
                Order::Asc(field)
            })
        })
        .collect()
}

pub(super) fn parse_columns(filter: &str) -> ApiResult<Vec<String>> {
    filter
        .split(',')
        .map(|column| {
            if SHOW_COLUMNS.contains(&column) {
                Ok(column.to_string())
            } else {
                Err(ApiError::InvalidQuery(format!(
                    "filter must be in the DB; got {column}"
                )))
            }
        })
        .collect()
}

pub(super) fn parse_page(page: i64) -> ApiResult<u32> {
    u32::try_from(page)
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| ApiError::InvalidQuery(format!("Page must be positive number; got {page}")))
}
