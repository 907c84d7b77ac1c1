use std::{cmp::Ordering, str::FromStr};

use garde::Validate;
use serde::Deserialize;
use serde_json::{Map, Value};
use tvshows_dal::show::Show;

use crate::error::{ApiError, ApiResult};

mod parsers;

pub use parsers::SHOW_COLUMNS;

pub const DEFAULT_ORDER_BY: &str = "+id";
pub const DEFAULT_FILTER: &str = "id,name";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Name,
    Runtime,
    Premiered,
    RatingAverage,
}

impl FromStr for SortField {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(SortField::Id),
            "name" => Ok(SortField::Name),
            "runtime" => Ok(SortField::Runtime),
            "premiered" => Ok(SortField::Premiered),
            "rating-average" => Ok(SortField::RatingAverage),
            other => Err(ApiError::InvalidQuery(format!(
                "order_by must be either id,name,runtime,premiered, or rating-average; got {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc(SortField),
    Desc(SortField),
}

impl Order {
    /// Compares two shows by this key. Missing values go last in both directions.
    pub fn compare(&self, a: &Show, b: &Show) -> Ordering {
        let (field, descending) = match *self {
            Order::Asc(field) => (field, false),
            Order::Desc(field) => (field, true),
        };
        let directed = |o: Ordering| if descending { o.reverse() } else { o };
        match field {
            SortField::Id => directed(a.tvmaze_id.cmp(&b.tvmaze_id)),
            SortField::Name => directed(a.name.cmp(&b.name)),
            SortField::Runtime => nulls_last(a.runtime, b.runtime, |x, y| directed(x.cmp(&y))),
            SortField::Premiered => nulls_last(
                a.premiered.as_deref(),
                b.premiered.as_deref(),
                |x, y| directed(x.cmp(y)),
            ),
            SortField::RatingAverage => nulls_last(
                a.rating_average(),
                b.rating_average(),
                |x, y| directed(x.total_cmp(&y)),
            ),
        }
    }
}

fn nulls_last<T>(a: Option<T>, b: Option<T>, cmp: impl FnOnce(T, T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => cmp(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable multi-key sort, keys applied left to right.
pub fn sort_shows(shows: &mut [Show], ordering: &[Order]) {
    shows.sort_by(|a, b| {
        ordering
            .iter()
            .map(|order| order.compare(a, b))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

#[derive(Debug, Clone, Validate, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
#[garde(allow_unvalidated)]
pub struct ListQuery {
    #[garde(length(max = 255))]
    order_by: Option<String>,
    page: Option<i64>,
    #[garde(range(min = 1))]
    page_size: Option<u32>,
    #[garde(length(max = 1000))]
    filter: Option<String>,
}

impl ListQuery {
    pub fn into_listing(self, default_page_size: u32) -> ApiResult<Listing> {
        let order_by = self
            .order_by
            .unwrap_or_else(|| DEFAULT_ORDER_BY.to_string());
        let ordering = parsers::parse_ordering(&order_by)?;
        let page = parsers::parse_page(self.page.unwrap_or(1))?;
        let page_size = self.page_size.unwrap_or(default_page_size).max(1);
        let filter = self.filter.unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let columns = parsers::parse_columns(&filter)?;

        Ok(Listing {
            order_by,
            ordering,
            page,
            page_size,
            filter,
            columns,
        })
    }
}

/// Checked listing request. Raw `order_by` and `filter` are kept for link building.
#[derive(Debug, Clone)]
pub struct Listing {
    pub order_by: String,
    pub ordering: Vec<Order>,
    pub page: u32,
    pub page_size: u32,
    pub filter: String,
    pub columns: Vec<String>,
}

#[derive(Debug)]
pub struct PageSlice<T> {
    pub rows: Vec<T>,
    pub has_previous: bool,
    pub has_next: bool,
}

impl Listing {
    pub fn apply(&self, mut shows: Vec<Show>) -> ApiResult<PageSlice<Map<String, Value>>> {
        sort_shows(&mut shows, &self.ordering);
        let PageSlice {
            rows,
            has_previous,
            has_next,
        } = paginate(shows, self.page, self.page_size)?;
        let rows = rows
            .iter()
            .map(|show| project(show, &self.columns))
            .collect::<ApiResult<Vec<_>>>()?;
        Ok(PageSlice {
            rows,
            has_previous,
            has_next,
        })
    }
}

/// Cuts page `page` out of `rows`. Bounds are `page * page_size` to
/// `(page + 1) * page_size`, except that a first page covering everything
/// returns all rows.
pub fn paginate<T>(rows: Vec<T>, page: u32, page_size: u32) -> ApiResult<PageSlice<T>> {
    let total = rows.len() as u64;
    let size = u64::from(page_size.max(1));
    if page == 1 && size >= total {
        return Ok(PageSlice {
            rows,
            has_previous: false,
            has_next: false,
        });
    }

    let start = u64::from(page) * size;
    let end = start + size;
    if start > total {
        return Err(ApiError::ResourceNotFound(format!(
            "Database has a total of {total} records; max pages is {}",
            total.div_ceil(size)
        )));
    }

    let (has_previous, has_next) = if page == 1 {
        (false, true)
    } else if end >= total {
        (true, false)
    } else {
        (true, true)
    };
    let rows = rows
        .into_iter()
        .skip(start as usize)
        .take(size as usize)
        .collect();
    Ok(PageSlice {
        rows,
        has_previous,
        has_next,
    })
}

/// Full JSON of a show, led by `id` which mirrors `tvmaze-id`.
pub fn show_to_json(show: &Show) -> ApiResult<Map<String, Value>> {
    let mut record = Map::new();
    record.insert("id".to_string(), Value::from(show.tvmaze_id));
    if let Value::Object(fields) = serde_json::to_value(show)? {
        record.extend(fields);
    }
    Ok(record)
}

pub fn project(show: &Show, columns: &[String]) -> ApiResult<Map<String, Value>> {
    let mut record = show_to_json(show)?;
    Ok(columns
        .iter()
        .filter_map(|column| record.remove(column).map(|value| (column.clone(), value)))
        .collect())
}
