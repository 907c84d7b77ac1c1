pub mod error;
pub mod import;
pub mod listing;
pub mod rest_api;
pub mod state;
pub mod stats;
pub mod validate;

#[macro_export]
macro_rules! store_from_request {
    ($store:ty) => {
        impl axum::extract::FromRequestParts<$crate::state::AppState> for $store {
            type Rejection = http::StatusCode;

            fn from_request_parts(
                _parts: &mut http::request::Parts,
                state: &$crate::state::AppState,
            ) -> impl std::future::Future<Output = std::result::Result<Self, Self::Rejection>>
                   + core::marker::Send {
                futures::future::ready(std::result::Result::Ok(state.store().clone()))
            }
        }
    };
}

store_from_request!(tvshows_dal::store::ShowStore);
