use std::sync::Arc;

use tvshows_dal::{store::ShowStore, Pool};
use url::Url;

use crate::import::ShowSearch;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(app_config: AppConfig, pool: Pool, search: ShowSearch) -> Self {
        AppState {
            state: Arc::new(AppStateInner {
                store: ShowStore::new(pool),
                app_config,
                search,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn build_url(&self, relative_url: &str) -> Result<Url, url::ParseError> {
        self.config().base_url.join(relative_url)
    }

    pub fn store(&self) -> &ShowStore {
        &self.state.store
    }

    pub fn search(&self) -> &ShowSearch {
        &self.state.search
    }
}

struct AppStateInner {
    store: ShowStore,
    app_config: AppConfig,
    search: ShowSearch,
}

pub struct AppConfig {
    pub base_url: Url,
    pub default_page_size: u32,
}
