use std::sync::Arc;

use futures::TryStreamExt as _;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::{
    ChosenDB, Error, Pool,
    error::Result,
    show::Show,
};

const SELECT_SHOWS: &str = r#"
SELECT tvmaze_id, name, type, language, genres, status, runtime, premiered, official_site,
schedule, rating, weight, network, summary, last_update
FROM tv_shows
"#;

const INSERT_SHOW: &str = r#"
INSERT INTO tv_shows (tvmaze_id, name, type, language, genres, status, runtime, premiered,
official_site, schedule, rating, weight, network, summary, last_update)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

/// The single show table. Reads materialize the whole table, writes either
/// append one row or replace every row in one transaction.
#[derive(Clone)]
pub struct ShowStore {
    pool: Pool,
    write_lock: Arc<Mutex<()>>,
}

impl ShowStore {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Serializes load-modify-replace sequences of all clones of this store.
    /// Hold the guard until the write is done.
    pub async fn lock_for_update(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    pub async fn load_all(&self) -> Result<Vec<Show>> {
        let sql = format!("{SELECT_SHOWS} ORDER BY rowid");
        let records = sqlx::query_as::<_, Show>(&sql)
            .fetch(&self.pool)
            .try_collect::<Vec<_>>()
            .await?;
        Ok(records)
    }

    pub async fn find(&self, tvmaze_id: i64) -> Result<Option<Show>> {
        let sql = format!("{SELECT_SHOWS} WHERE tvmaze_id = ?");
        let record = sqlx::query_as::<_, Show>(&sql)
            .bind(tvmaze_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    pub async fn append_one(&self, show: &Show) -> Result<()> {
        insert(&self.pool, show).await?;
        debug!("Appended show {}", show.tvmaze_id);
        Ok(())
    }

    pub async fn replace_all(&self, shows: &[Show]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM tv_shows").execute(&mut *tx).await?;
        for show in shows {
            insert(&mut *tx, show).await?;
        }
        tx.commit().await?;
        debug!("Replaced show table with {} records", shows.len());
        Ok(())
    }
}

fn encode_column<T: Serialize>(column: &'static str, value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|source| Error::ColumnEncodeError { column, source })
}

async fn insert<'c, E>(executor: E, show: &Show) -> Result<()>
where
    E: sqlx::Executor<'c, Database = ChosenDB>,
{
    let network = show
        .network
        .as_ref()
        .map(|n| encode_column("network", n))
        .transpose()?;
    sqlx::query(INSERT_SHOW)
        .bind(show.tvmaze_id)
        .bind(&show.name)
        .bind(&show.show_type)
        .bind(&show.language)
        .bind(encode_column("genres", &show.genres)?)
        .bind(&show.status)
        .bind(show.runtime)
        .bind(&show.premiered)
        .bind(&show.official_site)
        .bind(encode_column("schedule", &show.schedule)?)
        .bind(encode_column("rating", &show.rating)?)
        .bind(show.weight)
        .bind(network)
        .bind(&show.summary)
        .bind(show.last_update)
        .execute(executor)
        .await?;
    Ok(())
}
