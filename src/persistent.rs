use crate::error::ScrapeError;
use crate::status::TaskStatus;
use crate::{PageRecord, Storage};
use chrono::{DateTime, FixedOffset};
use futures::TryStreamExt;
use sqlx::{sqlite::SqliteConnectOptions, Row, SqlitePool};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

const WEBPAGES: &str = "webpages";
const IMAGES: &str = "images";
const TASK_RESULTS: &str = "task_results";

/// SQLite-backed store for pages, downloaded images and task status records.
/// Image bytes live on disk under `media_root`, one directory per page.
pub struct Persistent {
    pool: SqlitePool,
    media_root: PathBuf,
}

impl Persistent {
    pub async fn new(db_path: &Path, media_root: &Path) -> Result<Persistent, ScrapeError> {
        let opt = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(opt).await?;

        tokio::fs::create_dir_all(media_root).await?;

        let p = Persistent {
            pool,
            media_root: media_root.to_path_buf(),
        };

        for table in [WEBPAGES, IMAGES, TASK_RESULTS] {
            if !p.is_table_exists(table).await? {
                p.create_table(table).await?;
            }
        }

        Ok(p)
    }

    async fn is_table_exists(&self, table: &str) -> Result<bool, ScrapeError> {
        Ok(
            sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
                .bind(table)
                .fetch_optional(&self.pool)
                .await?
                .is_some(),
        )
    }

    async fn create_table(&self, table: &str) -> Result<(), ScrapeError> {
        let query = match table {
            WEBPAGES => format!(
                r#"
                    CREATE TABLE {} (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        url TEXT NOT NULL UNIQUE,
                        text TEXT,
                        created_at DATETIME
                    )
                "#,
                table
            ),
            IMAGES => format!(
                r#"
                    CREATE TABLE {} (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        webpage_id INTEGER NOT NULL REFERENCES webpages(id),
                        file TEXT NOT NULL,
                        created_at DATETIME
                    )
                "#,
                table
            ),
            _ => format!(
                r#"
                    CREATE TABLE {} (
                        task_id TEXT PRIMARY KEY,
                        result TEXT NOT NULL,
                        created_at DATETIME,
                        updated_at DATETIME
                    )
                "#,
                table
            ),
        };
        sqlx::query(&query).execute(&self.pool).await?;
        debug!("Created {}", table);
        Ok(())
    }

    async fn page_id_by_url(&self, url: &str) -> Result<Option<i64>, ScrapeError> {
        let query = format!("SELECT id FROM {} WHERE url = ?", WEBPAGES);
        let row = sqlx::query(&query)
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(match row {
            Some(row) => Some(row.try_get("id")?),
            None => None,
        })
    }

    async fn images_for_page(&self, page_id: i64) -> Result<Vec<String>, ScrapeError> {
        let query = format!(
            "SELECT file FROM {} WHERE webpage_id = ? ORDER BY id",
            IMAGES
        );
        let mut files = vec![];
        let mut rows = sqlx::query(&query).bind(page_id).fetch(&self.pool);
        while let Some(row) = rows.try_next().await? {
            files.push(row.try_get("file")?);
        }
        Ok(files)
    }

    fn get_now(&self) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(
            &chrono::offset::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        )
        .unwrap()
    }
}

#[async_trait::async_trait]
impl Storage for Persistent {
    async fn status_create(&self, task_id: Uuid, status: &TaskStatus) -> Result<(), ScrapeError> {
        let query = format!(
            "INSERT INTO {} (task_id, result, created_at, updated_at) VALUES (?, ?, ?, ?)",
            TASK_RESULTS
        );
        let now = self.get_now();
        sqlx::query(&query)
            .bind(task_id.to_string())
            .bind(status.to_payload().to_string())
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn status_update(&self, task_id: Uuid, status: &TaskStatus) -> Result<(), ScrapeError> {
        let query = format!(
            "UPDATE {} SET result = ?, updated_at = ? WHERE task_id = ?",
            TASK_RESULTS
        );
        sqlx::query(&query)
            .bind(status.to_payload().to_string())
            .bind(self.get_now())
            .bind(task_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn status_get(&self, task_id: Uuid) -> Result<Option<serde_json::Value>, ScrapeError> {
        let query = format!("SELECT result FROM {} WHERE task_id = ?", TASK_RESULTS);
        let row = sqlx::query(&query)
            .bind(task_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("result")?;
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => Ok(None),
        }
    }

    async fn page_upsert_text(&self, url: &str, text: &str) -> Result<i64, ScrapeError> {
        let query = format!(
            r#"
                INSERT INTO {} (url, text, created_at) VALUES (?, ?, ?)
                ON CONFLICT(url) DO UPDATE SET text = excluded.text
            "#,
            WEBPAGES
        );
        sqlx::query(&query)
            .bind(url)
            .bind(text)
            .bind(self.get_now())
            .execute(&self.pool)
            .await?;

        // The row is guaranteed to exist after the upsert.
        Ok(self.page_id_by_url(url).await?.ok_or(sqlx::Error::RowNotFound)?)
    }

    async fn page_get_or_create(&self, url: &str) -> Result<i64, ScrapeError> {
        if let Some(id) = self.page_id_by_url(url).await? {
            return Ok(id);
        }
        let query = format!(
            "INSERT OR IGNORE INTO {} (url, created_at) VALUES (?, ?)",
            WEBPAGES
        );
        sqlx::query(&query)
            .bind(url)
            .bind(self.get_now())
            .execute(&self.pool)
            .await?;
        Ok(self.page_id_by_url(url).await?.ok_or(sqlx::Error::RowNotFound)?)
    }

    async fn image_insert(
        &self,
        page_id: i64,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<(), ScrapeError> {
        let dir = self.media_root.join(page_id.to_string());
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(file_name), bytes).await?;

        let query = format!(
            "INSERT INTO {} (webpage_id, file, created_at) VALUES (?, ?, ?)",
            IMAGES
        );
        sqlx::query(&query)
            .bind(page_id)
            .bind(format!("{}/{}", page_id, file_name))
            .bind(self.get_now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn page_get(&self, id: i64) -> Result<Option<PageRecord>, ScrapeError> {
        let query = format!("SELECT id, url, text FROM {} WHERE id = ?", WEBPAGES);
        let row = sqlx::query(&query).bind(id).fetch_optional(&self.pool).await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let record = PageRecord {
            id: row.try_get("id")?,
            url: row.try_get("url")?,
            text: row.try_get("text")?,
            images: self.images_for_page(id).await?,
        };
        Ok(Some(record))
    }

    async fn page_list(&self, limit: u32, offset: u32) -> Result<Vec<PageRecord>, ScrapeError> {
        let query = format!(
            "SELECT id, url, text FROM {} ORDER BY id LIMIT ? OFFSET ?",
            WEBPAGES
        );
        let mut pages = vec![];
        {
            let mut rows = sqlx::query(&query)
                .bind(limit)
                .bind(offset)
                .fetch(&self.pool);
            while let Some(row) = rows.try_next().await? {
                pages.push(PageRecord {
                    id: row.try_get("id")?,
                    url: row.try_get("url")?,
                    text: row.try_get("text")?,
                    images: vec![],
                });
            }
        }
        for page in &mut pages {
            page.images = self.images_for_page(page.id).await?;
        }
        Ok(pages)
    }

    async fn page_count(&self) -> Result<u32, ScrapeError> {
        let query = format!("SELECT COUNT(*) FROM {}", WEBPAGES);
        Ok(sqlx::query(&query)
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?)
    }
}
