use serde::Serialize;
use uuid::Uuid;

pub mod api;
pub mod extract;
pub mod fetch;
pub mod persistent;
pub mod status;
pub mod tasks;

mod error;

pub use error::{ImageFetchError, PageFetchError, ScrapeError};
pub use status::{TaskKind, TaskStatus};
pub use tasks::TaskDispatcher;

/// A scraped page as exposed to readers: its text (if a text task ran) and
/// the location handles of its downloaded images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRecord {
    pub id: i64,
    pub url: String,
    pub text: Option<String>,
    pub images: Vec<String>,
}

/// Persistence operations the dispatcher and executors run against.
///
/// Status records are written whole on every update, so readers never see a
/// torn payload; pages are keyed by url and upserted, never duplicated.
#[async_trait::async_trait]
pub trait Storage {
    async fn status_create(&self, task_id: Uuid, status: &TaskStatus) -> Result<(), ScrapeError>;
    async fn status_update(&self, task_id: Uuid, status: &TaskStatus) -> Result<(), ScrapeError>;
    async fn status_get(&self, task_id: Uuid) -> Result<Option<serde_json::Value>, ScrapeError>;

    async fn page_upsert_text(&self, url: &str, text: &str) -> Result<i64, ScrapeError>;
    async fn page_get_or_create(&self, url: &str) -> Result<i64, ScrapeError>;
    async fn image_insert(
        &self,
        page_id: i64,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<(), ScrapeError>;

    async fn page_get(&self, id: i64) -> Result<Option<PageRecord>, ScrapeError>;
    async fn page_list(&self, limit: u32, offset: u32) -> Result<Vec<PageRecord>, ScrapeError>;
    async fn page_count(&self) -> Result<u32, ScrapeError>;
}
