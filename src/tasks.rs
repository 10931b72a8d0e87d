use crate::error::{ImageFetchError, ScrapeError};
use crate::status::{TaskKind, TaskStatus};
use crate::{extract, fetch, Storage};
use reqwest::Client;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Accepts scrape submissions and runs them in the background.
///
/// `submit` returns as soon as the initial status record is readable; from
/// then on the status store is the only channel back to the caller.
pub struct TaskDispatcher<S> {
    storage: Arc<S>,
    client: Client,
}

impl<S> TaskDispatcher<S>
where
    S: Storage + Send + Sync + 'static,
{
    pub fn new(storage: Arc<S>) -> TaskDispatcher<S> {
        TaskDispatcher {
            storage,
            client: Client::new(),
        }
    }

    pub async fn submit(&self, kind: TaskKind, url: String) -> Result<Uuid, ScrapeError> {
        let task_id = Uuid::new_v4();
        self.storage
            .status_create(task_id, &TaskStatus::Requesting)
            .await?;

        info!("Accepted {:?} task {} for {}", kind, task_id, url);

        let storage = Arc::clone(&self.storage);
        let client = self.client.clone();
        tokio::spawn(async move {
            run_task(kind, task_id, url, client, storage).await;
        });

        Ok(task_id)
    }
}

/// Drive one task to a terminal state. Every error lands in the status
/// record as a failure payload; nothing propagates to the submitter.
async fn run_task<S: Storage>(
    kind: TaskKind,
    task_id: Uuid,
    url: String,
    client: Client,
    storage: Arc<S>,
) {
    let result = match kind {
        TaskKind::Text => run_text_task(task_id, &url, &client, storage.as_ref()).await,
        TaskKind::Images => run_image_task(task_id, &url, &client, storage.as_ref()).await,
    };

    if let Err(e) = result {
        warn!("Task {} failed: {}", task_id, e);
        let status = TaskStatus::Failed {
            kind,
            error: e.to_string(),
        };
        if let Err(e) = storage.status_update(task_id, &status).await {
            error!("Could not record failure of task {}: {}", task_id, e);
        }
    } else {
        info!("Task {} complete", task_id);
    }
}

async fn run_text_task<S: Storage>(
    task_id: Uuid,
    url: &str,
    client: &Client,
    storage: &S,
) -> Result<(), ScrapeError> {
    let html = fetch::fetch_page(client, url).await?;
    storage
        .status_update(task_id, &TaskStatus::ProcessingHtml)
        .await?;

    let text = extract::extract_text(&html);

    storage
        .status_update(task_id, &TaskStatus::SavingText)
        .await?;
    storage.page_upsert_text(url, &text).await?;

    storage
        .status_update(task_id, &TaskStatus::TextComplete)
        .await?;
    Ok(())
}

async fn run_image_task<S: Storage>(
    task_id: Uuid,
    url: &str,
    client: &Client,
    storage: &S,
) -> Result<(), ScrapeError> {
    let html = fetch::fetch_page(client, url).await?;
    storage
        .status_update(task_id, &TaskStatus::ProcessingHtml)
        .await?;

    let image_urls = extract::extract_image_urls(&html);

    storage
        .status_update(task_id, &TaskStatus::DownloadingImages)
        .await?;
    let page_id = storage.page_get_or_create(url).await?;

    let total = image_urls.len();
    let mut downloaded = 0;
    let mut failed = 0;
    for (i, image_url) in image_urls.iter().enumerate() {
        // Written before the fetch so a poller sees the item in flight.
        storage
            .status_update(
                task_id,
                &TaskStatus::ImageProgress {
                    current: i + 1,
                    total,
                },
            )
            .await?;

        match fetch::fetch_image(client, image_url).await {
            Ok(bytes) => {
                let file_name = image_url.rsplit('/').next().unwrap_or(image_url);
                storage.image_insert(page_id, file_name, &bytes).await?;
                downloaded += 1;
            }
            Err(ImageFetchError::InvalidUrl { url, reason }) => {
                warn!("Skipping image with invalid url {}: {}", url, reason);
                failed += 1;
            }
            Err(e @ ImageFetchError::Transport(_)) => return Err(e.into()),
        }
    }

    storage
        .status_update(task_id, &TaskStatus::ImagesComplete { downloaded, failed })
        .await?;
    Ok(())
}
