use serde_json::json;

/// The two scrape task flavors a client can submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Text,
    Images,
}

impl TaskKind {
    pub fn failure_message(&self) -> &'static str {
        match self {
            TaskKind::Text => "Failed to download text",
            TaskKind::Images => "Failed to download images",
        }
    }
}

/// Everything a task ever writes into its status record.
///
/// A record advances through the in-progress variants in order and ends on
/// exactly one of the terminal variants; pollers read the rendered JSON
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Requesting,
    ProcessingHtml,
    SavingText,
    DownloadingImages,
    ImageProgress { current: usize, total: usize },
    TextComplete,
    ImagesComplete { downloaded: usize, failed: usize },
    Failed { kind: TaskKind, error: String },
}

impl TaskStatus {
    /// Whether this is a final state (no further writes follow it).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::TextComplete | TaskStatus::ImagesComplete { .. } | TaskStatus::Failed { .. }
        )
    }

    /// Render the wire payload stored in the status record.
    pub fn to_payload(&self) -> serde_json::Value {
        match self {
            TaskStatus::Requesting => json!({ "status_message": "requesting url" }),
            TaskStatus::ProcessingHtml => json!({ "status_message": "processing HTML file" }),
            TaskStatus::SavingText => json!({ "status_message": "saving text in database" }),
            TaskStatus::DownloadingImages => json!({ "status_message": "downloading images" }),
            TaskStatus::ImageProgress { current, total } => json!({
                "status_message": format!("Downloaded {} / {} images", current, total),
            }),
            TaskStatus::TextComplete => json!({
                "status_code": 200,
                "status_message": "download complete",
            }),
            TaskStatus::ImagesComplete { downloaded, failed } => json!({
                "status_code": 200,
                "status_message": "download complete",
                "images_downloaded": downloaded,
                "images_failed_to_download": failed,
            }),
            TaskStatus::Failed { kind, error } => json!({
                "status_code": 500,
                "status_message": kind.failure_message(),
                "error_message": error,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_milestone_payloads_carry_only_a_message() {
        assert_eq!(
            TaskStatus::Requesting.to_payload(),
            json!({ "status_message": "requesting url" })
        );
        assert_eq!(
            TaskStatus::ImageProgress {
                current: 2,
                total: 7
            }
            .to_payload(),
            json!({ "status_message": "Downloaded 2 / 7 images" })
        );
    }

    #[test]
    fn test_terminal_payloads() {
        assert_eq!(
            TaskStatus::TextComplete.to_payload(),
            json!({ "status_code": 200, "status_message": "download complete" })
        );
        assert_eq!(
            TaskStatus::ImagesComplete {
                downloaded: 3,
                failed: 1
            }
            .to_payload(),
            json!({
                "status_code": 200,
                "status_message": "download complete",
                "images_downloaded": 3,
                "images_failed_to_download": 1,
            })
        );
        assert_eq!(
            TaskStatus::Failed {
                kind: TaskKind::Images,
                error: "boom".to_string()
            }
            .to_payload(),
            json!({
                "status_code": 500,
                "status_message": "Failed to download images",
                "error_message": "boom",
            })
        );
    }

    #[test]
    fn test_terminal_detection() {
        assert!(!TaskStatus::Requesting.is_terminal());
        assert!(!TaskStatus::DownloadingImages.is_terminal());
        assert!(!TaskStatus::ImageProgress {
            current: 1,
            total: 1
        }
        .is_terminal());
        assert!(TaskStatus::TextComplete.is_terminal());
        assert!(TaskStatus::Failed {
            kind: TaskKind::Text,
            error: "x".to_string()
        }
        .is_terminal());
    }
}
