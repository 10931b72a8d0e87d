use crate::error::{ImageFetchError, PageFetchError};
use reqwest::Client;
use tracing::debug;

/// Download the page under scrape. Anything other than a success status is
/// an error, and that error is fatal to the owning task.
pub async fn fetch_page(client: &Client, url: &str) -> Result<String, PageFetchError> {
    debug!("Requesting {}", url);
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(PageFetchError::BadStatus(response.status()));
    }
    Ok(response.text().await?)
}

/// Download one image. The URL is validated up front so that a malformed
/// entry surfaces as `InvalidUrl` rather than a transport error.
pub async fn fetch_image(client: &Client, url: &str) -> Result<Vec<u8>, ImageFetchError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| ImageFetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    debug!("Downloading image {}", parsed);
    let response = client.get(parsed).send().await?;
    Ok(response.bytes().await?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_page_rejects_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let client = Client::new();
        let err = fetch_page(&client, &format!("{}/missing", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, PageFetchError::BadStatus(status) if status.as_u16() == 404));
    }

    #[tokio::test]
    async fn test_fetch_page_returns_body_on_success() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/page")
            .with_status(200)
            .with_body("<html><body>hi</body></html>")
            .create_async()
            .await;

        let client = Client::new();
        let body = fetch_page(&client, &format!("{}/page", server.url()))
            .await
            .unwrap();
        assert!(body.contains("hi"));
    }

    #[tokio::test]
    async fn test_fetch_image_flags_malformed_urls() {
        let client = Client::new();
        let err = fetch_image(&client, "http://").await.unwrap_err();
        assert!(matches!(err, ImageFetchError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_fetch_image_returns_bytes() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/img.png")
            .with_status(200)
            .with_body(&[0x89u8, 0x50, 0x4e, 0x47][..])
            .create_async()
            .await;

        let client = Client::new();
        let bytes = fetch_image(&client, &format!("{}/img.png", server.url()))
            .await
            .unwrap();
        assert_eq!(bytes, vec![0x89, 0x50, 0x4e, 0x47]);
    }
}
