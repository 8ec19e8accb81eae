//! GitHub release API interaction

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::ACCEPT;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::client::ReleaseClient;
use super::error::ClientError;
use super::release::Release;

// Connection establishment and per-chunk inactivity limits. The overall
// deadline is enforced by the caller.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300);

/// Largest asset accepted from the release feed
pub const MAX_ASSET_SIZE: u64 = 512 * 1024 * 1024;

// Content-Length is server-controlled; only this much is reserved up front
const CAPACITY_HINT_LIMIT: u64 = 64 * 1024 * 1024;

/// [`ReleaseClient`] backed by the GitHub releases REST API
#[derive(Debug, Clone)]
pub struct GitHubReleaseClient {
    base: Url,
    client: reqwest::Client,
}

impl GitHubReleaseClient {
    /// `release_url` is the repository API root,
    /// e.g. `https://api.github.com/repos/<owner>/<repo>`.
    pub fn new(release_url: &str, user_agent: &str) -> Result<Self, ClientError> {
        let base = Url::parse(release_url)
            .map_err(|e| ClientError::Other(format!("invalid release url {release_url:?}: {e}")))?;

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(user_agent)
            .build()?;

        Ok(Self::from_parts(base, client))
    }

    pub(crate) fn from_parts(base: Url, client: reqwest::Client) -> Self {
        Self { base, client }
    }

    fn latest_release_url(&self) -> String {
        format!("{}/releases/latest", self.base.as_str().trim_end_matches('/'))
    }

    async fn fetch_latest(&self) -> Result<Release, ClientError> {
        let url = self.latest_release_url();
        debug!("Fetching latest release from {url}");

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        let release: Release = response.json().await?;
        debug!(
            "Latest release {} has {} assets",
            release.tag(),
            release.assets().len()
        );
        Ok(release)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        debug!("Downloading release asset {url}");

        let mut response = self
            .client
            .get(url)
            .header(ACCEPT, "application/octet-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let too_large = || ClientError::TooLarge {
            url: url.to_string(),
            limit: MAX_ASSET_SIZE,
        };
        let declared = response.content_length().unwrap_or(0);
        if declared > MAX_ASSET_SIZE {
            return Err(too_large());
        }

        let mut bytes = Vec::with_capacity(declared.min(CAPACITY_HINT_LIMIT) as usize);
        loop {
            // Detect stalled transfers instead of waiting on the overall deadline
            let chunk = match timeout(DOWNLOAD_INACTIVITY_TIMEOUT, response.chunk()).await {
                Ok(Ok(Some(chunk))) => chunk,
                Ok(Ok(None)) => break,
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    return Err(ClientError::Stalled(DOWNLOAD_INACTIVITY_TIMEOUT.as_secs()));
                }
            };
            if (bytes.len() + chunk.len()) as u64 > MAX_ASSET_SIZE {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }

        debug!("Downloaded {} bytes from {url}", bytes.len());
        Ok(bytes)
    }
}

#[async_trait]
impl ReleaseClient for GitHubReleaseClient {
    async fn get_latest_release(&self, cancel: &CancellationToken) -> Result<Release, ClientError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            result = self.fetch_latest() => result,
        }
    }

    async fn get_asset(&self, cancel: &CancellationToken, url: &str) -> Result<Vec<u8>, ClientError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            result = self.download(url) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_release_url_tolerates_trailing_slash() {
        let client = GitHubReleaseClient::new(
            "https://api.github.com/repos/Vonage/vonage-cloud-runtime-cli/",
            "vcr-cli-test",
        )
        .unwrap();
        assert_eq!(
            client.latest_release_url(),
            "https://api.github.com/repos/Vonage/vonage-cloud-runtime-cli/releases/latest"
        );
    }

    #[test]
    fn rejects_invalid_release_url() {
        let err = GitHubReleaseClient::new("not a url", "vcr-cli-test").unwrap_err();
        assert!(matches!(err, ClientError::Other(_)));
    }

    #[tokio::test]
    async fn cancelled_token_aborts_requests() {
        // Unroutable address: the request would hang until the connect timeout.
        let client = GitHubReleaseClient::new("http://10.255.255.1/repos/x/y", "vcr-cli-test").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = client.get_latest_release(&cancel).await.unwrap_err();
        assert!(matches!(err, ClientError::Cancelled));

        let err = client
            .get_asset(&cancel, "http://10.255.255.1/asset.tar.gz")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Cancelled));
    }

    mod local_server {
        use super::*;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        /// Answers one request with `response`, returning the asset URL.
        async fn serve_once(response: &'static str) -> String {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
            format!("http://{addr}/vcr_linux_amd64.tar.gz")
        }

        fn local_client() -> GitHubReleaseClient {
            let http = reqwest::Client::builder().no_proxy().build().unwrap();
            GitHubReleaseClient::from_parts(Url::parse("http://127.0.0.1/repos/x/y").unwrap(), http)
        }

        #[tokio::test]
        async fn downloads_asset_body() {
            let url = serve_once(
                "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
            )
            .await;

            let bytes = local_client()
                .get_asset(&CancellationToken::new(), &url)
                .await
                .unwrap();
            assert_eq!(bytes, b"hello");
        }

        #[tokio::test]
        async fn absurd_content_length_is_an_error() {
            let url = serve_once(
                "HTTP/1.1 200 OK\r\nContent-Length: 4611686018427387904\r\nConnection: close\r\n\r\nshort",
            )
            .await;

            let err = local_client()
                .get_asset(&CancellationToken::new(), &url)
                .await
                .unwrap_err();
            assert!(matches!(err, ClientError::TooLarge { .. }), "{err:?}");
        }

        #[tokio::test]
        async fn short_body_is_an_error() {
            let url = serve_once(
                "HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\nshort",
            )
            .await;

            let result = local_client().get_asset(&CancellationToken::new(), &url).await;
            assert!(result.is_err());
        }

        #[tokio::test]
        async fn error_status_is_reported() {
            let url = serve_once(
                "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            )
            .await;

            let err = local_client()
                .get_asset(&CancellationToken::new(), &url)
                .await
                .unwrap_err();
            assert!(matches!(err, ClientError::Status { status: 404, .. }), "{err:?}");
        }
    }
}
