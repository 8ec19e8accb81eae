//! Release feed abstraction
//!
//! The update flow only needs two operations from the release feed: the
//! latest release's metadata, and the raw bytes behind an asset URL.
//! Implementations must observe `cancel` in every blocking network wait.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::error::ClientError;
use super::release::Release;

#[async_trait]
pub trait ReleaseClient: Send + Sync {
    /// Most recent published release.
    async fn get_latest_release(&self, cancel: &CancellationToken) -> Result<Release, ClientError>;

    /// Raw bytes served at `url`.
    async fn get_asset(&self, cancel: &CancellationToken, url: &str) -> Result<Vec<u8>, ClientError>;
}

#[async_trait]
impl<T> ReleaseClient for Arc<T>
where
    T: ReleaseClient + ?Sized,
{
    async fn get_latest_release(&self, cancel: &CancellationToken) -> Result<Release, ClientError> {
        (**self).get_latest_release(cancel).await
    }

    async fn get_asset(&self, cancel: &CancellationToken, url: &str) -> Result<Vec<u8>, ClientError> {
        (**self).get_asset(cancel, url).await
    }
}

#[async_trait]
impl<'a, T> ReleaseClient for &'a T
where
    T: ReleaseClient + ?Sized,
{
    async fn get_latest_release(&self, cancel: &CancellationToken) -> Result<Release, ClientError> {
        (**self).get_latest_release(cancel).await
    }

    async fn get_asset(&self, cancel: &CancellationToken, url: &str) -> Result<Vec<u8>, ClientError> {
        (**self).get_asset(cancel, url).await
    }
}
