//! A single extension trait for bounding any future with a timeout.
#![doc(html_logo_url = "https://scuffle.cloud/favicon.svg")]
#![doc(html_favicon_url = "https://scuffle.cloud/favicon.svg")]

use std::future::Future;
use std::time::Duration;

use tokio::time::error::Elapsed;

/// Extends every [`Future`] with [`FutureExt::with_timeout`].
pub trait FutureExt: Future + Sized {
    /// Wraps this future so it resolves to `Err(Elapsed)` if it has not completed
    /// within `duration`.
    ///
    /// ```
    /// # use std::time::Duration;
    /// # use scuffle_future_ext::FutureExt;
    /// # tokio_test::block_on(async {
    /// let result = std::future::ready(1).with_timeout(Duration::from_secs(1)).await;
    /// assert_eq!(result.unwrap(), 1);
    /// # });
    /// ```
    fn with_timeout(self, duration: Duration) -> impl Future<Output = Result<Self::Output, Elapsed>> {
        tokio::time::timeout(duration, self)
    }
}

impl<F: Future> FutureExt for F {}
