use crate::error::Result;
use crate::github::{Asset, Release};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Ratio of bytes transferred so far, or `None` while the total is unknown.
pub type ProgressFn<'a> = &'a (dyn Fn(Option<f64>) + Send + Sync);

/// Seam between the install logic and the network, so tests can substitute
/// a client that never leaves the machine.
pub trait DownloadClient {
    /// Fetch the latest release descriptor from the metadata endpoint.
    fn latest_release(&self) -> impl Future<Output = Result<Release>> + Send;

    /// Stream `asset` to `output_path`, reporting progress after every chunk.
    /// Cancelling `token` aborts the transfer with a distinguishable error.
    fn download_asset(
        &self,
        asset: &Asset,
        output_path: &Path,
        token: &CancellationToken,
        on_progress: ProgressFn<'_>,
    ) -> impl Future<Output = Result<()>> + Send;
}
