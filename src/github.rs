use crate::config::Config;
use crate::download_client::{DownloadClient, ProgressFn};
use crate::error::{InstallerError, Result};
use crate::logging::progress_bar_style;
use crate::platform;
use crate::version::{self, VersionRange, MIN_GLIBC};
use futures_util::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use tracing_indicatif::span_ext::IndicatifSpanExt;

/// Timeout for the release metadata fetch. Downloads are bounded by
/// cancellation instead.
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// One published release, as returned by the metadata endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Release {
    pub name: String,
    pub tag_name: String,
    pub assets: Vec<Asset>,
}

/// One downloadable file within a release.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
}

/// Select the asset compatible with the local platform, gated on Linux by
/// the glibc minimum the upstream binaries require.
pub async fn choose_asset<'r>(config: &Config, release: &'r Release) -> Result<&'r Asset> {
    let keyword = platform::platform_keyword(&config.os).ok_or_else(|| {
        InstallerError::UnsupportedPlatform {
            os: config.os.clone(),
            arch: config.arch.clone(),
        }
    })?;

    // Refuse up front rather than install a binary that will not start.
    if keyword == "linux" {
        let min = VersionRange::parse(MIN_GLIBC)?;
        if let Some(found) = version::old_glibc(&config.glibc_probe, &min).await {
            return Err(InstallerError::GlibcTooOld {
                found: found.to_string(),
                minimum: MIN_GLIBC.to_string(),
            });
        }
    }

    if platform::arch_compatible(keyword, &config.arch) {
        let wanted = format!("clangd-{keyword}");
        if let Some(asset) = release.assets.iter().find(|a| a.name.contains(&wanted)) {
            tracing::debug!(asset = %asset.name, "chose release asset");
            return Ok(asset);
        }
    }

    Err(InstallerError::UnsupportedPlatform {
        os: config.os.clone(),
        arch: config.arch.clone(),
    })
}

pub struct GitHubClient {
    client: Client,
    endpoint: String,
}

impl GitHubClient {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .user_agent("clangd-installer/0.1.0")
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            endpoint: config.release_endpoint.clone(),
        }
    }

    async fn stream_to_file(
        response: reqwest::Response,
        file: &mut File,
        token: &CancellationToken,
        on_progress: ProgressFn<'_>,
    ) -> Result<()> {
        // An absent or invalid content-length degrades progress reporting to
        // indeterminate; it is not an error.
        let total = response.content_length().filter(|t| *t > 0);
        if let Some(total) = total {
            tracing::Span::current().pb_set_length(total);
        }

        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        loop {
            tokio::select! {
                _ = token.cancelled() => return Err(InstallerError::Cancelled),
                chunk = stream.next() => {
                    let Some(chunk) = chunk else { break };
                    let chunk = chunk?;
                    file.write_all(&chunk).await?;
                    downloaded += chunk.len() as u64;

                    tracing::Span::current().pb_set_position(downloaded);
                    on_progress(total.map(|t| downloaded as f64 / t as f64));
                }
            }
        }

        file.flush().await?;
        Ok(())
    }
}

impl DownloadClient for GitHubClient {
    async fn latest_release(&self) -> Result<Release> {
        let response = self
            .client
            .get(&self.endpoint)
            .header("Accept", "application/vnd.github.v3+json")
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InstallerError::Fetch(format!("timed out fetching {}", self.endpoint))
                } else {
                    e.into()
                }
            })?;

        if !response.status().is_success() {
            return Err(InstallerError::Fetch(format!(
                "{} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        Ok(response.json().await?)
    }

    #[instrument(skip_all)]
    async fn download_asset(
        &self,
        asset: &Asset,
        output_path: &Path,
        token: &CancellationToken,
        on_progress: ProgressFn<'_>,
    ) -> Result<()> {
        let current_span = tracing::Span::current();
        current_span.pb_set_style(&progress_bar_style());
        current_span.pb_set_message(&format!("Downloading {}...", asset.name));
        current_span.pb_set_finish_message(&format!("Downloading {}... Complete!", asset.name));

        let response = self.client.get(&asset.browser_download_url).send().await?;

        if !response.status().is_success() {
            return Err(InstallerError::Fetch(format!(
                "download of {} failed: {}",
                asset.name,
                response.status()
            )));
        }

        let mut file = File::create(output_path).await?;
        let outcome = Self::stream_to_file(response, &mut file, token, on_progress).await;

        if outcome.is_err() {
            // Best-effort cleanup of the partial file; never masks the
            // original error.
            drop(file);
            let _ = tokio::fs::remove_file(output_path).await;
        }
        outcome
    }
}
