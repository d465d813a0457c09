use crate::download_client::{DownloadClient, ProgressFn};
use crate::error::{InstallerError, Result};
use crate::github::{Asset, Release};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Download client that never touches the network: `latest_release` returns
/// a canned descriptor and `download_asset` writes a real zip archive so the
/// extraction path is exercised end to end.
pub struct MockDownloadClient {
    pub release: Release,
    /// Path of the binary entry inside the generated archive.
    pub entry_path: String,
    /// When set, `latest_release` fails the way a network outage would.
    pub fail_fetch: bool,
    pub downloads: AtomicUsize,
}

impl MockDownloadClient {
    pub fn new() -> Self {
        Self::with_entry("clangd_15.0.6/bin/clangd")
    }

    pub fn with_entry(entry_path: &str) -> Self {
        Self {
            release: Self::release("clangd 15.0.6", "15.0.6"),
            entry_path: entry_path.to_string(),
            fail_fetch: false,
            downloads: AtomicUsize::new(0),
        }
    }

    pub fn release(name: &str, tag: &str) -> Release {
        Release {
            name: name.to_string(),
            tag_name: tag.to_string(),
            assets: vec![
                Asset {
                    name: format!("clangd-linux-{tag}.zip"),
                    browser_download_url: format!("https://example.com/clangd-linux-{tag}.zip"),
                },
                Asset {
                    name: format!("clangd-mac-{tag}.zip"),
                    browser_download_url: format!("https://example.com/clangd-mac-{tag}.zip"),
                },
                Asset {
                    name: format!("clangd-windows-{tag}.zip"),
                    browser_download_url: format!("https://example.com/clangd-windows-{tag}.zip"),
                },
            ],
        }
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

impl DownloadClient for MockDownloadClient {
    async fn latest_release(&self) -> Result<Release> {
        if self.fail_fetch {
            return Err(InstallerError::Fetch("mock network outage".to_string()));
        }
        Ok(self.release.clone())
    }

    async fn download_asset(
        &self,
        _asset: &Asset,
        output_path: &Path,
        _token: &CancellationToken,
        on_progress: ProgressFn<'_>,
    ) -> Result<()> {
        self.downloads.fetch_add(1, Ordering::SeqCst);

        let mut zip_buffer = Vec::new();
        let mut zip = ZipWriter::new(Cursor::new(&mut zip_buffer));

        // 0o755 so the entry round-trips as an executable on Unix.
        #[cfg(unix)]
        let options = SimpleFileOptions::default().unix_permissions(0o755);
        #[cfg(not(unix))]
        let options = SimpleFileOptions::default();

        zip.start_file(&*self.entry_path, options)
            .map_err(InstallerError::from)?;
        zip.finish().map_err(InstallerError::from)?;

        on_progress(Some(1.0));
        fs::write(output_path, zip_buffer)?;
        Ok(())
    }
}
