//! On-disk install tree management: download staging, reuse-or-replace of
//! versioned install directories, archive extraction and binary lookup.
//!
//! Layout: `storage/install/<tag>/...archive contents...` holds one
//! directory per release tag, and `storage/download/<asset-name>` stages the
//! in-flight archive. The staging file lives outside the install tree so a
//! failed download never leaves a half-written archive inside it.

use crate::config::Config;
use crate::download_client::DownloadClient;
use crate::error::{InstallerError, Result};
use crate::github::{Asset, Release};
use crate::host::{HostUi, ReuseDecision};
use crate::logging::spinner_style;
use crate::platform;
use std::fs;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use tracing_indicatif::span_ext::IndicatifSpanExt;

/// Install `asset` from `release` into the storage tree and return the
/// absolute path of the extracted clangd binary.
///
/// If this release tag is already installed the user decides between reusing
/// it (no network access at all), replacing it, or aborting. The decision
/// happens before anything touches the directory.
pub async fn install<D: DownloadClient, U: HostUi>(
    config: &Config,
    ui: &U,
    client: &D,
    release: &Release,
    asset: &Asset,
    token: &CancellationToken,
) -> Result<PathBuf> {
    fs::create_dir_all(&config.install_dir)?;
    fs::create_dir_all(&config.download_dir)?;

    let extract_root = config.install_dir.join(&release.tag_name);
    let binary = platform::binary_name(&config.os);

    if dir_has_entries(&extract_root) {
        match ui.should_reuse(&release.name).await {
            ReuseDecision::Reuse => {
                tracing::info!(tag = %release.tag_name, "reusing existing clangd install");
                return find_binary(&extract_root, binary);
            }
            ReuseDecision::Replace => {
                tracing::info!(tag = %release.tag_name, "replacing existing clangd install");
                fs::remove_dir_all(&extract_root)?;
            }
            ReuseDecision::Dismissed => {
                token.cancel();
                return Err(InstallerError::AlreadyInstalled(release.name.clone()));
            }
        }
    }

    let archive_path = config.download_dir.join(&asset.name);
    ui.progress_begin(&format!("Downloading {}", asset.name));
    let downloaded = client
        .download_asset(asset, &archive_path, token, &|ratio| {
            ui.progress_report(ratio)
        })
        .await;
    ui.progress_end();
    downloaded?;

    let unpacked = unpack(ui, asset, &archive_path, &extract_root, binary);

    // The staging archive is consumed whether unpacking succeeded or not;
    // an unpack error takes precedence over a cleanup error.
    let removed = fs::remove_file(&archive_path);
    let clangd = unpacked?;
    removed?;

    tracing::info!(path = %clangd.display(), "installed clangd");
    Ok(clangd)
}

fn unpack<U: HostUi>(
    ui: &U,
    asset: &Asset,
    archive_path: &Path,
    extract_root: &Path,
    binary: &str,
) -> Result<PathBuf> {
    // Look before we leap: make sure the archive is usable before spending
    // time extracting it.
    ensure_archive_contains(archive_path, binary)?;

    ui.progress_begin(&format!("Extracting {}", asset.name));
    let extracted = extract_zip(archive_path, extract_root);
    ui.progress_end();
    extracted?;

    let clangd = find_binary(extract_root, binary)?;

    #[cfg(unix)]
    make_executable(&clangd)?;

    Ok(clangd)
}

fn dir_has_entries(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Check that some entry's base filename matches the expected binary name.
fn ensure_archive_contains(archive_path: &Path, binary: &str) -> Result<()> {
    let file = fs::File::open(archive_path)?;
    let archive = zip::ZipArchive::new(file)?;

    let found = archive
        .file_names()
        .any(|name| name.rsplit('/').next() == Some(binary));
    if !found {
        return Err(InstallerError::BinaryNotInArchive {
            archive: archive_path.to_path_buf(),
            binary: binary.to_string(),
        });
    }
    Ok(())
}

#[instrument(skip_all)]
fn extract_zip(archive_path: &Path, destination: &Path) -> Result<()> {
    let current_span = tracing::Span::current();
    current_span.pb_set_style(&spinner_style("{msg}"));
    current_span.pb_set_message("Extracting...");
    current_span.pb_set_finish_message("Extracting... Done");

    let file = fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let outpath = match file.enclosed_name() {
            Some(path) => destination.join(path),
            None => continue,
        };

        if file.name().ends_with('/') {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(p) = outpath.parent()
                && !p.exists()
            {
                fs::create_dir_all(p)?;
            }
            let mut outfile = fs::File::create(&outpath)?;
            std::io::copy(&mut file, &mut outfile)?;
        }

        // Restore archive permissions on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = file.unix_mode() {
                fs::set_permissions(&outpath, fs::Permissions::from_mode(mode))?;
            }
        }
    }

    Ok(())
}

/// Find the binary by filename anywhere under an install directory. Archive
/// layouts vary across releases, so the path inside is not assumed.
fn find_binary(extract_root: &Path, binary: &str) -> Result<PathBuf> {
    for entry in walkdir::WalkDir::new(extract_root) {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.file_name().to_str() == Some(binary)
        {
            return Ok(std::path::absolute(entry.path())?);
        }
    }

    Err(InstallerError::BinaryNotInstalled {
        dir: extract_root.to_path_buf(),
        binary: binary.to_string(),
    })
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::mock_download_client::MockDownloadClient;
    use crate::test_helpers::mock_ui::MockUi;
    use anyhow::Result;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> Config {
        let mut config = Config::new_for_path(dir.path());
        config.os = "linux".to_string();
        config.arch = "x86_64".to_string();
        config.glibc_probe = vec!["true".to_string()];
        config
    }

    async fn run_install(
        config: &Config,
        ui: &MockUi,
        client: &MockDownloadClient,
    ) -> crate::error::Result<PathBuf> {
        let release = client.release.clone();
        let asset = release.assets[0].clone();
        let token = CancellationToken::new();
        install(config, ui, client, &release, &asset, &token).await
    }

    #[tokio::test]
    async fn test_fresh_install() -> Result<()> {
        let tmp = TempDir::new()?;
        let config = test_config(&tmp);
        let ui = MockUi::default();
        let client = MockDownloadClient::new();

        let clangd = run_install(&config, &ui, &client).await?;

        assert!(clangd.is_absolute());
        assert!(clangd.exists());
        assert_eq!(clangd.file_name().unwrap(), "clangd");
        assert!(clangd.starts_with(config.install_dir.join("15.0.6")));
        assert_eq!(client.download_count(), 1);

        // The staging archive is gone after a successful extract.
        assert!(!config.download_dir.join(&client.release.assets[0].name).exists());

        // Owner-executable on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&clangd)?.permissions().mode();
            assert_ne!(mode & 0o100, 0);
        }

        // Progress was surfaced for both download and extraction.
        let labels = ui.progress_labels.lock().unwrap();
        assert!(labels.iter().any(|l| l.starts_with("Downloading")));
        assert!(labels.iter().any(|l| l.starts_with("Extracting")));
        Ok(())
    }

    #[tokio::test]
    async fn test_reuse_skips_network() -> Result<()> {
        let tmp = TempDir::new()?;
        let config = test_config(&tmp);
        let ui = MockUi::default();
        let client = MockDownloadClient::new();

        let first = run_install(&config, &ui, &client).await?;
        assert_eq!(client.download_count(), 1);

        let ui = MockUi {
            reuse: ReuseDecision::Reuse,
            ..MockUi::default()
        };
        let second = run_install(&config, &ui, &client).await?;

        assert_eq!(first, second);
        assert_eq!(client.download_count(), 1, "reuse must not re-download");
        Ok(())
    }

    #[tokio::test]
    async fn test_replace_removes_old_directory() -> Result<()> {
        let tmp = TempDir::new()?;
        let config = test_config(&tmp);
        let ui = MockUi::default();
        let client = MockDownloadClient::new();

        run_install(&config, &ui, &client).await?;

        // Leave a marker that must not survive the replace.
        let marker = config.install_dir.join("15.0.6").join("stale-marker");
        fs::write(&marker, b"old")?;

        let ui = MockUi {
            reuse: ReuseDecision::Replace,
            ..MockUi::default()
        };
        run_install(&config, &ui, &client).await?;

        assert!(!marker.exists());
        assert_eq!(client.download_count(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_dismissed_prompt_aborts_untouched() -> Result<()> {
        let tmp = TempDir::new()?;
        let config = test_config(&tmp);
        let ui = MockUi::default();
        let client = MockDownloadClient::new();

        run_install(&config, &ui, &client).await?;
        let marker = config.install_dir.join("15.0.6").join("stale-marker");
        fs::write(&marker, b"old")?;

        let ui = MockUi {
            reuse: ReuseDecision::Dismissed,
            ..MockUi::default()
        };
        let release = client.release.clone();
        let asset = release.assets[0].clone();
        let token = CancellationToken::new();
        let err = install(&config, &ui, &client, &release, &asset, &token)
            .await
            .unwrap_err();

        assert!(matches!(err, InstallerError::AlreadyInstalled(_)));
        assert!(token.is_cancelled());
        assert!(marker.exists(), "dismissing must leave the tree untouched");
        assert_eq!(client.download_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_archive_without_binary_fails_before_extract() -> Result<()> {
        let tmp = TempDir::new()?;
        let config = test_config(&tmp);
        let ui = MockUi::default();
        let client = MockDownloadClient::with_entry("clangd_15.0.6/bin/clangd-indexer");

        let err = run_install(&config, &ui, &client).await.unwrap_err();
        assert!(matches!(err, InstallerError::BinaryNotInArchive { .. }));

        // Nothing was extracted into the install tree.
        assert!(!dir_has_entries(&config.install_dir.join("15.0.6")));

        // The downloaded archive does not linger in the staging directory.
        assert!(
            !config.download_dir.join(&client.release.assets[0].name).exists(),
            "aborted install must remove the staging archive"
        );
        Ok(())
    }
}
