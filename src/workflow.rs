//! Startup triage and the install/update/recovery flows built on top of it.
//!
//! Failure reporting follows one rule: background work the user never asked
//! for stays silent (traced only), while explicit actions surface through
//! the host's error/help hooks. Recovery always degrades to pointing at the
//! manual installation instructions rather than failing loudly.

use crate::config::{Config, INSTALL_HELP_URL};
use crate::download_client::DownloadClient;
use crate::error::InstallerError;
use crate::github::{self, Release};
use crate::host::HostUi;
use crate::installer;
use crate::version;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Result of startup triage. `clangd_path` is available immediately; the
/// background task (recovery or update check) is fire-and-forget, but tests
/// await it for determinism.
pub struct InstallStatus {
    pub clangd_path: Option<PathBuf>,
    pub background: JoinHandle<()>,
}

pub struct Installer<D, U> {
    pub config: Config,
    pub client: D,
    pub ui: U,
}

impl<D, U> Installer<D, U>
where
    D: DownloadClient + Send + Sync + 'static,
    U: HostUi + 'static,
{
    pub fn new(config: Config, client: D, ui: U) -> Arc<Self> {
        Arc::new(Self { config, client, ui })
    }

    /// Decide whether the configured binary is usable and kick off the
    /// appropriate background work. Returns without waiting on any network
    /// I/O.
    pub async fn prepare(self: Arc<Self>, configured: &str, check_updates: bool) -> InstallStatus {
        match resolve_binary(configured).await {
            None => {
                tracing::info!(configured, "configured clangd not found, starting recovery");
                let this = Arc::clone(&self);
                InstallStatus {
                    clangd_path: None,
                    background: tokio::spawn(async move { this.recover().await }),
                }
            }
            Some(path) => {
                tracing::debug!(path = %path.display(), "using configured clangd");
                let background = if check_updates {
                    let this = Arc::clone(&self);
                    let clangd = path.clone();
                    tokio::spawn(async move { this.check_updates(&clangd, false).await })
                } else {
                    tokio::spawn(async {})
                };
                InstallStatus {
                    clangd_path: Some(path),
                    background,
                }
            }
        }
    }

    /// Compare the installed binary against the latest release and offer an
    /// upgrade. `requested` distinguishes the user asking "check now" from
    /// the periodic silent check.
    pub async fn check_updates(&self, clangd: &Path, requested: bool) {
        let checked = async {
            let release = self.client.latest_release().await?;
            let check = version::upgrade(&release, clangd).await?;
            Ok::<_, InstallerError>((release, check))
        }
        .await;

        let (release, check) = match checked {
            Ok(pair) => pair,
            Err(e) => {
                if requested {
                    self.ui
                        .error(&format!("Failed to check for clangd update: {e}"));
                } else {
                    tracing::info!("skipped clangd update check: {e}");
                }
                return;
            }
        };

        if !check.upgrade_available {
            tracing::debug!(installed = %check.old, latest = %check.new, "clangd is up to date");
            if requested {
                self.ui.info(&format!(
                    "clangd is up to date (installed {}, latest {})",
                    check.old, check.new
                ));
            }
            return;
        }

        if self
            .ui
            .prompt_update(&check.old.to_string(), &check.new.to_string())
            .await
        {
            self.install_release(&release).await;
        }
    }

    /// No usable binary was configured: offer to install the latest release.
    /// Never propagates an error; anything going wrong ends in a pointer to
    /// the manual installation instructions.
    pub async fn recover(&self) {
        let offered = async {
            let release = self.client.latest_release().await?;
            github::choose_asset(&self.config, &release).await?;
            Ok::<_, InstallerError>(release)
        }
        .await;

        let release = match offered {
            Ok(release) => release,
            Err(e) => {
                tracing::info!("cannot offer to install clangd: {e}");
                self.ui.show_help(
                    "The clangd language server was not found on your system.",
                    INSTALL_HELP_URL,
                );
                return;
            }
        };

        if self.ui.prompt_install(&release.name).await {
            self.install_release(&release).await;
        }
    }

    /// Explicit "install the latest release" command from the host.
    pub async fn install_latest(&self) -> Option<PathBuf> {
        match self.client.latest_release().await {
            Ok(release) => self.install_release(&release).await,
            Err(e) => {
                self.ui.show_help(
                    &format!("Failed to install clangd language server: {e}"),
                    INSTALL_HELP_URL,
                );
                None
            }
        }
    }

    /// Install with consent already given. Cancellation and a dismissed
    /// reuse prompt end quietly; real failures surface through the help UI.
    async fn install_release(&self, release: &Release) -> Option<PathBuf> {
        let token = CancellationToken::new();
        let result = async {
            let asset = github::choose_asset(&self.config, release).await?;
            installer::install(&self.config, &self.ui, &self.client, release, asset, &token).await
        }
        .await;

        match result {
            Ok(path) => {
                self.ui
                    .prompt_reload(&format!(
                        "clangd {} is now installed. Reload the window to start using it.",
                        release.name
                    ))
                    .await;
                Some(path)
            }
            Err(InstallerError::Cancelled) => {
                tracing::info!("clangd install cancelled");
                None
            }
            Err(InstallerError::AlreadyInstalled(name)) => {
                tracing::info!("clangd {name} install dismissed, keeping the existing directory");
                None
            }
            Err(e) => {
                self.ui.show_help(
                    &format!("Failed to install clangd language server: {e}"),
                    INSTALL_HELP_URL,
                );
                None
            }
        }
    }
}

/// Resolve the configured binary: absolute paths are probed directly (any
/// access failure counts as "not found"), relative names go through PATH.
async fn resolve_binary(configured: &str) -> Option<PathBuf> {
    let path = Path::new(configured);
    if path.is_absolute() {
        match tokio::fs::metadata(path).await {
            Ok(_) => Some(path.to_path_buf()),
            Err(_) => None,
        }
    } else {
        which::which(configured).ok()
    }
}
