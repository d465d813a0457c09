use std::path::{Path, PathBuf};

/// Release metadata endpoint for upstream clangd builds.
pub const RELEASE_ENDPOINT: &str = "https://api.github.com/repos/clangd/clangd/releases/latest";

/// Manual installation instructions, shown whenever automatic install fails.
pub const INSTALL_HELP_URL: &str = "https://clangd.llvm.org/installation.html";

#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory for installer data (install tree and download staging).
    pub storage_dir: PathBuf,

    /// Directory holding one subdirectory per installed release tag.
    pub install_dir: PathBuf,

    /// Staging directory for in-flight downloads.
    pub download_dir: PathBuf,

    /// Release metadata endpoint. Points at the upstream release API by
    /// default; tests substitute their own.
    pub release_endpoint: String,

    /// Command used to probe the local glibc version. Defaults to
    /// `ldd --version`; tests substitute their own.
    pub glibc_probe: Vec<String>,

    /// Platform-specific operating system string.
    pub os: String,

    /// Platform-specific architecture string.
    pub arch: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::new_for_path(&Self::default_storage_dir())
    }
}

impl Config {
    pub fn new_for_path(storage_dir: &Path) -> Self {
        Self {
            storage_dir: storage_dir.to_path_buf(),
            install_dir: storage_dir.join("install"),
            download_dir: storage_dir.join("download"),
            release_endpoint: RELEASE_ENDPOINT.to_string(),
            glibc_probe: vec!["ldd".to_string(), "--version".to_string()],
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }

    pub fn default_storage_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"))
            .join("clangd-installer")
    }
}
