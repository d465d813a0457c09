use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = InstallerError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum InstallerError {
    #[error("release metadata request failed: {0}")]
    Fetch(String),

    #[error("no clangd release asset for this platform: OS={os}, ARCH={arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error(
        "the clangd release binaries need glibc {minimum} or newer, but this system has glibc {found}"
    )]
    GlibcTooOld { found: String, minimum: String },

    #[error("unable to parse a version from '{0}'")]
    UnparseableVersion(String),

    /// Vendor-modified builds whose version numbers do not track upstream.
    /// Kept separate from [`InstallerError::UnparseableVersion`] so the host
    /// can report it instead of treating the binary as broken.
    #[error("cannot compare versions of a vendor-modified clangd build ({vendor}: '{output}')")]
    IncomparableVersion { vendor: String, output: String },

    #[error("clangd {0} is already installed")]
    AlreadyInstalled(String),

    #[error("download was cancelled")]
    Cancelled,

    #[error("archive {archive:?} does not contain the {binary} binary")]
    BinaryNotInArchive { archive: PathBuf, binary: String },

    #[error("could not find the {binary} binary under {dir:?}")]
    BinaryNotInstalled { dir: PathBuf, binary: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to read archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("failed to scan install directory: {0}")]
    Walk(#[from] walkdir::Error),
}
