//! Install and update machinery for the clangd language server.
//!
//! This crate has no UI of its own: an editor plugin embeds it, supplies a
//! [`host::HostUi`] implementation for prompts and progress, and calls
//! [`workflow::Installer::prepare`] at startup. Everything else (release
//! lookup, version comparison, download, extraction) happens behind that
//! entry point.

pub mod config;
pub mod download_client;
pub mod error;
pub mod github;
pub mod host;
pub mod installer;
pub mod logging;
pub mod platform;
pub mod version;
pub mod workflow;

#[cfg(test)]
pub mod test_helpers;
