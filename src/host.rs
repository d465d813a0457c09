//! Contract between this crate and the hosting editor plugin.
//!
//! The host owns every user-visible surface: message toasts, help pages,
//! consent prompts and progress indicators. The workflow code only ever
//! talks to this trait, so tests drive it with a scripted implementation.

/// Outcome of asking the user whether to reuse an existing install.
///
/// "User said no" and "user dismissed the prompt without answering" lead to
/// different behavior, so this is a three-valued decision rather than a
/// nullable boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReuseDecision {
    /// Keep the existing install directory and skip the network entirely.
    Reuse,
    /// Delete the existing install directory and install fresh.
    Replace,
    /// The prompt was dismissed; abort and leave the directory untouched.
    Dismissed,
}

pub trait HostUi: Send + Sync {
    fn info(&self, message: &str);

    fn error(&self, message: &str);

    /// Show `message` together with a link to manual instructions at `url`.
    fn show_help(&self, message: &str, url: &str);

    /// A long-running step has started. Download progress arrives through
    /// [`HostUi::progress_report`] until [`HostUi::progress_end`] is called;
    /// steps without measurable progress (extraction) report nothing.
    fn progress_begin(&self, label: &str);

    fn progress_report(&self, ratio: Option<f64>);

    fn progress_end(&self);

    /// Offer to reload the host so a freshly installed binary takes effect.
    fn prompt_reload(&self, message: &str) -> impl Future<Output = ()> + Send;

    /// Ask whether to upgrade from `old_version` to `new_version`.
    fn prompt_update(
        &self,
        old_version: &str,
        new_version: &str,
    ) -> impl Future<Output = bool> + Send;

    /// Ask whether to install `version` when no binary is configured.
    fn prompt_install(&self, version: &str) -> impl Future<Output = bool> + Send;

    /// Ask whether to reuse the install directory described by `label`.
    fn should_reuse(&self, label: &str) -> impl Future<Output = ReuseDecision> + Send;
}
