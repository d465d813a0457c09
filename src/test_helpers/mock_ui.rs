use crate::host::{HostUi, ReuseDecision};
use std::sync::Mutex;

/// Host UI with scripted prompt answers that records everything shown to it.
pub struct MockUi {
    pub reuse: ReuseDecision,
    pub accept_install: bool,
    pub accept_update: bool,
    pub infos: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
    pub helps: Mutex<Vec<(String, String)>>,
    pub reloads: Mutex<Vec<String>>,
    pub update_prompts: Mutex<Vec<(String, String)>>,
    pub install_prompts: Mutex<Vec<String>>,
    pub progress_labels: Mutex<Vec<String>>,
}

impl Default for MockUi {
    fn default() -> Self {
        Self {
            reuse: ReuseDecision::Replace,
            accept_install: true,
            accept_update: true,
            infos: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            helps: Mutex::new(Vec::new()),
            reloads: Mutex::new(Vec::new()),
            update_prompts: Mutex::new(Vec::new()),
            install_prompts: Mutex::new(Vec::new()),
            progress_labels: Mutex::new(Vec::new()),
        }
    }
}

impl HostUi for MockUi {
    fn info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    fn show_help(&self, message: &str, url: &str) {
        self.helps
            .lock()
            .unwrap()
            .push((message.to_string(), url.to_string()));
    }

    fn progress_begin(&self, label: &str) {
        self.progress_labels.lock().unwrap().push(label.to_string());
    }

    fn progress_report(&self, _ratio: Option<f64>) {}

    fn progress_end(&self) {}

    async fn prompt_reload(&self, message: &str) {
        self.reloads.lock().unwrap().push(message.to_string());
    }

    async fn prompt_update(&self, old_version: &str, new_version: &str) -> bool {
        self.update_prompts
            .lock()
            .unwrap()
            .push((old_version.to_string(), new_version.to_string()));
        self.accept_update
    }

    async fn prompt_install(&self, version: &str) -> bool {
        self.install_prompts
            .lock()
            .unwrap()
            .push(version.to_string());
        self.accept_install
    }

    async fn should_reuse(&self, _label: &str) -> ReuseDecision {
        self.reuse
    }
}
