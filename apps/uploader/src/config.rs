use std::{
    fmt::Display,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::Deserialize;
use tracing::warn;
use upload_client::ControllerSettings;

pub const DEFAULT_CONFIG_PATH: &str = "uploader.toml";
const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub output_dir: PathBuf,
    pub request_timeout_secs: Option<u64>,
    pub controller: ControllerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            output_dir: PathBuf::from("."),
            request_timeout_secs: None,
            controller: ControllerSettings::default(),
        }
    }
}

/// Flat `uploader.toml`; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    server_url: Option<String>,
    endpoint: Option<String>,
    response_mode: Option<String>,
    submit_policy: Option<String>,
    download_filename: Option<String>,
    output_dir: Option<PathBuf>,
    request_timeout_secs: Option<u64>,
    form_id: Option<String>,
    status_id: Option<String>,
}

pub fn load_settings(path: &Path) -> Settings {
    let raw = fs::read_to_string(path).ok();
    settings_from_sources(raw.as_deref(), |key| std::env::var(key).ok())
}

/// Defaults, then the config file, then environment variables.
pub fn settings_from_sources(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        match toml::from_str::<FileConfig>(raw) {
            Ok(file_cfg) => apply_file_config(&mut settings, file_cfg),
            Err(err) => warn!(error = %err, "ignoring unparseable uploader config"),
        }
    }

    if let Some(v) = env("UPLOADER_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = env("APP__ENDPOINT") {
        settings.controller.endpoint = v;
    }

    if let Some(mode) =
        env("APP__RESPONSE_MODE").and_then(|v| parse_or_warn("APP__RESPONSE_MODE", &v))
    {
        settings.controller.response_mode = mode;
    }

    if let Some(policy) =
        env("APP__SUBMIT_POLICY").and_then(|v| parse_or_warn("APP__SUBMIT_POLICY", &v))
    {
        settings.controller.submit_policy = policy;
    }

    if let Some(v) = env("APP__DOWNLOAD_FILENAME") {
        settings.controller.download_filename = v;
    }

    if let Some(v) = env("APP__OUTPUT_DIR") {
        settings.output_dir = PathBuf::from(v);
    }

    if let Some(secs) = env("APP__REQUEST_TIMEOUT_SECS")
        .and_then(|v| parse_or_warn::<u64>("APP__REQUEST_TIMEOUT_SECS", &v))
    {
        settings.request_timeout_secs = Some(secs);
    }

    settings
}

fn apply_file_config(settings: &mut Settings, file_cfg: FileConfig) {
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.endpoint {
        settings.controller.endpoint = v;
    }
    if let Some(mode) = file_cfg
        .response_mode
        .and_then(|v| parse_or_warn("response_mode", &v))
    {
        settings.controller.response_mode = mode;
    }
    if let Some(policy) = file_cfg
        .submit_policy
        .and_then(|v| parse_or_warn("submit_policy", &v))
    {
        settings.controller.submit_policy = policy;
    }
    if let Some(v) = file_cfg.download_filename {
        settings.controller.download_filename = v;
    }
    if let Some(v) = file_cfg.output_dir {
        settings.output_dir = v;
    }
    if file_cfg.request_timeout_secs.is_some() {
        settings.request_timeout_secs = file_cfg.request_timeout_secs;
    }
    if let Some(v) = file_cfg.form_id {
        settings.controller.form_id = v;
    }
    if let Some(v) = file_cfg.status_id {
        settings.controller.status_id = v;
    }
}

fn parse_or_warn<T>(key: &str, value: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            warn!(key, %err, "ignoring invalid setting");
            None
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
