use std::env;
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "media-file-server";
const DEFAULT_CONTENT_PATH: &str = "content";
const DEFAULT_PREVIEW_MAX_EDGE: u32 = 320;
const DEFAULT_TRANSCODER: &str = "ffmpeg";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got {value:?}")]
    InvalidEdge { key: &'static str, value: String },

    #[error("{key} must be a boolean, got {value:?}")]
    InvalidFlag { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub content_dir: PathBuf,
    pub previews_enabled: bool,
    pub preview_max_edge: u32,
    pub transcoder: PathBuf,
}

impl ServiceConfig {
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            content_dir: content_dir.into(),
            previews_enabled: false,
            preview_max_edge: DEFAULT_PREVIEW_MAX_EDGE,
            transcoder: PathBuf::from(DEFAULT_TRANSCODER),
        }
    }

    pub fn with_previews(mut self, max_edge: u32) -> Self {
        self.previews_enabled = true;
        self.preview_max_edge = max_edge;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let content_dir = resolve_content_dir(
            non_empty_var("CONTENT_PATH").as_deref(),
            &application_base_dir(),
        );
        let previews_enabled = match non_empty_var("FILE_PREVIEWS_ENABLED") {
            Some(value) => parse_flag("FILE_PREVIEWS_ENABLED", &value)?,
            None => false,
        };
        let preview_max_edge = match non_empty_var("FILE_PREVIEW_MAX_LONG_EDGE") {
            Some(value) => parse_edge("FILE_PREVIEW_MAX_LONG_EDGE", &value)?,
            None => DEFAULT_PREVIEW_MAX_EDGE,
        };
        let transcoder = non_empty_var("FFMPEG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TRANSCODER));

        Ok(Self {
            content_dir,
            previews_enabled,
            preview_max_edge,
            transcoder,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn application_base_dir() -> PathBuf {
    let mut base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.push(APP_DIR_NAME);
    base
}

pub fn resolve_content_dir(raw: Option<&str>, base: &Path) -> PathBuf {
    let path = PathBuf::from(raw.unwrap_or(DEFAULT_CONTENT_PATH));
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            key,
            value: value.to_string(),
        }),
    }
}

fn parse_edge(key: &'static str, value: &str) -> Result<u32, ConfigError> {
    value
        .parse::<u32>()
        .ok()
        .filter(|edge| *edge > 0)
        .ok_or_else(|| ConfigError::InvalidEdge {
            key,
            value: value.to_string(),
        })
}
