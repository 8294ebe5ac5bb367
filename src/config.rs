use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "stub://camera";
const DEFAULT_CAPTURE_INTERVAL_SECS: u64 = 2;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
const DEFAULT_ANNOUNCEMENT_COOLDOWN_SECS: u64 = 30;
const DEFAULT_OUTPUT_DIR: &str = "captured_frames";
const DEFAULT_MODEL_REFERENCE: &str = "stub";

#[derive(Debug, Deserialize, Default)]
struct LookoutConfigFile {
    endpoint: Option<String>,
    capture_interval_secs: Option<u64>,
    confidence_threshold: Option<f32>,
    announcement_cooldown_secs: Option<u64>,
    output_directory: Option<PathBuf>,
    model_reference: Option<String>,
    headless: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct LookoutConfig {
    /// Camera base URL (`http(s)://` snapshot endpoint, or `stub://`).
    pub endpoint: String,
    /// Minimum time between cycle starts.
    pub capture_interval: Duration,
    /// Minimum confidence for a detection to count.
    pub confidence_threshold: f32,
    /// Minimum time before re-announcing a label that left and returned.
    pub announcement_cooldown: Duration,
    pub output_directory: PathBuf,
    /// `stub`, or a path to an ONNX model.
    pub model_reference: String,
    /// Run without a display window (quit via Ctrl-C only).
    pub headless: bool,
}

impl LookoutConfig {
    /// Defaults, then the optional JSON config file named by
    /// `LOOKOUT_CONFIG`, then `LOOKOUT_*` environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("LOOKOUT_CONFIG").ok();
        Self::load_with_path(config_path.as_deref().map(Path::new))
    }

    pub fn load_with_path(config_path: Option<&Path>) -> Result<Self> {
        let file_cfg = match config_path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: LookoutConfigFile) -> Self {
        Self {
            endpoint: file
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            capture_interval: Duration::from_secs(
                file.capture_interval_secs
                    .unwrap_or(DEFAULT_CAPTURE_INTERVAL_SECS),
            ),
            confidence_threshold: file
                .confidence_threshold
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            announcement_cooldown: Duration::from_secs(
                file.announcement_cooldown_secs
                    .unwrap_or(DEFAULT_ANNOUNCEMENT_COOLDOWN_SECS),
            ),
            output_directory: file
                .output_directory
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            model_reference: file
                .model_reference
                .unwrap_or_else(|| DEFAULT_MODEL_REFERENCE.to_string()),
            headless: file.headless.unwrap_or(false),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(endpoint) = std::env::var("LOOKOUT_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.endpoint = endpoint;
            }
        }
        if let Ok(interval) = std::env::var("LOOKOUT_CAPTURE_INTERVAL_SECS") {
            let seconds: u64 = interval.parse().map_err(|_| {
                anyhow!("LOOKOUT_CAPTURE_INTERVAL_SECS must be an integer number of seconds")
            })?;
            self.capture_interval = Duration::from_secs(seconds);
        }
        if let Ok(threshold) = std::env::var("LOOKOUT_CONFIDENCE_THRESHOLD") {
            self.confidence_threshold = threshold
                .parse()
                .map_err(|_| anyhow!("LOOKOUT_CONFIDENCE_THRESHOLD must be a number"))?;
        }
        if let Ok(cooldown) = std::env::var("LOOKOUT_ANNOUNCEMENT_COOLDOWN_SECS") {
            let seconds: u64 = cooldown.parse().map_err(|_| {
                anyhow!("LOOKOUT_ANNOUNCEMENT_COOLDOWN_SECS must be an integer number of seconds")
            })?;
            self.announcement_cooldown = Duration::from_secs(seconds);
        }
        if let Ok(dir) = std::env::var("LOOKOUT_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.output_directory = PathBuf::from(dir);
            }
        }
        if let Ok(model) = std::env::var("LOOKOUT_MODEL") {
            if !model.trim().is_empty() {
                self.model_reference = model;
            }
        }
        if let Ok(headless) = std::env::var("LOOKOUT_HEADLESS") {
            self.headless = matches!(headless.as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.endpoint)
            .map_err(|e| anyhow!("invalid endpoint '{}': {}", self.endpoint, e))?;
        if !matches!(url.scheme(), "http" | "https" | "stub") {
            return Err(anyhow!(
                "unsupported endpoint scheme '{}'; expected http(s) or stub",
                url.scheme()
            ));
        }
        if self.capture_interval.is_zero() {
            return Err(anyhow!("capture interval must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(anyhow!(
                "confidence threshold must be within [0, 1], got {}",
                self.confidence_threshold
            ));
        }
        if self.model_reference.trim().is_empty() {
            return Err(anyhow!("model reference must not be empty"));
        }
        if self.output_directory.as_os_str().is_empty() {
            return Err(anyhow!("output directory must not be empty"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<LookoutConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
