use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::detect::backends::BACKEND_NAMES;

const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_MODEL_PATH: &str = "best.onnx";
const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_CONFIDENCE: f32 = 0.25;
const DEFAULT_IOU: f32 = 0.45;
const DEFAULT_STORED_STRIDE: u32 = 5;
const DEFAULT_STREAMED_STRIDE: u32 = 2;
const DEFAULT_STREAM_TIMEOUT_SECS: u64 = 5 * 60;
const DEFAULT_STALL_BACKOFF_MS: u64 = 100;
const DEFAULT_RESOLVER_PROGRAM: &str = "yt-dlp";
const DEFAULT_RESOLVER_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RESOLVER_FORMAT: &str = "best[ext=mp4]/best";
const DEFAULT_LINE_THICKNESS: u32 = 2;
const DEFAULT_FONT_SCALE: f32 = 18.0;
const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
const MAX_LINE_THICKNESS: u32 = 64;

#[derive(Debug, Deserialize, Default)]
struct LensConfigFile {
    detector: Option<DetectorConfigFile>,
    session: Option<SessionConfigFile>,
    resolver: Option<ResolverConfigFile>,
    annotate: Option<AnnotateConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    input_size: Option<u32>,
    confidence_threshold: Option<f32>,
    iou_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct SessionConfigFile {
    stored_stride: Option<u32>,
    streamed_stride: Option<u32>,
    stream_timeout_secs: Option<u64>,
    stall_backoff_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct ResolverConfigFile {
    program: Option<String>,
    timeout_secs: Option<u64>,
    format: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct AnnotateConfigFile {
    font_path: Option<PathBuf>,
    line_thickness: Option<u32>,
    font_scale: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct LensConfig {
    pub detector: DetectorSettings,
    pub session: SessionSettings,
    pub resolver: ResolverSettings,
    pub annotate: AnnotateSettings,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: PathBuf,
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Sample every N-th frame of stored videos.
    pub stored_stride: u32,
    /// Sample every N-th frame of streamed videos.
    pub streamed_stride: u32,
    pub stream_timeout: Duration,
    pub stall_backoff: Duration,
}

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub program: String,
    pub timeout: Duration,
    pub format: String,
}

#[derive(Debug, Clone)]
pub struct AnnotateSettings {
    pub font_path: Option<PathBuf>,
    pub line_thickness: u32,
    pub font_scale: f32,
}

impl Default for LensConfig {
    fn default() -> Self {
        Self::from_file(LensConfigFile::default())
    }
}

impl LensConfig {
    /// Load from the file named by `HERITAGE_CONFIG` (if any), then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("HERITAGE_CONFIG")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Load from an explicit file (if any), then apply environment overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => LensConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: LensConfigFile) -> Self {
        let detector = file.detector.unwrap_or_default();
        let session = file.session.unwrap_or_default();
        let resolver = file.resolver.unwrap_or_default();
        let annotate = file.annotate.unwrap_or_default();

        Self {
            detector: DetectorSettings {
                backend: detector
                    .backend
                    .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
                model_path: detector
                    .model_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
                input_size: detector.input_size.unwrap_or(DEFAULT_INPUT_SIZE),
                confidence_threshold: detector
                    .confidence_threshold
                    .unwrap_or(DEFAULT_CONFIDENCE),
                iou_threshold: detector.iou_threshold.unwrap_or(DEFAULT_IOU),
            },
            session: SessionSettings {
                stored_stride: session.stored_stride.unwrap_or(DEFAULT_STORED_STRIDE),
                streamed_stride: session.streamed_stride.unwrap_or(DEFAULT_STREAMED_STRIDE),
                stream_timeout: Duration::from_secs(
                    session
                        .stream_timeout_secs
                        .unwrap_or(DEFAULT_STREAM_TIMEOUT_SECS),
                ),
                stall_backoff: Duration::from_millis(
                    session.stall_backoff_ms.unwrap_or(DEFAULT_STALL_BACKOFF_MS),
                ),
            },
            resolver: ResolverSettings {
                program: resolver
                    .program
                    .unwrap_or_else(|| DEFAULT_RESOLVER_PROGRAM.to_string()),
                timeout: Duration::from_secs(
                    resolver
                        .timeout_secs
                        .unwrap_or(DEFAULT_RESOLVER_TIMEOUT_SECS),
                ),
                format: resolver
                    .format
                    .unwrap_or_else(|| DEFAULT_RESOLVER_FORMAT.to_string()),
            },
            annotate: AnnotateSettings {
                font_path: annotate.font_path,
                line_thickness: annotate.line_thickness.unwrap_or(DEFAULT_LINE_THICKNESS),
                font_scale: annotate.font_scale.unwrap_or(DEFAULT_FONT_SCALE),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(backend) = env_string("HERITAGE_BACKEND") {
            self.detector.backend = backend;
        }
        if let Some(path) = env_string("HERITAGE_MODEL_PATH") {
            self.detector.model_path = PathBuf::from(path);
        }
        if let Some(value) = env_string("HERITAGE_CONFIDENCE") {
            self.detector.confidence_threshold = value
                .parse()
                .map_err(|_| anyhow!("HERITAGE_CONFIDENCE must be a number between 0 and 1"))?;
        }
        if let Some(value) = env_string("HERITAGE_STORED_STRIDE") {
            self.session.stored_stride = value
                .parse()
                .map_err(|_| anyhow!("HERITAGE_STORED_STRIDE must be a positive integer"))?;
        }
        if let Some(value) = env_string("HERITAGE_STREAMED_STRIDE") {
            self.session.streamed_stride = value
                .parse()
                .map_err(|_| anyhow!("HERITAGE_STREAMED_STRIDE must be a positive integer"))?;
        }
        if let Some(value) = env_string("HERITAGE_STREAM_TIMEOUT_SECS") {
            let seconds: u64 = value.parse().map_err(|_| {
                anyhow!("HERITAGE_STREAM_TIMEOUT_SECS must be an integer number of seconds")
            })?;
            self.session.stream_timeout = Duration::from_secs(seconds);
        }
        if let Some(program) = env_string("HERITAGE_RESOLVER") {
            self.resolver.program = program;
        }
        if let Some(path) = env_string("HERITAGE_FONT_PATH") {
            self.annotate.font_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        self.detector.backend = self.detector.backend.trim().to_lowercase();
        if !BACKEND_NAMES.contains(&self.detector.backend.as_str()) {
            return Err(anyhow!(
                "unknown detector backend '{}' (expected one of: {})",
                self.detector.backend,
                BACKEND_NAMES.join(", ")
            ));
        }
        for (name, value) in [
            ("confidence_threshold", self.detector.confidence_threshold),
            ("iou_threshold", self.detector.iou_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
            }
        }
        if self.detector.input_size == 0 {
            return Err(anyhow!("input_size must be greater than zero"));
        }
        if self.session.stored_stride == 0 || self.session.streamed_stride == 0 {
            return Err(anyhow!("frame strides must be at least 1"));
        }
        for (name, value) in [
            ("stream timeout", self.session.stream_timeout),
            ("resolver timeout", self.resolver.timeout),
        ] {
            if value.is_zero() || value > MAX_TIMEOUT {
                return Err(anyhow!(
                    "{} must be between 1s and {}s, got {}s",
                    name,
                    MAX_TIMEOUT.as_secs(),
                    value.as_secs()
                ));
            }
        }
        if self.annotate.line_thickness > MAX_LINE_THICKNESS {
            return Err(anyhow!(
                "line_thickness must be at most {}, got {}",
                MAX_LINE_THICKNESS,
                self.annotate.line_thickness
            ));
        }
        if self.annotate.font_scale <= 0.0 {
            return Err(anyhow!("font_scale must be positive"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<LensConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))
    } else {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_recommended_values() {
        let cfg = LensConfig::default();
        assert_eq!(cfg.detector.backend, "stub");
        assert_eq!(cfg.session.stored_stride, 5);
        assert_eq!(cfg.session.streamed_stride, 2);
        assert_eq!(cfg.session.stream_timeout, Duration::from_secs(300));
        assert_eq!(cfg.resolver.program, "yt-dlp");
        assert_eq!(cfg.resolver.timeout, Duration::from_secs(30));
        assert!(cfg.annotate.font_path.is_none());
    }

    #[test]
    fn validation_rejects_zero_stride_and_bad_threshold() {
        let mut cfg = LensConfig::default();
        cfg.session.stored_stride = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = LensConfig::default();
        cfg.detector.confidence_threshold = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = LensConfig::default();
        cfg.detector.backend = " Tract ".to_string();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.detector.backend, "tract");
    }
}
