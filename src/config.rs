//! Configuration management using the prefer crate for file discovery.
//!
//! Settings are layered: built-in defaults, then a config file (explicit
//! `--config` path or auto-discovered `cedula-ocr.{toml,yaml,json}`), then
//! `CEDULA_OCR_*` environment variables, then CLI flags.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::ocr::{OcrConfig, PdftoppmRasterizer, TesseractBackend};
use crate::services::{Pipeline, StageLimits};
use crate::storage::ScratchSpace;

/// Name used for config file discovery.
pub const APP_NAME: &str = "cedula-ocr";

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default host to bind.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default maximum upload size (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Host to bind the HTTP server to.
    pub host: String,
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: u64,
    /// Tesseract language code.
    pub language: String,
    /// Rasterization resolution for PDF pages.
    pub dpi: u32,
    /// Root for per-request scratch directories.
    pub scratch_dir: PathBuf,
    /// Deadline for OCR of one page, in seconds.
    pub ocr_timeout_secs: u64,
    /// Deadline for rasterizing one PDF, in seconds.
    pub rasterize_timeout_secs: u64,
    /// Tesseract binary (name in PATH or absolute path).
    pub tesseract_path: PathBuf,
    /// pdftoppm binary (name in PATH or absolute path).
    pub pdftoppm_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            language: "spa".to_string(),
            dpi: 300,
            scratch_dir: std::env::temp_dir().join(APP_NAME),
            ocr_timeout_secs: 60,
            rasterize_timeout_secs: 120,
            tesseract_path: PathBuf::from("tesseract"),
            pdftoppm_path: PathBuf::from("pdftoppm"),
        }
    }
}

impl Settings {
    /// OCR tool configuration derived from these settings.
    pub fn ocr_config(&self) -> OcrConfig {
        OcrConfig {
            language: self.language.clone(),
            dpi: self.dpi,
            tesseract_path: self.tesseract_path.clone(),
            pdftoppm_path: self.pdftoppm_path.clone(),
        }
    }

    /// Per-stage pipeline deadlines.
    pub fn stage_limits(&self) -> StageLimits {
        StageLimits {
            rasterize: Duration::from_secs(self.rasterize_timeout_secs),
            recognize: Duration::from_secs(self.ocr_timeout_secs),
        }
    }

    pub fn scratch_space(&self) -> ScratchSpace {
        ScratchSpace::new(&self.scratch_dir)
    }

    /// Build the production pipeline (tesseract + pdftoppm).
    pub fn build_pipeline(&self) -> Pipeline {
        let ocr_config = self.ocr_config();
        Pipeline::new(
            Arc::new(TesseractBackend::with_config(ocr_config.clone())),
            Arc::new(PdftoppmRasterizer::with_config(&ocr_config)),
            self.stage_limits(),
        )
    }

    /// Apply `CEDULA_OCR_*` environment variables on top of current values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = get("CEDULA_OCR_BIND") {
            let (host, port) = parse_bind_address(&bind, self.port);
            self.host = host;
            self.port = port;
        }
        if let Some(language) = get("CEDULA_OCR_LANGUAGE") {
            self.language = language;
        }
        if let Some(dir) = get("CEDULA_OCR_SCRATCH_DIR") {
            self.scratch_dir = PathBuf::from(shellexpand::tilde(&dir).as_ref());
        }
        if let Some(raw) = get("CEDULA_OCR_MAX_UPLOAD_BYTES") {
            match raw.parse() {
                Ok(bytes) => self.max_upload_bytes = bytes,
                Err(_) => tracing::warn!(
                    "Ignoring CEDULA_OCR_MAX_UPLOAD_BYTES={:?}: not a byte count",
                    raw
                ),
            }
        }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Bind address: PORT, HOST, or HOST:PORT.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    /// Largest accepted upload, in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_upload_bytes: Option<u64>,
    /// Tesseract language code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// PDF rasterization DPI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpi: Option<u32>,
    /// Scratch directory root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<String>,
    /// OCR deadline per page, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_timeout_secs: Option<u64>,
    /// Rasterization deadline per document, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rasterize_timeout_secs: Option<u64>,
    /// Tesseract binary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tesseract_path: Option<String>,
    /// pdftoppm binary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdftoppm_path: Option<String>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Falls back to defaults when no config file is found or it fails to parse.
    pub async fn load() -> Self {
        match prefer::load(APP_NAME).await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Ignoring config file: {:#}", e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut config = Self::parse(&contents, path)?;
        config.source_path = Some(path.to_path_buf());
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn parse(contents: &str, path: &Path) -> anyhow::Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let config: Config = match ext {
            "toml" => toml::from_str(contents).context("Failed to parse TOML config")?,
            "yaml" | "yml" => {
                serde_yaml::from_str(contents).context("Failed to parse YAML config")?
            }
            _ => serde_json::from_str(contents).context("Failed to parse JSON config")?,
        };
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref bind) = self.bind {
            let (host, port) = parse_bind_address(bind, settings.port);
            settings.host = host;
            settings.port = port;
        }
        if let Some(bytes) = self.max_upload_bytes {
            settings.max_upload_bytes = bytes;
        }
        if let Some(ref language) = self.language {
            settings.language = language.clone();
        }
        if let Some(dpi) = self.dpi {
            settings.dpi = dpi;
        }
        if let Some(ref dir) = self.scratch_dir {
            settings.scratch_dir = self.resolve_path(dir, base_dir);
        }
        if let Some(secs) = self.ocr_timeout_secs {
            settings.ocr_timeout_secs = secs;
        }
        if let Some(secs) = self.rasterize_timeout_secs {
            settings.rasterize_timeout_secs = secs;
        }
        // Bare names are looked up in PATH, so only resolve values that look like paths.
        if let Some(ref bin) = self.tesseract_path {
            settings.tesseract_path = self.resolve_binary(bin, base_dir);
        }
        if let Some(ref bin) = self.pdftoppm_path {
            settings.pdftoppm_path = self.resolve_binary(bin, base_dir);
        }
    }

    fn resolve_binary(&self, bin: &str, base_dir: &Path) -> PathBuf {
        if bin.contains('/') || bin.starts_with('~') {
            self.resolve_path(bin, base_dir)
        } else {
            PathBuf::from(bin)
        }
    }
}

/// Options controlling how settings are loaded.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
}

/// Load settings from defaults, config file and environment.
pub async fn load_settings(options: LoadOptions) -> anyhow::Result<Settings> {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    let base_dir = config
        .base_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    settings.apply_env_overrides();
    Ok(settings)
}

/// Parse a bind address that can be:
/// - Just a port: "3000" -> 127.0.0.1:3000
/// - Just a host: "0.0.0.0" -> 0.0.0.0:{default_port}
/// - Host and port: "0.0.0.0:3000" -> 0.0.0.0:3000
pub fn parse_bind_address(bind: &str, default_port: u16) -> (String, u16) {
    if let Ok(port) = bind.parse::<u16>() {
        return (DEFAULT_HOST.to_string(), port);
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return (host.to_string(), port);
        }
    }

    (bind.to_string(), default_port)
}
