//! Configuration for callflow.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (CALLFLOW_HOME, CALLFLOW_BLOBS, CALLFLOW_BIND)
//! 2. Config file (.callflow/config.yaml)
//! 3. Defaults (~/.callflow)
//!
//! Config file discovery:
//! - Searches current directory and parents for .callflow/config.yaml
//! - Paths in config file are relative to the config file's parent directory
//!
//! Loaded once at startup and passed down; there is no global cache.
//! The stores, queue and API server are all constructed from the
//! resolved paths, so substituting a scratch directory is enough to run
//! the whole system in isolation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub api: Option<ApiConfig>,
    #[serde(default)]
    pub pipeline: Option<PipelineConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory holding calls.jsonl and jobs.jsonl
    pub home: Option<String>,
    /// Blob directory for uploaded audio
    pub blobs: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// "simulated" (default) or "whisper"
    pub transcriber: Option<String>,
    pub whisper_path: Option<String>,
    pub whisper_model: Option<String>,
}

/// Which transcription backend the worker runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriberBackend {
    Simulated,
    Whisper,
}

impl TranscriberBackend {
    fn parse(value: &str) -> Result<Self> {
        match value {
            "simulated" => Ok(Self::Simulated),
            "whisper" => Ok(Self::Whisper),
            other => anyhow::bail!("Unknown transcriber backend: '{}'", other),
        }
    }
}

/// Pipeline stage settings
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub transcriber: TranscriberBackend,
    pub whisper_path: String,
    pub whisper_model: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            transcriber: TranscriberBackend::Simulated,
            whisper_path: "whisper".to_string(),
            whisper_model: "base".to_string(),
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct Config {
    /// State directory (record log, job log)
    pub home: PathBuf,
    /// Blob directory
    pub blobs_dir: PathBuf,
    /// API bind address
    pub bind: String,
    /// Pipeline settings
    pub pipeline: PipelineSettings,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self> {
        let default_home = dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(".callflow");

        let config_file = find_config_file();

        let (mut home, mut blobs_dir, mut bind, pipeline) =
            if let Some(ref config_path) = config_file {
                let config = load_config_file(config_path)?;

                // Base directory is the .callflow/ directory itself
                let base_dir = config_path.parent().unwrap_or(Path::new("."));

                let home = config
                    .paths
                    .home
                    .as_deref()
                    .map(|p| resolve_path(base_dir, p))
                    .unwrap_or_else(|| default_home.clone());

                let blobs_dir = config
                    .paths
                    .blobs
                    .as_deref()
                    .map(|p| resolve_path(base_dir, p))
                    .unwrap_or_else(|| home.join("blobs"));

                let bind = config
                    .api
                    .as_ref()
                    .and_then(|a| a.bind.clone())
                    .unwrap_or_else(default_bind);

                let pipeline = resolve_pipeline(config.pipeline.as_ref())?;

                (home, blobs_dir, bind, pipeline)
            } else {
                let home = default_home;
                let blobs = home.join("blobs");
                (home, blobs, default_bind(), PipelineSettings::default())
            };

        // Environment overrides win over everything
        if let Ok(env_home) = std::env::var("CALLFLOW_HOME") {
            home = PathBuf::from(env_home);
            blobs_dir = home.join("blobs");
        }
        if let Ok(env_blobs) = std::env::var("CALLFLOW_BLOBS") {
            blobs_dir = PathBuf::from(env_blobs);
        }
        if let Ok(env_bind) = std::env::var("CALLFLOW_BIND") {
            bind = env_bind;
        }

        Ok(Self {
            home,
            blobs_dir,
            bind,
            pipeline,
            config_file,
        })
    }

    /// Path of the record log ($CALLFLOW_HOME/calls.jsonl)
    pub fn calls_log_path(&self) -> PathBuf {
        self.home.join("calls.jsonl")
    }

    /// Path of the job log ($CALLFLOW_HOME/jobs.jsonl)
    pub fn jobs_log_path(&self) -> PathBuf {
        self.home.join("jobs.jsonl")
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn resolve_pipeline(config: Option<&PipelineConfig>) -> Result<PipelineSettings> {
    let defaults = PipelineSettings::default();
    let Some(config) = config else {
        return Ok(defaults);
    };

    Ok(PipelineSettings {
        transcriber: config
            .transcriber
            .as_deref()
            .map(TranscriberBackend::parse)
            .transpose()?
            .unwrap_or(defaults.transcriber),
        whisper_path: config
            .whisper_path
            .clone()
            .unwrap_or(defaults.whisper_path),
        whisper_model: config
            .whisper_model
            .clone()
            .unwrap_or(defaults.whisper_model),
    })
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".callflow").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let callflow_dir = temp.path().join(".callflow");
        std::fs::create_dir_all(&callflow_dir).unwrap();

        let config_path = callflow_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
paths:
  home: ./
  blobs: ./blobs
api:
  bind: 0.0.0.0:9100
pipeline:
  transcriber: whisper
  whisper_model: small
"#
        )
        .unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.paths.home, Some("./".to_string()));
        assert_eq!(config.api.unwrap().bind, Some("0.0.0.0:9100".to_string()));

        let pipeline = resolve_pipeline(config.pipeline.as_ref()).unwrap();
        assert_eq!(pipeline.transcriber, TranscriberBackend::Whisper);
        assert_eq!(pipeline.whisper_model, "small");
        // Unset fields keep defaults
        assert_eq!(pipeline.whisper_path, "whisper");
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let config = PipelineConfig {
            transcriber: Some("quantum".to_string()),
            whisper_path: None,
            whisper_model: None,
        };
        assert!(resolve_pipeline(Some(&config)).is_err());
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project/.callflow");

        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
        // Non-existent relative paths fall back to plain join
        assert_eq!(
            resolve_path(&base, "state"),
            PathBuf::from("/home/user/project/.callflow/state")
        );
    }

    #[test]
    fn test_log_paths_under_home() {
        let config = Config {
            home: PathBuf::from("/data/callflow"),
            blobs_dir: PathBuf::from("/data/callflow/blobs"),
            bind: default_bind(),
            pipeline: PipelineSettings::default(),
            config_file: None,
        };

        assert_eq!(
            config.calls_log_path(),
            PathBuf::from("/data/callflow/calls.jsonl")
        );
        assert_eq!(
            config.jobs_log_path(),
            PathBuf::from("/data/callflow/jobs.jsonl")
        );
    }
}
