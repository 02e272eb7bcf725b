//! Configuration loader
//!
//! Loads the engine's configuration file-or-defaults, then layers a
//! handful of `REGIODEDUPE_*`-prefixed environment overrides on top — the
//! scalar knobs operators reach for most often (decision thresholds, the
//! AI toggle/model/key, resolver concurrency). The full nested structure
//! (per-signal weights, per-category overrides, geo/date/title tuning)
//! is only practical to express as a file.
//!
//! ## Environment Variables
//! - `REGIODEDUPE_THRESHOLD_HIGH` / `REGIODEDUPE_THRESHOLD_LOW` /
//!   `REGIODEDUPE_THRESHOLD_TITLE_VETO`
//! - `REGIODEDUPE_AI_ENABLED`, `REGIODEDUPE_AI_MODEL`, `REGIODEDUPE_AI_API_KEY`
//! - `REGIODEDUPE_AI_MAX_CONCURRENT_REQUESTS`, `REGIODEDUPE_AI_CONFIDENCE_THRESHOLD`
//!
//! ## File Locations
//! Probed in order: `./config.{toml,json}`, `./regiodedupe.{toml,json}`,
//! `../config.{toml,json}`, `../../config.{toml,json}`, and the same set
//! relative to the running executable.

use std::path::{Path, PathBuf};

use regiodedupe_domain::{Config, DedupeError, Result};

/// Load configuration file-or-defaults, then apply environment overrides.
///
/// # Errors
/// Returns [`DedupeError::Config`] if a config file is found but fails to
/// parse, or if an environment override has an invalid value.
pub fn load() -> Result<Config> {
    let mut config = match probe_config_paths() {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading configuration from file");
            load_from_file(Some(path))?
        }
        None => {
            tracing::debug!("no config file found in standard locations, using defaults");
            Config::default()
        }
    };

    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Load configuration from a file.
///
/// If `path` is `None`, probes [`probe_config_paths`] and errors if
/// nothing is found. Supports both JSON and TOML, detected by extension.
///
/// # Errors
/// Returns [`DedupeError::Config`] if the file is missing, unreadable,
/// or fails to parse.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(DedupeError::Config(format!("config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| DedupeError::Config("no config file found in any standard location".to_string()))?,
    };

    let contents = std::fs::read_to_string(&config_path).map_err(|e| DedupeError::Config(format!("failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
    match extension {
        "toml" => toml::from_str(contents).map_err(|e| DedupeError::Config(format!("invalid TOML config: {e}"))),
        "json" => serde_json::from_str(contents).map_err(|e| DedupeError::Config(format!("invalid JSON config: {e}"))),
        other => Err(DedupeError::Config(format!("unsupported config format: {other}"))),
    }
}

/// Probe conventional config file locations, returning the first that exists.
#[must_use]
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(probe_dir(&cwd));
        candidates.extend(probe_dir(&cwd.join("..")));
        candidates.extend(probe_dir(&cwd.join("../..")));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(probe_dir(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn probe_dir(dir: &Path) -> Vec<PathBuf> {
    vec![dir.join("config.toml"), dir.join("config.json"), dir.join("regiodedupe.toml"), dir.join("regiodedupe.json")]
}

fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(value) = env_f64("REGIODEDUPE_THRESHOLD_HIGH")? {
        config.thresholds.high = value;
    }
    if let Some(value) = env_f64("REGIODEDUPE_THRESHOLD_LOW")? {
        config.thresholds.low = value;
    }
    if let Some(value) = env_f64("REGIODEDUPE_THRESHOLD_TITLE_VETO")? {
        config.thresholds.title_veto = value;
    }
    if let Some(value) = env_bool("REGIODEDUPE_AI_ENABLED") {
        config.ai.enabled = value;
    }
    if let Ok(model) = std::env::var("REGIODEDUPE_AI_MODEL") {
        config.ai.model = model;
    }
    if let Ok(api_key) = std::env::var("REGIODEDUPE_AI_API_KEY") {
        config.ai.api_key = Some(api_key);
    }
    if let Some(value) = env_usize("REGIODEDUPE_AI_MAX_CONCURRENT_REQUESTS")? {
        config.ai.max_concurrent_requests = value;
    }
    if let Some(value) = env_f64("REGIODEDUPE_AI_CONFIDENCE_THRESHOLD")? {
        config.ai.confidence_threshold = value;
    }
    Ok(())
}

fn env_f64(key: &str) -> Result<Option<f64>> {
    match std::env::var(key) {
        Ok(raw) => raw.parse::<f64>().map(Some).map_err(|e| DedupeError::Config(format!("invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

fn env_usize(key: &str) -> Result<Option<usize>> {
    match std::env::var(key) {
        Ok(raw) => raw.parse::<usize>().map(Some).map_err(|e| DedupeError::Config(format!("invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    #[test]
    fn load_from_file_parses_toml() {
        let toml_content = "[thresholds]\nhigh = 0.8\nlow = 0.3\ntitle_veto = 0.25\n";
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        let path = temp_file.path().with_extension("toml");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let config = load_from_file(Some(path.clone())).unwrap();
        assert!((config.thresholds.high - 0.8).abs() < 1e-9);
        assert!((config.thresholds.low - 0.3).abs() < 1e-9);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn load_from_file_parses_json() {
        let json_content = r#"{"thresholds": {"high": 0.9, "low": 0.2, "title_veto": 0.1}}"#;
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(json_content.as_bytes()).unwrap();
        let path = temp_file.path().with_extension("json");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let config = load_from_file(Some(path.clone())).unwrap();
        assert!((config.thresholds.high - 0.9).abs() < 1e-9);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn load_from_file_missing_path_errors() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/regiodedupe-config.toml")));
        assert!(matches!(result, Err(DedupeError::Config(_))));
    }

    #[test]
    fn load_from_file_invalid_toml_errors() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"not = [valid").unwrap();
        let path = temp_file.path().with_extension("toml");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let result = load_from_file(Some(path.clone()));
        assert!(result.is_err());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn env_overrides_apply_on_top_of_defaults() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        std::env::set_var("REGIODEDUPE_THRESHOLD_HIGH", "0.85");
        std::env::set_var("REGIODEDUPE_AI_ENABLED", "true");
        std::env::set_var("REGIODEDUPE_AI_MODEL", "gpt-4o");

        let mut config = Config::default();
        apply_env_overrides(&mut config).unwrap();

        assert!((config.thresholds.high - 0.85).abs() < 1e-9);
        assert!(config.ai.enabled);
        assert_eq!(config.ai.model, "gpt-4o");

        std::env::remove_var("REGIODEDUPE_THRESHOLD_HIGH");
        std::env::remove_var("REGIODEDUPE_AI_ENABLED");
        std::env::remove_var("REGIODEDUPE_AI_MODEL");
    }

    #[test]
    fn env_override_invalid_number_errors() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        std::env::set_var("REGIODEDUPE_THRESHOLD_HIGH", "not-a-number");

        let mut config = Config::default();
        let result = apply_env_overrides(&mut config);
        assert!(matches!(result, Err(DedupeError::Config(_))));

        std::env::remove_var("REGIODEDUPE_THRESHOLD_HIGH");
    }
}
