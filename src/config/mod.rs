#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::TaskdeckError;
use crate::task::model::{Priority, TaskStatus};
use crate::task::store::StoreOptions;

/// Points at an alternative config file.
pub const CONFIG_ENV: &str = "TASKDECK_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub tasks: TasksConfig,
    pub ui: UiConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TasksConfig {
    #[serde(alias = "path")]
    pub file: String,
    pub require_deadline: bool,
    pub default_priority: u8,
    pub default_status: String,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            file: "~/.local/share/taskdeck/tasks.json".to_owned(),
            require_deadline: true,
            default_priority: Priority::default().value(),
            default_status: TaskStatus::default().as_str().to_owned(),
        }
    }
}

impl TasksConfig {
    #[must_use]
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            require_deadline: self.require_deadline,
        }
    }

    pub fn priority(&self) -> Result<Priority, TaskdeckError> {
        Priority::try_from(self.default_priority)
    }

    pub fn status(&self) -> Result<TaskStatus, TaskdeckError> {
        self.default_status.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    pub icons: bool,
    pub show_dates: bool,
    pub refresh_interval_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            icons: true,
            show_dates: false,
            refresh_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
        }
    }
}

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];
const STATUSES: &[&str] = &["todo", "doing", "done"];

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_file: PathBuf,
}

pub fn default_paths() -> anyhow::Result<ConfigPaths> {
    if let Some(p) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Ok(ConfigPaths {
            config_file: PathBuf::from(p),
        });
    }

    let unix = home_config_path_unix();
    if !cfg!(windows) {
        return Ok(ConfigPaths { config_file: unix });
    }

    // Windows: prefer the Unix-style path if present for portability.
    if unix.exists() {
        return Ok(ConfigPaths { config_file: unix });
    }

    let proj = ProjectDirs::from("com", "taskdeck", "taskdeck")
        .context("failed to determine platform config directory")?;
    Ok(ConfigPaths {
        config_file: proj.config_dir().join("config.toml"),
    })
}

fn home_config_path_unix() -> PathBuf {
    let home = home_dir().unwrap_or_else(|| PathBuf::from("~"));
    home.join(".config").join("taskdeck").join("config.toml")
}

fn home_dir() -> Option<PathBuf> {
    if let Some(v) = std::env::var_os("HOME") {
        return Some(PathBuf::from(v));
    }
    if let Some(v) = std::env::var_os("USERPROFILE") {
        return Some(PathBuf::from(v));
    }
    let drive = std::env::var_os("HOMEDRIVE");
    let path = std::env::var_os("HOMEPATH");
    match (drive, path) {
        (Some(d), Some(p)) => Some(PathBuf::from(d).join(PathBuf::from(p))),
        _ => None,
    }
}

#[must_use]
pub fn expand_tilde(input: &str) -> String {
    if let Some(rest) = input.strip_prefix("~/")
        && let Some(home) = home_dir()
    {
        return home.join(rest).to_string_lossy().to_string();
    }
    input.to_owned()
}

/// Shortens a path under the home directory to `~/...` for display.
#[must_use]
pub fn tilde_path(input: &str) -> String {
    let Some(home) = home_dir() else {
        return input.to_owned();
    };
    let home_str = home.to_string_lossy();
    if let Some(rest) = input.strip_prefix(home_str.as_ref()) {
        if rest.is_empty() {
            return "~".to_owned();
        }
        if rest.starts_with(std::path::MAIN_SEPARATOR) {
            return format!("~{rest}");
        }
    }
    input.to_owned()
}

pub fn expand_path(input: &str) -> anyhow::Result<PathBuf> {
    let expanded = expand_env_vars(&expand_tilde(input));
    let p = PathBuf::from(expanded);
    if p.is_absolute() {
        return Ok(p);
    }
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    Ok(cwd.join(p))
}

fn expand_env_vars(input: &str) -> String {
    // Expand $VAR and ${VAR}. Leave unknown vars untouched.
    let Ok(re) = regex::Regex::new(r"\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?") else {
        return input.to_owned();
    };
    re.replace_all(input, |caps: &regex::Captures<'_>| {
        let key = &caps[1];
        std::env::var(key).unwrap_or_else(|_| caps[0].to_owned())
    })
    .to_string()
}

pub fn load() -> anyhow::Result<(Config, ConfigPaths)> {
    let paths = default_paths()?;
    let (_doc, cfg) = load_from_file(&paths.config_file)?;
    cfg.validate()?;
    Ok((cfg, paths))
}

pub fn list_resolved_toml() -> anyhow::Result<String> {
    let (cfg, _paths) = load()?;
    Ok(toml::to_string_pretty(&cfg)?)
}

pub fn get_value_string(key: &str) -> anyhow::Result<Option<String>> {
    let paths = default_paths()?;
    get_value_string_at_path(&paths.config_file, key)
}

pub fn set_value_string(key: &str, value: &str) -> anyhow::Result<()> {
    let paths = default_paths()?;
    set_value_string_at_path(&paths.config_file, key, value)
}

fn load_from_file(path: &Path) -> anyhow::Result<(toml_edit::DocumentMut, Config)> {
    if !path.exists() {
        return Ok((toml_edit::DocumentMut::new(), Config::default()));
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let doc = raw
        .parse::<toml_edit::DocumentMut>()
        .with_context(|| format!("failed to parse TOML in {}", path.display()))?;

    let cfg: Config = toml::from_str(&raw)
        .with_context(|| format!("failed to deserialize TOML in {}", path.display()))?;
    Ok((doc, cfg))
}

pub fn get_value_string_at_path(path: &Path, key: &str) -> anyhow::Result<Option<String>> {
    let (_doc, cfg) = load_from_file(path)?;
    cfg.validate()?;

    let norm = normalize_key(key);
    let value = lookup_value(&cfg, &norm);
    Ok(value.map(format_value_for_stdout))
}

pub fn set_value_string_at_path(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let (mut doc, _cfg) = load_from_file(path)?;

    let (norm_key, value_item) = normalize_key_and_parse_value(key, value)?;
    apply_set(&mut doc, &norm_key, value_item)?;

    // Validate by re-parsing the updated doc into a Config.
    let new_raw = doc.to_string();
    let new_cfg: Config = toml::from_str(&new_raw)
        .with_context(|| format!("config update produced invalid TOML for {}", path.display()))?;
    new_cfg.validate()?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, new_raw.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), key = %norm_key, "config updated");

    Ok(())
}

impl Config {
    pub fn validate(&self) -> Result<(), TaskdeckError> {
        if self.tasks.file.trim().is_empty() {
            return Err(TaskdeckError::Config(
                "tasks.file must not be empty".to_owned(),
            ));
        }
        if self.tasks.priority().is_err() {
            return Err(TaskdeckError::Config(
                "tasks.default_priority must be 1, 2 or 3".to_owned(),
            ));
        }
        if self.tasks.status().is_err() {
            return Err(TaskdeckError::Config(format!(
                "tasks.default_status must be one of: {}",
                STATUSES.join(", ")
            )));
        }
        if self.ui.refresh_interval_ms < 100 {
            return Err(TaskdeckError::Config(
                "ui.refresh_interval_ms must be >= 100".to_owned(),
            ));
        }
        if !LOG_LEVELS.contains(&self.log.level.trim()) {
            return Err(TaskdeckError::Config(format!(
                "log.level must be one of: {}",
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }

    /// Resolved location of the task file.
    pub fn tasks_file(&self) -> anyhow::Result<PathBuf> {
        expand_path(&self.tasks.file)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyType {
    Bool,
    Int,
    String,
    Enum(&'static [&'static str]),
}

fn normalize_key(key: &str) -> String {
    match key {
        "tasks.path" | "storage.file" => "tasks.file",
        "tasks.priority" => "tasks.default_priority",
        "tasks.status" => "tasks.default_status",
        "log" => "log.level",
        _ => key,
    }
    .to_owned()
}

fn normalize_key_and_parse_value(
    key: &str,
    value: &str,
) -> anyhow::Result<(String, toml_edit::Item)> {
    let norm = normalize_key(key);
    let key_type = key_type(&norm).ok_or_else(|| TaskdeckError::InvalidConfigKey(key.to_owned()))?;
    let invalid = |msg: String| TaskdeckError::InvalidConfigValue {
        key: key.to_owned(),
        msg,
    };
    let item = match key_type {
        KeyType::Bool => toml_edit::value(parse_bool(value).map_err(invalid)?),
        KeyType::Int => toml_edit::value(parse_int(value).map_err(invalid)?),
        KeyType::String => toml_edit::value(value),
        KeyType::Enum(allowed) => {
            let v = value.trim();
            if !allowed.contains(&v) {
                return Err(invalid(format!("must be one of: {}", allowed.join(", "))).into());
            }
            toml_edit::value(v)
        }
    };

    Ok((norm, item))
}

fn key_type(key: &str) -> Option<KeyType> {
    Some(match key {
        "tasks.file" => KeyType::String,

        "tasks.require_deadline" | "ui.icons" | "ui.show_dates" => KeyType::Bool,

        "tasks.default_priority" | "ui.refresh_interval_ms" => KeyType::Int,

        "tasks.default_status" => KeyType::Enum(STATUSES),
        "log.level" => KeyType::Enum(LOG_LEVELS),

        _ => return None,
    })
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(format!("expected true|false, got '{other}'")),
    }
}

fn parse_int(s: &str) -> Result<i64, String> {
    s.trim()
        .parse::<i64>()
        .map_err(|e| format!("expected integer, got '{s}': {e}"))
}

fn apply_set(
    doc: &mut toml_edit::DocumentMut,
    key: &str,
    value: toml_edit::Item,
) -> anyhow::Result<()> {
    let parts: Vec<&str> = key.split('.').filter(|p| !p.is_empty()).collect();
    let Some((leaf, tables)) = parts.split_last() else {
        return Err(TaskdeckError::InvalidConfigKey(key.to_owned()).into());
    };

    let mut cur = doc.as_table_mut();
    for seg in tables {
        if !cur.contains_key(seg) {
            let mut t = toml_edit::Table::new();
            t.set_implicit(true);
            cur.insert(seg, toml_edit::Item::Table(t));
        }
        cur = cur[*seg].as_table_mut().ok_or_else(|| {
            TaskdeckError::Config(format!("cannot set {key}: '{seg}' is not a table"))
        })?;
    }

    cur.insert(leaf, value);
    Ok(())
}

fn lookup_value(cfg: &Config, key: &str) -> Option<serde_json::Value> {
    let mut v = serde_json::to_value(cfg).ok()?;
    for seg in key.split('.').filter(|s| !s.is_empty()) {
        match v {
            serde_json::Value::Object(mut map) => {
                v = map.remove(seg)?;
            }
            _ => return None,
        }
    }
    Some(v)
}

fn format_value_for_stdout(v: serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_owned(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s,
        other => serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        cfg.validate().unwrap();
        assert!(cfg.tasks.store_options().require_deadline);
        assert_eq!(cfg.tasks.priority().unwrap(), Priority::Medium);
        assert_eq!(cfg.tasks.status().unwrap(), TaskStatus::Todo);
    }

    #[test]
    fn config_validation_catches_invalid_values() {
        let mut cfg = Config::default();
        cfg.tasks.default_priority = 4;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.log.level = "loud".to_owned();
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.ui.refresh_interval_ms = 10;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_set_and_get_dot_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");

        set_value_string_at_path(&path, "tasks.require_deadline", "false").unwrap();
        assert_eq!(
            get_value_string_at_path(&path, "tasks.require_deadline")
                .unwrap()
                .as_deref(),
            Some("false")
        );

        set_value_string_at_path(&path, "tasks.path", "/tmp/t.json").unwrap();
        assert_eq!(
            get_value_string_at_path(&path, "tasks.file")
                .unwrap()
                .as_deref(),
            Some("/tmp/t.json")
        );

        set_value_string_at_path(&path, "tasks.priority", "3").unwrap();
        set_value_string_at_path(&path, "log.level", "debug").unwrap();

        let (_doc, cfg) = load_from_file(&path).unwrap();
        cfg.validate().unwrap();
        assert!(!cfg.tasks.require_deadline);
        assert_eq!(cfg.tasks.priority().unwrap(), Priority::High);
        assert_eq!(cfg.log.level, "debug");
    }

    #[test]
    fn config_set_rejects_unknown_keys_and_bad_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");

        assert!(set_value_string_at_path(&path, "tasks.colour", "red").is_err());
        assert!(set_value_string_at_path(&path, "ui.icons", "yes").is_err());
        assert!(set_value_string_at_path(&path, "tasks.default_status", "later").is_err());
        // parses as an int but fails validation
        assert!(set_value_string_at_path(&path, "tasks.default_priority", "9").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn set_preserves_comments() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# my tasks\n[ui]\nicons = true\n").unwrap();

        set_value_string_at_path(&path, "ui.icons", "false").unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("# my tasks"));
        assert!(raw.contains("icons = false"));
    }

    #[test]
    fn expand_env_vars_leaves_unknown_vars() {
        assert_eq!(
            expand_env_vars("$TASKDECK_SURELY_UNSET_VAR/x"),
            "$TASKDECK_SURELY_UNSET_VAR/x"
        );
    }
}
