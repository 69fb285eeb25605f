use color_eyre::eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::{
    env, fs, io,
    path::PathBuf,
    sync::{OnceLock, RwLock},
    time::Duration,
};

/// Globally accessible application configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_question_seconds_value")]
    pub question_seconds: u64,
    #[serde(default = "default_answer_settle_ms_value")]
    pub answer_settle_ms: u64,
    #[serde(default = "default_timeout_settle_ms_value")]
    pub timeout_settle_ms: u64,
    #[serde(default)]
    pub record_timeouts: bool,
    #[serde(default = "default_data_dir_value")]
    pub data_dir: String,
    #[serde(default = "default_content_dir_value")]
    pub content_dir: String,
}

impl AppConfig {
    fn normalize(&mut self) {
        self.question_seconds = match self.question_seconds {
            0 => DEFAULT_QUESTION_SECONDS,
            seconds => seconds.clamp(MIN_QUESTION_SECONDS, MAX_QUESTION_SECONDS),
        };
        self.answer_settle_ms = match self.answer_settle_ms {
            0 => DEFAULT_ANSWER_SETTLE_MS,
            millis => millis.min(MAX_SETTLE_MS),
        };
        self.timeout_settle_ms = match self.timeout_settle_ms {
            0 => DEFAULT_TIMEOUT_SETTLE_MS,
            millis => millis.min(MAX_SETTLE_MS),
        };
        if self.data_dir.trim().is_empty() {
            self.data_dir = default_data_dir_value();
        }
        if self.content_dir.trim().is_empty() {
            self.content_dir = default_content_dir_value();
        }
    }

    pub fn question_duration(&self) -> Duration {
        Duration::from_secs(
            self.question_seconds
                .clamp(MIN_QUESTION_SECONDS, MAX_QUESTION_SECONDS),
        )
    }

    pub fn answer_settle(&self) -> Duration {
        Duration::from_millis(self.answer_settle_ms.min(MAX_SETTLE_MS))
    }

    pub fn timeout_settle(&self) -> Duration {
        Duration::from_millis(self.timeout_settle_ms.min(MAX_SETTLE_MS))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            question_seconds: DEFAULT_QUESTION_SECONDS,
            answer_settle_ms: DEFAULT_ANSWER_SETTLE_MS,
            timeout_settle_ms: DEFAULT_TIMEOUT_SETTLE_MS,
            record_timeouts: false,
            data_dir: default_data_dir_value(),
            content_dir: default_content_dir_value(),
        }
    }
}

const DEFAULT_QUESTION_SECONDS: u64 = 25;
const DEFAULT_ANSWER_SETTLE_MS: u64 = 700;
const DEFAULT_TIMEOUT_SETTLE_MS: u64 = 800;
const MIN_QUESTION_SECONDS: u64 = 5;
const MAX_QUESTION_SECONDS: u64 = 120;
const MAX_SETTLE_MS: u64 = 5_000;

const DATA_DIR_ENV: &str = "STAGEQUIZ_DATA_DIR";
const CONTENT_DIR_ENV: &str = "STAGEQUIZ_CONTENT_DIR";
const CONFIG_FILE_PATH: &str = "config/app_config.toml";

/// Directory overrides taken from the environment at startup. They shape the running
/// config but are never written back to the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct EnvOverrides {
    data_dir: Option<String>,
    content_dir: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            data_dir: non_blank_var(DATA_DIR_ENV),
            content_dir: non_blank_var(CONTENT_DIR_ENV),
        }
    }

    fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(dir) = &self.content_dir {
            config.content_dir = dir.clone();
        }
        config
    }
}

fn non_blank_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Default)]
struct ConfigState {
    /// What the config file holds.
    saved: AppConfig,
    overrides: EnvOverrides,
}

impl ConfigState {
    fn effective(&self) -> AppConfig {
        self.overrides.apply(self.saved.clone())
    }

    /// Mutate the file-backed values and return them for persisting.
    fn update_saved<F>(&mut self, mutator: F) -> AppConfig
    where
        F: FnOnce(&mut AppConfig),
    {
        mutator(&mut self.saved);
        self.saved.normalize();
        self.saved.clone()
    }
}

static APP_CONFIG: OnceLock<RwLock<ConfigState>> = OnceLock::new();

fn config_lock() -> &'static RwLock<ConfigState> {
    APP_CONFIG.get_or_init(|| RwLock::new(ConfigState::default()))
}

/// Attempt to load configuration from disk. If loading fails, the in-memory config will be reset to defaults
/// and the error will be returned for the caller to surface if desired.
pub fn initialize() -> Result<()> {
    let overrides = EnvOverrides::from_env();
    let (saved, outcome) = match load_config_from_disk() {
        Ok(config) => (config, Ok(())),
        Err(err) => (AppConfig::default(), Err(err)),
    };
    *config_lock().write().expect("config lock poisoned") = ConfigState { saved, overrides };
    outcome
}

/// Retrieve a clone of the current configuration, environment overrides included.
pub fn current() -> AppConfig {
    config_lock()
        .read()
        .expect("config lock poisoned")
        .effective()
}

/// Convenience accessor for the configured data directory.
pub fn data_dir() -> String {
    current().data_dir
}

/// Apply the provided mutation to the file-backed configuration, persist it to disk, and
/// return the resulting running configuration.
pub fn update<F>(mutator: F) -> Result<AppConfig>
where
    F: FnOnce(&mut AppConfig),
{
    let mut state = config_lock().write().expect("config lock poisoned");
    let saved = state.update_saved(mutator);
    save_config_to_disk(&saved)?;
    Ok(state.effective())
}

/// Path to the configuration file used for persistence.
pub fn config_file_path() -> PathBuf {
    PathBuf::from(CONFIG_FILE_PATH)
}

fn load_config_from_disk() -> Result<AppConfig> {
    let path = config_file_path();
    match fs::read_to_string(&path) {
        Ok(contents) => parse_config(&contents)
            .wrap_err_with(|| format!("failed to parse configuration at {}", path.display())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(err) => Err(eyre!(format!(
            "failed to read configuration at {}: {}",
            path.display(),
            err
        ))),
    }
}

fn parse_config(contents: &str) -> Result<AppConfig> {
    let mut config: AppConfig = toml::from_str(contents)?;
    config.normalize();
    Ok(config)
}

fn save_config_to_disk(config: &AppConfig) -> Result<()> {
    let path = config_file_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).wrap_err_with(|| {
            format!(
                "failed to create configuration directory {}",
                parent.display()
            )
        })?;
    }
    let serialized =
        toml::to_string_pretty(config).wrap_err("failed to serialize configuration to TOML")?;
    fs::write(&path, serialized)
        .wrap_err_with(|| format!("failed to write configuration to {}", path.display()))
}

const fn default_question_seconds_value() -> u64 {
    DEFAULT_QUESTION_SECONDS
}

const fn default_answer_settle_ms_value() -> u64 {
    DEFAULT_ANSWER_SETTLE_MS
}

const fn default_timeout_settle_ms_value() -> u64 {
    DEFAULT_TIMEOUT_SETTLE_MS
}

fn default_data_dir_value() -> String {
    "output".to_string()
}

fn default_content_dir_value() -> String {
    "data".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigField {
    QuestionSeconds,
    RecordTimeouts,
}

impl ConfigField {
    fn index(self) -> usize {
        match self {
            Self::QuestionSeconds => 0,
            Self::RecordTimeouts => 1,
        }
    }

    fn next(self) -> Self {
        match self {
            Self::QuestionSeconds => Self::RecordTimeouts,
            Self::RecordTimeouts => Self::QuestionSeconds,
        }
    }

    fn previous(self) -> Self {
        self.next()
    }
}

/// Editable copy of the user-facing settings shown in the config view.
#[derive(Debug, Clone)]
pub struct ConfigForm {
    pub(crate) question_seconds: u64,
    pub(crate) record_timeouts: bool,
    field: ConfigField,
    pub(crate) dirty: bool,
    pub(crate) status: Option<String>,
}

impl ConfigForm {
    pub(crate) fn from_config(config: AppConfig) -> Self {
        Self {
            question_seconds: config.question_seconds,
            record_timeouts: config.record_timeouts,
            field: ConfigField::QuestionSeconds,
            dirty: false,
            status: None,
        }
    }

    pub(crate) fn selected_index(&self) -> usize {
        self.field.index()
    }

    pub(crate) fn select_next(&mut self) {
        self.field = self.field.next();
    }

    pub(crate) fn select_previous(&mut self) {
        self.field = self.field.previous();
    }

    pub(crate) fn adjust_current(&mut self, delta: i64) {
        if delta == 0 {
            return;
        }

        match self.field {
            ConfigField::RecordTimeouts => {
                self.record_timeouts = !self.record_timeouts;
                self.dirty = true;
                self.status = None;
            }
            ConfigField::QuestionSeconds => {
                let current = self.question_seconds as i64;
                let updated = (current + delta)
                    .clamp(MIN_QUESTION_SECONDS as i64, MAX_QUESTION_SECONDS as i64)
                    as u64;
                if updated != self.question_seconds {
                    self.question_seconds = updated;
                    self.dirty = true;
                    self.status = None;
                }
            }
        }
    }

    pub(crate) fn apply_saved(&mut self, config: AppConfig) {
        self.question_seconds = config.question_seconds;
        self.record_timeouts = config.record_timeouts;
        self.dirty = false;
        self.status = None;
    }

    pub(crate) fn set_status<S: Into<String>>(&mut self, status: S) {
        self.status = Some(status.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = parse_config("record_timeouts = true\n").unwrap();
        assert_eq!(config.question_seconds, 25);
        assert_eq!(config.answer_settle_ms, 700);
        assert_eq!(config.timeout_settle_ms, 800);
        assert!(config.record_timeouts);
        assert_eq!(config.data_dir, "output");
        assert_eq!(config.content_dir, "data");
    }

    #[test]
    fn zero_durations_are_normalized() {
        let config = parse_config("question_seconds = 0\nanswer_settle_ms = 0\ndata_dir = \" \"\n")
            .unwrap();
        assert_eq!(config.question_duration(), Duration::from_secs(25));
        assert_eq!(config.answer_settle(), Duration::from_millis(700));
        assert_eq!(config.data_dir, "output");
    }

    #[test]
    fn oversized_durations_are_clamped() {
        let config = parse_config(
            "question_seconds = 9223372036854775807\nanswer_settle_ms = 9999999\ntimeout_settle_ms = 1\n",
        )
        .unwrap();
        assert_eq!(config.question_seconds, 120);
        assert_eq!(config.answer_settle(), Duration::from_millis(5_000));
        assert_eq!(config.timeout_settle(), Duration::from_millis(1));

        let config = parse_config("question_seconds = 2\n").unwrap();
        assert_eq!(config.question_duration(), Duration::from_secs(5));

        let unnormalized = AppConfig {
            question_seconds: u64::MAX,
            ..AppConfig::default()
        };
        assert_eq!(unnormalized.question_duration(), Duration::from_secs(120));
    }

    #[test]
    fn saving_keeps_env_overrides_out_of_the_file() {
        let mut state = ConfigState {
            saved: AppConfig::default(),
            overrides: EnvOverrides {
                data_dir: Some("/tmp/stagequiz-env".to_string()),
                content_dir: None,
            },
        };
        assert_eq!(state.effective().data_dir, "/tmp/stagequiz-env");

        let saved = state.update_saved(|config| config.question_seconds = 40);
        assert_eq!(saved.data_dir, "output");
        assert_eq!(saved.question_seconds, 40);
        assert!(!toml::to_string_pretty(&saved).unwrap().contains("stagequiz-env"));

        let running = state.effective();
        assert_eq!(running.data_dir, "/tmp/stagequiz-env");
        assert_eq!(running.content_dir, "data");
        assert_eq!(running.question_seconds, 40);
    }

    #[test]
    fn form_clamps_question_seconds_and_toggles_timeouts() {
        let mut form = ConfigForm::from_config(AppConfig {
            question_seconds: 6,
            ..AppConfig::default()
        });
        form.adjust_current(-5);
        assert_eq!(form.question_seconds, 5);
        assert!(form.dirty);

        form.select_next();
        assert_eq!(form.selected_index(), 1);
        form.adjust_current(1);
        assert!(form.record_timeouts);

        let saved = AppConfig {
            question_seconds: 5,
            record_timeouts: true,
            ..AppConfig::default()
        };
        form.apply_saved(saved);
        assert!(!form.dirty);
    }
}
