use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_true")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_true(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_true(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    dirs::data_local_dir()
        .map(|dir| dir.join(SETTINGS_DIR).join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
        .to_string_lossy()
        .into_owned()
}
fn default_prefix() -> String {
    "jelling".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}
fn default_shutdown_timeout_ms() -> u64 {
    2000
}

const SETTINGS_DIR: &str = "Jelling";
const SETTINGS_FILE: &str = "settings.json";

/// Host-side preferences. The GATT identities and parameters are fixed and
/// not configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_settings: LogSettings,

    /// How long exit waits for the Bluetooth worker to stop advertising
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    #[serde(default = "default_false")]
    pub start_minimized: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_settings: LogSettings::default(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            start_minimized: false,
        }
    }
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
    /// Problems met while loading, kept until logging is up
    load_warnings: Vec<String>,
}

impl SettingsService {
    /// Load settings from the user's config directory, writing the defaults
    /// there on first run.
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::from_path(settings_path))
    }

    pub fn from_path(settings_path: PathBuf) -> Self {
        let mut service = Self {
            settings: Settings::default(),
            settings_path,
            load_warnings: Vec::new(),
        };

        if service.settings_path.exists() {
            match Self::load_from_file(&service.settings_path) {
                Ok(settings) => service.settings = settings,
                Err(e) => service.load_warnings.push(format!(
                    "Ignoring unreadable settings file {}: {}",
                    service.settings_path.display(),
                    e
                )),
            }
        } else if let Err(e) = service.save() {
            service
                .load_warnings
                .push(format!("Could not write default settings: {}", e));
        }

        service
    }

    pub fn load_warnings(&self) -> &[String] {
        &self.load_warnings
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push(SETTINGS_DIR);
        fs::create_dir_all(&path)?;
        path.push(SETTINGS_FILE);
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }
}
