//! Configuration loading and management

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::events::ShortcutAction;
use crate::hotkey::{parse_combination, parse_key, Binding, InterceptSettings};

/// Environment variable that overrides the config file location
pub const CONFIG_ENV: &str = "VIRTUAL_WIN_KEYS_CONFIG";

/// Daemon configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shortcuts to register at startup
    pub bindings: Vec<BindingConfig>,

    /// Keystroke interceptor settings
    pub intercept: InterceptConfig,

    /// Where this configuration was read from
    #[serde(skip)]
    pub config_path: PathBuf,
}

/// One shortcut entry, e.g. `{"hotkey": "Alt+Win+Right", "action": "move_window_right"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingConfig {
    pub hotkey: String,
    pub action: ShortcutAction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterceptConfig {
    /// Install the low-level keyboard filter
    pub enabled: bool,
    /// Key names to swallow, e.g. `["LWin"]`
    pub swallow: Vec<String>,
    /// Emit an event for every key-down
    pub log_keystrokes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bindings: vec![
                BindingConfig {
                    hotkey: "Alt+Win+Right".to_string(),
                    action: ShortcutAction::MoveWindowRight,
                },
                BindingConfig {
                    hotkey: "Alt+Win+Left".to_string(),
                    action: ShortcutAction::MoveWindowLeft,
                },
            ],
            intercept: InterceptConfig::default(),
            config_path: PathBuf::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(path) => PathBuf::from(path),
            None => data_dir()?.join("config.json"),
        };
        Self::load_from(&path)
    }

    /// Load from `path`, falling back to defaults when the file is missing
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Self::from_json(&raw).with_context(|| format!("invalid config {}", path.display()))?
        } else {
            Self::default()
        };

        config.config_path = path.to_owned();
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw).context("failed to parse config JSON")?;
        // Surface bad hotkey strings at load time rather than at registration
        config.resolve_bindings()?;
        config.intercept_settings()?;
        Ok(config)
    }

    /// Parsed shortcut bindings
    pub fn resolve_bindings(&self) -> Result<Vec<Binding>> {
        self.bindings
            .iter()
            .map(|entry| {
                let combination = parse_combination(&entry.hotkey)
                    .with_context(|| format!("invalid hotkey {:?}", entry.hotkey))?;
                Ok(Binding {
                    combination,
                    action: entry.action,
                })
            })
            .collect()
    }

    /// Parsed interceptor settings
    pub fn intercept_settings(&self) -> Result<InterceptSettings> {
        let mut swallow = Vec::with_capacity(self.intercept.swallow.len());
        for name in &self.intercept.swallow {
            match parse_key(name) {
                Some(key) => swallow.push(key),
                None => bail!("invalid key name {:?} in intercept.swallow", name),
            }
        }

        Ok(InterceptSettings {
            enabled: self.intercept.enabled,
            swallow,
            log_keystrokes: self.intercept.log_keystrokes,
        })
    }
}

/// Directory holding the config file
fn data_dir() -> Result<PathBuf> {
    if let Some(appdata) = std::env::var_os("APPDATA") {
        return Ok(PathBuf::from(appdata).join("virtual-win-keys"));
    }
    let home = std::env::var("HOME").context("neither APPDATA nor HOME is set")?;
    Ok(PathBuf::from(home).join(".config").join("virtual-win-keys"))
}
