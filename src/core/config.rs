//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.navkit/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.
//!
//! At runtime the resolved values are wrapped in a [`Config`], the key-value
//! provider navigators and overlays ask for named transition overrides
//! (`config.get("navTransition")`).

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::Mode;
use crate::core::animation::{AnimationOptions, builtin_builder};
use crate::core::transition::TransitionBuilder;
use crate::core::zindex::Direction;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct NavkitConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub transitions: TransitionsConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub mode: Option<Mode>,
    pub animated: Option<bool>,
    pub z_index_offset: Option<i32>,
    pub swipe_back_enabled: Option<bool>,
    pub log_level: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TransitionsConfig {
    pub duration_ms: Option<u64>,
    pub easing: Option<String>,
    /// Transition name → built-in animation (`slide`, `fade`, `none`).
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_ANIMATED: bool = true;
pub const DEFAULT_SWIPE_BACK_ENABLED: bool = true;
pub const DEFAULT_Z_INDEX_OFFSET: i32 = 0;

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub mode: Mode,
    pub animated: bool,
    pub z_index_offset: i32,
    pub swipe_back_enabled: bool,
    pub log_level: String,
    pub duration: Option<Duration>,
    pub easing: Option<String>,
    pub overrides: BTreeMap<String, String>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            animated: DEFAULT_ANIMATED,
            z_index_offset: DEFAULT_Z_INDEX_OFFSET,
            swipe_back_enabled: DEFAULT_SWIPE_BACK_ENABLED,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            duration: None,
            easing: None,
            overrides: BTreeMap::new(),
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.navkit/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".navkit").join("config.toml"))
}

/// Load config from `~/.navkit/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `NavkitConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<NavkitConfig, ConfigError> {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => {
            warn!("Could not determine home directory, using default config");
            Ok(NavkitConfig::default())
        }
    }
}

/// Load config from an explicit path, generating a default file if missing.
pub fn load_config_from(path: &Path) -> Result<NavkitConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(NavkitConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: NavkitConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# Navkit Configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# mode = "ios"                  # "ios" or "md", picks the default page transition
# animated = true               # Or set NAVKIT_ANIMATED=false
# z_index_offset = 0            # Base offset for the root navigator's stacking band
# swipe_back_enabled = true
# log_level = "info"            # Or set NAVKIT_LOG

# [transitions]
# duration_ms = 400             # Overrides every built-in duration
# easing = "ease-in-out"

# [transitions.overrides]
# navTransition = "fade"        # "slide", "fade" or "none"
# popoverEnter = "none"
"#;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Failed to create config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
///
/// `cli_mode` comes from the `--mode` flag (None = not specified).
pub fn resolve(config: &NavkitConfig, cli_mode: Option<Mode>) -> ResolvedConfig {
    // Mode: CLI → env → config → default
    let mode = cli_mode
        .or_else(|| {
            std::env::var("NAVKIT_MODE")
                .ok()
                .and_then(|s| s.parse::<Mode>().ok())
        })
        .or(config.general.mode)
        .unwrap_or_default();

    // Animated: env → config → default
    let animated = std::env::var("NAVKIT_ANIMATED")
        .ok()
        .and_then(|s| s.parse::<bool>().ok())
        .or(config.general.animated)
        .unwrap_or(DEFAULT_ANIMATED);

    // Log level: env → config → default
    let log_level = std::env::var("NAVKIT_LOG")
        .ok()
        .or_else(|| config.general.log_level.clone())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

    ResolvedConfig {
        mode,
        animated,
        z_index_offset: config
            .general
            .z_index_offset
            .unwrap_or(DEFAULT_Z_INDEX_OFFSET),
        swipe_back_enabled: config
            .general
            .swipe_back_enabled
            .unwrap_or(DEFAULT_SWIPE_BACK_ENABLED),
        log_level,
        duration: config.transitions.duration_ms.map(Duration::from_millis),
        easing: config.transitions.easing.clone(),
        overrides: config.transitions.overrides.clone(),
    }
}

// ============================================================================
// Runtime Provider
// ============================================================================

/// Key-value lookup for named transition builders plus the resolved settings.
pub struct Config {
    resolved: ResolvedConfig,
    builders: HashMap<String, Arc<dyn TransitionBuilder>>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.builders.keys().collect();
        names.sort();
        f.debug_struct("Config")
            .field("resolved", &self.resolved)
            .field("builders", &names)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_resolved(ResolvedConfig::default())
    }
}

impl Config {
    /// Builds the provider, registering the built-in animation named by each override.
    pub fn from_resolved(resolved: ResolvedConfig) -> Self {
        let mut builders = HashMap::new();
        for (name, builtin) in &resolved.overrides {
            match builtin_builder(builtin) {
                Some(builder) => {
                    debug!("Transition override {} -> {}", name, builtin);
                    builders.insert(name.clone(), builder);
                }
                None => warn!("Unknown animation '{}' for override '{}'", builtin, name),
            }
        }
        Self { resolved, builders }
    }

    /// The builder registered under `name`, if any.
    pub fn get(&self, name: &str) -> Option<Arc<dyn TransitionBuilder>> {
        self.builders.get(name).cloned()
    }

    pub fn set(&mut self, name: impl Into<String>, builder: Arc<dyn TransitionBuilder>) {
        self.builders.insert(name.into(), builder);
    }

    pub fn resolved(&self) -> &ResolvedConfig {
        &self.resolved
    }

    pub fn mode(&self) -> Mode {
        self.resolved.mode
    }

    pub fn animated(&self) -> bool {
        self.resolved.animated
    }

    pub fn z_index_offset(&self) -> i32 {
        self.resolved.z_index_offset
    }

    pub fn swipe_back_enabled(&self) -> bool {
        self.resolved.swipe_back_enabled
    }

    /// Animation options seeded from config for a navigation in `direction`.
    pub fn animation_options(&self, direction: Direction) -> AnimationOptions {
        AnimationOptions {
            animate: self.resolved.animated,
            direction,
            duration: self.resolved.duration,
            easing: self.resolved.easing.clone(),
            mode: self.resolved.mode,
            is_rtl: false,
        }
    }
}
