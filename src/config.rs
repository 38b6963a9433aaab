use log::{info, warn};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use winit::keyboard::KeyCode;

const CONFIG_PATH: &str = "quickdraw.ini";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevelSetting {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevelSetting {
    pub const fn as_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Off => log::LevelFilter::Off,
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }
}

impl FromStr for LogLevelSetting {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: LogLevelSetting,
    pub assets_dir: String,
    pub display_width: u32,
    pub display_height: u32,
    pub windowed: bool,
    /// Physical key that counts as a reaction (pointer presses always do).
    pub reaction_key: KeyCode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevelSetting::Info,
            assets_dir: "assets".to_string(),
            display_width: 1280,
            display_height: 720,
            windowed: true,
            reaction_key: KeyCode::Space,
        }
    }
}

static CONFIG: Lazy<Mutex<Config>> = Lazy::new(|| Mutex::new(Config::default()));

/// Loads `quickdraw.ini`, writing a default file when none exists.
/// Unknown or malformed values fall back to defaults with a warning.
pub fn load() {
    let path = Path::new(CONFIG_PATH);
    if !path.exists() {
        info!("No config at '{CONFIG_PATH}'; writing defaults.");
        write_default(path);
    }

    let mut config = Config::default();
    match read_ini(path) {
        Ok(values) => apply(&mut config, &values),
        Err(e) => warn!("Could not read '{CONFIG_PATH}': {e}; using defaults."),
    }

    *CONFIG.lock().unwrap() = config;
}

pub fn get() -> Config {
    CONFIG.lock().unwrap().clone()
}

fn apply(config: &mut Config, values: &HashMap<String, String>) {
    if let Some(v) = values.get("general.loglevel") {
        match v.parse() {
            Ok(level) => config.log_level = level,
            Err(()) => warn!("Unknown LogLevel '{v}'; keeping {:?}.", config.log_level),
        }
    }
    if let Some(v) = values.get("general.assetsdir") {
        config.assets_dir = v.clone();
    }
    if let Some(v) = values.get("display.width")
        && let Ok(w) = v.parse::<u32>()
        && w > 0
    {
        config.display_width = w;
    }
    if let Some(v) = values.get("display.height")
        && let Ok(h) = v.parse::<u32>()
        && h > 0
    {
        config.display_height = h;
    }
    if let Some(v) = values.get("display.windowed") {
        config.windowed = v.eq_ignore_ascii_case("true") || v == "1";
    }
    if let Some(v) = values.get("input.reactionkey") {
        match parse_key(v) {
            Some(code) => config.reaction_key = code,
            None => warn!("Unknown ReactionKey '{v}'; keeping {:?}.", config.reaction_key),
        }
    }
}

/// Flat `section.key` (lowercased) -> value view of an INI file.
fn read_ini(path: &Path) -> Result<HashMap<String, String>, std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    let mut values = HashMap::new();
    let mut section = String::new();

    for raw_line in content.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
            section = line[1..line.len() - 1].trim().to_ascii_lowercase();
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim().to_ascii_lowercase();
            if !key.is_empty() {
                values.insert(format!("{section}.{key}"), value.trim().to_string());
            }
        }
    }

    Ok(values)
}

fn write_default(path: &Path) {
    let defaults = Config::default();
    let content = format!(
        "[General]\n\
         LogLevel={}\n\
         AssetsDir={}\n\
         \n\
         [Display]\n\
         Width={}\n\
         Height={}\n\
         Windowed=true\n\
         \n\
         [Input]\n\
         ReactionKey=Space\n",
        defaults.log_level.as_str(),
        defaults.assets_dir,
        defaults.display_width,
        defaults.display_height,
    );
    if let Err(e) = std::fs::write(path, content) {
        warn!("Could not write default config: {e}");
    }
}

/// The handful of keys worth binding a reaction to.
fn parse_key(name: &str) -> Option<KeyCode> {
    match name.to_ascii_lowercase().as_str() {
        "space" => Some(KeyCode::Space),
        "enter" => Some(KeyCode::Enter),
        "keyj" => Some(KeyCode::KeyJ),
        "keyf" => Some(KeyCode::KeyF),
        "keyk" => Some(KeyCode::KeyK),
        "shiftleft" => Some(KeyCode::ShiftLeft),
        "shiftright" => Some(KeyCode::ShiftRight),
        "controlleft" => Some(KeyCode::ControlLeft),
        _ => None,
    }
}
