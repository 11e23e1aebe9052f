//! Runtime configuration: display policies, timings, assist triggers, and
//! the theme palette, loaded from `cordial.toml`.
//!
//! Unknown fields are ignored so the file format can grow without breaking
//! older configs; every field has a default and a missing file yields the
//! default configuration.

use core_model::{BlockedPolicy, DeletedPolicy};
use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf};
use thiserror::Error;
use tracing::info;

/// A missing file is not an error (defaults apply); an unreadable or
/// malformed one is, and the two are distinguishable to the caller.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub assist: AssistConfig,
    #[serde(default)]
    pub theme: ThemeConfig,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct DisplayConfig {
    #[serde(default)]
    pub blocked: BlockedPolicy,
    #[serde(default)]
    pub deleted: DeletedPolicy,
    /// Show the member list column at startup.
    #[serde(default)]
    pub members: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    #[serde(default = "TimingConfig::default_coalesce_ms")]
    pub coalesce_ms: u64,
    #[serde(default = "TimingConfig::default_blink_ms")]
    pub blink_ms: u64,
    #[serde(default = "TimingConfig::default_chord_timeout_ms")]
    pub chord_timeout_ms: u64,
    #[serde(default = "TimingConfig::default_escape_timeout_ms")]
    pub escape_timeout_ms: u64,
    /// Relative timestamps ("5 minutes ago") refresh on this period.
    #[serde(default = "TimingConfig::default_tick_secs")]
    pub tick_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            coalesce_ms: Self::default_coalesce_ms(),
            blink_ms: Self::default_blink_ms(),
            chord_timeout_ms: Self::default_chord_timeout_ms(),
            escape_timeout_ms: Self::default_escape_timeout_ms(),
            tick_secs: Self::default_tick_secs(),
        }
    }
}

impl TimingConfig {
    const fn default_coalesce_ms() -> u64 {
        12
    }
    const fn default_blink_ms() -> u64 {
        500
    }
    const fn default_chord_timeout_ms() -> u64 {
        1000
    }
    const fn default_escape_timeout_ms() -> u64 {
        50
    }
    const fn default_tick_secs() -> u64 {
        30
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssistConfig {
    #[serde(default = "AssistConfig::default_channel")]
    pub channel: char,
    #[serde(default = "AssistConfig::default_user")]
    pub user: char,
    #[serde(default = "AssistConfig::default_emoji")]
    pub emoji: char,
    #[serde(default = "AssistConfig::default_sticker")]
    pub sticker: char,
    #[serde(default = "AssistConfig::default_command")]
    pub command: char,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            channel: Self::default_channel(),
            user: Self::default_user(),
            emoji: Self::default_emoji(),
            sticker: Self::default_sticker(),
            command: Self::default_command(),
        }
    }
}

impl AssistConfig {
    const fn default_channel() -> char {
        '#'
    }
    const fn default_user() -> char {
        '@'
    }
    const fn default_emoji() -> char {
        ':'
    }
    const fn default_sticker() -> char {
        ';'
    }
    const fn default_command() -> char {
        '/'
    }
}

/// Color names in crossterm's spelling ("red", "dark_grey", "#rrggbb" is not
/// supported). The binary parses them into real colors and falls back to the
/// terminal default on unknown names.
#[derive(Debug, Deserialize, Clone)]
pub struct ThemeConfig {
    #[serde(default = "ThemeConfig::d_text")]
    pub text: String,
    #[serde(default = "ThemeConfig::d_mention")]
    pub mention: String,
    #[serde(default = "ThemeConfig::d_timestamp")]
    pub timestamp: String,
    #[serde(default = "ThemeConfig::d_author")]
    pub author: String,
    #[serde(default = "ThemeConfig::d_url")]
    pub url: String,
    #[serde(default = "ThemeConfig::d_code")]
    pub code: String,
    #[serde(default = "ThemeConfig::d_spoiler")]
    pub spoiler: String,
    #[serde(default = "ThemeConfig::d_chrome")]
    pub chrome: String,
    #[serde(default = "ThemeConfig::d_accent")]
    pub accent: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            text: Self::d_text(),
            mention: Self::d_mention(),
            timestamp: Self::d_timestamp(),
            author: Self::d_author(),
            url: Self::d_url(),
            code: Self::d_code(),
            spoiler: Self::d_spoiler(),
            chrome: Self::d_chrome(),
            accent: Self::d_accent(),
        }
    }
}

impl ThemeConfig {
    fn d_text() -> String {
        "white".into()
    }
    fn d_mention() -> String {
        "yellow".into()
    }
    fn d_timestamp() -> String {
        "dark_grey".into()
    }
    fn d_author() -> String {
        "cyan".into()
    }
    fn d_url() -> String {
        "blue".into()
    }
    fn d_code() -> String {
        "green".into()
    }
    fn d_spoiler() -> String {
        "dark_grey".into()
    }
    fn d_chrome() -> String {
        "grey".into()
    }
    fn d_accent() -> String {
        "magenta".into()
    }
}

/// Best-effort config path: working directory first, then the platform
/// config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("cordial.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("cordial").join("cordial.toml");
    }
    PathBuf::from("cordial.toml")
}

/// Loads and parses the file at `path`; a missing file is the default
/// configuration, a malformed one is an error.
pub fn load(path: &Path) -> Result<ConfigFile, ConfigError> {
    if !path.exists() {
        info!(target: "config.load", path = %path.display(), "no config file, using defaults");
        return Ok(ConfigFile::default());
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ConfigFile = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    info!(target: "config.load", path = %path.display(), "config loaded");
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_file() {
        let cfg = load(Path::new("/nonexistent/cordial.toml")).unwrap();
        assert_eq!(cfg.timing.coalesce_ms, 12);
        assert_eq!(cfg.timing.blink_ms, 500);
        assert_eq!(cfg.assist.channel, '#');
        assert_eq!(cfg.display.blocked, BlockedPolicy::Masked);
        assert_eq!(cfg.display.deleted, DeletedPolicy::Hidden);
    }

    #[test]
    fn partial_file_overrides_merge_with_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
[display]
blocked = "hidden"
members = true

[timing]
coalesce_ms = 25

[assist]
emoji = "!"
"#
        )
        .unwrap();
        let cfg = load(f.path()).unwrap();
        assert_eq!(cfg.display.blocked, BlockedPolicy::Hidden);
        assert!(cfg.display.members);
        assert_eq!(cfg.timing.coalesce_ms, 25);
        assert_eq!(cfg.timing.blink_ms, 500, "untouched fields keep defaults");
        assert_eq!(cfg.assist.emoji, '!');
        assert_eq!(cfg.assist.user, '@');
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[timing]\ncoalesce_ms = \"fast\"").unwrap();
        assert!(matches!(load(f.path()), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn theme_defaults_present() {
        let cfg = ConfigFile::default();
        assert_eq!(cfg.theme.text, "white");
        assert_eq!(cfg.theme.mention, "yellow");
    }
}
