use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Number of tags every monitor carries.
pub const TAG_COUNT: usize = 9;

/// Error types for configuration operations
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration format: {reason}")]
    InvalidFormat { reason: String },

    #[error("Invalid colour {value:?}: expected #rrggbb")]
    InvalidColor { value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A 24-bit colour written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u32);

impl Color {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidColor { value: value.to_string() };
        let hex = value.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 {
            return Err(invalid());
        }
        u32::from_str_radix(hex, 16).map(Color).map_err(|_| invalid())
    }

    /// Pixel value on a 24-bit TrueColor visual.
    pub fn pixel(self) -> u32 {
        self.0
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Color::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Placement policy for newly managed windows, matched on WM_CLASS and title.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Rule {
    pub class: Option<String>,
    pub instance: Option<String>,
    pub title: Option<String>,
    /// Tag indices (0-based) the window is placed on. Empty keeps the current view.
    pub tags: Vec<usize>,
    pub floating: bool,
    pub monitor: Option<usize>,
}

impl Rule {
    /// A rule matches when every matcher it sets is a substring of the window's value.
    pub fn matches(&self, class: &str, instance: &str, title: &str) -> bool {
        let hit = |pattern: &Option<String>, value: &str| {
            pattern.as_deref().map_or(true, |p| value.contains(p))
        };
        hit(&self.class, class) && hit(&self.instance, instance) && hit(&self.title, title)
    }

    pub fn tag_mask(&self) -> u32 {
        self.tags
            .iter()
            .filter(|&&t| t < TAG_COUNT)
            .fold(0, |mask, t| mask | 1 << t)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub border_px: u32,
    pub snap_px: u32,
    pub show_bar: bool,
    pub top_bar: bool,
    /// Height of the strip kept free for an external status bar.
    pub bar_height: u32,
    pub border_normal: Color,
    pub border_selected: Color,
    pub tags: Vec<String>,
    pub master_factor: f32,
    pub master_count: u32,
    pub respect_size_hints: bool,
    pub focus_follows_pointer: bool,
    pub terminal: Vec<String>,
    pub menu: Vec<String>,
    pub rules: Vec<Rule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            border_px: 1,
            snap_px: 32,
            show_bar: true,
            top_bar: true,
            bar_height: 20,
            border_normal: Color(0x444444),
            border_selected: Color(0x005577),
            tags: (1..=TAG_COUNT).map(|t| t.to_string()).collect(),
            master_factor: 0.55,
            master_count: 1,
            respect_size_hints: true,
            focus_follows_pointer: true,
            terminal: vec!["x-terminal-emulator".to_string()],
            menu: vec!["dmenu_run".to_string()],
            rules: Vec::new(),
        }
    }
}

impl Config {
    /// Parse and validate a TOML document. Unset keys keep their defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file. A missing file yields the defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load from the default location, falling back to defaults on any error.
    pub fn load_or_default() -> Self {
        let path = default_path();
        match Self::load_from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring configuration at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tags.len() != TAG_COUNT {
            return Err(ConfigError::InvalidFormat {
                reason: format!("expected {} tag names, found {}", TAG_COUNT, self.tags.len()),
            });
        }
        if !(0.05..=0.95).contains(&self.master_factor) {
            return Err(ConfigError::InvalidFormat {
                reason: format!("master_factor {} outside [0.05, 0.95]", self.master_factor),
            });
        }
        if self.terminal.is_empty() || self.menu.is_empty() {
            return Err(ConfigError::InvalidFormat {
                reason: "launch commands must not be empty".to_string(),
            });
        }
        if let Some(rule) = self.rules.iter().find(|r| r.tags.iter().any(|&t| t >= TAG_COUNT)) {
            return Err(ConfigError::InvalidFormat {
                reason: format!("rule {:?} names a tag beyond {}", rule, TAG_COUNT),
            });
        }
        Ok(())
    }
}

/// `$XDG_CONFIG_HOME/nwm/config.toml`
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nwm")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = tempdir().unwrap();
        let config = Config::load_from_file(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.tags.len(), TAG_COUNT);
        assert_eq!(config.border_selected.pixel(), 0x005577);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r##"
border_px = 3
border_normal = "#101010"
terminal = ["alacritty", "-e", "tmux"]

[[rules]]
class = "Gimp"
floating = true
tags = [8]
"##,
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.border_px, 3);
        assert_eq!(config.border_normal, Color(0x101010));
        assert_eq!(config.terminal, vec!["alacritty", "-e", "tmux"]);
        assert_eq!(config.snap_px, 32);
        assert_eq!(config.rules.len(), 1);
        assert_eq!(config.rules[0].tag_mask(), 1 << 8);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            Config::from_toml("tags = [\"a\", \"b\"]"),
            Err(ConfigError::InvalidFormat { .. })
        ));
        assert!(matches!(
            Config::from_toml("master_factor = 0.99"),
            Err(ConfigError::InvalidFormat { .. })
        ));
        assert!(Config::from_toml("border_selected = \"blue\"").is_err());
        assert!(matches!(Config::from_toml("bogus = 1"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_color_parse() {
        assert_eq!(Color::parse("#005577").unwrap(), Color(0x005577));
        assert!(Color::parse("005577").is_err());
        assert!(Color::parse("#0055").is_err());
        assert!(Color::parse("#zzzzzz").is_err());
    }

    #[test]
    fn test_rule_matching() {
        let rule = Rule {
            class: Some("Firefox".into()),
            title: Some("Library".into()),
            ..Rule::default()
        };
        assert!(rule.matches("Firefox", "Navigator", "Library"));
        assert!(!rule.matches("Firefox", "Navigator", "Mozilla Firefox"));
        assert!(Rule::default().matches("anything", "", ""));
    }
}
