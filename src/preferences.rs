//! Persisted client preferences in ~/.config/telepulse/preferences.toml.
//!
//! The only persisted preference is the theme. Unlike `config.toml`, this file
//! is written by the client itself (`telepulse theme toggle`).
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("Failed to access preferences file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in preferences file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to encode preferences: {0}")]
    Encode(#[from] toml::ser::Error),
}

// ============================================================================
// Theme Variant
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeVariant {
    Dark,
    Light,
}

impl ThemeVariant {
    /// Parse a variant name (case-insensitive).
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }

    /// Guess the variant from the host's background color (`#rrggbb`).
    pub fn from_host_background(color: &str) -> Self {
        let color = color.trim().to_ascii_lowercase();
        if color.contains("000000") || color.contains("1a1a1a") {
            Self::Dark
        } else {
            Self::Light
        }
    }

    /// Dark → Light → Dark.
    pub fn next(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    /// ANSI color for headings and channel names.
    pub fn accent(self) -> &'static str {
        match self {
            Self::Dark => "\x1b[96m",
            Self::Light => "\x1b[34m",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::Dark => "🌙",
            Self::Light => "☀️",
        }
    }
}

// ============================================================================
// Preferences
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Explicit choice. `None` follows the host.
    pub theme: Option<ThemeVariant>,
}

impl Preferences {
    /// Same ceiling as the config file.
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Missing or blank file → defaults.
    pub fn load(path: &Path) -> Result<Self, PreferencesError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                tracing::warn!(path = %path.display(), size = meta.len(), "Preferences file too large, ignoring");
                return Ok(Self::default());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(toml::from_str(&content)?)
    }

    /// Write via a temp file and rename, creating parent dirs as needed.
    pub fn save(&self, path: &Path) -> Result<(), PreferencesError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string(self)?;
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        tracing::debug!(path = %path.display(), theme = ?self.theme, "Preferences saved");
        Ok(())
    }

    /// The explicit choice, else the host's, else dark.
    pub fn effective_theme(&self, host_background: Option<&str>) -> ThemeVariant {
        self.theme
            .or_else(|| host_background.map(ThemeVariant::from_host_background))
            .unwrap_or(ThemeVariant::Dark)
    }

    /// Flip the effective theme and pin it. Returns the new theme.
    pub fn toggle_theme(&mut self, host_background: Option<&str>) -> ThemeVariant {
        let next = self.effective_theme(host_background).next();
        self.theme = Some(next);
        next
    }
}
