//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.
//! Every section is `#[serde(default)]`, so a settings file only needs the
//! keys it overrides.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// InterpreterMode
// ---------------------------------------------------------------------------

/// Selects which backend interprets spoken commands.
///
/// | Variant  | Backend                                     | Needs network |
/// |----------|---------------------------------------------|---------------|
/// | Offline  | Keyword navigation (next / back / repeat …) | No            |
/// | Api      | OpenAI-compatible chat-completions endpoint | Yes           |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpreterMode {
    Offline,
    Api,
}

impl Default for InterpreterMode {
    fn default() -> Self {
        Self::Api
    }
}

// ---------------------------------------------------------------------------
// InterpreterConfig
// ---------------------------------------------------------------------------

/// Settings for the instruction interpreter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Which backend to use.
    pub mode: InterpreterMode,
    /// Base URL of the API endpoint.
    ///
    /// - Ollama default: `http://localhost:11434`
    /// - OpenAI: `https://api.openai.com`
    pub base_url: String,
    /// API key — `None` for local providers.
    pub api_key: Option<String>,
    /// Model identifier sent to the API (e.g. `"qwen2.5:3b"`, `"gpt-4o-mini"`).
    pub model: String,
    /// Sampling temperature (0.0 – 1.0).
    pub temperature: f32,
    /// Maximum seconds to wait for a reply before timing out.
    pub timeout_secs: u64,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            mode: InterpreterMode::default(),
            base_url: "http://localhost:11434".into(),
            api_key: None,
            model: "qwen2.5:3b".into(),
            temperature: 0.2,
            timeout_secs: 15,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Behaviour of the hands-free cooking session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Locale code forwarded to the interpreter (e.g. `"en-US"`).
    pub language: String,
    /// Read the next step automatically when the user stays silent.
    pub auto_advance: bool,
    /// Dwell time after an instruction is read before auto-advancing.
    pub auto_advance_ms: u64,
    /// Spoken locally in reply to "pause".
    pub pause_message: String,
    /// Spoken when the interpreter could not be reached.
    pub retry_message: String,
    /// Substituted when the interpreter reply carries no text.
    pub not_understood_message: String,
    /// Sent as `currentInstruction` when no step applies.
    pub start_of_recipe_message: String,
}

impl SessionConfig {
    /// Auto-advance dwell as a [`Duration`].
    pub fn auto_advance_delay(&self) -> Duration {
        Duration::from_millis(self.auto_advance_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            language: "en-US".into(),
            auto_advance: true,
            auto_advance_ms: 7_000,
            pause_message: "Paused. Say resume when you're ready.".into(),
            retry_message: "Sorry, something went wrong. Please say that again.".into(),
            not_understood_message: "Sorry, I didn't catch that.".into(),
            start_of_recipe_message: "You are at the start.".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Settings for the terminal speech adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Simulated speaking rate used to time playback.
    pub words_per_minute: u32,
    /// Prefix printed before every spoken line.
    pub voice_prefix: String,
}

impl SpeechConfig {
    /// Playback time for `text` at the configured rate.
    ///
    /// ```
    /// use savora_cook::config::SpeechConfig;
    ///
    /// let cfg = SpeechConfig { words_per_minute: 120, ..SpeechConfig::default() };
    /// assert_eq!(cfg.playback_duration("one two").as_millis(), 1_000);
    /// ```
    pub fn playback_duration(&self, text: &str) -> Duration {
        let words = text.split_whitespace().count() as u64;
        let wpm = u64::from(self.words_per_minute.max(1));
        Duration::from_millis(words * 60_000 / wpm)
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            words_per_minute: 170,
            voice_prefix: "🔊".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use savora_cook::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Instruction interpreter settings.
    pub interpreter: InterpreterConfig,
    /// Cooking session behaviour.
    pub session: SessionConfig,
    /// Terminal speech adapter settings.
    pub speech: SpeechConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.interpreter.mode, loaded.interpreter.mode);
        assert_eq!(original.interpreter.base_url, loaded.interpreter.base_url);
        assert_eq!(original.interpreter.api_key, loaded.interpreter.api_key);
        assert_eq!(original.interpreter.model, loaded.interpreter.model);
        assert_eq!(original.session.language, loaded.session.language);
        assert_eq!(original.session.auto_advance_ms, loaded.session.auto_advance_ms);
        assert_eq!(original.session.pause_message, loaded.session.pause_message);
        assert_eq!(
            original.speech.words_per_minute,
            loaded.speech.words_per_minute
        );
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.interpreter.mode, InterpreterMode::Api);
        assert_eq!(config.session.auto_advance_ms, 7_000);
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.interpreter.base_url, "http://localhost:11434");
        assert!(cfg.interpreter.api_key.is_none());
        assert_eq!(cfg.session.language, "en-US");
        assert!(cfg.session.auto_advance);
        assert_eq!(cfg.session.auto_advance_delay(), Duration::from_millis(7_000));
        assert_eq!(cfg.session.start_of_recipe_message, "You are at the start.");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(
            &path,
            "[interpreter]\nmode = \"offline\"\n\n[session]\nauto_advance_ms = 3000\n",
        )
        .expect("write");

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.interpreter.mode, InterpreterMode::Offline);
        assert_eq!(cfg.interpreter.model, "qwen2.5:3b");
        assert_eq!(cfg.session.auto_advance_ms, 3_000);
        assert_eq!(cfg.session.language, "en-US");
        assert_eq!(cfg.speech.words_per_minute, 170);
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.interpreter.mode = InterpreterMode::Offline;
        cfg.interpreter.api_key = Some("sk-test".into());
        cfg.interpreter.timeout_secs = 30;
        cfg.session.language = "fr-FR".into();
        cfg.session.auto_advance = false;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.interpreter.mode, InterpreterMode::Offline);
        assert_eq!(loaded.interpreter.api_key, Some("sk-test".into()));
        assert_eq!(loaded.interpreter.timeout_secs, 30);
        assert_eq!(loaded.session.language, "fr-FR");
        assert!(!loaded.session.auto_advance);
    }

    #[test]
    fn playback_duration_scales_with_words() {
        let cfg = SpeechConfig {
            words_per_minute: 60,
            ..SpeechConfig::default()
        };
        assert_eq!(cfg.playback_duration(""), Duration::ZERO);
        assert_eq!(cfg.playback_duration("Bake for 20 minutes"), Duration::from_secs(4));
    }
}
