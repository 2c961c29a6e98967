//! Configuration loading from pet.toml

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use pet_core::ExpressionFiles;
use pet_services::TranslatorConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub avatar: AvatarConfig,
    #[serde(default)]
    pub dialog: DialogConfig,
    #[serde(default)]
    pub reminder: ReminderConfig,
    #[serde(default)]
    pub notes: NotesConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
}

/// Pet window configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_title")]
    pub title: String,
    /// Window size [width, height] in logical pixels
    #[serde(default = "default_window_size")]
    pub size: [u32; 2],
    /// Initial position [x, y] in logical pixels
    #[serde(default = "default_window_position")]
    pub position: [i32; 2],
    /// Background opacity (0.0 to 1.0)
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default = "default_true")]
    pub always_on_top: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            size: default_window_size(),
            position: default_window_position(),
            opacity: default_opacity(),
            always_on_top: true,
        }
    }
}

fn default_title() -> String {
    "Desk Pet".to_string()
}

fn default_window_size() -> [u32; 2] {
    [320, 300]
}

fn default_window_position() -> [i32; 2] {
    [100, 100]
}

fn default_opacity() -> f32 {
    0.9
}

fn default_true() -> bool {
    true
}

/// Avatar expression images
#[derive(Debug, Clone, Deserialize)]
pub struct AvatarConfig {
    /// Directory holding the expression images
    #[serde(default = "default_avatar_directory")]
    pub directory: String,
    /// Edge length of the square avatar in pixels
    #[serde(default = "default_avatar_size")]
    pub size: u32,
    #[serde(default = "default_close_file")]
    pub close: String,
    #[serde(default = "default_open_a_file")]
    pub open_a: String,
    #[serde(default = "default_open_b_file")]
    pub open_b: String,
    #[serde(default = "default_denying_file")]
    pub denying: String,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            directory: default_avatar_directory(),
            size: default_avatar_size(),
            close: default_close_file(),
            open_a: default_open_a_file(),
            open_b: default_open_b_file(),
            denying: default_denying_file(),
        }
    }
}

impl AvatarConfig {
    pub fn expression_files(&self) -> ExpressionFiles {
        ExpressionFiles {
            close: self.close.clone(),
            open_a: self.open_a.clone(),
            open_b: self.open_b.clone(),
            denying: self.denying.clone(),
        }
    }
}

fn default_avatar_directory() -> String {
    ".".to_string()
}

fn default_avatar_size() -> u32 {
    pet_core::expression::DEFAULT_EXPRESSION_SIZE
}

fn default_close_file() -> String {
    ExpressionFiles::default().close
}

fn default_open_a_file() -> String {
    ExpressionFiles::default().open_a
}

fn default_open_b_file() -> String {
    ExpressionFiles::default().open_b
}

fn default_denying_file() -> String {
    ExpressionFiles::default().denying
}

/// Dialog box and typewriter reveal
#[derive(Debug, Clone, Deserialize)]
pub struct DialogConfig {
    /// Delay between revealed characters in milliseconds
    #[serde(default = "default_char_delay_ms")]
    pub char_delay_ms: u64,
    /// Typewriter sound played per character (wav or ogg); no sound if missing
    #[serde(default = "default_sound")]
    pub sound: Option<String>,
    #[serde(default = "default_welcome")]
    pub welcome: String,
    /// Delay before the welcome message in milliseconds
    #[serde(default = "default_welcome_delay_ms")]
    pub welcome_delay_ms: u64,
    /// Face pattern of the welcome message
    #[serde(default = "default_welcome_pattern")]
    pub welcome_pattern: String,
    /// Extra font file (ttf/otf) for CJK text; egui's built-in fonts have no CJK glyphs
    #[serde(default)]
    pub font: Option<String>,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            char_delay_ms: default_char_delay_ms(),
            sound: default_sound(),
            welcome: default_welcome(),
            welcome_delay_ms: default_welcome_delay_ms(),
            welcome_pattern: default_welcome_pattern(),
            font: None,
        }
    }
}

impl DialogConfig {
    pub fn char_delay(&self) -> Duration {
        Duration::from_millis(self.char_delay_ms)
    }

    pub fn welcome_delay(&self) -> Duration {
        Duration::from_millis(self.welcome_delay_ms)
    }
}

fn default_char_delay_ms() -> u64 {
    50
}

fn default_sound() -> Option<String> {
    Some("typewriter.wav".to_string())
}

fn default_welcome() -> String {
    "Hello! I'm your desk pet.\nI can translate for you, remind you to save your files, and remember notes about your files and folders.".to_string()
}

fn default_welcome_delay_ms() -> u64 {
    100
}

fn default_welcome_pattern() -> String {
    "talking-a".to_string()
}

/// Periodic save reminder
#[derive(Debug, Clone, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_reminder_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_reminder_text")]
    pub text: String,
    #[serde(default = "default_reminder_pattern")]
    pub pattern: String,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_reminder_interval(),
            text: default_reminder_text(),
            pattern: default_reminder_pattern(),
        }
    }
}

impl ReminderConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

fn default_reminder_interval() -> u64 {
    // 1.5 hours
    5400
}

fn default_reminder_text() -> String {
    "Reminder: please save your work files!".to_string()
}

fn default_reminder_pattern() -> String {
    "talking-b".to_string()
}

/// Note store location
#[derive(Debug, Clone, Deserialize)]
pub struct NotesConfig {
    /// `.json` selects the JSON layout, anything else `key|note` lines
    #[serde(default = "default_notes_path")]
    pub path: String,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            path: default_notes_path(),
        }
    }
}

fn default_notes_path() -> String {
    "folder_notes.txt".to_string()
}

/// Translation service
#[derive(Debug, Clone, Deserialize)]
pub struct TranslationConfig {
    #[serde(default = "default_credentials_path")]
    pub credentials_path: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_test_timeout_secs")]
    pub test_timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            test_timeout_secs: default_test_timeout_secs(),
        }
    }
}

impl TranslationConfig {
    pub fn translator_config(&self) -> TranslatorConfig {
        TranslatorConfig {
            endpoint: self.endpoint.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            test_timeout: Duration::from_secs(self.test_timeout_secs),
        }
    }
}

fn default_credentials_path() -> String {
    "translation_config.json".to_string()
}

fn default_endpoint() -> String {
    pet_services::translate::DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_test_timeout_secs() -> u64 {
    5
}

/// Input prompt timing
#[derive(Debug, Clone, Deserialize)]
pub struct PromptConfig {
    /// Delay between a message and the prompt that follows it
    #[serde(default = "default_prompt_delay_ms")]
    pub delay_ms: u64,
    /// Delay before translation restarts after the API was configured
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_prompt_delay_ms(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl PromptConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn default_prompt_delay_ms() -> u64 {
    1000
}

fn default_retry_delay_ms() -> u64 {
    2000
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e.to_string()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load `path`, falling back to defaults when it is missing or broken
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                log::warn!(
                    "Using default configuration ({}: {})",
                    path.as_ref().display(),
                    e
                );
                Self::default()
            }
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.dialog.char_delay_ms, 50);
        assert_eq!(config.reminder.interval_secs, 5400);
        assert_eq!(config.prompt.delay(), Duration::from_millis(1000));
        assert_eq!(config.notes.path, "folder_notes.txt");
        assert_eq!(config.avatar.size, 80);
        assert_eq!(config.avatar.expression_files(), ExpressionFiles::default());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [window]
            title = "Moon"

            [reminder]
            interval_secs = 10
            pattern = "denying"

            [translation]
            timeout_secs = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.window.title, "Moon");
        assert_eq!(config.window.size, [320, 300]);
        assert_eq!(config.reminder.interval(), Duration::from_secs(10));
        assert!(config.reminder.enabled);
        assert_eq!(config.reminder.pattern, "denying");
        assert_eq!(config.dialog.welcome_pattern, "talking-a");

        let translator = config.translation.translator_config();
        assert_eq!(translator.timeout, Duration::from_secs(3));
        assert_eq!(translator.test_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::load(dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));

        let bad = dir.path().join("pet.toml");
        std::fs::write(&bad, "[window\nsize = 3").unwrap();
        assert!(matches!(Config::load(&bad), Err(ConfigError::Parse(_))));
        assert_eq!(Config::load_or_default(&bad).window.title, "Desk Pet");
    }
}
