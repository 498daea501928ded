//! Bot-level settings consumed by the dispatcher, gate and notices.
//!
//! These are plain serde structs with per-field defaults. The runtime embeds
//! [`BotSettings`] in its configuration file schema; tests usually build one
//! with `BotSettings::default()` and tweak fields.

use serde::{Deserialize, Serialize};

/// Settings that shape command dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// Literal prefix introducing a message command. Matched case-insensitively.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// User ids treated as elevated (bot owners).
    #[serde(default)]
    pub owners: Vec<String>,

    /// User ids allowed to run beta-only commands.
    #[serde(default)]
    pub beta: Vec<String>,

    #[serde(default)]
    pub theme: Theme,

    #[serde(default)]
    pub dispatch: DispatchOptions,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            owners: Vec::new(),
            beta: Vec::new(),
            theme: Theme::default(),
            dispatch: DispatchOptions::default(),
        }
    }
}

impl BotSettings {
    /// Returns `true` if `user_id` is an owner.
    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owners.iter().any(|owner| owner == user_id)
    }

    /// Returns `true` if `user_id` is on the beta allow-list.
    pub fn is_beta_tester(&self, user_id: &str) -> bool {
        self.beta.iter().any(|tester| tester == user_id)
    }
}

fn default_prefix() -> String {
    "!".to_string()
}

// =============================================================================
// Theme
// =============================================================================

/// Colors and emojis used when rendering notices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default)]
    pub colors: Palette,
    #[serde(default)]
    pub emojis: Emojis,
}

/// Named accent colors, as `#rrggbb`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Palette {
    #[serde(default = "default_purple")]
    pub purple: String,
    #[serde(default = "default_red")]
    pub red: String,
    #[serde(default = "default_blue")]
    pub blue: String,
    #[serde(default = "default_yellow")]
    pub yellow: String,
    #[serde(default = "default_green")]
    pub green: String,
    #[serde(default = "default_gold")]
    pub gold: String,
    #[serde(default = "default_aqua")]
    pub aqua: String,
    /// Accent for gate denials and execution errors.
    #[serde(default = "default_error")]
    pub error: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            purple: default_purple(),
            red: default_red(),
            blue: default_blue(),
            yellow: default_yellow(),
            green: default_green(),
            gold: default_gold(),
            aqua: default_aqua(),
            error: default_error(),
        }
    }
}

impl Palette {
    /// Iterates over `(name, value)` pairs, used by validation.
    pub fn entries(&self) -> [(&'static str, &str); 8] {
        [
            ("purple", self.purple.as_str()),
            ("red", self.red.as_str()),
            ("blue", self.blue.as_str()),
            ("yellow", self.yellow.as_str()),
            ("green", self.green.as_str()),
            ("gold", self.gold.as_str()),
            ("aqua", self.aqua.as_str()),
            ("error", self.error.as_str()),
        ]
    }
}

fn default_purple() -> String {
    "#9269ff".to_string()
}

fn default_red() -> String {
    "#ed4245".to_string()
}

fn default_blue() -> String {
    "#0a00ff".to_string()
}

fn default_yellow() -> String {
    "#fbff00".to_string()
}

fn default_green() -> String {
    "#00ff15".to_string()
}

fn default_gold() -> String {
    "#ffd700".to_string()
}

fn default_aqua() -> String {
    "#00ffff".to_string()
}

fn default_error() -> String {
    "#ff6b6b".to_string()
}

/// Emojis prefixed to status replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Emojis {
    #[serde(default = "default_success_emoji")]
    pub success: String,
    #[serde(default = "default_error_emoji")]
    pub error: String,
    #[serde(default = "default_warning_emoji")]
    pub warning: String,
}

impl Default for Emojis {
    fn default() -> Self {
        Self {
            success: default_success_emoji(),
            error: default_error_emoji(),
            warning: default_warning_emoji(),
        }
    }
}

fn default_success_emoji() -> String {
    "✅".to_string()
}

fn default_error_emoji() -> String {
    "❌".to_string()
}

fn default_warning_emoji() -> String {
    "⚠️".to_string()
}

// =============================================================================
// Dispatch options
// =============================================================================

/// Knobs for the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchOptions {
    /// Minimum similarity for a "did you mean" suggestion. `1.0` disables
    /// suggestions for anything but exact matches.
    #[serde(default = "default_suggestion_threshold")]
    pub suggestion_threshold: f64,

    /// Show raw handler error text to every user, not only owners.
    #[serde(default)]
    pub expose_error_details: bool,

    /// Cooldown notice template; `{time}` is replaced by the remaining time.
    #[serde(default = "default_cooldown_message")]
    pub cooldown_message: String,

    /// Command suggested in the "not found" notice.
    #[serde(default = "default_help_command")]
    pub help_command: String,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            suggestion_threshold: default_suggestion_threshold(),
            expose_error_details: false,
            cooldown_message: default_cooldown_message(),
            help_command: default_help_command(),
        }
    }
}

fn default_suggestion_threshold() -> f64 {
    0.85
}

fn default_cooldown_message() -> String {
    "Please wait {time} before using this command again.".to_string()
}

fn default_help_command() -> String {
    "help".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = BotSettings::default();
        assert_eq!(settings.prefix, "!");
        assert!(settings.owners.is_empty());
        assert_eq!(settings.theme.colors.purple, "#9269ff");
        assert_eq!(settings.theme.emojis.error, "❌");
        assert!(!settings.dispatch.expose_error_details);
    }

    #[test]
    fn test_partial_deserialize_fills_defaults() {
        let settings: BotSettings = serde_json::from_value(serde_json::json!({
            "prefix": "?",
            "owners": ["1"],
            "theme": { "colors": { "red": "#aa0000" } }
        }))
        .unwrap();
        assert_eq!(settings.prefix, "?");
        assert!(settings.is_owner("1"));
        assert!(!settings.is_beta_tester("1"));
        assert_eq!(settings.theme.colors.red, "#aa0000");
        assert_eq!(settings.theme.colors.blue, "#0a00ff");
        assert_eq!(settings.dispatch.suggestion_threshold, 0.85);
    }
}
