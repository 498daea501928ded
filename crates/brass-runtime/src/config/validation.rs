//! Configuration validation utilities.

use std::collections::HashSet;

use brass_framework::{BotSettings, DispatchOptions, Palette};

use super::error::{ConfigError, ConfigResult};
use super::schema::{BrassConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &BrassConfig) -> ConfigResult<()> {
    validate_bot_settings(&config.bot)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_bot_settings(bot: &BotSettings) -> ConfigResult<()> {
    if bot.prefix.is_empty() {
        return Err(ConfigError::missing_field("prefix"));
    }
    if bot.prefix.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation("Prefix cannot contain whitespace"));
    }

    validate_ids("owners", &bot.owners)?;
    validate_ids("beta", &bot.beta)?;
    validate_palette(&bot.theme.colors)?;
    validate_dispatch_options(&bot.dispatch)?;

    Ok(())
}

/// User id lists must not contain blanks or duplicates.
fn validate_ids(field: &str, ids: &[String]) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(ConfigError::validation(format!(
                "{field} contains an empty user id"
            )));
        }
        if !seen.insert(id) {
            return Err(ConfigError::validation(format!(
                "{field} contains duplicate user id {id}"
            )));
        }
    }
    Ok(())
}

fn validate_palette(palette: &Palette) -> ConfigResult<()> {
    for (key, value) in palette.entries() {
        if !is_hex_color(value) {
            return Err(ConfigError::InvalidColor {
                key: key.to_string(),
                value: value.to_string(),
            });
        }
    }
    Ok(())
}

fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

fn validate_dispatch_options(dispatch: &DispatchOptions) -> ConfigResult<()> {
    if !(0.0..=1.0).contains(&dispatch.suggestion_threshold) {
        return Err(ConfigError::validation(format!(
            "dispatch.suggestion_threshold must be within [0, 1], got {}",
            dispatch.suggestion_threshold
        )));
    }
    if dispatch.help_command.trim().is_empty() {
        return Err(ConfigError::missing_field("dispatch.help_command"));
    }
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    for target in logging.filters.keys() {
        if target.is_empty() || target.contains(char::is_whitespace) {
            return Err(ConfigError::validation(format!(
                "Invalid logging filter target: {target:?}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&BrassConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_prefix() {
        let mut config = BrassConfig::default();
        config.bot.prefix = String::new();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));

        config.bot.prefix = "hey bot".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_colors() {
        let mut config = BrassConfig::default();
        config.bot.theme.colors.gold = "gold".into();
        match validate_config(&config) {
            Err(ConfigError::InvalidColor { key, value }) => {
                assert_eq!(key, "gold");
                assert_eq!(value, "gold");
            }
            other => panic!("unexpected result {other:?}"),
        }

        assert!(is_hex_color("#FFD700"));
        assert!(!is_hex_color("#FFD70"));
        assert!(!is_hex_color("FFD700"));
    }

    #[test]
    fn test_validate_threshold_and_ids() {
        let mut config = BrassConfig::default();
        config.bot.dispatch.suggestion_threshold = 1.5;
        assert!(validate_config(&config).is_err());

        let mut config = BrassConfig::default();
        config.bot.owners = vec!["1".into(), "1".into()];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_file_output_requires_path() {
        let mut config = BrassConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some("logs/brass.log".into());
        assert!(validate_config(&config).is_ok());
    }
}
