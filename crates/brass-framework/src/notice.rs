//! User-facing notices for denials, misses and failures.

use std::time::Duration;

use brass_core::Reply;

use crate::gate::Denial;
use crate::registry::Suggestion;
use crate::settings::BotSettings;

const DENIAL_FOOTER: &str = "If the problem persists please contact the administrator";
const COOLDOWN_FOOTER: &str = "Command cooldown is applied to prevent spam on the server.";
const ERROR_FOOTER: &str = "Please report this error to the administrator.";
const REDACTED_DETAIL: &str = "The error has been logged.";

/// Renders a duration in long form: `500 ms`, `1 second`, `4 seconds`, `2 minutes`.
///
/// Each unit is rounded to the nearest whole number and pluralized from 1.5
/// units upwards.
pub fn format_duration(duration: Duration) -> String {
    const SECOND: f64 = 1_000.0;
    const MINUTE: f64 = SECOND * 60.0;
    const HOUR: f64 = MINUTE * 60.0;
    const DAY: f64 = HOUR * 24.0;

    let ms = duration.as_secs_f64() * 1_000.0;
    let plural = |unit: f64, name: &str| {
        let count = (ms / unit).round();
        let suffix = if ms >= unit * 1.5 { "s" } else { "" };
        format!("{count} {name}{suffix}")
    };

    if ms >= DAY {
        plural(DAY, "day")
    } else if ms >= HOUR {
        plural(HOUR, "hour")
    } else if ms >= MINUTE {
        plural(MINUTE, "minute")
    } else if ms >= SECOND {
        plural(SECOND, "second")
    } else {
        format!("{} ms", ms.round())
    }
}

/// Builds notices from the configured theme.
#[derive(Debug, Clone, Copy)]
pub struct Notices<'a> {
    settings: &'a BotSettings,
}

impl<'a> Notices<'a> {
    pub fn new(settings: &'a BotSettings) -> Self {
        Self { settings }
    }

    /// Notice explaining a gate denial.
    pub fn denial(&self, denial: &Denial) -> Reply {
        let error_color = &self.settings.theme.colors.error;
        let base = Reply::new().color(error_color).footer(DENIAL_FOOTER);

        match denial {
            Denial::Unauthorized => base
                .title("🚫 Unauthorized Access")
                .description("This command is only available to bot owners."),
            Denial::TemporarilyDisabled => base
                .title("🔒 Command Temporarily Disabled")
                .description(
                    "This command is currently unavailable for maintenance or update. \
                     Please try again later.",
                ),
            Denial::BetaOnly => base
                .title("🔒 Beta Feature")
                .description("🚫 This command is only available to beta users!"),
            Denial::InsufficientUserPermission { missing } => base
                .title("🔐 Insufficient User Permission")
                .description(format!(
                    "You need `{missing}` authorization to use this command."
                )),
            Denial::InsufficientBotPermission { missing } => base
                .title(format!("{} Bot Permission Error", self.settings.theme.emojis.warning))
                .description(format!(
                    "I need `{missing}` authorization to run this command."
                )),
            Denial::RateLimited { remaining } => {
                let message = self
                    .settings
                    .dispatch
                    .cooldown_message
                    .replace("{time}", &format_duration(*remaining));
                Reply::new()
                    .color(&self.settings.theme.colors.red)
                    .title("⏳ Command Cooldown Active")
                    .description(message)
                    .footer(COOLDOWN_FOOTER)
            }
        }
    }

    /// Notice for a message command token that resolved to nothing.
    pub fn not_found(&self, token: &str, suggestion: Option<&Suggestion>) -> Reply {
        let prefix = &self.settings.prefix;
        let help = &self.settings.dispatch.help_command;
        let mut description = format!(
            "No command named `{token}` was found. Please check the command name or type \
             `{prefix}{help}` for help."
        );
        if let Some(suggestion) = suggestion {
            description.push_str(&format!("\nDid you mean `{prefix}{}`?", suggestion.name));
        }

        Reply::new()
            .color(&self.settings.theme.colors.red)
            .title("🚫 Command Not Found")
            .description(description)
    }

    /// Notice for a handler that failed or panicked.
    ///
    /// `detail` is only shown when `reveal` is set.
    pub fn execution_error(&self, detail: &str, reveal: bool) -> Reply {
        let shown = if reveal { detail } else { REDACTED_DETAIL };
        Reply::new()
            .color(&self.settings.theme.colors.error)
            .title(format!(
                "{} Command Execution Error",
                self.settings.theme.emojis.error
            ))
            .description("An unexpected error occurred while processing the command.")
            .field("Error Detail", shown, false)
            .footer(ERROR_FOOTER)
    }

    /// Notice for a failure outside any handler, such as a lost reply.
    pub fn system_error(&self) -> Reply {
        Reply::new()
            .color(&self.settings.theme.colors.red)
            .title(format!("{} System Error", self.settings.theme.emojis.error))
            .description(
                "A system error has occurred. Please try again later. \
                 If the problem persists, contact the administrator.",
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brass_core::CapabilitySet;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500 ms");
        assert_eq!(format_duration(Duration::from_millis(1_000)), "1 second");
        assert_eq!(format_duration(Duration::from_millis(1_400)), "1 second");
        assert_eq!(format_duration(Duration::from_millis(1_500)), "2 seconds");
        assert_eq!(format_duration(Duration::from_secs(4)), "4 seconds");
        assert_eq!(format_duration(Duration::from_secs(60)), "1 minute");
        assert_eq!(format_duration(Duration::from_secs(150)), "3 minutes");
        assert_eq!(format_duration(Duration::from_secs(7_200)), "2 hours");
        assert_eq!(format_duration(Duration::from_secs(86_400)), "1 day");
    }

    #[test]
    fn test_cooldown_notice_uses_template() {
        let settings = BotSettings::default();
        let reply = Notices::new(&settings).denial(&Denial::RateLimited {
            remaining: Duration::from_secs(4),
        });
        assert_eq!(reply.title.as_deref(), Some("⏳ Command Cooldown Active"));
        assert_eq!(
            reply.description.as_deref(),
            Some("Please wait 4 seconds before using this command again.")
        );
    }

    #[test]
    fn test_permission_notice_lists_missing() {
        let settings = BotSettings::default();
        let missing: CapabilitySet = ["BanMembers", "KickMembers"].into_iter().collect();
        let reply = Notices::new(&settings).denial(&Denial::InsufficientUserPermission { missing });
        assert_eq!(
            reply.description.as_deref(),
            Some("You need `BanMembers, KickMembers` authorization to use this command.")
        );
    }

    #[test]
    fn test_not_found_with_suggestion() {
        let settings = BotSettings::default();
        let suggestion = Suggestion {
            name: "ping".into(),
            score: 0.92,
        };
        let reply = Notices::new(&settings).not_found("png", Some(&suggestion));
        let description = reply.description.unwrap();
        assert!(description.contains("`png`"));
        assert!(description.contains("`!help`"));
        assert!(description.ends_with("Did you mean `!ping`?"));
    }

    #[test]
    fn test_execution_error_redaction() {
        let settings = BotSettings::default();
        let notices = Notices::new(&settings);

        let hidden = notices.execution_error("db password wrong", false);
        assert_eq!(hidden.fields[0].value, REDACTED_DETAIL);

        let shown = notices.execution_error("db password wrong", true);
        assert_eq!(shown.fields[0].value, "db password wrong");
    }
}
