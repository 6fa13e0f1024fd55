use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Stop the reply that is currently streaming
    Stop,
    /// Show help
    Help,
    /// Exit the application
    Bye,
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Stop => "stop the reply that is streaming in",
            SlashCommand::Help => "show available commands and keys",
            SlashCommand::Bye => "exit TravelBot",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let head = input.trim().strip_prefix('/')?.split_whitespace().next()?;

    SlashCommand::from_str(head)
        .ok()
        .or_else(|| match head.to_lowercase().as_str() {
            "q" | "quit" | "exit" => Some(SlashCommand::Bye),
            "h" | "?" => Some(SlashCommand::Help),
            "cancel" => Some(SlashCommand::Stop),
            _ => None,
        })
}

/// Help text for commands and key bindings
pub fn get_help_text() -> String {
    let mut help = String::from("Commands:");
    for command in SlashCommand::iter() {
        help.push_str(&format!("  /{} {}", command.command(), command.description()));
    }
    help.push_str("  |  Keys: Enter send, Shift+Enter newline, F1-F4 quick actions, Esc stop, Ctrl+C quit");
    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands_and_aliases() {
        assert_eq!(parse_slash_command("/help"), Some(SlashCommand::Help));
        assert_eq!(parse_slash_command("  /bye  "), Some(SlashCommand::Bye));
        assert_eq!(parse_slash_command("/quit"), Some(SlashCommand::Bye));
        assert_eq!(parse_slash_command("/Q"), Some(SlashCommand::Bye));
        assert_eq!(parse_slash_command("/cancel"), Some(SlashCommand::Stop));
        assert_eq!(parse_slash_command("/stop now"), Some(SlashCommand::Stop));
    }

    #[test]
    fn plain_text_and_unknown_commands_are_not_commands() {
        assert_eq!(parse_slash_command("hello /help"), None);
        assert_eq!(parse_slash_command("/"), None);
        assert_eq!(parse_slash_command("/paris"), None);
    }

    #[test]
    fn help_lists_every_command() {
        let help = get_help_text();
        for command in SlashCommand::iter() {
            assert!(help.contains(&format!("/{}", command.command())));
        }
    }
}
