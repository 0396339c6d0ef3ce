//! Command structs

use teloxide::utils::command::BotCommands;

/// Commands any customer can send. Registered in the Telegram menu on
/// startup.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Các lệnh hỗ trợ:")]
pub enum UserCommand {
    #[command(description = "Mở menu chính.")]
    Start,
    #[command(description = "Hiển thị hướng dẫn.")]
    Help,
}

impl UserCommand {
    /// Parses the command word only, so deep-link payloads such as
    /// `/start promo` still open the menu.
    pub fn parse_text(text: &str, bot_username: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        if !word.starts_with('/') {
            return None;
        }
        <Self as BotCommands>::parse(word, bot_username).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_with_payload_is_start() {
        assert_eq!(
            UserCommand::parse_text("/start promo", "shopbot"),
            Some(UserCommand::Start)
        );
    }

    #[test]
    fn addressed_command_is_parsed() {
        assert_eq!(
            UserCommand::parse_text("/help@shopbot", "shopbot"),
            Some(UserCommand::Help)
        );
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(UserCommand::parse_text("start", "shopbot"), None);
        assert_eq!(UserCommand::parse_text("/unknown", "shopbot"), None);
        assert_eq!(UserCommand::parse_text("   ", "shopbot"), None);
    }
}
