use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use games::models::callback::InlineKeyboard;
use games::models::chat_event::{ChatCommand, ChatEvent};
use games::models::game_session::now_ts;
use games::models::player::{ChatId, MessageId, Player, PlayerId};
use games::services::chat_transport::ChatTransport;
use games::services::errors::transport_errors::TransportError;

/// Id the console bot itself answers to. Challenging it is refused.
pub const BOT_ID: PlayerId = 0;

pub fn player(id: PlayerId) -> Player {
    if id == BOT_ID {
        Player::bot(id, "console_bot")
    } else {
        Player::new(id, &format!("user{}", id))
    }
}

fn parse_id(raw: Option<&str>, what: &str) -> Result<i64, String> {
    raw.ok_or_else(|| format!("missing {}", what))?
        .parse()
        .map_err(|_| format!("invalid {}", what))
}

/// Parses one input line.
///
/// `<chat> <user> <text>` is a message, `<chat> <user> /cmd [reply_to_user]`
/// a command and `<chat> <user> !cb <message_id> <data>` a button press.
/// Negative chat ids are groups. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ChatEvent>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let mut parts = line.splitn(3, ' ');
    let chat_id: ChatId = parse_id(parts.next(), "chat id")?;
    let sender = player(parse_id(parts.next(), "user id")?);
    let rest = parts.next().unwrap_or("").trim();

    if let Some(callback) = rest.strip_prefix("!cb ") {
        let mut fields = callback.split_whitespace();
        let message_id: MessageId = parse_id(fields.next(), "message id")?;
        let data = fields.next().ok_or("missing callback data")?.to_string();
        return Ok(Some(ChatEvent::Callback {
            chat_id,
            message_id,
            sender,
            data,
        }));
    }

    if rest.starts_with('/') {
        let mut fields = rest.split_whitespace();
        let command = ChatCommand::parse(fields.next().unwrap_or(""));
        let reply_to = match fields.next() {
            Some(raw) => Some(player(parse_id(Some(raw), "reply user id")?)),
            None => None,
        };
        return Ok(Some(ChatEvent::Command {
            chat_id,
            is_group: chat_id < 0,
            sender,
            command,
            reply_to,
        }));
    }

    Ok(Some(ChatEvent::Text {
        chat_id,
        sender,
        text: rest.to_string(),
        sent_at: now_ts(),
    }))
}

fn render_keyboard(keyboard: &InlineKeyboard) -> String {
    keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|button| format!("[{} | {}]", button.text, button.data))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Chat transport that prints to stdout.
pub struct ConsoleTransport {
    next_message_id: AtomicI64,
}

impl ConsoleTransport {
    pub fn new() -> Self {
        ConsoleTransport {
            next_message_id: AtomicI64::new(1),
        }
    }

    fn next_id(&self) -> MessageId {
        self.next_message_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for ConsoleTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for ConsoleTransport {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<MessageId, TransportError> {
        let message_id = self.next_id();
        println!("[chat {} #{}] {}", chat_id, message_id, text);
        if let Some(keyboard) = keyboard {
            println!("{}", render_keyboard(&keyboard));
        }
        Ok(message_id)
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: &str,
        caption: &str,
    ) -> Result<MessageId, TransportError> {
        let message_id = self.next_id();
        println!("[chat {} #{}] <photo {}> {}", chat_id, message_id, photo, caption);
        Ok(message_id)
    }

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), TransportError> {
        println!("[chat {} #{} edited] {}", chat_id, message_id, text);
        Ok(())
    }

    async fn clear_keyboard(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), TransportError> {
        println!("[chat {} #{}] buttons removed", chat_id, message_id);
        Ok(())
    }

    async fn reply_to_actor(
        &self,
        chat_id: ChatId,
        player_id: PlayerId,
        text: &str,
    ) -> Result<(), TransportError> {
        println!("[chat {} to user{}] {}", chat_id, player_id, text);
        Ok(())
    }

    async fn get_player(&self, player_id: PlayerId) -> Result<Player, TransportError> {
        if player_id < 0 {
            return Err(TransportError::NotFound(format!("user {}", player_id)));
        }
        Ok(player(player_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use games::models::callback::CallbackData;
    use games::models::game_session::GameKind;

    #[test]
    fn test_parse_command_with_reply_target() {
        let event = parse_line("-10 1 /duel 2").unwrap().unwrap();

        assert_eq!(
            event,
            ChatEvent::Command {
                chat_id: -10,
                is_group: true,
                sender: player(1),
                command: ChatCommand::StartDuel,
                reply_to: Some(player(2)),
            }
        );
    }

    #[test]
    fn test_parse_callback() {
        let event = parse_line("-10 2 !cb 7 accept:duel").unwrap().unwrap();

        match event {
            ChatEvent::Callback {
                message_id, data, ..
            } => {
                assert_eq!(message_id, 7);
                assert_eq!(data.parse::<CallbackData>(), Ok(CallbackData::Accept(GameKind::Duel)));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_parse_text_and_private_chat() {
        match parse_line("5 1 de bruyne").unwrap().unwrap() {
            ChatEvent::Text { chat_id, text, .. } => {
                assert_eq!(chat_id, 5);
                assert_eq!(text, "de bruyne");
            }
            other => panic!("unexpected event {:?}", other),
        }
        match parse_line("5 1 /ttt").unwrap().unwrap() {
            ChatEvent::Command { is_group, .. } => assert!(!is_group),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert!(parse_line("x 1 hi").is_err());
        assert!(parse_line("-1").is_err());
        assert!(parse_line("-1 1 !cb seven accept:duel").is_err());
        assert!(parse_line("-1 1 /ttt bob").is_err());
    }

    #[test]
    fn test_bot_id_is_a_bot() {
        assert!(player(BOT_ID).is_bot);
        assert!(!player(3).is_bot);
    }
}
