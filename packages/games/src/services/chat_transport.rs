use async_trait::async_trait;

use crate::models::callback::InlineKeyboard;
use crate::models::player::{ChatId, MessageId, Player, PlayerId};
use crate::services::errors::transport_errors::TransportError;

#[cfg(test)]
use mockall::automock;

/// Outbound side of the chat platform.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<MessageId, TransportError>;

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: &str,
        caption: &str,
    ) -> Result<MessageId, TransportError>;

    /// Replaces the text of a message and drops its buttons.
    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), TransportError>;

    async fn clear_keyboard(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), TransportError>;

    /// Answer visible to a single player, such as a rejected move.
    async fn reply_to_actor(
        &self,
        chat_id: ChatId,
        player_id: PlayerId,
        text: &str,
    ) -> Result<(), TransportError>;

    async fn get_player(&self, player_id: PlayerId) -> Result<Player, TransportError>;
}
