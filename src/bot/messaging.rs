//! Send/edit helpers that log transport failures
//!
//! There is no channel to report a failed send back to the user, so these
//! helpers log and swallow: a transport error is never retried and never
//! fatal to the handler.

use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId};
use tracing::warn;

/// Send a plain text message; on failure, log and return `None`
pub async fn send_text(bot: &Bot, chat_id: ChatId, text: String) -> Option<Message> {
    match bot.send_message(chat_id, text).await {
        Ok(msg) => Some(msg),
        Err(e) => {
            warn!(chat_id = chat_id.0, error = %e, "failed to send message");
            None
        }
    }
}

/// Edit an existing message's text; on failure, log and move on
pub async fn edit_text(bot: &Bot, chat_id: ChatId, message_id: MessageId, text: String) {
    if let Err(e) = bot.edit_message_text(chat_id, message_id, text).await {
        warn!(chat_id = chat_id.0, error = %e, "failed to edit message");
    }
}
