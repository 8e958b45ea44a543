//! Command, text and callback handlers
//!
//! The conversation flow per chat: free text is a search query, search
//! results come back as an inline keyboard whose callback payload is the
//! zero-based track index, and a selection downloads the track and sends
//! it as audio. Commands and language buttons sit on top of that.
//!
//! Malformed or stale selection payloads (non-numeric data, an index from
//! a superseded result set) are logged and dropped without any outbound
//! message: the user pressed an old button, answering would only be noise.
//! Provider failures, by contrast, are always surfaced as a localized
//! message.

use super::{messaging, views};
use crate::config::Settings;
use crate::i18n::{Lang, Localizer};
use crate::provider::{MediaProvider, ProviderError, TempArtifact};
use crate::session::SessionStore;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ChatId, InputFile};
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

/// Supported commands for the bot
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Greet and offer the language keyboard
    #[command(description = "Choose language.")]
    Start,
    /// Usage summary
    #[command(description = "Show help.")]
    Help,
    /// Explain how to search
    #[command(description = "How to search for music.")]
    Search,
}

/// Handle a recognized command.
///
/// Commands never touch the chat's result set.
///
/// # Errors
///
/// Returns an error if the reply could not be sent.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    store: Arc<SessionStore>,
    localizer: Arc<Localizer>,
) -> Result<()> {
    let chat_id = msg.chat.id;
    let lang = store.language(chat_id.0).await;

    match cmd {
        Command::Start => {
            bot.send_message(chat_id, localizer.resolve(lang, "start"))
                .reply_markup(views::language_keyboard())
                .await?;
        }
        Command::Help => {
            bot.send_message(chat_id, localizer.resolve(lang, "help"))
                .await?;
        }
        Command::Search => {
            bot.send_message(chat_id, localizer.resolve(lang, "search_prompt"))
                .await?;
        }
    }
    Ok(())
}

/// Handle free text as a search query.
///
/// Sends a "searching" placeholder, runs the provider off the dispatch
/// path, and either presents the result keyboard or turns the placeholder
/// into a localized error. A zero-result search leaves any previously
/// stored result set untouched.
///
/// # Errors
///
/// Returns an error if sending the result list fails.
pub async fn handle_search_query(
    bot: Bot,
    msg: Message,
    store: Arc<SessionStore>,
    provider: Arc<dyn MediaProvider>,
    localizer: Arc<Localizer>,
    settings: Arc<Settings>,
) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let query = text.trim();
    if query.is_empty() {
        return Ok(());
    }

    let chat_id = msg.chat.id;
    let lang = store.language(chat_id.0).await;
    info!(chat_id = chat_id.0, query, "search query received");

    let placeholder =
        messaging::send_text(&bot, chat_id, localizer.resolve(lang, "searching")).await;

    let tracks = match provider.search(query).await {
        Ok(tracks) => tracks,
        Err(e) => {
            warn!(chat_id = chat_id.0, error = %e, "search failed");
            let text = provider_error_text(&localizer, lang, "search_error", &e);
            edit_or_send(&bot, chat_id, placeholder.as_ref(), text).await;
            return Ok(());
        }
    };

    if tracks.is_empty() {
        let text = localizer.resolve(lang, "no_tracks");
        edit_or_send(&bot, chat_id, placeholder.as_ref(), text).await;
        return Ok(());
    }

    info!(chat_id = chat_id.0, count = tracks.len(), "tracks found");
    store.set_results(chat_id.0, tracks.clone()).await;

    let keyboard = views::track_keyboard(&tracks);
    let caption = localizer.resolve(lang, "tracks_found");
    if let Some(banner) = &settings.banner_path {
        bot.send_photo(chat_id, InputFile::file(PathBuf::from(banner)))
            .caption(caption)
            .reply_markup(keyboard)
            .await?;
    } else {
        bot.send_message(chat_id, caption)
            .reply_markup(keyboard)
            .await?;
    }
    Ok(())
}

/// Handle an inline keyboard press: either a language pick or a track
/// selection.
///
/// # Errors
///
/// Returns an error if sending the "downloading" placeholder fails before
/// any download work has started.
pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    store: Arc<SessionStore>,
    provider: Arc<dyn MediaProvider>,
    localizer: Arc<Localizer>,
    settings: Arc<Settings>,
) -> Result<()> {
    let Some(data) = q.data.clone() else {
        return Ok(());
    };
    let Some(chat_id) = q.message.as_ref().map(|m| m.chat().id) else {
        return Ok(());
    };

    if let Some(lang) = Lang::from_callback_data(&data) {
        store.set_language(chat_id.0, lang).await;
        info!(chat_id = chat_id.0, lang = lang.tag(), "language selected");
        messaging::send_text(&bot, chat_id, localizer.resolve(lang, "language_set")).await;
        messaging::send_text(&bot, chat_id, localizer.resolve(lang, "search_instruction")).await;
        return Ok(());
    }

    let lang = store.language(chat_id.0).await;
    let Some(index) = parse_selection(&data) else {
        warn!(chat_id = chat_id.0, payload = %data, "dropping non-numeric callback payload");
        return Ok(());
    };
    let Some(track) = store.track_at(chat_id.0, index).await else {
        warn!(chat_id = chat_id.0, index, "dropping stale or out-of-range selection");
        return Ok(());
    };

    info!(chat_id = chat_id.0, track_id = %track.id, "track selected");
    let placeholder =
        messaging::send_text(&bot, chat_id, localizer.resolve(lang, "downloading")).await;

    // Removed on drop whatever happens below
    let artifact = TempArtifact::for_track(chat_id.0, &track.id);

    if let Err(e) = provider.materialize(&track, artifact.path()).await {
        warn!(chat_id = chat_id.0, track_id = %track.id, error = %e, "download failed");
        let text = provider_error_text(&localizer, lang, "download_error", &e);
        edit_or_send(&bot, chat_id, placeholder.as_ref(), text).await;
        return Ok(());
    }

    let mut send = bot
        .send_audio(chat_id, InputFile::file(artifact.path().to_path_buf()))
        .title(track.title.clone())
        .performer(track.artist.clone());
    if let Some(thumb) = &settings.thumbnail_path {
        send = send.thumbnail(InputFile::file(PathBuf::from(thumb)));
    }

    match send.await {
        Ok(_) => {
            let text = localizer.resolve(lang, "audio_delivered");
            edit_or_send(&bot, chat_id, placeholder.as_ref(), text).await;
        }
        Err(e) => {
            error!(chat_id = chat_id.0, track_id = %track.id, error = %e, "failed to send audio");
            let text = format!("{}: {e}", localizer.resolve(lang, "send_audio_error"));
            edit_or_send(&bot, chat_id, placeholder.as_ref(), text).await;
        }
    }

    if let Err(e) = bot
        .answer_callback_query(q.id.clone())
        .text(localizer.resolve(lang, "processing_complete"))
        .await
    {
        warn!(chat_id = chat_id.0, error = %e, "failed to answer callback query");
    }

    Ok(())
}

/// Parse a track-selection payload as a zero-based index.
///
/// Anything that is not a plain non-negative integer is rejected.
#[must_use]
pub fn parse_selection(data: &str) -> Option<usize> {
    data.parse::<usize>().ok()
}

/// Localized text for a provider failure; timeouts get their own message
fn provider_error_text(
    localizer: &Localizer,
    lang: Lang,
    key: &str,
    error: &ProviderError,
) -> String {
    if error.is_timeout() {
        localizer.resolve(lang, "provider_timeout")
    } else {
        format!("{}: {error}", localizer.resolve(lang, key))
    }
}

/// Edit the placeholder when we have one, otherwise fall back to a fresh
/// message (the placeholder send itself may have failed)
async fn edit_or_send(bot: &Bot, chat_id: ChatId, placeholder: Option<&Message>, text: String) {
    match placeholder {
        Some(msg) => messaging::edit_text(bot, chat_id, msg.id, text).await,
        None => {
            messaging::send_text(bot, chat_id, text).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_payloads_parse_strictly() {
        assert_eq!(parse_selection("0"), Some(0));
        assert_eq!(parse_selection("17"), Some(17));
        assert_eq!(parse_selection("abc"), None);
        assert_eq!(parse_selection("-1"), None);
        assert_eq!(parse_selection("1.5"), None);
        assert_eq!(parse_selection(""), None);
        assert_eq!(parse_selection("1 "), None);
    }

    #[test]
    fn commands_parse_from_text() {
        assert!(matches!(
            Command::parse("/start", "musicbot"),
            Ok(Command::Start)
        ));
        assert!(matches!(
            Command::parse("/help", "musicbot"),
            Ok(Command::Help)
        ));
        assert!(matches!(
            Command::parse("/search", "musicbot"),
            Ok(Command::Search)
        ));
        assert!(Command::parse("daft punk one more time", "musicbot").is_err());
    }
}
