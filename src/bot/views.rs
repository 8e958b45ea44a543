//! Inline keyboard builders

use crate::i18n::Lang;
use crate::provider::Track;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Telegram caps callback button text; longer labels are cut client-side
/// anyway, so trim them ourselves at a char boundary.
const MAX_BUTTON_LABEL: usize = 64;

/// One-row keyboard offering every supported language
#[must_use]
pub fn language_keyboard() -> InlineKeyboardMarkup {
    let row = Lang::ALL
        .into_iter()
        .map(|lang| InlineKeyboardButton::callback(lang.label(), lang.callback_data()))
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(vec![row])
}

/// Vertical keyboard with one button per track, in source order.
///
/// The callback payload is the zero-based index into the result set.
#[must_use]
pub fn track_keyboard(tracks: &[Track]) -> InlineKeyboardMarkup {
    let rows = tracks
        .iter()
        .enumerate()
        .map(|(i, track)| {
            let label = truncate_label(&format!("{} ({})", track.title, track.artist));
            vec![InlineKeyboardButton::callback(label, i.to_string())]
        })
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(rows)
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() <= MAX_BUTTON_LABEL {
        return label.to_string();
    }
    let cut: String = label.chars().take(MAX_BUTTON_LABEL - 1).collect();
    format!("{cut}…")
}
