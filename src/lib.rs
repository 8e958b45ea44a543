//! Telegram bot that searches for music by free-text query and replies
//! with an audio file, shelling out to yt-dlp for search and download.

/// Telegram handlers, keyboards and messaging helpers
pub mod bot;
/// Configuration and settings management
pub mod config;
/// Localized message bundles
pub mod i18n;
/// Media search/download via the yt-dlp subprocess
pub mod provider;
/// Per-chat session state (language + last search results)
pub mod session;
