//! Localized message bundles
//!
//! Locale files are embedded at compile time and parsed once at startup;
//! the resulting [`Localizer`] is shared immutably across all handlers.
//! Lookup never fails: an unknown language or key falls back to the key
//! itself so the bot can always produce some user-visible text.

use serde_json::Error as JsonError;
use std::collections::HashMap;
use tracing::warn;

/// A supported interface language
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lang {
    /// English
    En,
    /// Russian
    Ru,
    /// Kazakh
    Kaz,
}

impl Lang {
    /// All supported languages, in keyboard order
    pub const ALL: [Self; 3] = [Self::En, Self::Ru, Self::Kaz];

    /// Language tag as used in config and locale bundles
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ru => "ru",
            Self::Kaz => "kaz",
        }
    }

    /// Native-script label shown on the language keyboard
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Ru => "Русский",
            Self::Kaz => "Қазақша",
        }
    }

    /// Callback payload carried by the language keyboard buttons
    #[must_use]
    pub const fn callback_data(self) -> &'static str {
        match self {
            Self::En => "lang_en",
            Self::Ru => "lang_ru",
            Self::Kaz => "lang_kaz",
        }
    }

    /// Parse a config-style tag ("en", "ru", "kaz")
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.tag() == tag)
    }

    /// Parse a language-selection callback payload ("lang_en", ...)
    #[must_use]
    pub fn from_callback_data(data: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.callback_data() == data)
    }
}

/// Read-only message catalog, one bundle per supported language
pub struct Localizer {
    bundles: HashMap<Lang, HashMap<String, String>>,
}

impl Localizer {
    /// Build the localizer from the embedded locale files
    ///
    /// # Errors
    ///
    /// Returns an error if an embedded locale file is not a flat JSON
    /// object of strings. This aborts startup, matching the treatment of
    /// invalid configuration.
    pub fn from_embedded() -> Result<Self, JsonError> {
        let mut bundles = HashMap::new();
        for (lang, raw) in [
            (Lang::En, include_str!("../locales/en.json")),
            (Lang::Ru, include_str!("../locales/ru.json")),
            (Lang::Kaz, include_str!("../locales/kaz.json")),
        ] {
            let bundle: HashMap<String, String> = serde_json::from_str(raw)?;
            bundles.insert(lang, bundle);
        }
        Ok(Self { bundles })
    }

    /// Look up `key` in the bundle for `lang`.
    ///
    /// Falls back to the key itself when the key is unknown, so this can
    /// never leave the caller without text to send.
    #[must_use]
    pub fn resolve(&self, lang: Lang, key: &str) -> String {
        if let Some(text) = self.bundles.get(&lang).and_then(|b| b.get(key)) {
            return text.clone();
        }
        warn!(lang = lang.tag(), key, "missing localization entry");
        key.to_string()
    }
}
