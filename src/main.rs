use dotenvy::dotenv;
use music_bot::bot::handlers::{self, Command};
use music_bot::config::Settings;
use music_bot::i18n::{Lang, Localizer};
use music_bot::provider::{MediaProvider, YtDlpProvider};
use music_bot::session::SessionStore;
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting the bot token from log output
struct RedactionPatterns {
    token_url: Regex,
    token_bare: Regex,
    token_bot: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token_url: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            token_bare: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            token_bot: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let mut output = input.to_string();
        output = self
            .token_url
            .replace_all(&output, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = self
            .token_bare
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .token_bot
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string();
        output
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // Return the original length to satisfy the contract even if the
        // redacted string length differs.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);
    init_logging(patterns);

    info!("Starting music bot...");

    let settings = init_settings();
    let localizer = init_localizer();
    let default_lang = init_default_lang(&settings);

    let store = Arc::new(SessionStore::new(
        default_lang,
        Duration::from_secs(settings.session_idle_ttl_secs),
        settings.session_max_capacity,
    ));
    let provider: Arc<dyn MediaProvider> = Arc::new(YtDlpProvider::new(&settings));
    info!(
        yt_dlp = %settings.yt_dlp_path,
        limit = settings.search_limit,
        "Media provider initialized."
    );

    let bot = Bot::new(settings.telegram_token.clone());
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![store, provider, localizer, settings])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_localizer() -> Arc<Localizer> {
    match Localizer::from_embedded() {
        Ok(l) => {
            info!("Locale bundles loaded.");
            Arc::new(l)
        }
        Err(e) => {
            error!("Failed to parse embedded locale bundles: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_default_lang(settings: &Settings) -> Lang {
    match Lang::from_tag(&settings.default_lang) {
        Some(lang) => lang,
        None => {
            error!(
                "Unsupported DEFAULT_LANG '{}' (expected en, ru or kaz)",
                settings.default_lang
            );
            std::process::exit(1);
        }
    }
}

// The dispatcher's default distribution function keys updates by chat id:
// updates of one chat are handled in order, distinct chats concurrently.
fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handle_callback))
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(
                    Update::filter_message()
                        .filter(|msg: Message| msg.text().is_some())
                        .endpoint(handle_text),
                ),
        )
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    store: Arc<SessionStore>,
    localizer: Arc<Localizer>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_command(bot, msg, cmd, store, localizer).await {
        error!("Command handler error: {e:#}");
    }
    respond(())
}

async fn handle_text(
    bot: Bot,
    msg: Message,
    store: Arc<SessionStore>,
    provider: Arc<dyn MediaProvider>,
    localizer: Arc<Localizer>,
    settings: Arc<Settings>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = Box::pin(handlers::handle_search_query(
        bot, msg, store, provider, localizer, settings,
    ))
    .await
    {
        error!("Search handler error: {e:#}");
    }
    respond(())
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    store: Arc<SessionStore>,
    provider: Arc<dyn MediaProvider>,
    localizer: Arc<Localizer>,
    settings: Arc<Settings>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = Box::pin(handlers::handle_callback(
        bot, q, store, provider, localizer, settings,
    ))
    .await
    {
        error!("Callback handler error: {e:#}");
    }
    respond(())
}
