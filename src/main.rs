mod api;
mod controller;
mod responder;

use anyhow::Context as _;
use atende_channels::BridgeClient;
use atende_core::config::{self, BotConfig, Config, SessionBackendKind};
use atende_core::error::AtendeError;
use atende_core::shellexpand;
use atende_notify::qr;
use atende_session::SessionStore;
use clap::{Parser, Subcommand};
use controller::{Controller, ControllerSettings};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "atende", version, about = "atende: WhatsApp auto-reply bot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot and its HTTP server.
    Start,
    /// Show the effective configuration and probe the session store.
    Status,
    /// Render a login code as a terminal QR.
    Qr {
        /// The code text to encode.
        text: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(&cli.config, bootstrap_subscriber())?;
    let _log_guard = init_tracing(&cfg.bot);

    match cli.command {
        Commands::Start => start(cfg).await?,
        Commands::Status => status(&cli.config, &cfg).await,
        Commands::Qr { text } => {
            print!("{}", qr::render_terminal(&text)?);
        }
    }

    Ok(())
}

/// Console subscriber used while the config (and its log level) is loading.
fn bootstrap_subscriber() -> impl tracing::Subscriber + Send + Sync {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish()
}

/// Load the config with `bootstrap` as the active subscriber, so load
/// messages (missing file, bad env overrides) are not dropped.
fn load_config<S>(path: &str, bootstrap: S) -> Result<Config, AtendeError>
where
    S: tracing::Subscriber + Send + Sync + 'static,
{
    tracing::subscriber::with_default(bootstrap, || config::load(path))
}

/// Console logging, plus a daily rolling file when `bot.log_to_file` is set.
/// The returned guard flushes the file writer on drop.
fn init_tracing(bot: &BotConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&bot.log_level));

    let (file_layer, guard) = if bot.log_to_file {
        let dir = format!("{}/logs", shellexpand(&bot.data_dir));
        if let Err(e) = std::fs::create_dir_all(&dir) {
            eprintln!("cannot create log dir {dir}: {e}");
        }
        let appender = tracing_appender::rolling::daily(&dir, "atende.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (
            Some(fmt::layer().with_writer(writer).with_ansi(false)),
            Some(guard),
        )
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

async fn open_store(cfg: &Config) -> anyhow::Result<SessionStore> {
    let backend = atende_session::open_backend(&cfg.session).await?;
    Ok(SessionStore::new(backend, &cfg.session.key))
}

/// Run the bot until Ctrl-C.
async fn start(cfg: Config) -> anyhow::Result<()> {
    cfg.validate()?;
    info!("starting {}", cfg.bot.name);

    let store = open_store(&cfg).await?;
    match store.ping().await {
        Ok(true) => info!(
            "session store '{}' reachable, using key '{}'",
            store.backend_name(),
            store.key()
        ),
        Ok(false) => info!(
            "session store '{}' reachable, table is empty (key '{}')",
            store.backend_name(),
            store.key()
        ),
        Err(e) => warn!("session store '{}' unreachable: {e}", store.backend_name()),
    }
    if cfg.session.seed_placeholder {
        if let Err(e) = store.seed_placeholder().await {
            warn!("failed to seed placeholder session: {e}");
        }
    }

    let notifier = atende_notify::build_notifier(&cfg.email);
    let client = Arc::new(BridgeClient::new(cfg.bridge.clone()));
    let controller = Arc::new(Controller::new(
        client,
        store,
        notifier,
        ControllerSettings {
            reply_delay: Duration::from_millis(cfg.bot.reply_delay_ms),
            clear_on_disconnect: cfg.session.clear_on_disconnect,
        },
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let api_cfg = cfg.api.clone();
    let api_state = controller.state();
    let api_shutdown = shutdown_rx.clone();
    let mut api_handle =
        tokio::spawn(async move { api::serve(&api_cfg, api_state, api_shutdown).await });

    let ctl = controller.clone();
    let ctl_handle = tokio::spawn(async move { ctl.run(shutdown_rx).await });

    let api_exit = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
            None
        }
        res = &mut api_handle => Some(res),
    };

    let _ = shutdown_tx.send(true);
    if let Err(e) = ctl_handle.await? {
        warn!("controller stopped with error: {e}");
    }

    let api_result = match api_exit {
        Some(res) => res?,
        None => api_handle.await?,
    };
    api_result.with_context(|| {
        format!("HTTP server failed on {}:{}", cfg.api.host, cfg.api.port)
    })?;

    info!("shutdown complete");
    Ok(())
}

/// Print the effective configuration and probe the session store.
async fn status(config_path: &str, cfg: &Config) {
    println!("atende status\n");
    println!("Config: {config_path}");
    println!("Bot: {}", cfg.bot.name);
    println!();

    let backend = match cfg.session.backend {
        SessionBackendKind::Supabase => "supabase",
        SessionBackendKind::Sqlite => "sqlite",
    };
    println!(
        "  session: {backend} (table '{}', key '{}')",
        cfg.session.table, cfg.session.key
    );
    let store_status = match cfg.validate() {
        Err(e) => format!("misconfigured: {e}"),
        Ok(()) => match open_store(cfg).await {
            Err(e) => format!("unavailable: {e}"),
            Ok(store) => match store.ping().await {
                Ok(true) => "reachable (session rows present)".to_string(),
                Ok(false) => "reachable (empty)".to_string(),
                Err(e) => format!("unreachable: {e}"),
            },
        },
    };
    println!("  store: {store_status}");

    println!(
        "  email: {}",
        if cfg.email.is_configured() {
            format!("enabled (to {})", cfg.email.to)
        } else {
            "disabled".to_string()
        }
    );

    let argv = BridgeClient::new(cfg.bridge.clone()).command_line();
    let script_state = match argv.get(1) {
        Some(script) if !std::path::Path::new(script).exists() => " [script not found]",
        _ => "",
    };
    println!("  bridge: {}{script_state}", argv.join(" "));
    println!("  http: {}:{}", cfg.api.host, cfg.api.port);
    println!("  reply delay: {} ms", cfg.bot.reply_delay_ms);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn capturing_subscriber(out: &Captured) -> impl tracing::Subscriber + Send + Sync {
        let out = out.clone();
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || out.clone())
            .finish()
    }

    #[test]
    fn test_load_config_messages_reach_subscriber() {
        let out = Captured::default();
        let path = std::env::temp_dir().join("atende-no-such-dir/config.toml");
        let cfg = load_config(path.to_str().unwrap(), capturing_subscriber(&out)).unwrap();

        assert_eq!(cfg.session.table, Config::default().session.table);
        let logs = out.text();
        assert!(logs.contains("Config file not found"), "logs: {logs}");
    }

    #[test]
    fn test_bad_port_override_is_logged() {
        let out = Captured::default();
        let mut cfg = Config::default();
        tracing::subscriber::with_default(capturing_subscriber(&out), || {
            config::apply_env_overrides(&mut cfg, |k| (k == "PORT").then(|| "http".to_string()));
        });

        assert_eq!(cfg.api.port, Config::default().api.port);
        let logs = out.text();
        assert!(logs.contains("ignoring invalid PORT value 'http'"), "logs: {logs}");
    }
}
