mod gateway;

use clap::{Parser, Subcommand};
use nudge_channels::telegram::TelegramChannel;
use nudge_core::{
    config::{self, Config},
    error::NudgeError,
};
use nudge_memory::ReminderStore;
use nudge_parse::{split, DateTimeParser, Zone};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "nudge",
    version,
    about = "Nudge — chat reminders from plain Russian phrases"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot.
    Start,
    /// Show configuration and pending reminders.
    Status,
    /// Dry-run a message through the splitter and date parser.
    Parse {
        /// The message to parse.
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,
    },
}

/// Install the global subscriber: stdout always, plus a log file when asked.
///
/// `RUST_LOG` wins over `bot.log_level`. Keep the returned guard alive for
/// the life of the process or buffered file output is lost.
fn init_logging(cfg: &Config, to_file: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.bot.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = if to_file {
        let dir = cfg.log_dir();
        std::fs::create_dir_all(&dir)?;
        let appender = tracing_appender::rolling::never(&dir, "nudge.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Load configuration with `bootstrap` collecting its log output.
///
/// The real subscriber depends on the loaded config, so env and file
/// warnings emitted while loading need a subscriber of their own.
fn load_config<S>(path: &str, bootstrap: S) -> Result<Config, NudgeError>
where
    S: tracing::Subscriber + Send + Sync + 'static,
{
    tracing::subscriber::with_default(bootstrap, || config::load(path))
}

/// Stdout-only subscriber used until the configured one is installed.
fn bootstrap_subscriber() -> impl tracing::Subscriber + Send + Sync + 'static {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).finish()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(&cli.config, bootstrap_subscriber())?;

    match cli.command {
        Commands::Start => {
            let _guard = init_logging(&cfg, true)?;
            cfg.validate()?;

            let store = ReminderStore::open(cfg.state_path()).await?;
            let parser = DateTimeParser::for_timezone(&cfg.reminder.timezone);
            let telegram = Arc::new(TelegramChannel::new(
                cfg.telegram.clone(),
                cfg.reminder.topic_name.clone(),
            ));

            println!("Nudge — Starting bot...");
            let gw = gateway::Gateway::new(
                telegram.clone(),
                telegram,
                store,
                parser,
                cfg.reminder.lead_time(),
                cfg.scheduler.clone(),
            )?;
            Arc::new(gw).run().await?;
        }
        Commands::Status => {
            let _guard = init_logging(&cfg, false)?;
            println!("Nudge — Status Check\n");
            println!("Config: {}", cli.config);
            println!("Bot: {}", cfg.bot.name);
            println!("State file: {}", cfg.state_path().display());
            println!("Log dir: {}", cfg.log_dir().display());
            println!(
                "Timezone: {} (resolved: {})",
                cfg.reminder.timezone,
                Zone::resolve(&cfg.reminder.timezone).name()
            );
            println!("Lead time: {} min", cfg.reminder.lead_minutes);
            println!(
                "Scheduler: {}",
                if cfg.scheduler.enabled {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            println!(
                "  telegram: {}",
                if cfg.telegram.bot_token.is_empty() {
                    "missing bot_token"
                } else {
                    "configured"
                }
            );
            println!();

            match ReminderStore::open(cfg.state_path()).await {
                Ok(store) => println!("Pending reminders: {}", store.len().await),
                Err(e) => println!("State file unreadable: {e}"),
            }
        }
        Commands::Parse { text } => {
            let _guard = init_logging(&cfg, false)?;
            if text.is_empty() {
                anyhow::bail!("no text provided. Usage: nudge parse <text>");
            }

            // A literal "\n" separates lines.
            let text = text.join(" ").replace("\\n", "\n");
            let parts = split(&text)?;
            let parser = DateTimeParser::for_timezone(&cfg.reminder.timezone);
            let fire_at = parser.parse_now(&parts.fragment)?;

            println!("Action:   {}", parts.action);
            println!("Fragment: {}", parts.fragment);
            println!("Fires at: {}", fire_at.to_rfc3339());
        }
    }

    Ok(())
}
