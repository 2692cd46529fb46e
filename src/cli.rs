use chrono::NaiveDate;
use clap::Parser;
use clap::builder::styling::{AnsiColor, Effects, Styles};

fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .usage(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Yellow.on_default())
        .error(AnsiColor::Red.on_default().effects(Effects::BOLD))
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Red.on_default())
}

/// Lifecycle-aware fixture cache
///
/// Shows the fixtures of one date through the cache: past dates whose
/// fixtures have all concluded are served from disk across restarts, while
/// live and just-finished fixtures always go upstream.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(styles = get_styles())]
pub struct Args {
    /// Show fixtures for a specific date in YYYY-MM-DD format. Defaults to today.
    #[arg(long = "date", short = 'd', help_heading = "Fixtures")]
    pub date: Option<NaiveDate>,

    /// Show fixtures currently in progress. Never served from cache.
    #[arg(long = "live", help_heading = "Fixtures", conflicts_with = "date")]
    pub live: bool,

    /// Print cache statistics after the request
    #[arg(long = "stats", help_heading = "Cache")]
    pub stats: bool,

    /// Remove every persisted date bucket and exit
    #[arg(long = "purge-persistent", help_heading = "Cache")]
    pub purge_persistent: bool,

    /// List current configuration settings
    #[arg(long = "list-config", short = 'l', help_heading = "Configuration")]
    pub list_config: bool,

    /// Specify a custom log file path. If not provided, logs will be written to the default location.
    #[arg(long = "log-file", help_heading = "Debug")]
    pub log_file: Option<String>,

    /// Also write logs to stdout
    #[arg(long = "debug", help_heading = "Debug")]
    pub debug: bool,
}
