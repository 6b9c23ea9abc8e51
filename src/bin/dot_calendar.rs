use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, info, LevelFilter};
use simplelog::SimpleLogger;

use dot_calendar::app::App;
use dot_calendar::config::Config;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// TOML configuration, defaults apply when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// off, error, warn, info, debug or trace
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// When given, must match the configured token
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Weather calendar with the todo list
    Calendar {
        /// Pre-built event list instead of the configured calendar source
        #[arg(long)]
        calendar_json: Option<String>,
        #[arg(long, action)]
        dotsync: bool,
        #[arg(short, long, default_value = "dot_calendar.png")]
        output: PathBuf,
    },

    /// Temperature trend chart
    Chart {
        #[arg(long, default_value_t = 15)]
        days: u8,
        /// Leave yesterday out, the chart then starts today
        #[arg(long, action)]
        no_yesterday: bool,
        #[arg(short, long, default_value = "weather_chart.png")]
        output: PathBuf,
        #[arg(long, action)]
        dotsync: bool,
    },
}

fn write_png(path: &Path, png: &[u8]) -> dot_calendar::Result<()> {
    fs::write(path, png)?;
    info!("Wrote {} bytes to {}", png.len(), path.display());
    Ok(())
}

fn run(args: Args) -> dot_calendar::Result<()> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    }
    .with_env();

    let app = App::new(config);
    if args.token.is_some() {
        app.authorize(args.token.as_deref())?;
    }

    match args.command {
        Command::Calendar {
            calendar_json,
            dotsync,
            output,
        } => {
            let png = app.calendar_png(calendar_json.as_deref(), dotsync)?;
            write_png(&output, &png)
        }
        Command::Chart {
            days,
            no_yesterday,
            output,
            dotsync,
        } => {
            let png = app.chart_png(days, !no_yesterday, dotsync)?;
            write_png(&output, &png)
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = args.log_level.parse().unwrap_or(LevelFilter::Info);
    if let Err(e) = SimpleLogger::init(level, simplelog::Config::default()) {
        eprintln!("Cannot install logger: {e}");
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
