//! Initialisation and configuration of the application's logging system.
//!
//! Logging goes to the terminal (colourised when supported) and optionally to a pair
//! of log files next to the analysis outputs. The level comes from the
//! `GEOLENS_LOG_LEVEL` environment variable, falling back to `settings.toml` and
//! then to the default.
use anyhow::{Result, bail};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Record};
use std::env;
use std::fmt::Arguments;
use std::fs::File;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::OnceLock;

/// A flag indicating whether the logger has been initialised
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The default log level for the program.
///
/// Used as a fallback if the user hasn't specified something else with the
/// `GEOLENS_LOG_LEVEL` environment variable or the settings.toml file.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// The file name for the log file recording ordinary operation
const LOG_INFO_FILE_NAME: &str = "geolens_info.log";

/// The file name for the log file recording warnings and errors
const LOG_ERROR_FILE_NAME: &str = "geolens_error.log";

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Parse a log level name into a `LevelFilter`
fn parse_log_level(name: &str) -> Result<LevelFilter> {
    Ok(match name.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        unknown => bail!("Unknown log level: {}", unknown),
    })
}

/// Initialise the program logger using the `fern` logging library.
///
/// The level precedence is `GEOLENS_LOG_LEVEL`, then `log_level_from_settings`, then
/// [`DEFAULT_LOG_LEVEL`]. Possible options are `off`, `error`, `warn`, `info`,
/// `debug` and `trace`.
///
/// # Arguments
///
/// * `log_level_from_settings`: The log level specified in `settings.toml`
/// * `log_file_path`: Where to save log files (if Some, log files will be created)
pub fn init(log_level_from_settings: Option<&str>, log_file_path: Option<&Path>) -> Result<()> {
    let log_level = env::var("GEOLENS_LOG_LEVEL").unwrap_or_else(|_| {
        log_level_from_settings
            .unwrap_or(DEFAULT_LOG_LEVEL)
            .to_string()
    });
    let log_level = parse_log_level(&log_level)?;

    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    let mut dispatch = Dispatch::new()
        .chain(terminal_dispatch(log_level, colours, false))
        .chain(terminal_dispatch(log_level, colours, true));

    if let Some(log_file_path) = log_file_path {
        let info_log = File::create(log_file_path.join(LOG_INFO_FILE_NAME))?;
        let error_log = File::create(log_file_path.join(LOG_ERROR_FILE_NAME))?;
        dispatch = dispatch
            .chain(
                Dispatch::new()
                    .filter(|metadata| metadata.level() > LevelFilter::Warn)
                    .format(write_log_plain)
                    .level(log_level.max(LevelFilter::Info))
                    .chain(info_log),
            )
            .chain(
                Dispatch::new()
                    .format(write_log_plain)
                    .level(LevelFilter::Warn)
                    .chain(error_log),
            );
    }

    dispatch.apply()?;
    let _ = LOGGER_INIT.set(());

    Ok(())
}

/// A dispatch for either stdout (non-error messages) or stderr (warnings and errors)
fn terminal_dispatch(log_level: LevelFilter, colours: ColoredLevelConfig, errors: bool) -> Dispatch {
    if errors {
        let use_colour = std::io::stderr().is_terminal();
        Dispatch::new()
            .format(move |out, message, record| {
                write_log_colour(out, message, record, use_colour, &colours);
            })
            .level(log_level.min(LevelFilter::Warn))
            .chain(std::io::stderr())
    } else {
        let use_colour = std::io::stdout().is_terminal();
        Dispatch::new()
            .filter(|metadata| metadata.level() > LevelFilter::Warn)
            .format(move |out, message, record| {
                write_log_colour(out, message, record, use_colour, &colours);
            })
            .level(log_level)
            .chain(std::io::stdout())
    }
}

/// Write to the log with no colours
fn write_log_plain(out: FormatCallback, message: &Arguments, record: &Record) {
    let timestamp = Local::now().format("%H:%M:%S");
    out.finish(format_args!(
        "[{timestamp} {} {}] {message}",
        record.level(),
        record.target()
    ));
}

/// Write to the log, colourising the level when the stream supports it
fn write_log_colour(
    out: FormatCallback,
    message: &Arguments,
    record: &Record,
    use_colour: bool,
    colours: &ColoredLevelConfig,
) {
    if use_colour {
        let timestamp = Local::now().format("%H:%M:%S");
        out.finish(format_args!(
            "[{timestamp} {} {}] {message}",
            colours.color(record.level()),
            record.target()
        ));
    } else {
        write_log_plain(out, message, record);
    }
}
