use std::fs::OpenOptions;
use std::path::Path;

use apkwatch_platform::AppPaths;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};

/// Where log records go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOptions {
    /// Append debug records to the log file.
    pub debug_enabled: bool,
    /// Mirror records to stderr.
    pub verbose: bool,
    pub max_log_size: u64,
}

impl LogOptions {
    fn max_level(self) -> LevelFilter {
        if self.debug_enabled {
            LevelFilter::Debug
        } else if self.verbose {
            LevelFilter::Info
        } else {
            LevelFilter::Off
        }
    }
}

/// Keep the newest lines of an oversized log, at most half of `max_log_size`
/// bytes, starting on a line boundary.
fn truncate_log_to_newest(log_path: &Path, max_log_size: u64) {
    let Ok(metadata) = std::fs::metadata(log_path) else {
        return;
    };
    if metadata.len() <= max_log_size {
        return;
    }
    let Ok(contents) = std::fs::read(log_path) else {
        return;
    };
    let budget = usize::try_from(max_log_size / 2).unwrap_or(usize::MAX);
    let cut = contents.len().saturating_sub(budget);
    let keep_from = contents[cut..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(contents.len(), |pos| cut + pos + 1);
    if let Err(error) = std::fs::write(log_path, &contents[keep_from..]) {
        eprintln!("apkwatch: could not truncate {}: {error}", log_path.display());
    }
}

fn build_loggers(
    paths: &AppPaths,
    options: LogOptions,
    config: &Config,
) -> Vec<Box<dyn SharedLogger>> {
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if options.verbose {
        loggers.push(TermLogger::new(
            options.max_level(),
            config.clone(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }
    if options.debug_enabled {
        let log_path = paths.log_file();
        truncate_log_to_newest(&log_path, options.max_log_size);
        match OpenOptions::new().create(true).append(true).open(&log_path) {
            Ok(file) => loggers.push(WriteLogger::new(LevelFilter::Debug, config.clone(), file)),
            Err(error) => eprintln!("apkwatch: cannot open {}: {error}", log_path.display()),
        }
    }
    loggers
}

pub fn init_logging(paths: &AppPaths, options: LogOptions) {
    if options.debug_enabled
        && let Err(error) = paths.ensure_dirs()
    {
        eprintln!("apkwatch: cannot create data directory: {error}");
    }

    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .add_filter_allow_str("apkwatch")
        .build();
    let loggers = build_loggers(paths, options, &config);
    if !loggers.is_empty() {
        let _ = CombinedLogger::init(loggers);
    }
    log::set_max_level(options.max_level());

    if options.debug_enabled {
        log::info!("Debug logging to {}", paths.log_file().display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(debug_enabled: bool, verbose: bool) -> LogOptions {
        LogOptions {
            debug_enabled,
            verbose,
            max_log_size: 1024,
        }
    }

    #[test]
    fn oversized_log_keeps_newest_whole_lines() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let log_path = temp_dir.path().join("debug.log");
        std::fs::write(&log_path, "line-1\nline-2\nline-3\nline-4\nline-5\n")
            .expect("test log file should be written");

        truncate_log_to_newest(&log_path, 20);

        let trimmed =
            std::fs::read_to_string(&log_path).expect("trimmed log file should be readable");
        assert_eq!(trimmed, "line-5\n");
    }

    #[test]
    fn small_log_is_left_alone() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let log_path = temp_dir.path().join("debug.log");
        std::fs::write(&log_path, "line-1\n").expect("test log file should be written");

        truncate_log_to_newest(&log_path, 1024);

        assert_eq!(
            std::fs::read_to_string(&log_path).expect("log file should be readable"),
            "line-1\n"
        );
    }

    #[test]
    fn level_follows_options() {
        assert_eq!(options(true, false).max_level(), LevelFilter::Debug);
        assert_eq!(options(true, true).max_level(), LevelFilter::Debug);
        assert_eq!(options(false, true).max_level(), LevelFilter::Info);
        assert_eq!(options(false, false).max_level(), LevelFilter::Off);
    }

    #[test]
    fn file_logger_only_when_debug_is_enabled() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let paths = AppPaths::rooted_at(temp_dir.path());
        paths.ensure_dirs().expect("dirs should be created");
        let config = Config::default();

        assert!(build_loggers(&paths, options(false, false), &config).is_empty());
        assert!(!paths.log_file().exists());

        assert_eq!(build_loggers(&paths, options(true, false), &config).len(), 1);
        assert!(paths.log_file().exists());
    }
}
