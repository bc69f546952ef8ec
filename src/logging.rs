//! Logger construction.
//!
//! The hook never installs a process-wide logger. `stdout_logger` builds a
//! `log4rs::Logger` that `main` owns for the lifetime of the run and hands to
//! the manager as a `&dyn Log`; call sites write to it with
//! `log::info!(logger: logger, ...)`.
use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    Logger,
};

use crate::{defaults, error::OptError};

pub fn stdout_logger(level: LevelFilter) -> Result<Logger, OptError> {
    let stdout = ConsoleAppender::builder()
        .target(Target::Stdout)
        .encoder(Box::new(PatternEncoder::new(defaults::LOG_PATTERN)))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))
        .map_err(|err| OptError(format!("unable to build logger: {err}")))?;

    Ok(Logger::new(config))
}
