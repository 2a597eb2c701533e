//! Console logging backed by `log4rs`.
//!
//! Library code only emits records through the `log` macros. Nothing is printed until a caller
//! turns logging on with [`enable_logging`] or [`set_log_level`]; per-module levels can be
//! layered on top with [`set_module_filter`].

use crate::{error::EpiError, hashing::HashMap};
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Logger, Root},
    encode::pattern::PatternEncoder,
    Config, Handle,
};
use std::sync::{LazyLock, Mutex, MutexGuard};

pub use log::LevelFilter;

const APPENDER_NAME: &str = "stdout";
const PATTERN: &str = "{h({l})} {M} - {m}{n}";

#[derive(Default)]
struct LoggerState {
    handle: Option<Handle>,
    level: Option<LevelFilter>,
    module_filters: HashMap<String, LevelFilter>,
}

// The global logger is process-wide by nature; this only tracks how it was configured.
static LOGGER_STATE: LazyLock<Mutex<LoggerState>> =
    LazyLock::new(|| Mutex::new(LoggerState::default()));

fn logger_state() -> MutexGuard<'static, LoggerState> {
    match LOGGER_STATE.lock() {
        Ok(guard) => guard,
        // A panic while holding the lock cannot leave the state half-written.
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Enables logging at `Trace` level for every module.
pub fn enable_logging() -> Result<(), EpiError> {
    set_log_level(LevelFilter::Trace)
}

/// Turns logging off. Module filters are kept and apply again once logging is re-enabled.
pub fn disable_logging() -> Result<(), EpiError> {
    set_log_level(LevelFilter::Off)
}

/// Sets the root log level.
pub fn set_log_level(level: LevelFilter) -> Result<(), EpiError> {
    let mut state = logger_state();
    state.level = Some(level);
    apply(&mut state)
}

/// Sets the level for one module path (e.g. `"epinet_core::engine"`), overriding the root
/// level for that module and its children.
pub fn set_module_filter(module: &str, level: LevelFilter) -> Result<(), EpiError> {
    let mut state = logger_state();
    state.module_filters.insert(module.to_string(), level);
    apply(&mut state)
}

/// Removes a module override previously installed by [`set_module_filter`].
pub fn remove_module_filter(module: &str) -> Result<(), EpiError> {
    let mut state = logger_state();
    state.module_filters.remove(module);
    apply(&mut state)
}

fn build_config(level: LevelFilter, module_filters: &HashMap<String, LevelFilter>) -> Result<Config, EpiError> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();

    // Sorted so the produced configuration does not depend on map order.
    let mut modules: Vec<(&String, &LevelFilter)> = module_filters.iter().collect();
    modules.sort();

    let mut builder = Config::builder().appender(Appender::builder().build(APPENDER_NAME, Box::new(stdout)));
    for (module, module_level) in modules {
        builder = builder.logger(Logger::builder().build(module.as_str(), *module_level));
    }

    builder
        .build(Root::builder().appender(APPENDER_NAME).build(level))
        .map_err(|errors| EpiError::LoggingError(errors.to_string()))
}

fn apply(state: &mut LoggerState) -> Result<(), EpiError> {
    let level = state.level.unwrap_or(LevelFilter::Off);
    let config = build_config(level, &state.module_filters)?;

    match &state.handle {
        Some(handle) => handle.set_config(config),
        None => {
            let handle = log4rs::init_config(config)
                .map_err(|error| EpiError::LoggingError(error.to_string()))?;
            state.handle = Some(handle);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configs_build_with_module_filters() {
        let mut filters = HashMap::default();
        filters.insert("epinet_core::engine".to_string(), LevelFilter::Debug);
        filters.insert("epinet_core::graph".to_string(), LevelFilter::Warn);
        let config = build_config(LevelFilter::Info, &filters).unwrap();
        assert_eq!(config.root().level(), LevelFilter::Info);
        assert_eq!(config.loggers().len(), 2);
    }

    #[test]
    fn level_changes_are_recorded() {
        // Other tests in the same process may have installed a logger first, so only the
        // bookkeeping is checked here.
        let _ = set_log_level(LevelFilter::Warn);
        assert_eq!(logger_state().level, Some(LevelFilter::Warn));
        let _ = disable_logging();
        assert_eq!(logger_state().level, Some(LevelFilter::Off));
    }
}
