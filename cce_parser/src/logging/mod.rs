//! Global logging for the compliance check engine
//!
//! Events are coded, carry key/value context, and are tagged with the device
//! whose run is executing on the current thread. Logging is a no-op until
//! `init_global_logging` is called.

pub mod codes;
pub mod config;
pub mod events;
pub mod macros;
pub mod service;

use std::cell::RefCell;
use std::sync::{Arc, OnceLock};

pub use codes::Code;
pub use events::{LogEvent, LogLevel};
pub use service::{FacadeLogger, Logger, LoggingService, MemoryLogger, StructuredLogger};

// ============================================================================
// GLOBAL STATE
// ============================================================================

static GLOBAL_LOGGER: OnceLock<Arc<LoggingService>> = OnceLock::new();

thread_local! {
    static DEVICE_CONTEXT: RefCell<Option<String>> = const { RefCell::new(None) };
}

// ============================================================================
// INITIALIZATION
// ============================================================================

pub fn init_global_logging() -> Result<(), String> {
    let logging_service = Arc::new(service::create_configured_service());

    GLOBAL_LOGGER
        .set(logging_service.clone())
        .map_err(|_| "Global logger already initialized".to_string())?;

    let event = LogEvent::success(
        codes::success::SYSTEM_INITIALIZATION_COMPLETED,
        "Global logging system initialized",
    )
    .with_context("config", &config::get_config_summary());
    logging_service.log_event(event);

    Ok(())
}

/// Initialize with a custom service (primarily for testing)
pub fn init_global_logging_with_service(service: Arc<LoggingService>) -> Result<(), String> {
    GLOBAL_LOGGER
        .set(service)
        .map_err(|_| "Global logger already initialized".to_string())
}

pub fn is_initialized() -> bool {
    GLOBAL_LOGGER.get().is_some()
}

pub fn try_get_global_logger() -> Option<&'static LoggingService> {
    GLOBAL_LOGGER.get().map(|service| service.as_ref())
}

// ============================================================================
// DEVICE CONTEXT MANAGEMENT
// ============================================================================

pub fn set_device_context(device_id: &str) {
    DEVICE_CONTEXT.with(|ctx| {
        *ctx.borrow_mut() = Some(device_id.to_string());
    });
}

pub fn clear_device_context() {
    DEVICE_CONTEXT.with(|ctx| {
        *ctx.borrow_mut() = None;
    });
}

pub fn get_current_device_context() -> Option<String> {
    DEVICE_CONTEXT.with(|ctx| ctx.borrow().clone())
}

/// Restores the previous device context when dropped
struct DeviceContextGuard {
    previous: Option<String>,
}

impl Drop for DeviceContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        DEVICE_CONTEXT.with(|ctx| {
            *ctx.borrow_mut() = previous;
        });
    }
}

/// Run `f` with every event on this thread tagged with `device_id`
pub fn with_device_context<F, R>(device_id: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = DeviceContextGuard {
        previous: get_current_device_context(),
    };
    set_device_context(device_id);
    f()
}

// ============================================================================
// MACRO SUPPORT FUNCTIONS
// ============================================================================

fn dispatch(mut event: LogEvent, context: Vec<(&str, &str)>) {
    let Some(logger) = try_get_global_logger() else {
        return;
    };
    if !logger.should_log(event.level) {
        return;
    }

    for (key, value) in context {
        event = event.with_context(key, value);
    }
    if let Some(device) = get_current_device_context() {
        event = event.with_context("device", &device);
    }

    logger.log_event(event);
}

/// Used by `log_error!`
pub fn log_error_with_context(code: Code, message: &str, context: Vec<(&str, &str)>) {
    dispatch(LogEvent::error(code, message), context);
}

/// Used by `log_warning!`
pub fn log_warning_with_context(code: Option<Code>, message: &str, context: Vec<(&str, &str)>) {
    let event = match code {
        Some(code) => LogEvent::warning_with_code(code, message),
        None => LogEvent::warning(message),
    };
    dispatch(event, context);
}

/// Used by `log_success!`
pub fn log_success_with_context(code: Code, message: &str, context: Vec<(&str, &str)>) {
    dispatch(LogEvent::success(code, message), context);
}

/// Used by `log_info!`
pub fn log_info_with_context(message: &str, context: Vec<(&str, &str)>) {
    dispatch(LogEvent::info(message), context);
}

/// Used by `log_debug!`
pub fn log_debug_with_context(message: &str, context: Vec<(&str, &str)>) {
    dispatch(LogEvent::debug(message), context);
}

/// Error logging that falls back to stderr when logging is not initialized
pub fn safe_log_error(code: Code, message: &str) {
    if let Some(logger) = try_get_global_logger() {
        logger.log_event(LogEvent::error(code, message));
    } else {
        eprintln!("[ERROR] FALLBACK: [{}] {}", code.as_str(), message);
    }
}
