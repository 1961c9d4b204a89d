//! Logging service and sinks
//!
//! Sinks forward to the `log` facade so the embedding binary picks the
//! backend (the CLI installs `env_logger`).

use super::codes::Code;
use super::config;
use super::events::{LogEvent, LogLevel};
use crate::config::compile_time::logging::MEMORY_LOG_BUFFER_SIZE;
use std::sync::{Arc, Mutex, MutexGuard};

const LOG_TARGET: &str = "cce";

pub trait Logger: Send + Sync {
    fn log(&self, event: &LogEvent);
}

/// Main logging service with a minimum level gate
pub struct LoggingService {
    logger: Arc<dyn Logger>,
    min_level: LogLevel,
}

impl LoggingService {
    pub fn new(logger: Arc<dyn Logger>, min_level: LogLevel) -> Self {
        Self { logger, min_level }
    }

    /// Service configured from runtime preferences
    pub fn with_config() -> Self {
        let min_level = config::get_min_log_level();
        let logger: Arc<dyn Logger> = if config::use_structured_logging() {
            Arc::new(StructuredLogger)
        } else {
            Arc::new(FacadeLogger)
        };

        Self::new(logger, min_level)
    }

    pub fn set_min_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    pub fn should_log(&self, level: LogLevel) -> bool {
        level <= self.min_level
    }

    pub fn log_event(&self, event: LogEvent) {
        if self.should_log(event.level) {
            self.logger.log(&event);
        }
    }

    pub fn log_error(&self, error_code: Code, message: &str) {
        self.log_event(LogEvent::error(error_code, message));
    }

    pub fn log_info(&self, message: &str) {
        self.log_event(LogEvent::info(message));
    }
}

/// Text events through the `log` facade
pub struct FacadeLogger;

impl Logger for FacadeLogger {
    fn log(&self, event: &LogEvent) {
        log::log!(target: LOG_TARGET, event.level.to_log_level(), "{}", event.format());
    }
}

/// JSON line events through the `log` facade
pub struct StructuredLogger;

impl Logger for StructuredLogger {
    fn log(&self, event: &LogEvent) {
        let line = event.format_json().unwrap_or_else(|_| event.format());
        log::log!(target: LOG_TARGET, event.level.to_log_level(), "{}", line);
    }
}

/// Memory logger for testing
pub struct MemoryLogger {
    events: Mutex<Vec<LogEvent>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get_events(&self) -> Vec<LogEvent> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn event_count(&self) -> usize {
        self.lock().len()
    }

    pub fn get_errors(&self) -> Vec<LogEvent> {
        self.lock().iter().filter(|e| e.is_error()).cloned().collect()
    }

    pub fn get_warnings(&self) -> Vec<LogEvent> {
        self.lock().iter().filter(|e| e.is_warning()).cloned().collect()
    }

    pub fn get_events_with_code(&self, code: Code) -> Vec<LogEvent> {
        self.lock()
            .iter()
            .filter(|e| e.code == code)
            .cloned()
            .collect()
    }

    /// Events emitted while the given device context was active
    pub fn get_events_for_device(&self, device: &str) -> Vec<LogEvent> {
        self.lock()
            .iter()
            .filter(|e| e.context_value("device") == Some(device))
            .cloned()
            .collect()
    }

    pub fn has_error_with_code(&self, code: Code) -> bool {
        self.lock().iter().any(|e| e.is_error() && e.code == code)
    }

    pub fn has_warning_with_code(&self, code: Code) -> bool {
        self.lock().iter().any(|e| e.is_warning() && e.code == code)
    }
}

impl Default for MemoryLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, event: &LogEvent) {
        let mut events = self.lock();
        if events.len() >= MEMORY_LOG_BUFFER_SIZE {
            let remove_count = events.len() - MEMORY_LOG_BUFFER_SIZE + 1;
            events.drain(0..remove_count);
        }
        events.push(event.clone());
    }
}

/// Service configured from runtime preferences
pub fn create_configured_service() -> LoggingService {
    LoggingService::with_config()
}
