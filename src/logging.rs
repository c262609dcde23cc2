use std::fmt;

/// Request-scoped logging interface.
///
/// `RequestLog` is obtained from [`Context::log`](crate::Context::log) and is
/// lifetime-bound to the context it came from. Every event carries the
/// request id so a request's auth decisions can be followed across log
/// lines.
///
/// Credentials are redacted when logged because of their `Debug` and
/// `Display` implementations.
#[derive(Debug, Clone, Copy)]
pub struct RequestLog<'a> {
    request_id: &'a str,
}

impl<'a> RequestLog<'a> {
    /// Only `Context` creates loggers.
    pub(crate) fn new(request_id: &'a str) -> Self {
        Self { request_id }
    }

    /// Returns the request ID associated with this logger.
    pub fn request_id(&self) -> &str {
        self.request_id
    }

    /// Logs a trace-level message with request ID.
    pub fn trace(&self, args: fmt::Arguments<'_>) {
        tracing::trace!(request_id = %self.request_id, "{}", args);
    }

    /// Logs a debug-level message with request ID.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(request_id = %self.request_id, "{}", args);
    }

    /// Logs an info-level message with request ID.
    ///
    /// Use with `format_args!`:
    /// ```no_run
    /// # use route_auth::{Credential, RequestLog};
    /// # fn example(log: &RequestLog) {
    /// let password = Credential::from("hunter2");
    /// log.info(format_args!("submitted {:?}", password)); // logs [REDACTED]
    /// # }
    /// ```
    pub fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(request_id = %self.request_id, "{}", args);
    }

    /// Logs a warning-level message with request ID.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(request_id = %self.request_id, "{}", args);
    }

    /// Logs an error-level message with request ID.
    pub fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(request_id = %self.request_id, "{}", args);
    }
}
