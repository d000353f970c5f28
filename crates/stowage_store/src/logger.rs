// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Injected structured logging for stores.

use std::{fmt::Debug, sync::LazyLock};

use tracing::{Dispatch, Subscriber};
use tracing_subscriber::fmt::time::ChronoLocal;

/// The timestamp prefix used by the default logger, e.g. `2024/01/23 01:23:23`.
pub const DATE_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

static DEFAULT_LOGGER: LazyLock<Logger> = LazyLock::new(Logger::stdout);

/// The logging destination of a store.
///
/// A `Logger` wraps a [`tracing::Dispatch`]. Stores emit their `tracing` events inside
/// [`Logger::in_scope`], so every store reports to the dispatcher it was built with,
/// independently of whatever global subscriber the process installs.
///
/// [`Logger::default()`] returns the process-wide default: a formatter writing to
/// standard output with a local date and time prefix ([`DATE_TIME_FORMAT`]). It is
/// created once, on first use, and never reconfigured.
///
/// # Examples
///
/// ```
/// use stowage_store::Logger;
///
/// // The process default, shared by every store that is not given a logger.
/// let logger = Logger::default();
///
/// // A logger that follows the subscriber active at this call site.
/// let ambient = Logger::current();
///
/// logger.in_scope(|| tracing::info!("written to stdout"));
/// # let _ = ambient;
/// ```
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
}

impl Logger {
    /// Creates a logger that reports to the given subscriber.
    #[must_use]
    pub fn new<S>(subscriber: S) -> Self
    where
        S: Subscriber + Send + Sync + 'static,
    {
        Self {
            dispatch: Dispatch::new(subscriber),
        }
    }

    /// Creates a logger bound to the dispatcher that is active on the calling thread.
    #[must_use]
    pub fn current() -> Self {
        tracing::dispatcher::get_default(|dispatch| Self {
            dispatch: dispatch.clone(),
        })
    }

    /// Runs `f` with this logger's dispatcher as the default.
    ///
    /// Every `tracing` event emitted inside `f` is delivered to this logger.
    pub fn in_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Returns the underlying dispatcher.
    #[must_use]
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    fn stdout() -> Self {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(std::io::stdout)
            .with_timer(ChronoLocal::new(DATE_TIME_FORMAT.to_owned()))
            .with_target(false)
            .finish();
        Self::new(subscriber)
    }
}

impl Default for Logger {
    fn default() -> Self {
        DEFAULT_LOGGER.clone()
    }
}

impl From<Dispatch> for Logger {
    fn from(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }
}

impl Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}
