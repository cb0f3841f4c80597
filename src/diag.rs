//! Diagnostics.
//!
//! Every diagnostic goes through a [`Log`], which records it and forwards it to [`tracing`]. The
//! record lets callers and tests inspect what a transformation reported.

crate::prelude!();

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Debug information.
    Debug,
    /// Progress information.
    Info,
    /// Something was ignored or approximated.
    Warn,
    /// Something failed, the output is incomplete.
    Error,
}
impl fmt::Display for Level {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warning",
            Self::Error => "error",
        };
        s.fmt(fmt)
    }
}

/// A recorded diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Severity.
    pub level: Level,
    /// Message.
    pub msg: String,
}
impl fmt::Display for Entry {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "[{}] {}", self.level, self.msg)
    }
}

/// Diagnostic sink.
#[derive(Debug, Clone, Default)]
pub struct Log {
    entries: Vec<Entry>,
}

impl Log {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic.
    pub fn log(&mut self, level: Level, msg: impl Into<String>) {
        let msg = msg.into();
        match level {
            Level::Debug => tracing::debug!("{}", msg),
            Level::Info => tracing::info!("{}", msg),
            Level::Warn => tracing::warn!("{}", msg),
            Level::Error => tracing::error!("{}", msg),
        }
        self.entries.push(Entry { level, msg })
    }
    /// Records a debug diagnostic.
    pub fn debug(&mut self, msg: impl Into<String>) {
        self.log(Level::Debug, msg)
    }
    /// Records an info diagnostic.
    pub fn info(&mut self, msg: impl Into<String>) {
        self.log(Level::Info, msg)
    }
    /// Records a warning.
    pub fn warn(&mut self, msg: impl Into<String>) {
        self.log(Level::Warn, msg)
    }
    /// Records an error.
    pub fn error(&mut self, msg: impl Into<String>) {
        self.log(Level::Error, msg)
    }
    /// Records an error and its causes, outermost first.
    pub fn exception(&mut self, err: &Error) {
        let mut msg = err.to_string();
        for cause in err.iter().skip(1) {
            msg.push_str("\n  caused by: ");
            msg.push_str(&cause.to_string());
        }
        self.error(msg)
    }

    /// Recorded diagnostics, in order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    /// Number of diagnostics of some level.
    pub fn count(&self, level: Level) -> usize {
        self.entries.iter().filter(|entry| entry.level == level).count()
    }
    /// Diagnostics of some level.
    pub fn at(&self, level: Level) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(move |entry| entry.level == level)
    }
}
