//! Logging training statistics
//!
//! Statistics are logged in groups by a [`StatsLogger`].
//! Values logged under the same [`Id`] are aggregated into summaries which are periodically
//! written to a backend such as standard output ([`DisplayLogger`]) or a tensorboard log
//! directory ([`TensorBoardLogger`]).
//!
//! Diagnostic messages go through the [`log`] facade instead.
mod chunk;
mod chunk_by_time;
mod display;
mod tensorboard;

pub use chunk::{ChunkLogger, ChunkSummary, Chunker, SummaryWriter};
pub use chunk_by_time::ByTime;
pub use display::{DisplayBackend, DisplayLogger};
pub use tensorboard::{TensorBoardBackend, TensorBoardLogger};

use smallvec::SmallVec;
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// Log statistics in groups of related values.
pub trait StatsLogger: Send {
    /// Start a new group of logs.
    fn group_start(&mut self);

    /// Log a value within the current group.
    fn group_log(&mut self, id: Id, value: Loggable) -> Result<(), LogError>;

    /// End the current group of logs.
    fn group_end(&mut self);

    /// Write out any pending summaries.
    fn flush(&mut self);

    /// Log a single value as its own group.
    fn log(&mut self, id: Id, value: Loggable) -> Result<(), LogError> {
        self.group_start();
        let result = self.group_log(id, value);
        self.group_end();
        result
    }

    /// Log a scalar value within the current group.
    fn log_scalar(&mut self, id: Id, value: f64) -> Result<(), LogError> {
        self.group_log(id, Loggable::Scalar(value))
    }

    /// Log a counter increment within the current group.
    fn log_counter(&mut self, id: Id, increment: u64) -> Result<(), LogError> {
        self.group_log(id, Loggable::CounterIncrement(increment))
    }
}

/// Logger that does nothing
impl StatsLogger for () {
    #[inline]
    fn group_start(&mut self) {}
    #[inline]
    fn group_log(&mut self, _: Id, _: Loggable) -> Result<(), LogError> {
        Ok(())
    }
    #[inline]
    fn group_end(&mut self) {}
    #[inline]
    fn flush(&mut self) {}
}

impl<T: StatsLogger + ?Sized> StatsLogger for Box<T> {
    #[inline]
    fn group_start(&mut self) {
        T::group_start(self)
    }
    #[inline]
    fn group_log(&mut self, id: Id, value: Loggable) -> Result<(), LogError> {
        T::group_log(self, id, value)
    }
    #[inline]
    fn group_end(&mut self) {
        T::group_end(self)
    }
    #[inline]
    fn flush(&mut self) {
        T::flush(self)
    }
}

/// Hierarchical identifier of a logged value, displayed as `namespace/.../name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id {
    namespace: SmallVec<[&'static str; 4]>,
    name: Cow<'static, str>,
}

impl Id {
    pub fn new<T: Into<Cow<'static, str>>>(name: T) -> Self {
        Self {
            namespace: SmallVec::new(),
            name: name.into(),
        }
    }

    /// Place this ID inside the given namespace.
    #[must_use]
    pub fn with_prefix(mut self, scope: &'static str) -> Self {
        self.namespace.insert(0, scope);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<&'static str> for Id {
    fn from(name: &'static str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Id {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for scope in &self.namespace {
            write!(f, "{}/", scope)?;
        }
        f.write_str(&self.name)
    }
}

/// A value that can be logged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Loggable {
    /// Nothing. No data to log.
    Nothing,
    /// A scalar value. Aggregated into mean, standard deviation, min, and max.
    Scalar(f64),
    /// An increment to a counter.
    CounterIncrement(u64),
}

impl Loggable {
    const fn variant_name(&self) -> &'static str {
        match self {
            Self::Nothing => "Nothing",
            Self::Scalar(_) => "Scalar",
            Self::CounterIncrement(_) => "CounterIncrement",
        }
    }
}

impl From<f64> for Loggable {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<f32> for Loggable {
    fn from(value: f32) -> Self {
        Self::Scalar(value.into())
    }
}

/// Error logging a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum LogError {
    #[error("\"{id}\": incompatible value type; previously {prev} but now {now}")]
    IncompatibleValue {
        id: Id,
        prev: &'static str,
        now: &'static str,
    },
}
