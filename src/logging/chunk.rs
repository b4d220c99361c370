use super::{Id, LogError, Loggable, StatsLogger};
use crate::utils::stats::OnlineStats;
use std::collections::BTreeMap;
use std::ops::Drop;
use std::time::{Duration, Instant};

/// Decide when aggregated summaries are written out.
pub trait Chunker: Send {
    /// Start a new log group and decide whether to flush first.
    #[inline]
    fn flush_group_start(&mut self) -> bool {
        false
    }
    /// End the current group and decide whether to flush.
    #[inline]
    fn flush_group_end(&mut self) -> bool {
        false
    }
    /// Indicate that the current chunk has been flushed.
    fn note_flush(&mut self);
}

/// Write out summaries to a backend.
pub trait SummaryWriter: Send {
    fn write_summaries<'a, I>(&mut self, summaries: I, elapsed: Duration)
    where
        I: Iterator<Item = (&'a Id, &'a ChunkSummary)>;
}

/// Summarizes logged values over chunks of time (or groups) and writes each chunk summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkLogger<C: Chunker, W: SummaryWriter> {
    chunker: C,
    writer: W,

    // Sorted so that summaries are written in a stable order
    summaries: BTreeMap<Id, Node>,

    chunk_start: Instant,
}

impl<C: Chunker, W: SummaryWriter> ChunkLogger<C, W> {
    pub fn new(chunker: C, writer: W) -> Self {
        Self {
            chunker,
            writer,
            summaries: BTreeMap::new(),
            chunk_start: Instant::now(),
        }
    }

    /// The summary backend.
    pub const fn writer(&self) -> &W {
        &self.writer
    }
}

impl<C: Chunker + Default, W: SummaryWriter + Default> Default for ChunkLogger<C, W> {
    fn default() -> Self {
        Self::new(C::default(), W::default())
    }
}

impl<C: Chunker, W: SummaryWriter> StatsLogger for ChunkLogger<C, W> {
    fn group_start(&mut self) {
        if self.chunker.flush_group_start() {
            self.flush();
        }
    }

    fn group_log(&mut self, id: Id, value: Loggable) -> Result<(), LogError> {
        if let Some(node) = self.summaries.get_mut(&id) {
            node.push(value)
                .map_err(|prev| LogError::IncompatibleValue {
                    id,
                    prev,
                    now: value.variant_name(),
                })
        } else {
            self.summaries.insert(id, Node::new(value.into()));
            Ok(())
        }
    }

    fn group_end(&mut self) {
        if self.chunker.flush_group_end() {
            self.flush()
        }
    }

    fn flush(&mut self) {
        self.writer.write_summaries(
            self.summaries
                .iter()
                .filter(|(_, node)| node.dirty)
                .map(|(id, node)| (id, &node.summary)),
            self.chunk_start.elapsed(),
        );

        for node in self.summaries.values_mut() {
            node.reset();
        }
        self.chunk_start = Instant::now();
        self.chunker.note_flush();
    }
}

/// Flush when dropped
impl<C: Chunker, W: SummaryWriter> Drop for ChunkLogger<C, W> {
    fn drop(&mut self) {
        self.flush();
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Node {
    summary: ChunkSummary,
    /// Whether the summary has been updated in this chunk
    dirty: bool,
}

impl Node {
    const fn new(summary: ChunkSummary) -> Self {
        Self {
            summary,
            dirty: true,
        }
    }

    fn push(&mut self, value: Loggable) -> Result<(), &'static str> {
        self.summary.push(value)?;
        self.dirty = true;
        Ok(())
    }

    fn reset(&mut self) {
        self.dirty = false;
        self.summary.reset()
    }
}

/// Summary of the values logged under one ID within a chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkSummary {
    Nothing,
    Counter {
        /// Total increment within this chunk
        increment: u64,
        /// Counter value at the start of this chunk
        initial_value: u64,
    },
    Scalar {
        stats: OnlineStats<f64>,
    },
}

impl From<Loggable> for ChunkSummary {
    fn from(value: Loggable) -> Self {
        match value {
            Loggable::Nothing => Self::Nothing,
            Loggable::CounterIncrement(increment) => Self::Counter {
                increment,
                initial_value: 0,
            },
            Loggable::Scalar(v) => Self::Scalar {
                stats: [v].into_iter().collect(),
            },
        }
    }
}

impl ChunkSummary {
    /// Add a value to the summary.
    ///
    /// On a variant mismatch the value is not inserted and
    /// the name of the variant this summary was created from is returned.
    fn push(&mut self, value: Loggable) -> Result<(), &'static str> {
        match (self, value) {
            (Self::Nothing, Loggable::Nothing) => {}
            (Self::Counter { increment, .. }, Loggable::CounterIncrement(i)) => *increment += i,
            (Self::Scalar { stats }, Loggable::Scalar(v)) => stats.push(v),
            (summary, _) => return Err(summary.loggable_variant_name()),
        }
        Ok(())
    }

    /// Reset for the start of the next chunk.
    fn reset(&mut self) {
        match self {
            Self::Nothing => {}
            Self::Counter {
                increment,
                initial_value,
            } => {
                *initial_value += *increment;
                *increment = 0
            }
            Self::Scalar { stats } => *stats = OnlineStats::new(),
        }
    }

    const fn loggable_variant_name(&self) -> &'static str {
        match self {
            Self::Nothing => "Nothing",
            Self::Counter { .. } => "CounterIncrement",
            Self::Scalar { .. } => "Scalar",
        }
    }
}
