//! Standard output logger
use super::chunk::{ChunkLogger, ChunkSummary, Chunker, SummaryWriter};
use super::{ByTime, Id, LogError, Loggable, StatsLogger};
use crate::utils::fmt::PrettyPrint;
use std::fmt;
use std::time::Duration;
use yansi::Paint;

/// Logger that displays grouped summaries to standard output.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DisplayLogger<C: Chunker = ByTime>(ChunkLogger<C, DisplayBackend>);

impl<C: Chunker> DisplayLogger<C> {
    #[inline]
    pub fn new(chunker: C) -> Self {
        Self(ChunkLogger::new(chunker, DisplayBackend))
    }
}

impl<C: Chunker> StatsLogger for DisplayLogger<C> {
    #[inline]
    fn group_start(&mut self) {
        self.0.group_start()
    }
    #[inline]
    fn group_log(&mut self, id: Id, value: Loggable) -> Result<(), LogError> {
        self.0.group_log(id, value)
    }
    #[inline]
    fn group_end(&mut self) {
        self.0.group_end()
    }
    #[inline]
    fn flush(&mut self) {
        self.0.flush()
    }
}

/// Logging backend that displays summaries to standard output.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DisplayBackend;

impl SummaryWriter for DisplayBackend {
    fn write_summaries<'a, I>(&mut self, summaries: I, elapsed: Duration)
    where
        I: Iterator<Item = (&'a Id, &'a ChunkSummary)>,
    {
        println!(
            "{}",
            Paint::fixed(8, format!("-- {:.1}s", elapsed.as_secs_f64()))
        );
        for (id, summary) in summaries {
            println!("{:<32} {}", Paint::fixed(35, id), DisplaySummary(summary));
        }
    }
}

#[derive(Debug)]
struct DisplaySummary<'a>(&'a ChunkSummary);

impl<'a> fmt::Display for DisplaySummary<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            ChunkSummary::Nothing => Ok(()),
            ChunkSummary::Counter {
                increment,
                initial_value,
            } => write!(
                f,
                "{}  {}",
                initial_value + increment,
                Paint::fixed(253, format!("(+{})", increment))
            ),
            ChunkSummary::Scalar { stats } => {
                if let Some(mean) = stats.mean() {
                    write!(f, "{}", PrettyPrint(mean))?;
                }
                if stats.count() > 1 {
                    if let (Some(stddev), Some(min), Some(max)) =
                        (stats.stddev(), stats.min(), stats.max())
                    {
                        write!(
                            f,
                            " {}",
                            Paint::fixed(
                                8,
                                format!(
                                    "(σ {}, range [{}, {}])",
                                    PrettyPrint(stddev),
                                    PrettyPrint(min),
                                    PrettyPrint(max)
                                )
                            )
                        )?;
                    }
                }
                Ok(())
            }
        }
    }
}
