//! Tensorboard logger
use super::chunk::{ChunkLogger, ChunkSummary, Chunker, SummaryWriter};
use super::{ByTime, Id, LogError, Loggable, StatsLogger};
use std::fmt::{self, Write};
use std::path::Path;
use std::time::Duration;
use tensorboard_rs::summary_writer::SummaryWriter as TbSummaryWriter;

/// Logger that saves grouped summaries to a tensorboard event file.
#[derive(Debug)]
pub struct TensorBoardLogger<C: Chunker = ByTime>(ChunkLogger<C, TensorBoardBackend>);

impl<C: Chunker> TensorBoardLogger<C> {
    #[inline]
    pub fn new<P: AsRef<Path>>(chunker: C, log_dir: P) -> Self {
        Self(ChunkLogger::new(chunker, TensorBoardBackend::new(log_dir)))
    }
}

impl<C: Chunker> StatsLogger for TensorBoardLogger<C> {
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

/// Logging backend that saves summaries to a tensorboard event file.
///
/// Each flushed chunk is one tensorboard step.
pub struct TensorBoardBackend {
    writer: TbSummaryWriter,
    step: usize,
}

impl fmt::Debug for TensorBoardBackend {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TensorBoardBackend")
            .field("step", &self.step)
            .finish()
    }
}

impl TensorBoardBackend {
    pub fn new<P: AsRef<Path>>(log_dir: P) -> Self {
        Self {
            writer: TbSummaryWriter::new(log_dir),
            step: 0,
        }
    }
}

impl SummaryWriter for TensorBoardBackend {
    fn write_summaries<'a, I>(&mut self, summaries: I, _elapsed: Duration)
    where
        I: Iterator<Item = (&'a Id, &'a ChunkSummary)>,
    {
        // Reused across summaries; the writer copies the tag anyways.
        let mut tag = String::new();
        for (id, summary) in summaries {
            tag.clear();
            if write!(tag, "{}", id).is_err() {
                continue;
            }
            #[allow(clippy::cast_possible_truncation)]
            match summary {
                ChunkSummary::Counter {
                    increment,
                    initial_value,
                } => self
                    .writer
                    .add_scalar(&tag, (initial_value + increment) as f32, self.step),
                ChunkSummary::Scalar { stats } => {
                    if let Some(mean) = stats.mean() {
                        self.writer.add_scalar(&tag, mean as f32, self.step);
                    }
                }
                ChunkSummary::Nothing => {}
            }
        }
        self.step += 1;
        self.writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::stats::OnlineStats;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_log_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("curiosity_tb_{}_{}", name, nanos))
    }

    /// Total size of the event files in `dir`.
    fn event_bytes(dir: &Path) -> u64 {
        fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().metadata().unwrap().len())
            .sum()
    }

    #[test]
    fn write_summaries_advances_step() {
        let dir = unique_log_dir("backend");
        fs::create_dir_all(&dir).unwrap();
        let mut backend = TensorBoardBackend::new(&dir);

        let counter_id = Id::from("steps");
        let scalar_id = Id::from("loss").with_prefix("icm");
        let nothing_id = Id::from("marker");
        let empty_id = Id::from("empty");
        let counter = ChunkSummary::Counter {
            increment: 3,
            initial_value: 2,
        };
        let scalar = ChunkSummary::Scalar {
            stats: [0.5, 1.5].into_iter().collect::<OnlineStats<f64>>(),
        };
        let nothing = ChunkSummary::Nothing;
        let empty = ChunkSummary::Scalar {
            stats: OnlineStats::new(),
        };
        let summaries = [
            (&counter_id, &counter),
            (&scalar_id, &scalar),
            (&nothing_id, &nothing),
            (&empty_id, &empty),
        ];

        backend.write_summaries(summaries.into_iter(), Duration::from_secs(1));
        assert_eq!(backend.step, 1);
        let written = event_bytes(&dir);
        assert!(written > 0);

        backend.write_summaries(summaries.into_iter(), Duration::from_secs(1));
        assert_eq!(backend.step, 2);
        assert!(event_bytes(&dir) > written);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn logger_flush_writes_event_file() {
        let dir = unique_log_dir("logger");
        fs::create_dir_all(&dir).unwrap();
        let mut logger = TensorBoardLogger::new(ByTime::new(Duration::from_secs(3600)), &dir);

        logger.log_scalar(Id::from("forward_loss"), 0.25).unwrap();
        logger.log_counter(Id::from("skipped_steps"), 1).unwrap();
        logger.log(Id::from("marker"), Loggable::Nothing).unwrap();
        logger.flush();

        assert_eq!(logger.0.writer().step, 1);
        assert!(event_bytes(&dir) > 0);

        fs::remove_dir_all(&dir).unwrap();
    }
}
