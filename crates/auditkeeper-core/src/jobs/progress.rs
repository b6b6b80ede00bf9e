/// Messages sent from a job thread to the UI thread via a
/// crossbeam channel.
use super::JobResult;
use std::time::Duration;

#[derive(Debug)]
pub enum JobProgress {
    /// The job thread picked the work up.
    Started { label: &'static str },
    /// The job ended; `result` carries the structured outcome.
    Finished {
        result: JobResult,
        duration: Duration,
    },
}
