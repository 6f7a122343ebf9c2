use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;

use rayon::prelude::*;
use serde::Serialize;

use crate::config::RuleConfig;
use crate::error::BatchError;
use crate::result::{CheckResult, IssueCategory};

/// A result together with the path it came from.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CheckedFile {
    pub path: PathBuf,
    pub result: CheckResult,
}

#[derive(Clone, Debug)]
pub enum BatchEvent {
    /// A file is about to be checked; `completed` of `total` are done so far.
    Started {
        completed: usize,
        total: usize,
        path: PathBuf,
    },
    /// `current` files out of `total` are done; `path` is the latest one.
    Progress {
        current: usize,
        total: usize,
        path: PathBuf,
    },
    FileCompleted(CheckedFile),
    /// Sent once, only for batches that were not cancelled.
    Completed { results: Vec<CheckedFile> },
}

/// Receiver of batch events. Called from worker threads.
pub trait EventSink: Sync {
    fn emit(&self, event: BatchEvent) -> Result<(), BatchError>;
}

impl EventSink for mpsc::Sender<BatchEvent> {
    fn emit(&self, event: BatchEvent) -> Result<(), BatchError> {
        self.send(event).map_err(|_| BatchError::SinkClosed)
    }
}

/// Discards every event.
pub struct NoEvents;

impl EventSink for NoEvents {
    fn emit(&self, _event: BatchEvent) -> Result<(), BatchError> {
        Ok(())
    }
}

/// Cooperative cancellation flag, checked before each file starts.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug)]
pub struct BatchOutcome {
    /// Files that were checked, in input order.
    pub results: Vec<CheckedFile>,
    /// True when cancellation left some files unchecked.
    pub cancelled: bool,
}

/// Check `paths` in parallel against one fixed rule set.
///
/// Per-file failures never abort the batch; they are ordinary failed
/// results. The only batch-level error is a sink that stops accepting
/// events, after which no new files are started.
pub fn run_batch(
    paths: &[PathBuf],
    config: &RuleConfig,
    cancel: &CancelToken,
    sink: &dyn EventSink,
) -> Result<BatchOutcome, BatchError> {
    let total = paths.len();
    let completed = AtomicUsize::new(0);
    let sink_closed = AtomicBool::new(false);

    log::info!("starting batch of {total} file(s)");

    let checked: Vec<Option<CheckedFile>> = paths
        .par_iter()
        .map(|path| {
            if cancel.is_cancelled() || sink_closed.load(Ordering::SeqCst) {
                return None;
            }
            let started = sink.emit(BatchEvent::Started {
                completed: completed.load(Ordering::SeqCst),
                total,
                path: path.clone(),
            });
            if started.is_err() {
                sink_closed.store(true, Ordering::SeqCst);
                return None;
            }
            let file = CheckedFile {
                path: path.clone(),
                result: crate::check_file(path, config),
            };
            let current = completed.fetch_add(1, Ordering::SeqCst) + 1;
            let delivered = sink
                .emit(BatchEvent::FileCompleted(file.clone()))
                .and_then(|()| {
                    sink.emit(BatchEvent::Progress {
                        current,
                        total,
                        path: path.clone(),
                    })
                });
            if delivered.is_err() {
                sink_closed.store(true, Ordering::SeqCst);
            }
            Some(file)
        })
        .collect();

    if sink_closed.load(Ordering::SeqCst) {
        log::error!("batch aborted: event receiver closed");
        return Err(BatchError::SinkClosed);
    }

    let results: Vec<CheckedFile> = checked.into_iter().flatten().collect();
    let cancelled = results.len() < total;
    if cancelled {
        log::warn!("batch cancelled after {} of {total} file(s)", results.len());
    } else {
        sink.emit(BatchEvent::Completed {
            results: results.clone(),
        })?;
        log::info!("batch finished: {total} file(s)");
    }

    Ok(BatchOutcome { results, cancelled })
}

/// Counts over a set of results. Built by folding; order does not matter.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub issue_totals: BTreeMap<IssueCategory, usize>,
}

impl Default for BatchSummary {
    fn default() -> Self {
        BatchSummary {
            total: 0,
            passed: 0,
            failed: 0,
            issue_totals: IssueCategory::ALL.iter().map(|c| (*c, 0)).collect(),
        }
    }
}

impl BatchSummary {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a CheckResult>) -> Self {
        results
            .into_iter()
            .fold(BatchSummary::default(), |mut summary, result| {
                summary.add(result);
                summary
            })
    }

    pub fn add(&mut self, result: &CheckResult) {
        self.total += 1;
        if result.success {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        for (category, issues) in &result.issues {
            *self.issue_totals.entry(*category).or_insert(0) += issues.len();
        }
    }

    pub fn merge(mut self, other: BatchSummary) -> BatchSummary {
        self.total += other.total;
        self.passed += other.passed;
        self.failed += other.failed;
        for (category, count) in other.issue_totals {
            *self.issue_totals.entry(category).or_insert(0) += count;
        }
        self
    }

    pub fn issue_total(&self, category: IssueCategory) -> usize {
        self.issue_totals.get(&category).copied().unwrap_or(0)
    }

    pub fn total_issues(&self) -> usize {
        self.issue_totals.values().sum()
    }
}
