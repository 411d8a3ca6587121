// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run stages and progress reporting

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Linear stages of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Load,
    GridCompute,
    PerCellAssembly,
    Aggregate,
    Render,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PipelineStage::Load => "load",
            PipelineStage::GridCompute => "grid",
            PipelineStage::PerCellAssembly => "assembly",
            PipelineStage::Aggregate => "aggregate",
            PipelineStage::Render => "render",
            PipelineStage::Done => "done",
        })
    }
}

/// One progress notification; any field may be absent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub status: Option<String>,
    pub percent: Option<u8>,
    pub piece_event: Option<String>,
}

/// Receives progress updates; may be called from worker threads
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, update: ProgressUpdate);
}

impl<F> ProgressObserver for F
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn on_progress(&self, update: ProgressUpdate) {
        self(update)
    }
}

/// Forwards updates to an optional observer, never letting percent go back
pub(crate) struct ProgressReporter<'a> {
    observer: Option<&'a dyn ProgressObserver>,
    high_water: AtomicU8,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(observer: Option<&'a dyn ProgressObserver>) -> Self {
        Self {
            observer,
            high_water: AtomicU8::new(0),
        }
    }

    pub(crate) fn status(&self, stage: PipelineStage, percent: u8, status: impl Into<String>) {
        let status = status.into();
        tracing::info!(%stage, percent, "{}", status);
        self.send(ProgressUpdate {
            status: Some(status),
            percent: Some(percent),
            piece_event: None,
        });
    }

    pub(crate) fn piece(&self, percent: u8, event: impl Into<String>) {
        self.send(ProgressUpdate {
            status: None,
            percent: Some(percent),
            piece_event: Some(event.into()),
        });
    }

    fn send(&self, mut update: ProgressUpdate) {
        let Some(observer) = self.observer else {
            return;
        };
        if let Some(percent) = update.percent {
            let percent = percent.min(100);
            let previous = self.high_water.fetch_max(percent, Ordering::AcqRel);
            update.percent = Some(previous.max(percent));
        }
        observer.on_progress(update);
    }
}

/// Percent for `done` of `total` cells, spread over 25..=85
pub(crate) fn assembly_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 85;
    }
    let done = done.min(total);
    (25 + 60 * done / total) as u8
}
