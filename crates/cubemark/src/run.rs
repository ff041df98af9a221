//! The frame loop: capture, process, present, repeat.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detect::MarkerDetector;
use crate::io::{FrameSink, FrameSource, LoopControl, SinkError, SourceError};
use crate::pipeline::{FrameProcessor, FrameReport};
use crate::pose::PoseEstimator;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Stop after this many frames.
    pub max_frames: Option<u64>,
}

#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

#[derive(thiserror::Error, Debug)]
pub enum ReportIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Summary of a whole run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub frames_processed: u64,
    /// The sink asked to stop before the source ran dry.
    pub stopped_by_sink: bool,
    pub frames: Vec<FrameReport>,
}

impl RunReport {
    /// Frames that drew at least one cube.
    pub fn frames_with_cubes(&self) -> usize {
        self.frames.iter().filter(|f| !f.cubes.is_empty()).count()
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ReportIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Drive `processor` over `source` until it is exhausted, the sink stops
/// the loop, or `max_frames` is reached.
///
/// Source and sink failures end the run; per-frame problems never do.
pub fn run<S, K, D, P>(
    source: &mut S,
    sink: &mut K,
    processor: &mut FrameProcessor<D, P>,
    options: &RunOptions,
) -> Result<RunReport, RunError>
where
    S: FrameSource + ?Sized,
    K: FrameSink + ?Sized,
    D: MarkerDetector,
    P: PoseEstimator,
{
    let mut report = RunReport::default();

    while options
        .max_frames
        .is_none_or(|max| report.frames_processed < max)
    {
        let Some(frame) = source.next_frame()? else {
            break;
        };
        let out = processor.process(&frame);
        let control = sink.present(&frame, &out.image)?;
        report.frames.push(out.report);
        report.frames_processed += 1;

        if control == LoopControl::Stop {
            log::info!("stop requested after frame {}", frame.name);
            report.stopped_by_sink = true;
            break;
        }
    }

    log::info!(
        "processed {} frames, {} with cubes",
        report.frames_processed,
        report.frames_with_cubes()
    );
    Ok(report)
}
