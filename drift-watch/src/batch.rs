//! One daily run: every camera seen both yesterday and today is compared and reported.

use crate::frames::FrameStore;
use chrono::NaiveDate;
use drift_core::{
    compare, select_pairs, ArtifactRenderer, ComparisonResult, CorrespondenceProvider, Notifier,
    Report, Reporter,
};
use log::*;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Counts of what happened during a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Pairs that were compared to a verdict.
    pub compared: usize,
    pub moved: usize,
    pub stable: usize,
    /// Pairs that could not be decoded or compared.
    pub skipped: usize,
    pub notify_failures: usize,
    pub artifact_failures: usize,
}

pub struct Batch<P, R, N> {
    pub provider: P,
    pub reporter: Reporter<R, N>,
    pub frames: FrameStore,
    pub threshold: f64,
}

impl<P, R, N> Batch<P, R, N>
where
    P: CorrespondenceProvider,
    R: ArtifactRenderer,
    N: Notifier,
{
    /// Compares the frames of the day before `today` against those of `today`.
    pub fn run_day(&self, today: NaiveDate) -> RunSummary {
        let mut summary = RunSummary::default();
        let yesterday = match today.pred_opt() {
            Some(yesterday) => yesterday,
            None => {
                error!("{} has no previous day", today);
                return summary;
            }
        };
        let yesterday_frames = self.list(yesterday);
        let today_frames = self.list(today);
        for name in today_frames.keys() {
            info!("found frame {} of {}", name, today);
        }
        let pairs = select_pairs(&yesterday_frames, &today_frames);
        info!(
            "comparing {} cameras of {} against {}",
            pairs.len(),
            yesterday,
            today
        );

        for pair in pairs {
            let identity = pair.identity.as_str();
            info!(
                "comparing {} with {}",
                pair.yesterday.display(),
                pair.today.display()
            );
            let (image_a, image_b) = match (image::open(pair.yesterday), image::open(pair.today)) {
                (Ok(a), Ok(b)) => (a, b),
                (Err(e), _) | (_, Err(e)) => {
                    error!("skipping {}: unable to decode frame: {}", identity, e);
                    summary.skipped += 1;
                    continue;
                }
            };
            let result = match compare(&self.provider, &image_a, &image_b, self.threshold) {
                Ok(result) => result,
                Err(e) => {
                    error!("skipping {}: {}", identity, e);
                    summary.skipped += 1;
                    continue;
                }
            };
            self.log_verdict(identity, &result);
            summary.compared += 1;

            match self
                .reporter
                .report(today, identity, &image_a, &image_b, &result)
            {
                Report::Stable => summary.stable += 1,
                Report::Moved { artifact, notified } => {
                    summary.moved += 1;
                    if let Err(e) = artifact {
                        error!("unable to write artifact of {}: {}", identity, e);
                        summary.artifact_failures += 1;
                    }
                    if notified {
                        info!("alert for {} delivered", identity);
                    } else {
                        error!("alert for {} was not delivered", identity);
                        summary.notify_failures += 1;
                    }
                }
            }
        }
        summary
    }

    fn list(&self, date: NaiveDate) -> BTreeMap<String, PathBuf> {
        self.frames.frames(date).unwrap_or_else(|e| {
            error!(
                "unable to list frames in {}: {}",
                self.frames.day_dir(date).display(),
                e
            );
            BTreeMap::new()
        })
    }

    fn log_verdict(&self, identity: &str, result: &ComparisonResult) {
        if result.verdict.is_moved() {
            warn!(
                "Alert: camera frame {} moved or deformed, threshold {:.1}% ({} of {} correspondences)",
                identity,
                result.threshold * 100.0,
                result.exceeding.len(),
                result.correspondences.len()
            );
            info!(
                "{} displacements: {:?}",
                identity,
                result
                    .exceeding
                    .iter()
                    .map(|&ix| {
                        let d = result.displacements[ix];
                        format!("({:.1}, {:.1}) {:.2}%", d.x, d.y, result.normalized[ix] * 100.0)
                    })
                    .collect::<Vec<_>>()
            );
        } else {
            info!(
                "{} shows no significant movement, threshold {:.1}%",
                identity,
                result.threshold * 100.0
            );
        }
    }
}
