//! Turns a [`Verdict`] into artifacts and notifications.
//!
//! A stable verdict produces nothing. A moved verdict produces a rendered artifact stored under
//! the run date and the camera identity, followed by a notification. Persisting the artifact and
//! sending the notification fail independently: a notification is still sent when the artifact
//! could not be written, and a failed notification leaves the artifact in place.

use crate::{ComparisonResult, ReportingError, Verdict};
use chrono::NaiveDate;
use image::DynamicImage;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

const ARTIFACT_PREFIX: &str = "comparison_matchpoint";
const ARTIFACT_EXTENSION: &str = "png";

/// Delivers alerts to operators.
pub trait Notifier {
    /// Sends one alert and reports whether it was delivered.
    ///
    /// Delivery failures are reported through the return value, never by panicking.
    /// `artifact_path` is `None` if the artifact of the alert could not be persisted.
    fn notify(
        &self,
        subject: &str,
        body: &str,
        artifact_path: Option<&Path>,
        identity: &str,
    ) -> bool;
}

impl<N> Notifier for &N
where
    N: Notifier + ?Sized,
{
    fn notify(
        &self,
        subject: &str,
        body: &str,
        artifact_path: Option<&Path>,
        identity: &str,
    ) -> bool {
        (**self).notify(subject, body, artifact_path, identity)
    }
}

/// Draws the visual artifact of a comparison into a file.
pub trait ArtifactRenderer {
    fn render(
        &self,
        path: &Path,
        image_a: &DynamicImage,
        image_b: &DynamicImage,
        result: &ComparisonResult,
    ) -> Result<(), ReportingError>;
}

impl<R> ArtifactRenderer for &R
where
    R: ArtifactRenderer + ?Sized,
{
    fn render(
        &self,
        path: &Path,
        image_a: &DynamicImage,
        image_b: &DynamicImage,
        result: &ComparisonResult,
    ) -> Result<(), ReportingError> {
        (**self).render(path, image_a, image_b, result)
    }
}

/// Decides where artifacts are stored.
///
/// Artifacts of a run go to `<root>/<YYYYMMDD>/` and are named after the date and the identity,
/// so artifacts of different days never collide. Within a day, an existing artifact is never
/// overwritten; a numeric suffix is appended instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The directory artifacts of `date` are stored in.
    pub fn day_dir(&self, date: NaiveDate) -> PathBuf {
        self.root.join(date.format("%Y%m%d").to_string())
    }

    /// The file name of the `attempt`-th artifact of `identity` on `date`.
    pub fn file_name(date: NaiveDate, identity: &str, attempt: usize) -> String {
        let stem = Path::new(identity)
            .file_stem()
            .map(|stem| stem.to_string_lossy())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| "frame".into());
        let date = date.format("%Y-%m-%d");
        if attempt == 0 {
            format!("{ARTIFACT_PREFIX}_{date}_{stem}.{ARTIFACT_EXTENSION}")
        } else {
            format!("{ARTIFACT_PREFIX}_{date}_{stem}_{attempt}.{ARTIFACT_EXTENSION}")
        }
    }

    /// Reserves a fresh artifact path by creating an empty file there.
    ///
    /// The file is created with create-new semantics, so a path is handed out at most once.
    pub fn claim(&self, date: NaiveDate, identity: &str) -> io::Result<PathBuf> {
        let dir = self.day_dir(date);
        fs::create_dir_all(&dir)?;
        for attempt in 0.. {
            let path = dir.join(Self::file_name(date, identity, attempt));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(path),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }
        unreachable!("artifact names are exhausted")
    }
}

/// The texts of the alerts sent for moved cameras.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertPolicy {
    pub subject: String,
    pub body: String,
}

impl AlertPolicy {
    pub fn subject_for(&self, identity: &str) -> String {
        format!("{}:{}", self.subject, identity)
    }

    pub fn body_for(&self, identity: &str, artifact: Option<&Path>) -> String {
        let location = match artifact {
            Some(path) => path.display().to_string(),
            None => "artifact unavailable".to_owned(),
        };
        if self.body.is_empty() {
            format!("{identity}: {location}")
        } else {
            format!("{}\n\n{identity}: {location}", self.body)
        }
    }
}

/// What the reporter did with one comparison.
#[derive(Debug)]
pub enum Report {
    /// Nothing to do; the camera did not move.
    Stable,
    /// The camera moved.
    Moved {
        /// Where the artifact was written, or why it was not.
        artifact: Result<PathBuf, ReportingError>,
        /// Whether the notifier delivered the alert.
        notified: bool,
    },
}

impl Report {
    pub fn verdict(&self) -> Verdict {
        match self {
            Report::Stable => Verdict::Stable,
            Report::Moved { .. } => Verdict::Moved,
        }
    }
}

/// Acts on comparison results.
pub struct Reporter<R, N> {
    pub policy: AlertPolicy,
    pub store: ArtifactStore,
    pub renderer: R,
    pub notifier: N,
}

impl<R, N> Reporter<R, N>
where
    R: ArtifactRenderer,
    N: Notifier,
{
    pub fn new(policy: AlertPolicy, store: ArtifactStore, renderer: R, notifier: N) -> Self {
        Self {
            policy,
            store,
            renderer,
            notifier,
        }
    }

    /// Acts on the result of comparing `image_a` (yesterday) against `image_b` (today).
    pub fn report(
        &self,
        date: NaiveDate,
        identity: &str,
        image_a: &DynamicImage,
        image_b: &DynamicImage,
        result: &ComparisonResult,
    ) -> Report {
        if result.verdict == Verdict::Stable {
            return Report::Stable;
        }
        let artifact = self.persist(date, identity, image_a, image_b, result);
        let artifact_path = artifact.as_ref().ok().map(PathBuf::as_path);
        let notified = self.notifier.notify(
            &self.policy.subject_for(identity),
            &self.policy.body_for(identity, artifact_path),
            artifact_path,
            identity,
        );
        Report::Moved { artifact, notified }
    }

    fn persist(
        &self,
        date: NaiveDate,
        identity: &str,
        image_a: &DynamicImage,
        image_b: &DynamicImage,
        result: &ComparisonResult,
    ) -> Result<PathBuf, ReportingError> {
        let path = self.store.claim(date, identity)?;
        match self.renderer.render(&path, image_a, image_b, result) {
            Ok(()) => Ok(path),
            Err(e) => {
                // Only the empty placeholder we claimed is removed.
                fs::remove_file(&path).ok();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze;
    use cv_core::nalgebra::Point2;
    use cv_core::{FeatureMatch, KeyPoint};
    use std::cell::RefCell;

    struct BytesRenderer;

    impl ArtifactRenderer for BytesRenderer {
        fn render(
            &self,
            path: &Path,
            _: &DynamicImage,
            _: &DynamicImage,
            result: &ComparisonResult,
        ) -> Result<(), ReportingError> {
            fs::write(path, format!("{:?}", result.exceeding))?;
            Ok(())
        }
    }

    struct FailingRenderer;

    impl ArtifactRenderer for FailingRenderer {
        fn render(
            &self,
            _: &Path,
            _: &DynamicImage,
            _: &DynamicImage,
            _: &ComparisonResult,
        ) -> Result<(), ReportingError> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full").into())
        }
    }

    #[derive(Default)]
    struct Recorder {
        deliver: bool,
        sent: RefCell<Vec<(String, String, Option<PathBuf>, String)>>,
    }

    impl Notifier for Recorder {
        fn notify(
            &self,
            subject: &str,
            body: &str,
            artifact_path: Option<&Path>,
            identity: &str,
        ) -> bool {
            self.sent.borrow_mut().push((
                subject.to_owned(),
                body.to_owned(),
                artifact_path.map(Path::to_path_buf),
                identity.to_owned(),
            ));
            self.deliver
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    fn image() -> DynamicImage {
        DynamicImage::new_rgb8(800, 600)
    }

    fn result(shift: f64) -> ComparisonResult {
        let m = FeatureMatch(
            KeyPoint(Point2::new(100.0, 100.0)),
            KeyPoint(Point2::new(100.0 + shift, 100.0)),
        );
        analyze(&image(), &image(), vec![m], 0.03).unwrap()
    }

    fn policy() -> AlertPolicy {
        AlertPolicy {
            subject: "Camera moved".to_owned(),
            body: "Please check the camera.".to_owned(),
        }
    }

    #[test]
    fn file_names_embed_date_and_identity() {
        assert_eq!(
            ArtifactStore::file_name(date(), "cam-11.jpg", 0),
            "comparison_matchpoint_2024-05-17_cam-11.png"
        );
        assert_eq!(
            ArtifactStore::file_name(date(), "cam-11.jpg", 2),
            "comparison_matchpoint_2024-05-17_cam-11_2.png"
        );
        assert_eq!(
            ArtifactStore::file_name(date(), "", 0),
            "comparison_matchpoint_2024-05-17_frame.png"
        );
    }

    #[test]
    fn stable_result_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Recorder::default();
        let reporter = Reporter::new(
            policy(),
            ArtifactStore::new(dir.path()),
            BytesRenderer,
            &notifier,
        );
        let report = reporter.report(date(), "cam1.jpg", &image(), &image(), &result(1.0));
        assert!(matches!(report, Report::Stable));
        assert!(notifier.sent.borrow().is_empty());
        assert!(!reporter.store.day_dir(date()).exists());
    }

    #[test]
    fn moved_result_persists_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Recorder {
            deliver: true,
            ..Default::default()
        };
        let reporter = Reporter::new(
            policy(),
            ArtifactStore::new(dir.path()),
            BytesRenderer,
            &notifier,
        );
        let report = reporter.report(date(), "cam1.jpg", &image(), &image(), &result(50.0));
        let path = match report {
            Report::Moved {
                artifact: Ok(path),
                notified: true,
            } => path,
            other => panic!("unexpected report {:?}", other),
        };
        assert_eq!(
            path,
            dir.path()
                .join("20240517")
                .join("comparison_matchpoint_2024-05-17_cam1.png")
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "[0]");

        let sent = notifier.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "Camera moved:cam1.jpg");
        assert!(sent[0].1.starts_with("Please check the camera."));
        assert!(sent[0].1.contains(&path.display().to_string()));
        assert_eq!(sent[0].2.as_deref(), Some(path.as_path()));
        assert_eq!(sent[0].3, "cam1.jpg");
    }

    #[test]
    fn repeated_reports_never_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Recorder::default();
        let reporter = Reporter::new(
            policy(),
            ArtifactStore::new(dir.path()),
            BytesRenderer,
            &notifier,
        );
        let mut paths = vec![];
        for _ in 0..2 {
            match reporter.report(date(), "cam1.jpg", &image(), &image(), &result(50.0)) {
                Report::Moved {
                    artifact: Ok(path), ..
                } => paths.push(path),
                other => panic!("unexpected report {:?}", other),
            }
        }
        assert_ne!(paths[0], paths[1]);
        assert!(paths.iter().all(|path| path.exists()));
        assert!(paths[1].ends_with("comparison_matchpoint_2024-05-17_cam1_1.png"));
    }

    #[test]
    fn failed_notification_keeps_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Recorder {
            deliver: false,
            ..Default::default()
        };
        let reporter = Reporter::new(
            policy(),
            ArtifactStore::new(dir.path()),
            BytesRenderer,
            &notifier,
        );
        match reporter.report(date(), "cam1.jpg", &image(), &image(), &result(50.0)) {
            Report::Moved {
                artifact: Ok(path),
                notified: false,
            } => assert!(path.exists()),
            other => panic!("unexpected report {:?}", other),
        }
    }

    #[test]
    fn failed_artifact_still_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Recorder {
            deliver: true,
            ..Default::default()
        };
        let reporter = Reporter::new(
            policy(),
            ArtifactStore::new(dir.path()),
            FailingRenderer,
            &notifier,
        );
        let report = reporter.report(date(), "cam1.jpg", &image(), &image(), &result(50.0));
        assert!(matches!(
            report,
            Report::Moved {
                artifact: Err(ReportingError::Persist(_)),
                notified: true,
            }
        ));
        let sent = notifier.sent.borrow();
        assert_eq!(sent[0].2, None);
        assert!(sent[0].1.ends_with("cam1.jpg: artifact unavailable"));
        assert_eq!(
            fs::read_dir(reporter.store.day_dir(date())).unwrap().count(),
            0
        );
    }

    #[test]
    fn body_without_template_names_identity() {
        let policy = AlertPolicy::default();
        assert_eq!(
            policy.body_for("cam2.jpg", Some(Path::new("/a/b.png"))),
            "cam2.jpg: /a/b.png"
        );
        assert_eq!(policy.subject_for("cam2.jpg"), ":cam2.jpg");
    }
}
