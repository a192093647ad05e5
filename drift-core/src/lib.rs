//! # `drift-core`
//!
//! Detects movement of a fixed camera by comparing its reference frame of one day
//! against the frame of the previous day.
//!
//! The crate does not extract or match features itself. Point correspondences come from a
//! [`CorrespondenceProvider`], so the analysis here stays the same regardless of the matching
//! technique behind it. Everything in this crate is deterministic and free of side effects apart
//! from the artifact persistence in [`alert`].
//!
//! ## Modules
//! * [`analyze`] - normalized displacement of correspondences and the [`Verdict`]
//! * [`pairing`] - selection of the yesterday/today frame pairs sharing an identity
//! * [`alert`] - what to do with a verdict: artifacts and notifications

pub mod alert;
pub mod analyze;
mod error;
pub mod pairing;
mod provider;

pub use alert::{AlertPolicy, ArtifactRenderer, ArtifactStore, Notifier, Report, Reporter};
pub use analyze::{analyze, ComparisonResult, Verdict};
pub use cv_core::{nalgebra, FeatureMatch, KeyPoint};
pub use error::{CompareError, InputError, ProviderError, ReportingError};
pub use pairing::{select_pairs, FramePair};
pub use provider::{compare, CorrespondenceProvider};

/// A point in image A matched with the point in image B that shows the same scene location.
///
/// Both points are in pixel coordinates of their own image.
pub type Correspondence = FeatureMatch<KeyPoint>;
