use crate::{Correspondence, InputError};
use cv_core::nalgebra::Vector2;
use cv_core::FeatureMatch;
use image::GenericImageView;

/// Classification of one camera's day-over-day comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// No correspondence moved further than the threshold.
    Stable,
    /// At least one correspondence moved further than the threshold.
    Moved,
}

impl Verdict {
    pub fn is_moved(self) -> bool {
        self == Verdict::Moved
    }
}

/// Everything derived from one comparison of an image pair.
///
/// `displacements` and `normalized` are index aligned with `correspondences`, and every
/// index in `exceeding` is a valid index into all three.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    /// The correspondences in the order the provider returned them.
    pub correspondences: Vec<Correspondence>,
    /// `b - a` in pixels for every correspondence.
    pub displacements: Vec<Vector2<f64>>,
    /// Displacement length divided by the diagonal of image A.
    pub normalized: Vec<f64>,
    /// Ascending indices of the correspondences whose normalized displacement exceeds the threshold.
    pub exceeding: Vec<usize>,
    /// The threshold the result was classified with.
    pub threshold: f64,
    pub verdict: Verdict,
}

impl ComparisonResult {
    /// Iterates over the displacement vectors of the exceeding correspondences.
    pub fn exceeding_displacements(&self) -> impl Iterator<Item = Vector2<f64>> + '_ {
        self.exceeding.iter().map(move |&ix| self.displacements[ix])
    }

    /// Checks if the correspondence at `ix` exceeds the threshold.
    pub fn is_exceeding(&self, ix: usize) -> bool {
        self.exceeding.binary_search(&ix).is_ok()
    }
}

/// Checks that a threshold lies strictly between `0` and `1`.
pub fn check_threshold(threshold: f64) -> Result<f64, InputError> {
    if threshold > 0.0 && threshold < 1.0 {
        Ok(threshold)
    } else {
        Err(InputError::InvalidThreshold(threshold))
    }
}

/// The length of the diagonal of an image with the given dimensions.
pub fn diagonal(width: u32, height: u32) -> Result<f64, InputError> {
    let diagonal = Vector2::new(width as f64, height as f64).norm();
    if diagonal > 0.0 {
        Ok(diagonal)
    } else {
        Err(InputError::DegenerateImage { width, height })
    }
}

/// The vector from the point in image A to the point in image B.
pub fn displacement(&FeatureMatch(a, b): &Correspondence) -> Vector2<f64> {
    b.0 - a.0
}

/// Classifies an image pair from the correspondences found between them.
///
/// Only the dimensions of `image_a`, the baseline, are used to normalize displacements;
/// `image_b` is assumed to come from the same camera. A normalized displacement exactly equal
/// to `threshold` does not count as exceeding.
///
/// An empty correspondence set is classified as [`Verdict::Stable`]. Note that this also
/// means a scene that changed so much that nothing matched is reported as stable.
pub fn analyze(
    image_a: &impl GenericImageView,
    _image_b: &impl GenericImageView,
    correspondences: Vec<Correspondence>,
    threshold: f64,
) -> Result<ComparisonResult, InputError> {
    let threshold = check_threshold(threshold)?;
    let (width, height) = image_a.dimensions();
    let diagonal = diagonal(width, height)?;

    let displacements: Vec<Vector2<f64>> = correspondences.iter().map(displacement).collect();
    let normalized: Vec<f64> = displacements.iter().map(|d| d.norm() / diagonal).collect();
    let exceeding: Vec<usize> = normalized
        .iter()
        .enumerate()
        .filter(|&(_, &n)| n > threshold)
        .map(|(ix, _)| ix)
        .collect();
    let verdict = if exceeding.is_empty() {
        Verdict::Stable
    } else {
        Verdict::Moved
    };

    Ok(ComparisonResult {
        correspondences,
        displacements,
        normalized,
        exceeding,
        threshold,
        verdict,
    })
}
