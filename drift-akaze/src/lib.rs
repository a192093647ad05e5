//! # `drift-akaze`
//!
//! A [`CorrespondenceProvider`] built on AKAZE features.
//!
//! Features are extracted from both images with [`Akaze`] and their binary descriptors are
//! matched symmetrically by Hamming distance. Correspondences are returned in the order of the
//! features of image A.

use akaze::Akaze;
use bitarray::{BitArray, Hamming};
use drift_core::nalgebra::Point2;
use drift_core::{Correspondence, CorrespondenceProvider, FeatureMatch, KeyPoint, ProviderError};
use image::{DynamicImage, GenericImageView};
use log::*;
use space::{Knn, LinearKnn};

/// The default amount of bits the best match must beat the second best match by.
pub const DEFAULT_BETTER_BY: u32 = 24;

/// An AKAZE descriptor.
pub type Descriptor = BitArray<64>;

/// Finds correspondences by matching AKAZE descriptors.
#[derive(Debug, Copy, Clone)]
pub struct AkazeMatcher {
    /// The feature extractor.
    pub akaze: Akaze,
    /// The Hamming distance by which the best match must beat the second best one.
    ///
    /// Features with a less distinctive best match are not matched at all.
    pub better_by: u32,
}

impl AkazeMatcher {
    /// Creates a matcher with the given AKAZE detector threshold and match margin.
    ///
    /// 0.01 will be very sparse and 0.0001 will be very dense.
    pub fn new(detector_threshold: f64, better_by: u32) -> Self {
        Self {
            akaze: Akaze::new(detector_threshold),
            better_by,
        }
    }
}

impl Default for AkazeMatcher {
    fn default() -> Self {
        Self {
            akaze: Akaze::default(),
            better_by: DEFAULT_BETTER_BY,
        }
    }
}

impl CorrespondenceProvider for AkazeMatcher {
    fn extract_and_match(
        &self,
        image_a: &DynamicImage,
        image_b: &DynamicImage,
    ) -> Result<Vec<Correspondence>, ProviderError> {
        for image in [image_a, image_b] {
            let (width, height) = image.dimensions();
            if width == 0 || height == 0 {
                return Err(ProviderError::EmptyImage { width, height });
            }
        }

        let (key_points_a, descriptors_a) = self.akaze.extract(image_a);
        let (key_points_b, descriptors_b) = self.akaze.extract(image_b);
        debug!(
            "performing matching between {} and {} features",
            descriptors_a.len(),
            descriptors_b.len()
        );

        let matches = symmetric_matching(&descriptors_a, &descriptors_b, self.better_by);
        debug!("found {} symmetric matches", matches.len());
        Ok(matches
            .into_iter()
            .map(|[a, b]| FeatureMatch(key_point(key_points_a[a]), key_point(key_points_b[b])))
            .collect())
    }
}

fn key_point(key_point: akaze::KeyPoint) -> KeyPoint {
    let (x, y) = key_point.point;
    KeyPoint(Point2::new(x as f64, y as f64))
}

/// Performs non-symmetric matching from `a` to `b`.
///
/// If there aren't at least 2 features on both sides, no matches are produced.
pub fn matching(a: &[Descriptor], b: &[Descriptor], better_by: u32) -> Vec<Option<usize>> {
    if a.len() < 2 || b.len() < 2 {
        return vec![];
    }
    let knn_b = LinearKnn {
        metric: Hamming,
        iter: b.iter(),
    };
    a.iter()
        .map(|descriptor| {
            let knn = knn_b.knn(descriptor, 2);
            if knn[0].distance + better_by <= knn[1].distance {
                Some(knn[0].index)
            } else {
                None
            }
        })
        .collect()
}

/// Performs symmetric matching between `a` and `b`.
///
/// Symmetric matching requires a feature in `b` to be the best match for a feature in `a`
/// and for the same feature in `a` to be the best match for the same feature in `b`.
/// The result is ordered by the index of the feature in `a`.
pub fn symmetric_matching(a: &[Descriptor], b: &[Descriptor], better_by: u32) -> Vec<[usize; 2]> {
    let forward_matches = matching(a, b, better_by);
    let reverse_matches = matching(b, a, better_by);
    forward_matches
        .into_iter()
        .enumerate()
        .filter_map(|(aix, bix)| {
            bix.map(|bix| [aix, bix])
                .filter(|&[aix, bix]| reverse_matches[bix] == Some(aix))
        })
        .collect()
}
