use crate::{analyze, CompareError, ComparisonResult, Correspondence, ProviderError};
use image::DynamicImage;

/// Finds corresponding points between two images of the same scene.
pub trait CorrespondenceProvider {
    /// Extracts features from both images and matches them.
    ///
    /// The returned order must be stable for the duration of one call, since downstream stages
    /// refer to correspondences by index. Either a complete set is returned or an error.
    fn extract_and_match(
        &self,
        image_a: &DynamicImage,
        image_b: &DynamicImage,
    ) -> Result<Vec<Correspondence>, ProviderError>;
}

impl<P> CorrespondenceProvider for &P
where
    P: CorrespondenceProvider + ?Sized,
{
    fn extract_and_match(
        &self,
        image_a: &DynamicImage,
        image_b: &DynamicImage,
    ) -> Result<Vec<Correspondence>, ProviderError> {
        (**self).extract_and_match(image_a, image_b)
    }
}

/// Runs the provider on an image pair and analyzes the correspondences it found.
///
/// The threshold is checked before the provider runs so that a bad threshold does not
/// cost a feature extraction.
pub fn compare<P>(
    provider: &P,
    image_a: &DynamicImage,
    image_b: &DynamicImage,
    threshold: f64,
) -> Result<ComparisonResult, CompareError>
where
    P: CorrespondenceProvider + ?Sized,
{
    analyze::check_threshold(threshold)?;
    let correspondences = provider.extract_and_match(image_a, image_b)?;
    Ok(analyze(image_a, image_b, correspondences, threshold)?)
}
