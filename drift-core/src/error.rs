use std::io;
use thiserror::Error;

/// The arguments of one comparison cannot be analyzed.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum InputError {
    #[error("threshold {0} is not inside of (0, 1)")]
    InvalidThreshold(f64),
    #[error("image of {width}x{height} pixels has a degenerate diagonal")]
    DegenerateImage { width: u32, height: u32 },
}

/// The correspondence provider could not produce a correspondence set.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("cannot extract features from an empty {width}x{height} image")]
    EmptyImage { width: u32, height: u32 },
    #[error("feature extraction failed: {0}")]
    Extraction(String),
}

/// Failure of one camera pair comparison.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Failure to produce the artifact of a moved verdict.
#[derive(Debug, Error)]
pub enum ReportingError {
    #[error("unable to persist artifact: {0}")]
    Persist(#[from] io::Error),
    #[error("unable to render artifact: {0}")]
    Render(#[from] image::ImageError),
}
