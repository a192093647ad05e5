//! The `key=value` configuration file.
//!
//! Lines starting with `#` are comments, blank lines and lines without `=` are ignored, and the
//! first `=` of a line separates the key from the value. Keys and values are trimmed.

use drift_akaze::DEFAULT_BETTER_BY;
use drift_core::analyze::check_threshold;
use drift_core::AlertPolicy;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_SENDER: &str = "camera-watch@localhost";
pub const DEFAULT_SENDMAIL: &str = "/usr/sbin/sendmail";
pub const DEFAULT_AKAZE_THRESHOLD: f64 = 0.001;

/// The configuration cannot be used; nothing can be compared without it.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read configuration {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("missing required key `{0}`")]
    MissingKey(&'static str),
    #[error("threshold_percentage `{0}` is not a fraction inside of (0, 1)")]
    InvalidThreshold(String),
    #[error("invalid value `{value}` for `{key}`")]
    InvalidNumber { key: &'static str, value: String },
}

/// The settings of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchConfig {
    /// Normalized displacement above which a correspondence counts as moved.
    pub threshold: f64,
    pub sender: String,
    /// E-mail receivers; alerts are only logged if this is empty.
    pub receivers: Vec<String>,
    pub subject: String,
    pub body: String,
    /// The root directory of artifacts, if configured.
    pub attachment: Option<PathBuf>,
    /// The AKAZE detector threshold.
    pub akaze_threshold: f64,
    /// The Hamming margin of descriptor matches.
    pub match_better_by: u32,
    /// The sendmail compatible program alerts are piped to.
    pub sendmail: PathBuf,
}

/// Splits configuration text into its key value pairs.
///
/// Later keys override earlier ones.
pub fn parse_pairs(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()))
        .collect()
}

impl WatchConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut pairs = parse_pairs(text);

        let threshold = pairs
            .remove("threshold_percentage")
            .ok_or(ConfigError::MissingKey("threshold_percentage"))?;
        let threshold = threshold
            .parse::<f64>()
            .ok()
            .and_then(|t| check_threshold(t).ok())
            .ok_or(ConfigError::InvalidThreshold(threshold))?;

        let receivers = pairs
            .remove("receivers")
            .map(|receivers| {
                receivers
                    .split(',')
                    .map(str::trim)
                    .filter(|receiver| !receiver.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            threshold,
            sender: pairs
                .remove("sender")
                .unwrap_or_else(|| DEFAULT_SENDER.to_owned()),
            receivers,
            subject: pairs.remove("subject").unwrap_or_default(),
            body: pairs.remove("body").unwrap_or_default(),
            attachment: pairs
                .remove("attachment")
                .filter(|attachment| !attachment.is_empty())
                .map(PathBuf::from),
            akaze_threshold: parse_number(&mut pairs, "akaze_threshold")?
                .unwrap_or(DEFAULT_AKAZE_THRESHOLD),
            match_better_by: parse_number(&mut pairs, "match_better_by")?
                .unwrap_or(DEFAULT_BETTER_BY),
            sendmail: pairs
                .remove("sendmail")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SENDMAIL)),
        })
    }

    pub fn alert_policy(&self) -> AlertPolicy {
        AlertPolicy {
            subject: self.subject.clone(),
            body: self.body.clone(),
        }
    }

    /// The artifact root, defaulting to `compare_matchpoint` next to the frame root.
    pub fn artifact_root(&self, frames: &Path) -> PathBuf {
        match &self.attachment {
            Some(attachment) => attachment.clone(),
            None => frames
                .parent()
                .unwrap_or(frames)
                .join("compare_matchpoint"),
        }
    }
}

fn parse_number<T: std::str::FromStr>(
    pairs: &mut HashMap<String, String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    pairs
        .remove(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidNumber { key, value })
        })
        .transpose()
}
