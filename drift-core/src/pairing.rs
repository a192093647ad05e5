use std::collections::BTreeMap;

/// The two frames of one identity that are compared against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePair<'a, K, Y, T> {
    pub identity: &'a K,
    pub yesterday: &'a Y,
    pub today: &'a T,
}

/// Selects the frames to compare from yesterday's and today's collections.
///
/// Only identities present in both collections produce a pair, in ascending identity order.
/// An identity missing from either day is skipped without error.
pub fn select_pairs<'a, K, Y, T>(
    yesterday: &'a BTreeMap<K, Y>,
    today: &'a BTreeMap<K, T>,
) -> Vec<FramePair<'a, K, Y, T>>
where
    K: Ord,
{
    yesterday
        .iter()
        .filter_map(|(identity, yesterday)| {
            today.get(identity).map(|today| FramePair {
                identity,
                yesterday,
                today,
            })
        })
        .collect()
}
