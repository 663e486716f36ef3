use std::collections::HashSet;

use crate::data::{Track, TrackKey};

/// Append `incoming` to `base`, skipping duplicates and unidentifiable tracks.
///
/// Keys already present in `base` count as seen. Stops as soon as the result
/// holds `limit` tracks; the relative order of both inputs is preserved.
pub fn merge_unique_tracks(base: &[Track], incoming: &[Track], limit: usize) -> Vec<Track> {
    let mut out: Vec<Track> = base.to_vec();
    let mut seen: HashSet<TrackKey> = out.iter().map(Track::key).collect();

    for track in incoming {
        if out.len() >= limit {
            break;
        }
        let key = track.key();
        if key.is_empty() || seen.contains(&key) {
            continue;
        }
        seen.insert(key);
        out.push(track.clone());
    }
    out
}
