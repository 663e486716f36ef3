use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::helpers::artistsplitter::primary_artist;

/// A recommended track as returned by the metadata service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Track title (empty if the service did not provide one)
    #[serde(default)]
    pub name: String,
    /// Artist name (empty if the service did not provide one)
    #[serde(default)]
    pub artist: String,
    /// Link to the track page on the metadata service
    #[serde(default)]
    pub url: Option<String>,
    /// Similarity score, only set by tiers that compute one
    #[serde(default, rename = "match")]
    pub match_score: Option<f64>,
}

impl Track {
    pub fn new(artist: &str, name: &str) -> Self {
        Track {
            name: name.to_string(),
            artist: artist.to_string(),
            url: None,
            match_score: None,
        }
    }

    /// Comparison key used for de-duplication
    pub fn key(&self) -> TrackKey {
        TrackKey::new(&self.artist, &self.name)
    }
}

/// Case-insensitive identity of a track: (artist, title), both trimmed and lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackKey {
    pub artist: String,
    pub name: String,
}

impl TrackKey {
    pub fn new(artist: &str, name: &str) -> Self {
        TrackKey {
            artist: artist.trim().to_lowercase(),
            name: name.trim().to_lowercase(),
        }
    }

    /// A key without artist and title identifies nothing and is never merged
    pub fn is_empty(&self) -> bool {
        self.artist.is_empty() && self.name.is_empty()
    }
}

/// The anchor track recommendations are computed for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seed {
    pub artist: String,
    pub title: String,
}

impl Seed {
    pub fn new(artist: &str, title: &str) -> Self {
        Seed {
            artist: artist.to_string(),
            title: title.to_string(),
        }
    }

    /// Seed in the form used for metadata queries: primary artist only, trimmed title
    pub fn for_query(artist: &str, title: &str) -> Self {
        Seed {
            artist: primary_artist(artist),
            title: title.trim().to_string(),
        }
    }

    pub fn key(&self) -> TrackKey {
        TrackKey::new(&self.artist, &self.title)
    }
}

/// Tracks the caller has already seen, plus the seed itself
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    keys: HashSet<TrackKey>,
}

impl ExclusionSet {
    /// Build the exclusion set for `seed`. Entries with neither artist nor title are ignored.
    pub fn new<'a, I>(seed: &Seed, excluded: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut keys: HashSet<TrackKey> = excluded
            .into_iter()
            .map(|(artist, title)| TrackKey::new(artist, title))
            .filter(|key| !key.is_empty())
            .collect();
        keys.insert(seed.key());
        ExclusionSet { keys }
    }

    pub fn contains(&self, key: &TrackKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
