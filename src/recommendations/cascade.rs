//! Cascading recommendation strategy.
//!
//! Tiers run in a fixed order and each one only runs while the result is still
//! short of its target:
//! 1. tracks similar to the seed track
//! 2. the top track of each artist similar to the seed artist
//! 3. top tracks of the seed's genre tags
//! 4. the global chart, so that a result is never empty while the service is up
//!
//! A failing tier contributes nothing; the cascade itself never fails.

use std::fmt::Display;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::data::{ExclusionSet, Seed, Track};
use crate::helpers::lastfm::LastfmError;
use crate::recommendations::merge::merge_unique_tracks;
use crate::recommendations::types::{CascadeErrors, CascadeResult, MoreRecommendations, SourcePolicy};
use crate::recommendations::MetadataService;

/// Number of tracks returned by default
pub const DEFAULT_LIMIT: usize = 5;

/// Number of seed tags used by the tag tier
pub const DEFAULT_TAG_COUNT: usize = 3;

/// Extra tracks requested per tier when excluded tracks will be filtered out afterwards
pub const DEFAULT_OVERFETCH_MARGIN: usize = 10;

/// One fallback strategy of the cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    SimilarTracks,
    SimilarArtists,
    TagTopTracks,
    Chart,
}

impl Tier {
    /// All tiers, in the order they are attempted
    pub const ALL: [Tier; 4] = [Tier::SimilarTracks, Tier::SimilarArtists, Tier::TagTopTracks, Tier::Chart];

    /// Name reported in `CascadeResult::sources`
    pub fn label(&self) -> &'static str {
        match self {
            Tier::SimilarTracks => "track.getSimilar",
            Tier::SimilarArtists => "artist.getSimilar",
            Tier::TagTopTracks => "tag.getTopTracks",
            Tier::Chart => "chart.getTopTracks",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeSettings {
    pub tag_count: usize,
    pub overfetch_margin: usize,
    pub source_policy: SourcePolicy,
}

impl Default for CascadeSettings {
    fn default() -> Self {
        CascadeSettings {
            tag_count: DEFAULT_TAG_COUNT,
            overfetch_margin: DEFAULT_OVERFETCH_MARGIN,
            source_policy: SourcePolicy::default(),
        }
    }
}

/// Targets for one run of the tiers
#[derive(Debug, Clone, Copy)]
struct Plan {
    /// Per-call limit, merge cap, and the count below which tiers 1-3 run
    fetch_limit: usize,
    /// The chart tier runs only while the count is below this
    chart_threshold: usize,
}

#[derive(Debug, Default)]
struct TierRun {
    tracks: Vec<Track>,
    sources: Vec<String>,
    similar_error: Option<String>,
}

/// Recommendation engine over a metadata service
#[derive(Clone)]
pub struct RecommendationCascade {
    service: Arc<dyn MetadataService>,
    settings: CascadeSettings,
}

impl RecommendationCascade {
    pub fn new(service: Arc<dyn MetadataService>) -> Self {
        Self {
            service,
            settings: CascadeSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: CascadeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &CascadeSettings {
        &self.settings
    }

    /// Up to `limit` tracks related to `seed`.
    ///
    /// `seed` must already be in query form (see `Seed::for_query`).
    pub fn recommend(&self, seed: &Seed, limit: usize) -> CascadeResult {
        info!("Recommending {} tracks for '{}' - '{}'", limit, seed.artist, seed.title);

        let (tags, tags_error) = self.fetch_tags(seed);
        let run = self.run_tiers(
            seed,
            &tags,
            Plan {
                fetch_limit: limit,
                chart_threshold: limit,
            },
        );

        debug!("Cascade for '{}' - '{}' used {:?}", seed.artist, seed.title, run.sources);
        CascadeResult {
            tracks: run.tracks,
            sources: run.sources,
            tags,
            errors: CascadeErrors {
                similar: run.similar_error,
                tags: tags_error,
            },
        }
    }

    /// Up to `desired` tracks related to `seed` that are not in `exclusions`.
    ///
    /// Every tier over-fetches so that enough tracks survive the exclusion filter.
    pub fn recommend_more(&self, seed: &Seed, exclusions: &ExclusionSet, desired: usize) -> MoreRecommendations {
        let fetch_limit = desired + exclusions.len() + self.settings.overfetch_margin;
        info!(
            "Recommending {} more tracks for '{}' - '{}' ({} excluded, fetching up to {})",
            desired,
            seed.artist,
            seed.title,
            exclusions.len(),
            fetch_limit
        );

        let (tags, tags_error) = self.fetch_tags(seed);
        let playcount = self.service.track_playcount(&seed.artist, &seed.title);

        let run = self.run_tiers(
            seed,
            &tags,
            Plan {
                fetch_limit,
                chart_threshold: desired,
            },
        );

        let tracks: Vec<Track> = run
            .tracks
            .into_iter()
            .filter(|track| !exclusions.contains(&track.key()))
            .take(desired)
            .collect();

        MoreRecommendations {
            cascade: CascadeResult {
                tracks,
                sources: run.sources,
                tags,
                errors: CascadeErrors {
                    similar: run.similar_error,
                    tags: tags_error,
                },
            },
            playcount,
        }
    }

    fn fetch_tags(&self, seed: &Seed) -> (Vec<String>, Option<String>) {
        match self.service.top_tags(&seed.artist, &seed.title, self.settings.tag_count) {
            Ok(tags) => (tags, None),
            Err(e) => {
                warn!("Top tags for '{}' - '{}' unavailable: {}", seed.artist, seed.title, e);
                (Vec::new(), Some(e.to_string()))
            }
        }
    }

    fn run_tiers(&self, seed: &Seed, tags: &[String], plan: Plan) -> TierRun {
        let mut run = TierRun::default();

        for tier in Tier::ALL {
            let threshold = match tier {
                Tier::Chart => plan.chart_threshold,
                _ => plan.fetch_limit,
            };
            if run.tracks.len() >= threshold {
                debug!("Skipping {}: already have {} tracks", tier.label(), run.tracks.len());
                continue;
            }
            if tier == Tier::TagTopTracks && tags.is_empty() {
                debug!("Skipping {}: seed has no tags", tier.label());
                continue;
            }

            let found = match self.attempt(tier, seed, tags, plan.fetch_limit) {
                Ok(found) => found,
                Err(e) => {
                    warn!("{} failed for '{}' - '{}': {}", tier.label(), seed.artist, seed.title, e);
                    if tier == Tier::SimilarTracks {
                        run.similar_error = Some(e.to_string());
                    }
                    Vec::new()
                }
            };

            let before = run.tracks.len();
            let merged = merge_unique_tracks(&run.tracks, &found, plan.fetch_limit);
            let contributed = match self.settings.source_policy {
                SourcePolicy::Contributed => merged.len() > before,
                SourcePolicy::RawOutput => !found.is_empty(),
            };
            debug!(
                "{} returned {} tracks, {} new",
                tier.label(),
                found.len(),
                merged.len() - before
            );
            if contributed {
                run.sources.push(tier.label().to_string());
            }
            run.tracks = merged;
        }

        run
    }

    fn attempt(&self, tier: Tier, seed: &Seed, tags: &[String], limit: usize) -> Result<Vec<Track>, LastfmError> {
        match tier {
            Tier::SimilarTracks => self.service.similar_by_track(&seed.artist, &seed.title, limit),
            Tier::SimilarArtists => self.similar_artist_tracks(seed, limit),
            Tier::TagTopTracks => Ok(self.tag_tracks(tags, limit)),
            Tier::Chart => self.service.chart_top_tracks(limit),
        }
    }

    /// Top track of each similar artist, credited to that artist with its similarity score
    fn similar_artist_tracks(&self, seed: &Seed, limit: usize) -> Result<Vec<Track>, LastfmError> {
        let artists = self.service.similar_artists(&seed.artist, limit)?;

        Ok(collect_isolated(&artists, |artist| {
            self.service.top_track_by_artist(&artist.name).map(|top| {
                top.map(|mut track| {
                    track.artist = artist.name.clone();
                    track.match_score = artist.match_score;
                    track
                })
            })
        }))
    }

    /// Tracks of each tag in turn until `limit` unique tracks are collected
    fn tag_tracks(&self, tags: &[String], limit: usize) -> Vec<Track> {
        let mut collected: Vec<Track> = Vec::new();
        for tag in tags {
            if collected.len() >= limit {
                break;
            }
            match self.service.top_tracks_by_tag(tag, limit) {
                Ok(found) => collected = merge_unique_tracks(&collected, &found, limit),
                Err(e) => warn!("Top tracks for tag '{}' unavailable: {}", tag, e),
            }
        }
        collected
    }
}

/// Run `lookup` for every item, keeping successful results in order.
///
/// A failing lookup is logged and skipped; it never affects the others.
pub fn collect_isolated<T, R, E, F>(items: &[T], lookup: F) -> Vec<R>
where
    F: Fn(&T) -> Result<Option<R>, E>,
    E: Display,
{
    let mut results = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match lookup(item) {
            Ok(Some(result)) => results.push(result),
            Ok(None) => {}
            Err(e) => debug!("Lookup {} of {} failed: {}", index + 1, items.len(), e),
        }
    }
    results
}
