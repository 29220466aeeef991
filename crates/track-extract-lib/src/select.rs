//! Date-key normalization and the track selection state machine.
//!
//! Selection matches requested date keys against track labels across every
//! input source, enforces the one-match-unless-combining rule, and walks the
//! matched tracks through cutoff filtering, thinning and distance
//! accumulation.

use crate::cutoff::{parse_iso_datetime, CutoffFilter};
use crate::distance::DistanceAccumulator;
use crate::model::{Source, Track};
use crate::thin::{PointThinner, ThinMode};
use crate::{ExtractError, Result};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Label fragment identifying date-bearing tracks recorded by the logger.
pub const SENTINEL_LABEL: &str = "Active Log";

/// A normalized date (`YYYY-MM-DD`) or date-time (`YYYY-MM-DD HH:MM`)
/// string, matched against track labels by substring.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateKey(String);

impl DateKey {
    /// Normalize a user-supplied ISO string. The minute-resolution form is
    /// produced only when the raw input carried more than a bare date.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let parsed = parse_iso_datetime(trimmed)?;
        if trimmed.len() > 10 {
            Ok(DateKey(parsed.format("%Y-%m-%d %H:%M").to_string()))
        } else {
            Ok(DateKey(parsed.format("%Y-%m-%d").to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `YYYY-MM-DD` prefix.
    pub fn date_part(&self) -> &str {
        &self.0[..10]
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// First `YYYY-MM-DD` shaped substring embedded in a track label.
pub fn date_label(name: &str) -> Option<&str> {
    let bytes = name.as_bytes();
    bytes
        .windows(10)
        .position(is_date_shape)
        .map(|start| &name[start..start + 10])
}

fn is_date_shape(window: &[u8]) -> bool {
    window.iter().enumerate().all(|(i, &b)| match i {
        4 | 7 => b == b'-',
        _ => b.is_ascii_digit(),
    })
}

/// Per-invocation selection settings.
#[derive(Clone, Copy, Debug, Default)]
pub struct SelectorConfig {
    /// Accept several matches per key and feed them into one combined
    /// output track.
    pub combine: bool,
    pub thin: Option<ThinMode>,
    pub cutoff: Option<CutoffFilter>,
}

/// One matched track after cutoff, thinning and distance accumulation.
#[derive(Clone, Debug)]
pub struct SelectedTrack {
    pub track: Track,
    /// Distance over this track's retained points, km.
    pub km: f64,
}

/// Every accepted track for one requested date key.
#[derive(Clone, Debug)]
pub struct KeyMatches {
    pub key: DateKey,
    pub tracks: Vec<SelectedTrack>,
    /// Aggregate distance across all matched tracks, km.
    pub total_km: f64,
}

/// State machine over (requested date key × input source).
///
/// Resolution is memoized per (key, source) pair: once a pair has been
/// queried its match set is final and is never recomputed, so a repeated
/// key cannot be reprocessed after accumulation begins.
pub struct TrackSelector {
    config: SelectorConfig,
    resolved: HashMap<(DateKey, String), Vec<usize>>,
}

impl TrackSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self {
            config,
            resolved: HashMap::new(),
        }
    }

    /// Match the requested keys against every source, in request order,
    /// walking each accepted track through the configured processing.
    pub fn select(&mut self, sources: &[Source], keys: &[DateKey]) -> Result<Vec<KeyMatches>> {
        if let Some(ThinMode::Orientation(_)) = self.config.thin {
            // File-wide check up front so a partial thin is never produced.
            PointThinner::check_course_coverage(
                sources.iter().flat_map(|source| source.tracks.iter()),
            )?;
        }

        let multi_source = sources.len() > 1;
        let mut accumulator = DistanceAccumulator::new();
        let mut results: Vec<KeyMatches> = Vec::new();

        for key in keys {
            if results.iter().any(|matches| matches.key == *key) {
                debug!(%key, "date key already resolved, skipping repeat");
                continue;
            }

            let mut matched: Vec<(usize, usize)> = Vec::new();
            for (source_index, source) in sources.iter().enumerate() {
                let indices = self.resolve(key, source);
                if indices.is_empty() && !multi_source {
                    return Err(ExtractError::NoMatch {
                        key: key.to_string(),
                        scope: format!("'{}'", source.path),
                    });
                }
                matched.extend(indices.into_iter().map(|track| (source_index, track)));
            }

            if matched.is_empty() {
                warn!(%key, "no source matched this key");
                continue;
            }
            if matched.len() > 1 && !self.config.combine {
                let names = matched
                    .iter()
                    .map(|&(source, track)| sources[source].tracks[track].name.clone())
                    .collect();
                return Err(ExtractError::MultipleMatch {
                    key: key.to_string(),
                    names,
                });
            }

            let mut tracks = Vec::with_capacity(matched.len());
            for &(source_index, track_index) in &matched {
                let before = accumulator.track_km();
                let track =
                    self.process_track(&sources[source_index].tracks[track_index], &mut accumulator);
                let km = accumulator.track_km() - before;
                if !self.config.combine {
                    accumulator.finish_track();
                }
                info!(%key, track = %track.name, km, "accepted track");
                tracks.push(SelectedTrack { track, km });
            }
            let total_km = if self.config.combine {
                accumulator.finish_track()
            } else {
                tracks.iter().map(|selected| selected.km).sum()
            };

            results.push(KeyMatches {
                key: key.clone(),
                tracks,
                total_km,
            });
        }

        if results.is_empty() {
            return Err(ExtractError::NoMatch {
                key: keys
                    .iter()
                    .map(DateKey::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
                scope: "any input".to_string(),
            });
        }
        Ok(results)
    }

    /// Query one (key, source) pair, building the index on first use.
    fn resolve(&mut self, key: &DateKey, source: &Source) -> Vec<usize> {
        let map_key = (key.clone(), source.path.clone());
        if let Some(existing) = self.resolved.get(&map_key) {
            return existing.clone();
        }

        let indices: Vec<usize> = source
            .tracks
            .iter()
            .enumerate()
            .filter(|(_, track)| track.name.contains(key.as_str()))
            .map(|(index, _)| index)
            .collect();
        debug!(%key, source = %source.path, matches = indices.len(), "resolved date key");
        self.resolved.insert(map_key, indices.clone());
        indices
    }

    /// Cutoff, thin and accumulate one matched track.
    fn process_track(&self, track: &Track, accumulator: &mut DistanceAccumulator) -> Track {
        let mut processed = track.clone();
        for segment in &mut processed.segments {
            if let Some(filter) = &self.config.cutoff {
                filter.apply(&mut segment.points);
            }
            if segment.is_empty() {
                continue;
            }
            if let Some(mode) = self.config.thin {
                PointThinner::new(mode).thin_segment(&mut segment.points);
            }
            accumulator.add_segment(&segment.points);
        }
        processed.segments.retain(|segment| !segment.is_empty());
        processed
    }

    /// Merge mode: every sentinel-labelled track of every source, in
    /// supplied order, as-is (no thinning, no cutoff, no date filtering).
    pub fn merge(sources: &[Source]) -> Vec<Track> {
        sources
            .iter()
            .flat_map(|source| {
                source
                    .tracks
                    .iter()
                    .filter(|track| track.name.contains(SENTINEL_LABEL))
                    .cloned()
            })
            .collect()
    }

    /// Extract mode: the labels of every sentinel-labelled track.
    pub fn list_dated_tracks(sources: &[Source]) -> Vec<String> {
        sources
            .iter()
            .flat_map(|source| {
                source
                    .tracks
                    .iter()
                    .filter(|track| track.name.contains(SENTINEL_LABEL))
                    .map(|track| track.name.clone())
            })
            .collect()
    }
}
