//! Composition of selected tracks into the output track list.

use crate::distance::DistanceAccumulator;
use crate::model::{Segment, Track};
use crate::select::{date_label, KeyMatches};
use std::collections::BTreeSet;

/// Builds the final output tracks from a selection.
pub struct TrackComposer;

impl TrackComposer {
    /// Compose one output track per key (combine mode) or pass each matched
    /// track through with its own mileage comment.
    pub fn compose(matches: Vec<KeyMatches>, combine: bool) -> Vec<Track> {
        if combine {
            matches.into_iter().map(Self::combine_key).collect()
        } else {
            matches
                .into_iter()
                .flat_map(|key_matches| key_matches.tracks)
                .map(|selected| {
                    let mut track = selected.track;
                    track.comment = (selected.km > 0.0)
                        .then(|| DistanceAccumulator::miles_comment(selected.km));
                    track
                })
                .collect()
        }
    }

    /// Concatenate all matches for one key into a single track, naming it
    /// after the sorted, de-duplicated date labels of its children.
    fn combine_key(key_matches: KeyMatches) -> Track {
        let labels: BTreeSet<String> = key_matches
            .tracks
            .iter()
            .map(|selected| {
                date_label(&selected.track.name)
                    .unwrap_or(key_matches.key.date_part())
                    .to_string()
            })
            .collect();
        let label_list = labels.into_iter().collect::<Vec<_>>().join(", ");

        let source = key_matches
            .tracks
            .first()
            .map(|selected| selected.track.source.clone())
            .unwrap_or_default();
        let segments: Vec<Segment> = key_matches
            .tracks
            .into_iter()
            .flat_map(|selected| selected.track.segments)
            .collect();

        Track {
            name: format!("Combined track: {label_list}"),
            comment: Some(DistanceAccumulator::miles_comment(key_matches.total_km)),
            segments,
            source,
        }
    }

    /// Merge mode: concatenate the given tracks into one output track, no
    /// per-date naming and no mileage annotation.
    pub fn merge(tracks: Vec<Track>) -> Option<Track> {
        let first = tracks.first()?;
        let source = first.source.clone();
        let segments: Vec<Segment> = tracks
            .into_iter()
            .flat_map(|track| track.segments)
            .collect();
        Some(Track {
            name: "Merged tracks".to_string(),
            comment: None,
            segments,
            source,
        })
    }
}
