//! Owned track data model produced by the GPX parser.
//!
//! The parser builds these structures in a single pass; all later stages
//! (thinning, cutoff, selection) operate on the owned vectors rather than
//! on a live document tree.

use crate::geopoint::GeoPoint;
use chrono::{DateTime, Utc};

/// One recorded location fix.
#[derive(Clone, Debug)]
pub struct TrackPoint {
    pub geo: GeoPoint,
    /// Elevation in metres; a missing value serializes as 0.
    pub elevation: Option<f64>,
    /// Recording instant, UTC.
    pub time: Option<DateTime<Utc>>,
    /// Course over ground in degrees, when the receiver recorded one.
    /// `geo` carries the same value, or 0 when absent.
    pub course: Option<f64>,
}

/// A contiguous ordered run of track points.
#[derive(Clone, Debug, Default)]
pub struct Segment {
    pub points: Vec<TrackPoint>,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A named recorded path composed of one or more segments.
#[derive(Clone, Debug)]
pub struct Track {
    /// Label as recorded by the logger; embeds a date/time string.
    pub name: String,
    /// Synthesized aggregate-distance comment, if any.
    pub comment: Option<String>,
    pub segments: Vec<Segment>,
    /// Path of the input file this track was parsed from.
    pub source: String,
}

impl Track {
    /// Total number of points across all segments.
    pub fn point_count(&self) -> usize {
        self.segments.iter().map(Segment::len).sum()
    }
}

/// One parsed input file and the tracks discovered in it.
#[derive(Clone, Debug)]
pub struct Source {
    pub path: String,
    pub tracks: Vec<Track>,
}
