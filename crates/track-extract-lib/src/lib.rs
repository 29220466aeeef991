//! Track Extract Library - Core Operations for GPX Track Extraction
//!
//! This library locates named tracks inside GPX location logs, optionally
//! reduces their point density, computes travel distance, and serializes a
//! normalized combined track document plus an optional KML visualization.
//!
//! # Architecture
//!
//! - **[`GeoPoint`]**: spherical coordinate with great-circle distance and
//!   bounding-box computation
//! - **[`PointThinner`]**: distance- and orientation-based segment thinning
//! - **[`CutoffFilter`]**: time-cutoff filtering with distance correction
//! - **[`TrackSelector`]**: date-key matching across multiple input sources
//! - **[`TrackComposer`]**: combination of matched tracks into output tracks
//! - **[`Exporter`]**: GPX serialization and KML derivation
//!
//! The [`pipeline`] module wires these together for one batch invocation.

mod blog;
mod compose;
mod cutoff;
mod distance;
mod geopoint;
mod gpx;
mod kml;
mod model;
pub mod pipeline;
mod select;
mod thin;

// Public API exports
pub use blog::{BlogFinder, HttpProber, UrlProber, NOT_FOUND_MARKER};
pub use compose::TrackComposer;
pub use cutoff::{CutoffFilter, CutoffOutcome};
pub use distance::{DistanceAccumulator, KM_TO_MILES};
pub use geopoint::{GeoPoint, EARTH_RADIUS_KM};
pub use gpx::{read_tracks, write_tracks, Exporter, ExportOptions};
pub use kml::{KmlOptions, MONTH_NAMES, WEEKDAY_NAMES};
pub use model::{Segment, Source, Track, TrackPoint};
pub use select::{DateKey, KeyMatches, SelectedTrack, SelectorConfig, TrackSelector, SENTINEL_LABEL};
pub use thin::{PointThinner, ThinMode};

/// Error types for the extraction pipeline
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("{what} {value} is out of range")]
    OutOfRange { what: &'static str, value: f64 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("conflicting configuration: {0}")]
    ConfigurationConflict(String),

    #[error("unable to open input file '{path}': {source}")]
    InputOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed track document '{path}': {detail}")]
    Parse { path: String, detail: String },

    #[error("no matching track for '{key}' found in {scope}")]
    NoMatch { key: String, scope: String },

    #[error("more than one track matches '{key}': {}", .names.join(", "))]
    MultipleMatch { key: String, names: Vec<String> },

    #[error("track '{track}' has points without course data")]
    MissingCourseData { track: String },

    #[error("unable to write output file '{path}': {source}")]
    OutputWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("blog lookup failed for '{url}': {detail}")]
    NetworkLookup { url: String, detail: String },
}

pub type Result<T> = std::result::Result<T, ExtractError>;
