//! End-to-end orchestration of one batch invocation.
//!
//! The binary translates CLI flags into an explicit [`Options`] value; no
//! ambient state crosses this boundary.

use crate::compose::TrackComposer;
use crate::cutoff::CutoffFilter;
use crate::gpx::{self, Exporter, ExportOptions};
use crate::model::{Source, Track};
use crate::select::{DateKey, SelectorConfig, TrackSelector, SENTINEL_LABEL};
use crate::thin::ThinMode;
use crate::{ExtractError, Result};
use std::path::PathBuf;
use tracing::info;

/// Explicit configuration for one run.
#[derive(Clone, Debug)]
pub struct Options {
    /// Input files, searched in the order supplied.
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    /// Requested ISO dates or date-times, processed in request order.
    pub dates: Vec<String>,
    /// List discoverable date-bearing tracks and exit.
    pub extract: bool,
    /// Combine all matches per date into one output track.
    pub combine: bool,
    /// Concatenate every date-bearing track regardless of date.
    pub merge: bool,
    pub pretty: bool,
    /// Distance thinning threshold, km.
    pub thin_distance: Option<f64>,
    /// Orientation thinning threshold, degrees.
    pub thin_orientation: Option<f64>,
    /// Also write the KML visualization.
    pub kml: bool,
    /// Suppress point markers in the visualization.
    pub no_points: bool,
    /// Enrich visualization descriptions with discovered blog URLs.
    pub add_blog_url: bool,
    /// ISO date-time cutoff.
    pub datetime_cutoff: Option<String>,
    /// `+hh:mm`/`-hh:mm` offset applied to the cutoff instant.
    pub time_offset_from_utc: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            output: PathBuf::from("extracted_track.gpx"),
            dates: Vec::new(),
            extract: false,
            combine: false,
            merge: false,
            pretty: false,
            thin_distance: None,
            thin_orientation: None,
            kml: false,
            no_points: false,
            add_blog_url: false,
            datetime_cutoff: None,
            time_offset_from_utc: None,
        }
    }
}

/// What one run produced.
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Track labels listed by extract mode.
    pub listed: Vec<String>,
    /// The written track document.
    pub output: Option<PathBuf>,
    /// The written visualization document, when requested.
    pub kml: Option<PathBuf>,
}

/// Run one batch invocation to completion.
pub fn run(options: &Options) -> Result<RunOutcome> {
    validate(options)?;

    let sources: Vec<Source> = options
        .inputs
        .iter()
        .map(|path| gpx::read_tracks(path))
        .collect::<Result<_>>()?;

    if options.extract {
        let listed = TrackSelector::list_dated_tracks(&sources);
        if listed.is_empty() {
            return Err(ExtractError::NoMatch {
                key: SENTINEL_LABEL.to_string(),
                scope: "any input".to_string(),
            });
        }
        return Ok(RunOutcome {
            listed,
            ..RunOutcome::default()
        });
    }

    let tracks = if options.merge {
        let merged = TrackSelector::merge(&sources);
        info!(tracks = merged.len(), "merge mode selected tracks");
        let track = TrackComposer::merge(merged).ok_or_else(|| ExtractError::NoMatch {
            key: SENTINEL_LABEL.to_string(),
            scope: "any input".to_string(),
        })?;
        vec![track]
    } else {
        select_by_date(options, &sources)?
    };

    let exporter = Exporter::new(ExportOptions {
        pretty: options.pretty,
        kml: options.kml,
        markers: !options.no_points,
        blog_urls: options.add_blog_url,
    });
    let kml_path = exporter.export(&tracks, &options.output)?;

    Ok(RunOutcome {
        listed: Vec::new(),
        output: Some(options.output.clone()),
        kml: kml_path,
    })
}

fn select_by_date(options: &Options, sources: &[Source]) -> Result<Vec<Track>> {
    let keys: Vec<DateKey> = options
        .dates
        .iter()
        .map(|raw| DateKey::parse(raw))
        .collect::<Result<_>>()?;

    let cutoff = options
        .datetime_cutoff
        .as_deref()
        .map(|raw| CutoffFilter::parse(raw, options.time_offset_from_utc.as_deref()))
        .transpose()?;
    let config = SelectorConfig {
        combine: options.combine,
        thin: thin_mode(options),
        cutoff,
    };

    let matches = TrackSelector::new(config).select(sources, &keys)?;
    Ok(TrackComposer::compose(matches, options.combine))
}

fn thin_mode(options: &Options) -> Option<ThinMode> {
    options
        .thin_distance
        .map(ThinMode::Distance)
        .or(options.thin_orientation.map(ThinMode::Orientation))
}

fn validate(options: &Options) -> Result<()> {
    if options.inputs.is_empty() {
        return Err(ExtractError::InvalidArgument(
            "at least one input file is required".to_string(),
        ));
    }
    if options.thin_distance.is_some() && options.thin_orientation.is_some() {
        return Err(ExtractError::ConfigurationConflict(
            "--thindistance and --thinorientation are mutually exclusive".to_string(),
        ));
    }
    for threshold in [options.thin_distance, options.thin_orientation]
        .into_iter()
        .flatten()
    {
        if threshold < 0.0 || !threshold.is_finite() {
            return Err(ExtractError::InvalidArgument(format!(
                "thinning threshold must be non-negative, got {threshold}"
            )));
        }
    }
    if options.time_offset_from_utc.is_some() && options.datetime_cutoff.is_none() {
        return Err(ExtractError::ConfigurationConflict(
            "--timeoffsetfromutc requires --datetimecutoff".to_string(),
        ));
    }
    if !options.extract && !options.merge && options.dates.is_empty() {
        return Err(ExtractError::ConfigurationConflict(
            "no date specified; use --date, --extract or --merge".to_string(),
        ));
    }
    Ok(())
}
