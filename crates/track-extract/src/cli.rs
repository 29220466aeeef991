//! Command-line surface.

use clap::Parser;
use std::path::PathBuf;
use track_extract_lib::pipeline::Options;

/// Extract named tracks from GPX location logs by date, optionally thinning
/// points, combining matches and deriving a KML visualization.
#[derive(Parser, Debug)]
#[command(name = "track-extract", version, about)]
pub struct Cli {
    /// Source GPX file containing one or more tracks; repeat to search
    /// several files in order.
    #[arg(short = 'i', long = "input", required = true)]
    pub input: Vec<PathBuf>,

    /// Write the extracted tracks to this file.
    #[arg(short = 'o', long = "output", default_value = "extracted_track.gpx")]
    pub output: PathBuf,

    /// Extract the track matching this ISO date or date-time
    /// (yyyy-mm-dd [hh:mm[:ss]]); repeat to append.
    #[arg(short = 'd', long = "date")]
    pub date: Vec<String>,

    /// List all dates that have tracks associated with them and exit.
    #[arg(short = 'e', long = "extract")]
    pub extract: bool,

    /// Combine all tracks that match a date into one output track.
    #[arg(short = 'c', long = "combine")]
    pub combine: bool,

    /// Ignore dates and concatenate every recorded track.
    #[arg(short = 'm', long = "merge")]
    pub merge: bool,

    /// Indent the output documents.
    #[arg(short = 'p', long = "pretty")]
    pub pretty: bool,

    /// Drop points within this many kilometres of the previously kept point.
    #[arg(short = 't', long = "thindistance", conflicts_with = "thinorientation")]
    pub thindistance: Option<f64>,

    /// Drop points whose course is within this many degrees of the
    /// previously kept point.
    #[arg(short = 'r', long = "thinorientation")]
    pub thinorientation: Option<f64>,

    /// Also write a KML visualization next to the output file.
    #[arg(short = 'k', long = "kml")]
    pub kml: bool,

    /// Suppress per-track point markers in the KML file.
    #[arg(short = 'n', long = "nopoints")]
    pub nopoints: bool,

    /// Look up a blog post for each track date and record it in the KML
    /// description.
    #[arg(short = 'b', long = "addblogurl")]
    pub addblogurl: bool,

    /// Drop points recorded after this ISO date-time.
    #[arg(long = "datetimecutoff")]
    pub datetimecutoff: Option<String>,

    /// Fixed UTC offset (+hh:mm/-hh:mm) applied to the cutoff instant.
    #[arg(long = "timeoffsetfromutc", requires = "datetimecutoff")]
    pub timeoffsetfromutc: Option<String>,
}

impl Cli {
    /// Translate the parsed flags into the pipeline configuration.
    pub fn into_options(self) -> Options {
        Options {
            inputs: self.input,
            output: self.output,
            dates: self.date,
            extract: self.extract,
            combine: self.combine,
            merge: self.merge,
            pretty: self.pretty,
            thin_distance: self.thindistance,
            thin_orientation: self.thinorientation,
            kml: self.kml,
            no_points: self.nopoints,
            add_blog_url: self.addblogurl,
            datetime_cutoff: self.datetimecutoff,
            time_offset_from_utc: self.timeoffsetfromutc,
        }
    }
}
