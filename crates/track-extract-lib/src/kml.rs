//! KML visualization derived from the exported track document.

use crate::blog::BlogFinder;
use crate::model::Track;
use crate::select::date_label;
use crate::{ExtractError, Result};
use chrono::{Datelike, NaiveDate};
use quick_xml::escape::escape;
use std::fmt::Write as _;
use std::path::Path;
use tracing::debug;

/// Month names indexed by 1-based month number; position 0 is unused.
pub const MONTH_NAMES: [&str; 13] = [
    "",
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Weekday names with Monday at position 0.
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const KML_HEADER: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n",
    "<kml xmlns=\"http://www.opengis.net/kml/2.2\">\n",
    "<Document>\n",
);
const KML_FOOTER: &str = "</Document>\n</kml>\n";

const TRACK_STYLE_ID: &str = "trackLine";
const FINAL_TRACK_STYLE_ID: &str = "finalTrackLine";

/// Rendering options for the visualization document.
#[derive(Clone, Copy, Debug)]
pub struct KmlOptions {
    /// Emit one point marker per track.
    pub markers: bool,
    pub pretty: bool,
}

impl Default for KmlOptions {
    fn default() -> Self {
        Self {
            markers: true,
            pretty: false,
        }
    }
}

/// Write the KML document for the given tracks to `path`.
///
/// With a [`BlogFinder`] present, each dated track's description is enriched
/// with the discovered post URL (or the not-found marker).
pub fn write_kml(
    tracks: &[Track],
    path: &Path,
    options: &KmlOptions,
    finder: Option<&BlogFinder<'_>>,
) -> Result<()> {
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "tracks".to_string());
    let doc = render(tracks, &name, options, finder)?;
    std::fs::write(path, doc).map_err(|source| ExtractError::OutputWrite {
        path: path.display().to_string(),
        source,
    })
}

fn render(
    tracks: &[Track],
    document_name: &str,
    options: &KmlOptions,
    finder: Option<&BlogFinder<'_>>,
) -> Result<String> {
    let mut doc = String::with_capacity(1024);
    doc.push_str(KML_HEADER);
    let _ = writeln!(doc, "<name>{}</name>", escape(document_name));
    push_line_style(&mut doc, TRACK_STYLE_ID, "ff0000ff");
    push_line_style(&mut doc, FINAL_TRACK_STYLE_ID, "ffff0000");

    for (index, track) in tracks.iter().enumerate() {
        let is_last = index + 1 == tracks.len();
        let title = track_title(track);
        let description = track_description(track, finder)?;
        let style = if is_last {
            FINAL_TRACK_STYLE_ID
        } else {
            TRACK_STYLE_ID
        };
        debug!(track = %track.name, %title, is_last, "rendering visualization track");

        doc.push_str("<Placemark>\n");
        let _ = writeln!(doc, "<name>{}</name>", escape(&title));
        if !description.is_empty() {
            let _ = writeln!(doc, "<description>{}</description>", escape(&description));
        }
        let _ = writeln!(doc, "<styleUrl>#{style}</styleUrl>");
        doc.push_str("<LineString>\n<tessellate>1</tessellate>\n<coordinates>");
        let separator = if options.pretty { "\n" } else { " " };
        for point in track.segments.iter().flat_map(|segment| segment.points.iter()) {
            let _ = write!(
                doc,
                "{separator}{},{},{}",
                point.geo.longitude(),
                point.geo.latitude(),
                point.elevation.unwrap_or(0.0)
            );
        }
        doc.push_str("\n</coordinates>\n</LineString>\n</Placemark>\n");

        if options.markers {
            if let Some(first) = track
                .segments
                .iter()
                .flat_map(|segment| segment.points.iter())
                .next()
            {
                doc.push_str("<Placemark>\n");
                let _ = writeln!(doc, "<name>{}</name>", escape(&format!("{title} start")));
                let _ = writeln!(
                    doc,
                    "<Point>\n<coordinates>{},{},{}</coordinates>\n</Point>",
                    first.geo.longitude(),
                    first.geo.latitude(),
                    first.elevation.unwrap_or(0.0)
                );
                doc.push_str("</Placemark>\n");
            }
        }
    }

    doc.push_str(KML_FOOTER);
    Ok(doc)
}

fn push_line_style(doc: &mut String, id: &str, color: &str) {
    let _ = writeln!(
        doc,
        "<Style id=\"{id}\">\n<LineStyle>\n<color>{color}</color>\n<width>3</width>\n</LineStyle>\n</Style>"
    );
}

/// Human title from the calendar tables and the date embedded in the track
/// label; tracks without a parseable date keep their label.
fn track_title(track: &Track) -> String {
    match parsed_date(&track.name) {
        Some(date) => {
            let weekday = WEEKDAY_NAMES[date.weekday().num_days_from_monday() as usize];
            let month = MONTH_NAMES[date.month() as usize];
            format!("{weekday} {month} {}, {}", date.day(), date.year())
        }
        None => track.name.clone(),
    }
}

fn track_description(track: &Track, finder: Option<&BlogFinder<'_>>) -> Result<String> {
    let mut description = track.comment.clone().unwrap_or_default();
    if let Some(finder) = finder {
        if let Some(date) = parsed_date(&track.name) {
            let found = finder.find_for_date(date)?;
            if !description.is_empty() {
                description.push('\n');
            }
            let _ = write!(description, "Blog: {found}");
        }
    }
    Ok(description)
}

fn parsed_date(name: &str) -> Option<NaiveDate> {
    date_label(name).and_then(|label| NaiveDate::parse_from_str(label, "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blog::{UrlProber, NOT_FOUND_MARKER};
    use crate::geopoint::GeoPoint;
    use crate::model::{Segment, TrackPoint};

    fn point(lat: f64, lon: f64) -> TrackPoint {
        TrackPoint {
            geo: GeoPoint::from_degrees(lat, lon, 0.0).unwrap(),
            elevation: Some(10.0),
            time: None,
            course: None,
        }
    }

    fn track(name: &str) -> Track {
        Track {
            name: name.to_string(),
            comment: Some("Miles travelled: 6".to_string()),
            segments: vec![Segment {
                points: vec![point(51.5, -0.12), point(51.6, -0.13)],
            }],
            source: "a.gpx".to_string(),
        }
    }

    struct NeverFound;

    impl UrlProber for NeverFound {
        fn probe(&self, _url: &str) -> crate::Result<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_calendar_table_index_semantics() {
        assert_eq!(MONTH_NAMES[0], "");
        assert_eq!(MONTH_NAMES[1], "January");
        assert_eq!(MONTH_NAMES[12], "December");
        assert_eq!(WEEKDAY_NAMES[0], "Monday");
        assert_eq!(WEEKDAY_NAMES[6], "Sunday");
    }

    #[test]
    fn test_track_title_uses_lookup_tables() {
        // 2023-05-01 was a Monday
        let title = track_title(&track("Active Log: 2023-05-01 08:00:00"));
        assert_eq!(title, "Monday May 1, 2023");

        let untitled = track_title(&track("Merged tracks"));
        assert_eq!(untitled, "Merged tracks");
    }

    #[test]
    fn test_last_track_gets_alternate_style() {
        let tracks = vec![
            track("Active Log: 2023-05-01 08:00:00"),
            track("Active Log: 2023-05-02 08:00:00"),
        ];
        let doc = render(&tracks, "out", &KmlOptions::default(), None).unwrap();

        let first_style = doc.find("#trackLine").unwrap();
        let last_style = doc.find("#finalTrackLine").unwrap();
        assert!(first_style < last_style);
        assert_eq!(doc.matches("#finalTrackLine").count(), 1);
    }

    #[test]
    fn test_markers_can_be_suppressed() {
        let tracks = vec![track("Active Log: 2023-05-01 08:00:00")];
        let with_markers = render(&tracks, "out", &KmlOptions::default(), None).unwrap();
        let without = render(
            &tracks,
            "out",
            &KmlOptions {
                markers: false,
                pretty: false,
            },
            None,
        )
        .unwrap();

        assert!(with_markers.contains("<Point>"));
        assert!(!without.contains("<Point>"));
    }

    #[test]
    fn test_coordinates_are_lon_lat_ele() {
        let tracks = vec![track("Active Log: 2023-05-01 08:00:00")];
        let doc = render(&tracks, "out", &KmlOptions::default(), None).unwrap();
        assert!(doc.contains("-0.12,51.5,10"));
    }

    #[test]
    fn test_description_records_not_found_marker() {
        let prober = NeverFound;
        let finder = BlogFinder::new(&prober);
        let tracks = vec![track("Active Log: 2023-05-01 08:00:00")];
        let doc = render(&tracks, "out", &KmlOptions::default(), Some(&finder)).unwrap();
        assert!(doc.contains(&format!("Blog: {NOT_FOUND_MARKER}")));
    }
}
