//! GPX document parsing and serialization.
//!
//! Parsing walks the XML event stream once and builds the owned
//! [`Track`]/[`Segment`]/[`TrackPoint`] model; there is no live document
//! tree to mutate. Serialization emits the fixed GPX 1.0 envelope.

use crate::blog::{BlogFinder, HttpProber};
use crate::kml::{self, KmlOptions};
use crate::model::{Segment, Source, Track, TrackPoint};
use crate::{ExtractError, GeoPoint, Result};
use chrono::{DateTime, Utc};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fmt::Write as _;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const GPX_HEADER: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n",
    "<gpx version=\"1.0\"\n",
    " creator=\"track-extract\"\n",
    " xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\"\n",
    " xmlns=\"http://www.topografix.com/GPX/1/0\"\n",
    " xsi:schemaLocation=\"http://www.topografix.com/GPX/1/0 http://www.topografix.com/GPX/1/0/gpx.xsd\">\n",
);
const GPX_FOOTER: &str = "</gpx>\n";

/// Which element's character data is being collected.
#[derive(Clone, Copy, Debug, PartialEq)]
enum TextTarget {
    TrackName,
    TrackComment,
    Elevation,
    Time,
    Course,
}

#[derive(Debug, Default)]
struct PendingPoint {
    lat: Option<f64>,
    lon: Option<f64>,
    elevation: Option<f64>,
    time: Option<DateTime<Utc>>,
    course: Option<f64>,
}

/// Parse one GPX file into its discovered tracks.
pub fn read_tracks(path: &Path) -> Result<Source> {
    let display_path = path.display().to_string();
    let file = File::open(path).map_err(|source| ExtractError::InputOpen {
        path: display_path.clone(),
        source,
    })?;
    let mut reader = Reader::from_reader(BufReader::new(file));

    let parse_error = |detail: String| ExtractError::Parse {
        path: display_path.clone(),
        detail,
    };

    let mut tracks: Vec<Track> = Vec::new();
    let mut current_track: Option<Track> = None;
    let mut current_segment: Option<Segment> = None;
    let mut current_point: Option<PendingPoint> = None;
    let mut text_target: Option<TextTarget> = None;
    let mut text = String::new();
    let mut buf = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| parse_error(e.to_string()))?;
        match event {
            Event::Eof => break,
            Event::Start(ref element) => match element.name().as_ref() {
                b"trk" => {
                    current_track = Some(Track {
                        name: String::new(),
                        comment: None,
                        segments: Vec::new(),
                        source: display_path.clone(),
                    });
                }
                b"trkseg" if current_track.is_some() => {
                    current_segment = Some(Segment::default());
                }
                b"trkpt" if current_segment.is_some() => {
                    current_point = Some(read_point_attributes(element, &parse_error)?);
                }
                b"name" if current_track.is_some() && current_point.is_none() => {
                    text_target = Some(TextTarget::TrackName);
                    text.clear();
                }
                b"cmt" if current_track.is_some() && current_point.is_none() => {
                    text_target = Some(TextTarget::TrackComment);
                    text.clear();
                }
                b"ele" if current_point.is_some() => {
                    text_target = Some(TextTarget::Elevation);
                    text.clear();
                }
                b"time" if current_point.is_some() => {
                    text_target = Some(TextTarget::Time);
                    text.clear();
                }
                b"course" if current_point.is_some() => {
                    text_target = Some(TextTarget::Course);
                    text.clear();
                }
                _ => {}
            },
            Event::Empty(ref element) => {
                if element.name().as_ref() == b"trkpt" {
                    if let Some(segment) = current_segment.as_mut() {
                        let pending = read_point_attributes(element, &parse_error)?;
                        segment.points.push(finish_point(pending, &parse_error)?);
                    }
                }
            }
            Event::Text(ref chunk) => {
                if text_target.is_some() {
                    text.push_str(
                        &chunk
                            .unescape()
                            .map_err(|e| parse_error(e.to_string()))?,
                    );
                }
            }
            Event::End(ref element) => match element.name().as_ref() {
                b"trk" => {
                    if let Some(track) = current_track.take() {
                        debug!(track = %track.name, points = track.point_count(), "parsed track");
                        tracks.push(track);
                    }
                }
                b"trkseg" => {
                    if let (Some(track), Some(segment)) =
                        (current_track.as_mut(), current_segment.take())
                    {
                        track.segments.push(segment);
                    }
                }
                b"trkpt" => {
                    if let (Some(segment), Some(pending)) =
                        (current_segment.as_mut(), current_point.take())
                    {
                        segment.points.push(finish_point(pending, &parse_error)?);
                    }
                }
                _ => {
                    if let Some(target) = text_target.take() {
                        assign_text(
                            target,
                            &text,
                            current_track.as_mut(),
                            current_point.as_mut(),
                            &parse_error,
                        )?;
                    }
                }
            },
            _ => {}
        }
        buf.clear();
    }

    info!(path = %display_path, tracks = tracks.len(), "parsed input file");
    Ok(Source {
        path: display_path,
        tracks,
    })
}

fn read_point_attributes(
    element: &quick_xml::events::BytesStart<'_>,
    parse_error: &impl Fn(String) -> ExtractError,
) -> Result<PendingPoint> {
    let mut pending = PendingPoint::default();
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| parse_error(e.to_string()))?;
        let value = attribute
            .unescape_value()
            .map_err(|e| parse_error(e.to_string()))?;
        match attribute.key.as_ref() {
            b"lat" => {
                pending.lat = Some(
                    value
                        .parse()
                        .map_err(|_| parse_error(format!("bad latitude '{value}'")))?,
                );
            }
            b"lon" => {
                pending.lon = Some(
                    value
                        .parse()
                        .map_err(|_| parse_error(format!("bad longitude '{value}'")))?,
                );
            }
            _ => {}
        }
    }
    Ok(pending)
}

fn finish_point(
    pending: PendingPoint,
    parse_error: &impl Fn(String) -> ExtractError,
) -> Result<TrackPoint> {
    let lat = pending
        .lat
        .ok_or_else(|| parse_error("track point without lat attribute".to_string()))?;
    let lon = pending
        .lon
        .ok_or_else(|| parse_error("track point without lon attribute".to_string()))?;
    let geo = GeoPoint::from_degrees(lat, lon, pending.course.unwrap_or(0.0))?;
    Ok(TrackPoint {
        geo,
        elevation: pending.elevation,
        time: pending.time,
        course: pending.course,
    })
}

fn assign_text(
    target: TextTarget,
    text: &str,
    track: Option<&mut Track>,
    point: Option<&mut PendingPoint>,
    parse_error: &impl Fn(String) -> ExtractError,
) -> Result<()> {
    let trimmed = text.trim();
    match target {
        TextTarget::TrackName => {
            if let Some(track) = track {
                track.name = trimmed.to_string();
            }
        }
        TextTarget::TrackComment => {
            if let Some(track) = track {
                track.comment = Some(trimmed.to_string());
            }
        }
        TextTarget::Elevation => {
            if let Some(point) = point {
                point.elevation = Some(
                    trimmed
                        .parse()
                        .map_err(|_| parse_error(format!("bad elevation '{trimmed}'")))?,
                );
            }
        }
        TextTarget::Time => {
            if let Some(point) = point {
                let instant = DateTime::parse_from_rfc3339(trimmed)
                    .map_err(|_| parse_error(format!("bad timestamp '{trimmed}'")))?;
                point.time = Some(instant.with_timezone(&Utc));
            }
        }
        TextTarget::Course => {
            if let Some(point) = point {
                point.course = Some(
                    trimmed
                        .parse()
                        .map_err(|_| parse_error(format!("bad course '{trimmed}'")))?,
                );
            }
        }
    }
    Ok(())
}

/// Serialize tracks into the fixed GPX 1.0 envelope at `path`.
pub fn write_tracks(tracks: &[Track], path: &Path, pretty: bool) -> Result<()> {
    let mut doc = String::with_capacity(1024);
    doc.push_str(GPX_HEADER);
    for track in tracks {
        render_track(&mut doc, track, pretty);
    }
    doc.push_str(GPX_FOOTER);

    std::fs::write(path, doc).map_err(|source| ExtractError::OutputWrite {
        path: path.display().to_string(),
        source,
    })
}

fn render_track(doc: &mut String, track: &Track, pretty: bool) {
    let nl = |level: usize| -> String {
        if pretty {
            format!("\n{}", "  ".repeat(level))
        } else {
            String::new()
        }
    };

    doc.push_str("<trk>");
    let _ = write!(doc, "{}<name>{}</name>", nl(1), escape(&track.name));
    if let Some(comment) = &track.comment {
        let _ = write!(doc, "{}<cmt>{}</cmt>", nl(1), escape(comment));
    }
    for segment in &track.segments {
        let _ = write!(doc, "{}<trkseg>", nl(1));
        for point in &segment.points {
            let _ = write!(
                doc,
                "{}<trkpt lat=\"{}\" lon=\"{}\">",
                nl(2),
                point.geo.latitude(),
                point.geo.longitude()
            );
            // A missing elevation serializes as the default 0.
            let _ = write!(doc, "{}<ele>{}</ele>", nl(3), point.elevation.unwrap_or(0.0));
            if let Some(time) = &point.time {
                let _ = write!(
                    doc,
                    "{}<time>{}</time>",
                    nl(3),
                    time.format("%Y-%m-%dT%H:%M:%SZ")
                );
            }
            if let Some(course) = point.course {
                let _ = write!(doc, "{}<course>{}</course>", nl(3), course);
            }
            let _ = write!(doc, "{}</trkpt>", nl(2));
        }
        let _ = write!(doc, "{}</trkseg>", nl(1));
    }
    doc.push_str(&nl(0));
    doc.push_str("</trk>\n");
}

/// Export settings for one invocation.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExportOptions {
    pub pretty: bool,
    /// Also derive the KML visualization.
    pub kml: bool,
    /// Emit a point marker per track in the KML.
    pub markers: bool,
    /// Probe for a blog post per track date and record it in the KML.
    pub blog_urls: bool,
}

/// Writes the final track document and, on request, the derived KML file.
pub struct Exporter {
    options: ExportOptions,
}

impl Exporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    /// Write `tracks` to `output`; returns the KML path when one was
    /// written.
    pub fn export(&self, tracks: &[Track], output: &Path) -> Result<Option<PathBuf>> {
        write_tracks(tracks, output, self.options.pretty)?;
        info!(path = %output.display(), tracks = tracks.len(), "wrote track document");

        if !self.options.kml {
            return Ok(None);
        }

        // Re-read the document just written so the visualization observes
        // exactly the post-thinning geometry the primary consumer sees.
        let reread = read_tracks(output)?;
        let kml_path = output.with_extension("kml");
        let kml_options = KmlOptions {
            markers: self.options.markers,
            pretty: self.options.pretty,
        };
        if self.options.blog_urls {
            let prober = HttpProber::new()?;
            let finder = BlogFinder::new(&prober);
            kml::write_kml(&reread.tracks, &kml_path, &kml_options, Some(&finder))?;
        } else {
            kml::write_kml(&reread.tracks, &kml_path, &kml_options, None)?;
        }
        info!(path = %kml_path.display(), "wrote visualization document");
        Ok(Some(kml_path))
    }
}
