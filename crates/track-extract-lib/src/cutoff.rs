//! Time-cutoff filtering with distance correction.

use crate::geopoint::EARTH_RADIUS_KM;
use crate::model::TrackPoint;
use crate::{ExtractError, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};

/// Drops points recorded after a configured instant.
///
/// The cutoff is a wall-clock date-time combined with a fixed UTC offset.
/// The offset is applied once at construction; every point comparison is
/// then a plain UTC comparison.
#[derive(Clone, Copy, Debug)]
pub struct CutoffFilter {
    cutoff: DateTime<Utc>,
}

/// Result of applying the cutoff to one segment.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CutoffOutcome {
    /// Points removed from the segment.
    pub dropped: usize,
    /// Segment distance in kilometres over the retained points, after the
    /// per-drop correction has been subtracted back out.
    pub distance_km: f64,
}

impl CutoffFilter {
    pub fn new(cutoff: DateTime<FixedOffset>) -> Self {
        Self {
            cutoff: cutoff.with_timezone(&Utc),
        }
    }

    /// Build a filter from an ISO date-time string and an optional
    /// `+hh:mm`/`-hh:mm` offset (zero offset when absent).
    pub fn parse(cutoff: &str, offset: Option<&str>) -> Result<Self> {
        let naive = parse_iso_datetime(cutoff)?;
        let offset = match offset {
            Some(raw) => parse_utc_offset(raw)?,
            None => Utc.fix(),
        };
        let instant = offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| {
                ExtractError::InvalidArgument(format!("ambiguous cutoff instant '{cutoff}'"))
            })?;
        Ok(Self::new(instant))
    }

    /// The configured instant, in UTC.
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    /// Apply the cutoff to one segment's points, in place.
    ///
    /// A segment whose first point already lies past the cutoff is dropped
    /// whole. Otherwise the walk accumulates the great-circle delta to each
    /// visited point and subtracts that delta back out when the point is
    /// dropped, exactly once per dropped point, so the running distance
    /// always equals the distance over the retained chain. Points without a
    /// timestamp are never dropped.
    pub fn apply(&self, points: &mut Vec<TrackPoint>) -> CutoffOutcome {
        if points.is_empty() {
            return CutoffOutcome::default();
        }

        if self.is_past_cutoff(&points[0]) {
            let dropped = points.len();
            points.clear();
            tracing::debug!(dropped, "dropped whole segment past cutoff");
            return CutoffOutcome {
                dropped,
                distance_km: 0.0,
            };
        }

        let mut retained: Vec<TrackPoint> = Vec::with_capacity(points.len());
        retained.push(points[0].clone());
        let mut anchor_geo = points[0].geo;
        let mut distance_km = 0.0;
        let mut dropped = 0;

        for candidate in &points[1..] {
            let delta = anchor_geo.distance_to(&candidate.geo, EARTH_RADIUS_KM);
            distance_km += delta;
            if self.is_past_cutoff(candidate) {
                // The delta above used a point that is not in the final
                // sequence; take it back out.
                distance_km -= delta;
                dropped += 1;
            } else {
                anchor_geo = candidate.geo;
                retained.push(candidate.clone());
            }
        }

        if dropped > 0 {
            tracing::debug!(dropped, "dropped points past cutoff");
        }
        *points = retained;
        CutoffOutcome {
            dropped,
            distance_km,
        }
    }

    fn is_past_cutoff(&self, point: &TrackPoint) -> bool {
        point.time.is_some_and(|t| t > self.cutoff)
    }
}

/// Parse `YYYY-MM-DD[ HH:MM[:SS]]` (a `T` separator is also accepted) into
/// a naive date-time; a bare date means midnight.
pub(crate) fn parse_iso_datetime(raw: &str) -> Result<NaiveDateTime> {
    let trimmed = raw.trim();
    for format in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(parsed);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight);
        }
    }
    Err(ExtractError::InvalidArgument(format!(
        "'{trimmed}' is not an ISO date or date-time"
    )))
}

/// Parse a `+hh:mm`/`-hh:mm` fixed UTC offset.
pub(crate) fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let trimmed = raw.trim();
    let invalid =
        || ExtractError::InvalidArgument(format!("'{trimmed}' is not a +hh:mm/-hh:mm offset"));

    let (sign, body) = if let Some(body) = trimmed.strip_prefix('+') {
        (1, body)
    } else if let Some(body) = trimmed.strip_prefix('-') {
        (-1, body)
    } else {
        return Err(invalid());
    };
    let (hours_text, minutes_text) = body.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours_text.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes_text.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Allow tests elsewhere to build instants tersely.
#[cfg(test)]
pub(crate) fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geopoint::GeoPoint;

    // ~0.5 km of latitude
    const HALF_KM_DEG: f64 = 0.0045;

    fn point(lat: f64, time: Option<DateTime<Utc>>) -> TrackPoint {
        TrackPoint {
            geo: GeoPoint::from_degrees(lat, 0.0, 0.0).unwrap(),
            elevation: None,
            time,
            course: None,
        }
    }

    fn chain_distance(points: &[TrackPoint]) -> f64 {
        points
            .windows(2)
            .map(|w| w[0].geo.distance_to(&w[1].geo, EARTH_RADIUS_KM))
            .sum()
    }

    fn filter_at(h: u32, mi: u32) -> CutoffFilter {
        CutoffFilter::parse(&format!("2023-05-01 {h:02}:{mi:02}"), None).unwrap()
    }

    #[test]
    fn test_whole_segment_past_cutoff_removed() {
        let mut points = vec![
            point(0.0, Some(utc(2023, 5, 1, 11, 0, 0))),
            point(HALF_KM_DEG, Some(utc(2023, 5, 1, 11, 5, 0))),
        ];
        let outcome = filter_at(10, 0).apply(&mut points);

        assert!(points.is_empty());
        assert_eq!(outcome.dropped, 2);
        assert_eq!(outcome.distance_km, 0.0);
    }

    #[test]
    fn test_correction_cancels_exactly() {
        let mut points = vec![
            point(0.0, Some(utc(2023, 5, 1, 9, 0, 0))),
            point(HALF_KM_DEG, Some(utc(2023, 5, 1, 9, 10, 0))),
            point(2.0 * HALF_KM_DEG, Some(utc(2023, 5, 1, 11, 0, 0))),
        ];
        let outcome = filter_at(10, 0).apply(&mut points);

        assert_eq!(points.len(), 2);
        assert_eq!(outcome.dropped, 1);
        assert!((outcome.distance_km - chain_distance(&points)).abs() < 1e-12);
    }

    #[test]
    fn test_consecutive_drops_do_not_double_correct() {
        let mut points = vec![
            point(0.0, Some(utc(2023, 5, 1, 9, 0, 0))),
            point(HALF_KM_DEG, Some(utc(2023, 5, 1, 9, 10, 0))),
            point(2.0 * HALF_KM_DEG, Some(utc(2023, 5, 1, 11, 0, 0))),
            point(3.0 * HALF_KM_DEG, Some(utc(2023, 5, 1, 11, 10, 0))),
            point(4.0 * HALF_KM_DEG, Some(utc(2023, 5, 1, 11, 20, 0))),
        ];
        let outcome = filter_at(10, 0).apply(&mut points);

        assert_eq!(points.len(), 2);
        assert_eq!(outcome.dropped, 3);
        assert!(outcome.distance_km > 0.0);
        assert!((outcome.distance_km - chain_distance(&points)).abs() < 1e-12);
    }

    #[test]
    fn test_points_without_timestamps_survive() {
        let mut points = vec![
            point(0.0, Some(utc(2023, 5, 1, 9, 0, 0))),
            point(HALF_KM_DEG, None),
            point(2.0 * HALF_KM_DEG, Some(utc(2023, 5, 1, 11, 0, 0))),
        ];
        filter_at(10, 0).apply(&mut points);
        assert_eq!(points.len(), 2);
        assert!(points[1].time.is_none());
    }

    #[test]
    fn test_offset_shifts_cutoff_instant() {
        // 10:00 at -02:00 is 12:00 UTC, so an 11:00Z point survives.
        let filter = CutoffFilter::parse("2023-05-01 10:00", Some("-02:00")).unwrap();
        let mut points = vec![
            point(0.0, Some(utc(2023, 5, 1, 9, 0, 0))),
            point(HALF_KM_DEG, Some(utc(2023, 5, 1, 11, 0, 0))),
        ];
        let outcome = filter.apply(&mut points);
        assert_eq!(outcome.dropped, 0);
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn test_parse_utc_offset() {
        assert_eq!(
            parse_utc_offset("+05:30").unwrap(),
            FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap()
        );
        assert_eq!(
            parse_utc_offset("-07:00").unwrap(),
            FixedOffset::east_opt(-7 * 3600).unwrap()
        );
        assert!(parse_utc_offset("05:30").is_err());
        assert!(parse_utc_offset("+5").is_err());
        assert!(parse_utc_offset("+24:00").is_err());
    }

    #[test]
    fn test_parse_iso_datetime_variants() {
        assert!(parse_iso_datetime("2023-05-01").is_ok());
        assert!(parse_iso_datetime("2023-05-01 10:30").is_ok());
        assert!(parse_iso_datetime("2023-05-01T10:30:15").is_ok());
        assert!(parse_iso_datetime("May 1st").is_err());
    }
}
