//! Point thinning: distance- and orientation-based segment simplification.

use crate::geopoint::EARTH_RADIUS_KM;
use crate::model::{Track, TrackPoint};
use crate::{ExtractError, Result};

/// Thinning criterion. The two modes are mutually exclusive; the CLI rejects
/// a configuration that sets both.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ThinMode {
    /// Keep a point once it is more than this many kilometres from the
    /// current anchor.
    Distance(f64),
    /// Keep a point once its course differs from the current anchor by more
    /// than this many degrees.
    Orientation(f64),
}

/// Simplifies segment point sequences with an anchor walk.
///
/// The first point of a segment is the initial anchor; each following point
/// is retained (and becomes the new anchor) when its deviation from the
/// anchor exceeds the threshold, or when it is the last point. Everything
/// else is dropped from the owned sequence.
#[derive(Clone, Copy, Debug)]
pub struct PointThinner {
    mode: ThinMode,
}

impl PointThinner {
    pub fn new(mode: ThinMode) -> Self {
        Self { mode }
    }

    /// Verify that every point of every segment carries course data.
    ///
    /// Orientation thinning requires this check to run over the whole track
    /// set before any segment is mutated, so a partial thin is never
    /// produced for an input lacking course data.
    pub fn check_course_coverage<'a, I>(tracks: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Track>,
    {
        for track in tracks {
            let missing = track
                .segments
                .iter()
                .flat_map(|segment| segment.points.iter())
                .any(|point| point.course.is_none());
            if missing {
                return Err(ExtractError::MissingCourseData {
                    track: track.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Thin one segment in place. The first and last point are always
    /// retained; sequences of two or fewer points are left untouched.
    pub fn thin_segment(&self, points: &mut Vec<TrackPoint>) {
        if points.len() <= 2 {
            return;
        }

        let last_index = points.len() - 1;
        let mut retained: Vec<TrackPoint> = Vec::with_capacity(points.len());
        retained.push(points[0].clone());
        let mut anchor = 0;

        for index in 1..=last_index {
            let deviation = self.deviation(&points[anchor], &points[index]);
            let threshold = match self.mode {
                ThinMode::Distance(t) | ThinMode::Orientation(t) => t,
            };
            if deviation > threshold || index == last_index {
                retained.push(points[index].clone());
                anchor = index;
            }
        }

        tracing::debug!(
            kept = retained.len(),
            dropped = points.len() - retained.len(),
            "thinned segment"
        );
        *points = retained;
    }

    fn deviation(&self, anchor: &TrackPoint, candidate: &TrackPoint) -> f64 {
        match self.mode {
            ThinMode::Distance(_) => anchor.geo.distance_to(&candidate.geo, EARTH_RADIUS_KM),
            ThinMode::Orientation(_) => course_difference(anchor.geo.course(), candidate.geo.course()),
        }
    }
}

/// Absolute course difference in degrees, wrapped to [0, 180].
fn course_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs() % 360.0;
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geopoint::GeoPoint;
    use crate::model::Segment;

    // ~0.5 km of latitude
    const HALF_KM_DEG: f64 = 0.0045;

    fn point(lat: f64, course: Option<f64>) -> TrackPoint {
        TrackPoint {
            geo: GeoPoint::from_degrees(lat, 0.0, course.unwrap_or(0.0)).unwrap(),
            elevation: None,
            time: None,
            course,
        }
    }

    fn half_km_run(n: usize) -> Vec<TrackPoint> {
        (0..n).map(|i| point(i as f64 * HALF_KM_DEG, None)).collect()
    }

    #[test]
    fn test_distance_thinning_keeps_every_other_point() {
        // Points 0.5 km apart with a 1 km threshold: the anchor advances on
        // every second point, and the last point is always kept.
        let mut points = half_km_run(8);
        PointThinner::new(ThinMode::Distance(1.0)).thin_segment(&mut points);

        let kept: Vec<f64> = points.iter().map(|p| p.geo.latitude()).collect();
        let expected: Vec<f64> = [0, 2, 4, 6, 7]
            .iter()
            .map(|&i| i as f64 * HALF_KM_DEG)
            .collect();
        assert_eq!(kept, expected);
    }

    #[test]
    fn test_first_and_last_always_retained() {
        for threshold in [0.1, 1.0, 1000.0] {
            let mut points = half_km_run(10);
            let first = points[0].geo;
            let last = points[9].geo;
            PointThinner::new(ThinMode::Distance(threshold)).thin_segment(&mut points);

            assert!(points.len() >= 2);
            assert_eq!(points[0].geo, first);
            assert_eq!(points[points.len() - 1].geo, last);
        }
    }

    #[test]
    fn test_thinning_never_increases_length() {
        for n in 0..6 {
            let mut points = half_km_run(n);
            PointThinner::new(ThinMode::Distance(0.0)).thin_segment(&mut points);
            assert!(points.len() <= n);
        }
    }

    #[test]
    fn test_huge_threshold_collapses_to_endpoints() {
        let mut points = half_km_run(10);
        PointThinner::new(ThinMode::Distance(1e6)).thin_segment(&mut points);
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn test_short_segments_untouched() {
        let mut points = half_km_run(2);
        PointThinner::new(ThinMode::Distance(1e6)).thin_segment(&mut points);
        assert_eq!(points.len(), 2);

        let mut single = half_km_run(1);
        PointThinner::new(ThinMode::Distance(1e6)).thin_segment(&mut single);
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn test_orientation_thinning_drops_straight_runs() {
        let courses = [10.0, 12.0, 14.0, 100.0, 102.0, 104.0];
        let mut points: Vec<TrackPoint> = courses
            .iter()
            .enumerate()
            .map(|(i, &c)| point(i as f64 * HALF_KM_DEG, Some(c)))
            .collect();

        PointThinner::new(ThinMode::Orientation(10.0)).thin_segment(&mut points);

        // The turn to ~100 degrees is kept, the straight runs collapse.
        let kept: Vec<f64> = points.iter().map(|p| p.geo.course()).collect();
        assert_eq!(kept, vec![10.0, 100.0, 104.0]);
    }

    #[test]
    fn test_course_difference_wraps() {
        assert_eq!(course_difference(350.0, 10.0), 20.0);
        assert_eq!(course_difference(10.0, 350.0), 20.0);
        assert_eq!(course_difference(0.0, 180.0), 180.0);
        assert_eq!(course_difference(90.0, 90.0), 0.0);
    }

    #[test]
    fn test_course_coverage_check_is_track_wide() {
        let track = Track {
            name: "Active Log: 2023-05-01 08:00:00".to_string(),
            comment: None,
            segments: vec![
                Segment {
                    points: vec![point(0.0, Some(10.0)), point(HALF_KM_DEG, Some(20.0))],
                },
                Segment {
                    points: vec![point(0.1, Some(30.0)), point(0.1 + HALF_KM_DEG, None)],
                },
            ],
            source: "a.gpx".to_string(),
        };

        let err = PointThinner::check_course_coverage(std::iter::once(&track)).unwrap_err();
        assert!(matches!(err, ExtractError::MissingCourseData { .. }));
    }

    #[test]
    fn test_course_coverage_check_passes_when_complete() {
        let track = Track {
            name: "Active Log: 2023-05-01 08:00:00".to_string(),
            comment: None,
            segments: vec![Segment {
                points: vec![point(0.0, Some(10.0)), point(HALF_KM_DEG, Some(20.0))],
            }],
            source: "a.gpx".to_string(),
        };
        assert!(PointThinner::check_course_coverage(std::iter::once(&track)).is_ok());
    }
}
