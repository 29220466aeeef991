//! Distance bookkeeping over the points retained after cutoff filtering and
//! thinning.

use crate::geopoint::EARTH_RADIUS_KM;
use crate::model::TrackPoint;

/// Display conversion factor; internal accumulation stays in kilometres.
pub const KM_TO_MILES: f64 = 0.62;

/// Running kilometre sums for the current track and the whole selection.
///
/// Per-track distance resets when a track is finished. In combine mode the
/// caller defers `finish_track` until every track destined for the same
/// combined output has been accumulated.
#[derive(Clone, Copy, Debug, Default)]
pub struct DistanceAccumulator {
    track_km: f64,
    total_km: f64,
}

impl DistanceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Great-circle chain distance over one retained point sequence, in km.
    pub fn segment_km(points: &[TrackPoint]) -> f64 {
        points
            .windows(2)
            .map(|pair| pair[0].geo.distance_to(&pair[1].geo, EARTH_RADIUS_KM))
            .sum()
    }

    /// Accumulate one segment's retained points; returns the segment km.
    pub fn add_segment(&mut self, points: &[TrackPoint]) -> f64 {
        let km = Self::segment_km(points);
        self.track_km += km;
        self.total_km += km;
        km
    }

    /// Close out the current track, returning its distance and resetting
    /// the per-track sum.
    pub fn finish_track(&mut self) -> f64 {
        std::mem::take(&mut self.track_km)
    }

    /// Distance accumulated for the track in progress.
    pub fn track_km(&self) -> f64 {
        self.track_km
    }

    /// Distance accumulated across the whole selection.
    pub fn total_km(&self) -> f64 {
        self.total_km
    }

    /// Kilometres converted for display.
    pub fn miles(km: f64) -> f64 {
        km * KM_TO_MILES
    }

    /// The mileage annotation embedded in output track comments.
    pub fn miles_comment(km: f64) -> String {
        format!("Miles travelled: {}", Self::miles(km).round() as i64)
    }
}
