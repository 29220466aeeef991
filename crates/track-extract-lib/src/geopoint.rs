//! Spherical geodesy primitives: coordinate validation, great-circle
//! distance and bounding-box computation.

use crate::{ExtractError, Result};
use std::f64::consts::{FRAC_PI_2, PI};

/// Mean earth radius in kilometres, used as the default sphere radius.
pub const EARTH_RADIUS_KM: f64 = 6371.01;

const MIN_LAT_RAD: f64 = -FRAC_PI_2;
const MAX_LAT_RAD: f64 = FRAC_PI_2;
const MIN_LON_RAD: f64 = -PI;
const MAX_LON_RAD: f64 = PI;

/// A point on a sphere with an optional course over ground.
///
/// Both the radian and the degree representation are stored as a consistent
/// pair; construction validates latitude, longitude and course bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoPoint {
    lat_rad: f64,
    lon_rad: f64,
    lat_deg: f64,
    lon_deg: f64,
    course_deg: f64,
    course_rad: f64,
}

impl GeoPoint {
    /// Create a point from degree coordinates and a course in degrees.
    ///
    /// Fails when latitude is outside [-90, 90], longitude outside
    /// [-180, 180] or course outside [0, 360].
    pub fn from_degrees(lat: f64, lon: f64, course: f64) -> Result<Self> {
        let point = Self {
            lat_rad: lat.to_radians(),
            lon_rad: lon.to_radians(),
            lat_deg: lat,
            lon_deg: lon,
            course_deg: course,
            course_rad: course.to_radians(),
        };
        point.check_bounds()?;
        Ok(point)
    }

    /// Create a point from radian coordinates and a course in radians.
    pub fn from_radians(lat: f64, lon: f64, course: f64) -> Result<Self> {
        let point = Self {
            lat_rad: lat,
            lon_rad: lon,
            lat_deg: lat.to_degrees(),
            lon_deg: lon.to_degrees(),
            course_deg: course.to_degrees(),
            course_rad: course,
        };
        point.check_bounds()?;
        Ok(point)
    }

    fn check_bounds(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.lat_deg) {
            return Err(ExtractError::OutOfRange {
                what: "latitude",
                value: self.lat_deg,
            });
        }
        if !(-180.0..=180.0).contains(&self.lon_deg) {
            return Err(ExtractError::OutOfRange {
                what: "longitude",
                value: self.lon_deg,
            });
        }
        if !(0.0..=360.0).contains(&self.course_deg) {
            return Err(ExtractError::OutOfRange {
                what: "course",
                value: self.course_deg,
            });
        }
        Ok(())
    }

    /// Latitude in degrees
    #[inline]
    pub fn latitude(&self) -> f64 {
        self.lat_deg
    }

    /// Longitude in degrees
    #[inline]
    pub fn longitude(&self) -> f64 {
        self.lon_deg
    }

    /// Latitude in radians
    #[inline]
    pub fn latitude_rad(&self) -> f64 {
        self.lat_rad
    }

    /// Longitude in radians
    #[inline]
    pub fn longitude_rad(&self) -> f64 {
        self.lon_rad
    }

    /// Course over ground in degrees
    #[inline]
    pub fn course(&self) -> f64 {
        self.course_deg
    }

    /// Course over ground in radians
    #[inline]
    pub fn course_rad(&self) -> f64 {
        self.course_rad
    }

    /// Great-circle distance to `other` on a sphere of the given radius,
    /// via the spherical law of cosines.
    ///
    /// The cosine argument is clamped to [-1, 1]; floating error on nearly
    /// identical or antipodal points can push it slightly outside.
    pub fn distance_to(&self, other: &GeoPoint, radius: f64) -> f64 {
        let cos_arg = (self.lat_rad.sin() * other.lat_rad.sin()
            + self.lat_rad.cos() * other.lat_rad.cos() * (self.lon_rad - other.lon_rad).cos())
        .clamp(-1.0, 1.0);
        radius * cos_arg.acos()
    }

    /// SW/NE corners of the smallest lat/lon square containing every point
    /// within `distance` of this point, on a sphere of the given radius.
    ///
    /// Longitude wraps across the ±180° seam. When a bounding latitude
    /// crosses a pole, latitude is clamped to ±90° and the longitude span
    /// widens to the full [-180°, 180°] range.
    pub fn bounding_locations(&self, distance: f64, radius: f64) -> Result<(GeoPoint, GeoPoint)> {
        if distance < 0.0 {
            return Err(ExtractError::InvalidArgument(format!(
                "bounding distance must be non-negative, got {distance}"
            )));
        }
        if radius < 0.0 {
            return Err(ExtractError::InvalidArgument(format!(
                "sphere radius must be non-negative, got {radius}"
            )));
        }

        // Angular distance on the sphere
        let rad_dist = distance / radius;

        let mut min_lat = self.lat_rad - rad_dist;
        let mut max_lat = self.lat_rad + rad_dist;

        let (min_lon, max_lon) = if min_lat > MIN_LAT_RAD && max_lat < MAX_LAT_RAD {
            let delta_lon = (rad_dist.sin() / self.lat_rad.cos()).asin();
            let mut min_lon = self.lon_rad - delta_lon;
            if min_lon < MIN_LON_RAD {
                min_lon += 2.0 * PI;
            }
            let mut max_lon = self.lon_rad + delta_lon;
            if max_lon > MAX_LON_RAD {
                max_lon -= 2.0 * PI;
            }
            (min_lon, max_lon)
        } else {
            // A pole is inside the bounding circle
            min_lat = min_lat.max(MIN_LAT_RAD);
            max_lat = max_lat.min(MAX_LAT_RAD);
            (MIN_LON_RAD, MAX_LON_RAD)
        };

        Ok((
            GeoPoint::from_radians(min_lat, min_lon, 0.0)?,
            GeoPoint::from_radians(max_lat, max_lon, 0.0)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn test_degree_radian_roundtrip() {
        let point = GeoPoint::from_degrees(51.5074, -0.1278, 90.0).unwrap();
        let back = GeoPoint::from_radians(
            point.latitude_rad(),
            point.longitude_rad(),
            point.course_rad(),
        )
        .unwrap();

        assert!((point.latitude() - back.latitude()).abs() < TOLERANCE);
        assert!((point.longitude() - back.longitude()).abs() < TOLERANCE);
        assert!((point.course() - back.course()).abs() < TOLERANCE);
    }

    #[test]
    fn test_out_of_range_construction_fails() {
        assert!(GeoPoint::from_degrees(90.1, 0.0, 0.0).is_err());
        assert!(GeoPoint::from_degrees(-90.1, 0.0, 0.0).is_err());
        assert!(GeoPoint::from_degrees(0.0, 180.5, 0.0).is_err());
        assert!(GeoPoint::from_degrees(0.0, -180.5, 0.0).is_err());
        assert!(GeoPoint::from_degrees(0.0, 0.0, 360.5).is_err());
        assert!(GeoPoint::from_degrees(0.0, 0.0, -0.5).is_err());
        assert!(GeoPoint::from_degrees(f64::NAN, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = GeoPoint::from_degrees(51.5074, -0.1278, 0.0).unwrap();
        let b = GeoPoint::from_degrees(48.8566, 2.3522, 0.0).unwrap();

        let ab = a.distance_to(&b, EARTH_RADIUS_KM);
        let ba = b.distance_to(&a, EARTH_RADIUS_KM);
        assert!((ab - ba).abs() < TOLERANCE);
        // London to Paris is roughly 344 km
        assert!(ab > 330.0 && ab < 360.0);
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let a = GeoPoint::from_degrees(12.34, 56.78, 0.0).unwrap();
        assert_eq!(a.distance_to(&a, EARTH_RADIUS_KM), 0.0);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let a = GeoPoint::from_degrees(0.0, 0.0, 0.0).unwrap();
        let b = GeoPoint::from_degrees(1.0, 0.0, 0.0).unwrap();
        let d = a.distance_to(&b, EARTH_RADIUS_KM);
        assert!((d - 111.19).abs() < 0.05);
    }

    #[test]
    fn test_bounding_locations_contains_nearby_point() {
        let center = GeoPoint::from_degrees(45.0, 10.0, 0.0).unwrap();
        let (sw, ne) = center.bounding_locations(50.0, EARTH_RADIUS_KM).unwrap();

        assert!(sw.latitude() < center.latitude());
        assert!(ne.latitude() > center.latitude());
        assert!(sw.longitude() < center.longitude());
        assert!(ne.longitude() > center.longitude());

        // A point 30 km due north stays inside the box
        let north = GeoPoint::from_degrees(45.0 + 30.0 / 111.19, 10.0, 0.0).unwrap();
        assert!(north.latitude() < ne.latitude());
    }

    #[test]
    fn test_bounding_locations_near_pole_widens_longitude() {
        let center = GeoPoint::from_degrees(89.9, 0.0, 0.0).unwrap();
        let (sw, ne) = center.bounding_locations(100.0, EARTH_RADIUS_KM).unwrap();

        assert!((ne.latitude() - 90.0).abs() < TOLERANCE);
        assert!((sw.longitude() - -180.0).abs() < 1e-6);
        assert!((ne.longitude() - 180.0).abs() < 1e-6);
    }

    #[test]
    fn test_bounding_locations_wraps_longitude_seam() {
        let center = GeoPoint::from_degrees(0.0, 179.9, 0.0).unwrap();
        let (_, ne) = center.bounding_locations(50.0, EARTH_RADIUS_KM).unwrap();

        // The NE corner wrapped past +180 into negative longitude
        assert!(ne.longitude() < 0.0);
    }

    #[test]
    fn test_bounding_locations_rejects_negative_arguments() {
        let center = GeoPoint::from_degrees(0.0, 0.0, 0.0).unwrap();
        assert!(center.bounding_locations(-1.0, EARTH_RADIUS_KM).is_err());
        assert!(center.bounding_locations(1.0, -1.0).is_err());
    }
}
