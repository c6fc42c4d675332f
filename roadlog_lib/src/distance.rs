use crate::geo_sample::GeoSample;

const EARTH_RADIUS_M: f64 = 6_372_800.0;

/// Meters to miles. Applied when displaying distance, never when storing it.
pub const METERS_TO_MILES: f64 = 0.00062137;
/// Meters per second to miles per hour. Display-time only, like above.
pub const MPS_TO_MPH: f64 = 2.237;

pub fn haversine_meters(p1: (f64, f64), p2: (f64, f64)) -> f64 {
    if p1 == p2 {
        return 0.0;
    }

    let d_lat = (p2.0 - p1.0).to_radians();
    let d_lon = (p2.1 - p1.1).to_radians();
    let lat1 = p1.0.to_radians();
    let lat2 = p2.0.to_radians();

    let a = f64::sin(d_lat / 2.).powi(2)
        + f64::cos(lat1) * f64::cos(lat2) * f64::sin(d_lon / 2.).powi(2);
    let c = 2. * f64::asin(f64::sqrt(a));

    EARTH_RADIUS_M * c
}

/// Great-circle distance between two fixes in meters. Altitude is ignored.
pub fn segment_meters(a: &GeoSample, b: &GeoSample) -> f64 {
    haversine_meters((a.latitude(), a.longitude()), (b.latitude(), b.longitude()))
}

/// Running trip distance, fed one segment per accepted sample.
/// The total is kept in meters; conversion happens at read time.
#[derive(Debug, Default, Clone, Copy)]
pub struct DistanceAccumulator {
    total_meters: f64,
}

impl DistanceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the segment between the previous and the new accepted sample,
    /// returning its length.
    pub fn add_segment(&mut self, a: &GeoSample, b: &GeoSample) -> f64 {
        let segment = segment_meters(a, b);
        self.total_meters += segment;
        segment
    }

    pub fn total_meters(&self) -> f64 {
        self.total_meters
    }

    pub fn reset(&mut self) {
        self.total_meters = 0.0;
    }
}

pub fn meters_to_miles(meters: f64) -> f64 {
    meters * METERS_TO_MILES
}

pub fn mps_to_mph(speed_mps: f64) -> f64 {
    speed_mps * MPS_TO_MPH
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(lat: f64, lon: f64) -> GeoSample {
        GeoSample::new(lat, lon, 0.0, 5.0, Utc::now())
    }

    #[test]
    fn identical_points_are_zero_meters() {
        assert_eq!(haversine_meters((56.0, 9.9), (56.0, 9.9)), 0.0);
    }

    #[test]
    fn one_millidegree_of_latitude() {
        // 0.001 deg of latitude is R * 0.001 * pi / 180 along a meridian.
        let expected = EARTH_RADIUS_M * 0.001_f64.to_radians();
        let measured = haversine_meters((56.0, 9.9), (56.001, 9.9));
        assert!((measured - expected).abs() < 0.01, "got {measured}, expected {expected}");
    }

    #[test]
    fn accumulator_equals_sum_of_segments() {
        let points = [
            sample(56.0, 9.9),
            sample(56.0005, 9.9),
            sample(56.0005, 9.901),
            sample(56.001, 9.902),
        ];

        let mut acc = DistanceAccumulator::new();
        let mut expected = 0.0;
        for pair in points.windows(2) {
            expected += segment_meters(&pair[0], &pair[1]);
            acc.add_segment(&pair[0], &pair[1]);
        }

        assert!((acc.total_meters() - expected).abs() < 1e-9);
        assert!(acc.total_meters() > 0.0);

        acc.reset();
        assert_eq!(acc.total_meters(), 0.0);
    }

    #[test]
    fn conversions_are_read_time_factors() {
        assert!((meters_to_miles(1609.34) - 1.0).abs() < 0.001);
        assert!((mps_to_mph(1.34) - 2.998).abs() < 0.01);
    }
}
