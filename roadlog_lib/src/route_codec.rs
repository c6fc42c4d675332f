use geo_types::LineString;

use crate::geo_sample::GeoSample;

/// Standard Google polyline precision, 5 decimal places (~1.1 m).
const POLYLINE_PRECISION: u32 = 5;

/// Encode the accepted track as a Google polyline string.
/// An empty track encodes to an empty string.
pub fn encode_track(track: &[GeoSample]) -> String {
    if track.is_empty() {
        return String::new();
    }

    // LineString wants (x, y) = (lon, lat).
    let line: LineString<f64> = track
        .iter()
        .map(|sample| (sample.longitude(), sample.latitude()))
        .collect();

    polyline::encode_coordinates(line, POLYLINE_PRECISION).unwrap_or_default()
}

/// Decode a polyline back to (lat, lon) pairs for display.
/// Empty or malformed input decodes to an empty sequence, never an error.
pub fn decode_track(encoded: &str) -> Vec<(f64, f64)> {
    if encoded.is_empty() {
        return Vec::new();
    }

    polyline::decode_polyline(encoded, POLYLINE_PRECISION)
        .map(|line| line.coords().map(|coord| (coord.y, coord.x)).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(lat: f64, lon: f64) -> GeoSample {
        GeoSample::new(lat, lon, 10.0, 5.0, Utc::now())
    }

    #[test]
    fn round_trip_stays_within_polyline_precision() {
        let track = vec![
            sample(56.04910, 9.92177),
            sample(56.05003, 9.92311),
            sample(56.05127, 9.92684),
            sample(56.05130, -0.00012),
        ];

        let encoded = encode_track(&track);
        assert!(!encoded.is_empty());

        let decoded = decode_track(&encoded);
        assert_eq!(decoded.len(), track.len());
        for (original, (lat, lon)) in track.iter().zip(decoded) {
            assert!((original.latitude() - lat).abs() < 1e-5);
            assert!((original.longitude() - lon).abs() < 1e-5);
        }
    }

    #[test]
    fn single_point_round_trips() {
        let track = vec![sample(56.0491, 9.9218)];
        let decoded = decode_track(&encode_track(&track));
        assert_eq!(decoded.len(), 1);
        assert!((decoded[0].0 - 56.0491).abs() < 1e-5);
    }

    #[test]
    fn empty_and_malformed_inputs_decode_to_nothing() {
        assert_eq!(encode_track(&[]), "");
        assert!(decode_track("").is_empty());
        // Bytes below the polyline alphabet are not decodable.
        assert!(decode_track("!!!!").is_empty());
    }
}
