//! Google polyline algorithm encoding and decoding.
//!
//! Route geometry arrives from the directions provider as a compact encoded
//! string: 5-bit groups with a continuation bit, zig-zag signed deltas,
//! fixed-point scale 1e5, latitude and longitude in strict alternation.
//! Decoding happens at the boundary; everything downstream works on
//! [`GeoPoint`] sequences.

use crate::error::{Result, SafetyError};
use crate::GeoPoint;

/// Fixed-point scale used by the polyline format.
const SCALE: f64 = 1e5;

/// Decode an encoded polyline string into GPS points.
///
/// Returns an empty vector for empty input. Fails with
/// [`SafetyError::MalformedPolyline`] if the byte stream terminates
/// mid-codeword (dangling continuation bit) rather than reading past the
/// end of the string.
///
/// # Example
/// ```
/// use route_safety::polyline::decode;
///
/// let points = decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
/// assert_eq!(points.len(), 3);
/// assert_eq!(points[0].latitude, 38.5);
/// ```
pub fn decode(encoded: &str) -> Result<Vec<GeoPoint>> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::new();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    while index < bytes.len() {
        lat += decode_delta(bytes, &mut index)?;
        lng += decode_delta(bytes, &mut index)?;
        points.push(GeoPoint::new(lat as f64 / SCALE, lng as f64 / SCALE));
    }

    Ok(points)
}

/// Decode one zig-zag signed delta, advancing the byte index.
fn decode_delta(bytes: &[u8], index: &mut usize) -> Result<i64> {
    let mut shift = 0u32;
    let mut accum: i64 = 0;

    loop {
        if *index >= bytes.len() || shift > 55 {
            return Err(SafetyError::MalformedPolyline { position: *index });
        }
        let b = i64::from(bytes[*index]) - 63;
        *index += 1;
        accum |= (b & 0x1f) << shift;
        shift += 5;
        if b < 0x20 {
            break;
        }
    }

    Ok(if accum & 1 != 0 {
        !(accum >> 1)
    } else {
        accum >> 1
    })
}

/// Encode GPS points into the compact polyline format.
///
/// Coordinates are rounded to 5 decimal places (the format's precision);
/// `decode(encode(points))` round-trips exactly for points already at that
/// precision.
pub fn encode(points: &[GeoPoint]) -> String {
    let mut out = String::new();
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;

    for point in points {
        let lat = (point.latitude * SCALE).round() as i64;
        let lng = (point.longitude * SCALE).round() as i64;
        encode_delta(lat - prev_lat, &mut out);
        encode_delta(lng - prev_lng, &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

fn encode_delta(value: i64, out: &mut String) {
    let mut v = if value < 0 {
        !(value << 1)
    } else {
        value << 1
    };

    while v >= 0x20 {
        out.push((((v & 0x1f) | 0x20) as u8 + 63) as char);
        v >>= 5;
    }
    out.push((v as u8 + 63) as char);
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference example from the polyline format documentation.
    const REFERENCE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    #[test]
    fn test_decode_reference_string() {
        let points = decode(REFERENCE).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], GeoPoint::new(38.5, -120.2));
        assert_eq!(points[1], GeoPoint::new(40.7, -120.95));
        assert_eq!(points[2], GeoPoint::new(43.252, -126.453));
    }

    #[test]
    fn test_decode_empty_input() {
        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn test_encode_round_trip() {
        let points = vec![
            GeoPoint::new(38.5, -120.2),
            GeoPoint::new(40.7, -120.95),
            GeoPoint::new(43.252, -126.453),
        ];
        assert_eq!(encode(&points), REFERENCE);
        assert_eq!(decode(&encode(&points)).unwrap(), points);
    }

    #[test]
    fn test_decode_truncated_codeword() {
        // A lone continuation byte can never complete a codeword.
        let result = decode("_");
        assert!(matches!(
            result,
            Err(SafetyError::MalformedPolyline { .. })
        ));
    }

    #[test]
    fn test_decode_missing_longitude() {
        // "_p~iF" is a complete latitude delta with no longitude following.
        let result = decode("_p~iF");
        assert!(matches!(
            result,
            Err(SafetyError::MalformedPolyline { position: 5 })
        ));
    }

    #[test]
    fn test_round_trip_single_point() {
        let points = vec![GeoPoint::new(12.97166, 77.59457)];
        assert_eq!(decode(&encode(&points)).unwrap(), points);
    }
}
