//! Text and binary geometry codecs backed by the `wkt` and `wkb` crates.
//!
//! Binary payloads come straight out of storage, so their layout is walked
//! before the `wkb` reader sees them: every count must fit inside the buffer,
//! type codes must be ISO 2D, Z, M or ZM codes, and nothing may trail the
//! geometry.

use geo::Geometry;
use geo_traits::to_geo::ToGeoGeometry;
use wkb::Endianness;
use wkb::reader::read_wkb;
use wkb::writer::{WriteOptions, write_geometry};
use wkt::{ToWkt, TryFromWkt};

use crate::GeometryError;

/// Deepest collection nesting accepted in a binary payload.
const MAX_NESTING: usize = 32;

/// Parse well-known text into a geometry.
pub(crate) fn parse_wkt(text: &str) -> Result<Geometry<f64>, GeometryError> {
    Geometry::<f64>::try_from_wkt_str(text).map_err(|err| GeometryError::Wkt {
        message: err.to_string(),
    })
}

/// Render a geometry as well-known text.
pub(crate) fn write_wkt(geometry: &Geometry<f64>) -> String {
    geometry.wkt_string()
}

/// Parse well-known binary, in either byte order, into a geometry.
///
/// Z and M ordinates are dropped.
pub(crate) fn parse_wkb(bytes: &[u8]) -> Result<Geometry<f64>, GeometryError> {
    check_layout(bytes)?;
    let wkb = read_wkb(bytes).map_err(|err| invalid_wkb(err.to_string()))?;
    wkb.try_to_geometry()
        .ok_or_else(|| invalid_wkb("empty point has no planar representation"))
}

/// Serialise a geometry as little-endian well-known binary.
pub(crate) fn write_wkb(geometry: &Geometry<f64>) -> Result<Vec<u8>, GeometryError> {
    let mut bytes = Vec::new();
    let options = WriteOptions {
        endianness: Endianness::LittleEndian,
    };
    write_geometry(&mut bytes, geometry, &options).map_err(|err| invalid_wkb(err.to_string()))?;
    Ok(bytes)
}

fn invalid_wkb(message: impl Into<String>) -> GeometryError {
    GeometryError::Wkb {
        message: message.into(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Big,
    Little,
}

/// Constraint a collection places on its members.
#[derive(Debug, Clone, Copy)]
struct Parent {
    order: ByteOrder,
    member_code: Option<u32>,
}

fn check_layout(bytes: &[u8]) -> Result<(), GeometryError> {
    let end = geometry_end(bytes, 0, None, 0)?;
    if end != bytes.len() {
        return Err(invalid_wkb(format!(
            "{} trailing bytes after geometry",
            bytes.len() - end
        )));
    }
    Ok(())
}

/// Offset just past the geometry starting at `start`.
fn geometry_end(
    bytes: &[u8],
    start: usize,
    parent: Option<Parent>,
    depth: usize,
) -> Result<usize, GeometryError> {
    if depth > MAX_NESTING {
        return Err(invalid_wkb("geometry collections nested too deeply"));
    }
    let order = match bytes.get(start) {
        Some(0) => ByteOrder::Big,
        Some(1) => ByteOrder::Little,
        Some(other) => return Err(invalid_wkb(format!("unknown byte order marker {other}"))),
        None => return Err(truncated(start)),
    };
    let code = read_u32(bytes, start + 1, order)?;
    if let Some(parent) = parent {
        if parent.order != order {
            return Err(invalid_wkb("mixed byte orders are not supported"));
        }
        if parent.member_code.is_some_and(|expected| expected != code) {
            return Err(invalid_wkb(format!(
                "geometry type {code} cannot appear in this collection"
            )));
        }
    }
    let (kind, ordinates) = match code {
        1..=7 => (code, 2),
        1001..=1007 => (code - 1000, 3),
        2001..=2007 => (code - 2000, 3),
        3001..=3007 => (code - 3000, 4),
        _ => return Err(invalid_wkb(format!("unsupported geometry type {code}"))),
    };
    let coord_width = ordinates * 8;
    let body = start + 5;
    match kind {
        1 => advance(bytes, body, 1, coord_width),
        2 => {
            let points = read_u32(bytes, body, order)?;
            advance(bytes, body + 4, points, coord_width)
        }
        3 => {
            let rings = read_u32(bytes, body, order)?;
            let mut offset = body + 4;
            for _ in 0..rings {
                let points = read_u32(bytes, offset, order)?;
                offset = advance(bytes, offset + 4, points, coord_width)?;
            }
            Ok(offset)
        }
        _ => {
            let members = read_u32(bytes, body, order)?;
            // Multi types (4, 5, 6) hold their single-part counterpart.
            let member_code = (kind < 7).then(|| code - 3);
            let parent = Parent { order, member_code };
            let mut offset = body + 4;
            for _ in 0..members {
                offset = geometry_end(bytes, offset, Some(parent), depth + 1)?;
            }
            Ok(offset)
        }
    }
}

fn read_u32(bytes: &[u8], offset: usize, order: ByteOrder) -> Result<u32, GeometryError> {
    let word = bytes
        .get(offset..)
        .and_then(|rest| rest.get(..4))
        .and_then(|slice| <[u8; 4]>::try_from(slice).ok())
        .ok_or_else(|| truncated(offset))?;
    Ok(match order {
        ByteOrder::Big => u32::from_be_bytes(word),
        ByteOrder::Little => u32::from_le_bytes(word),
    })
}

fn advance(
    bytes: &[u8],
    offset: usize,
    count: u32,
    width: u32,
) -> Result<usize, GeometryError> {
    usize::try_from(u64::from(count) * u64::from(width))
        .ok()
        .and_then(|len| offset.checked_add(len))
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| truncated(offset))
}

fn truncated(offset: usize) -> GeometryError {
    invalid_wkb(format!("payload truncated at byte {offset}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Point, point};
    use rstest::rstest;

    fn little_endian_point(code: u32, ordinates: &[f64]) -> Vec<u8> {
        let mut bytes = vec![1];
        bytes.extend_from_slice(&code.to_le_bytes());
        for ordinate in ordinates {
            bytes.extend_from_slice(&ordinate.to_le_bytes());
        }
        bytes
    }

    #[rstest]
    fn wkt_round_trips_point() {
        let geometry = parse_wkt("POINT(1 2)").expect("parse point");
        assert_eq!(geometry, Geometry::Point(point!(x: 1.0, y: 2.0)));
        let text = write_wkt(&geometry);
        assert_eq!(parse_wkt(&text).expect("reparse"), geometry);
    }

    #[rstest]
    fn wkt_rejects_garbage() {
        let err = parse_wkt("POINT(one two)").expect_err("garbage should fail");
        assert!(matches!(err, GeometryError::Wkt { .. }));
    }

    #[rstest]
    fn wkb_round_trips_point() {
        let geometry = Geometry::Point(Point::new(-122.5, 37.75));
        let bytes = write_wkb(&geometry).expect("encode point");
        assert_eq!(bytes.first(), Some(&1));
        assert_eq!(parse_wkb(&bytes).expect("decode point"), geometry);
    }

    #[rstest]
    fn reads_big_endian_point() {
        let mut bytes = vec![0];
        bytes.extend_from_slice(&1_u32.to_be_bytes());
        bytes.extend_from_slice(&3.5_f64.to_be_bytes());
        bytes.extend_from_slice(&(-1.25_f64).to_be_bytes());
        assert_eq!(
            parse_wkb(&bytes).expect("decode big-endian point"),
            Geometry::Point(Point::new(3.5, -1.25))
        );
    }

    #[rstest]
    #[case::z(1001, &[1.0, 2.0, 3.0])]
    #[case::m(2001, &[1.0, 2.0, 9.0])]
    #[case::zm(3001, &[1.0, 2.0, 3.0, 9.0])]
    fn drops_extra_ordinates(#[case] code: u32, #[case] ordinates: &[f64]) {
        let bytes = little_endian_point(code, ordinates);
        assert_eq!(
            parse_wkb(&bytes).expect("decode point"),
            Geometry::Point(Point::new(1.0, 2.0))
        );
    }

    #[rstest]
    fn reads_empty_polygon() {
        let mut bytes = vec![1];
        bytes.extend_from_slice(&3_u32.to_le_bytes());
        bytes.extend_from_slice(&0_u32.to_le_bytes());
        let geometry = parse_wkb(&bytes).expect("decode empty polygon");
        assert!(matches!(
            geometry,
            Geometry::Polygon(polygon) if polygon.exterior().0.is_empty()
        ));
    }

    #[rstest]
    #[case::empty(&[])]
    #[case::bad_byte_order(&[0xFF])]
    #[case::truncated_header(&[1, 1, 0])]
    #[case::unknown_type(&[1, 99, 0, 0, 0])]
    #[case::truncated_point(&[1, 1, 0, 0, 0, 0, 0, 0, 0])]
    #[case::huge_ring_count(&[1, 3, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF])]
    #[case::huge_point_count(&[1, 2, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0x7F])]
    #[case::wrong_member(&[1, 4, 0, 0, 0, 1, 0, 0, 0, 1, 2, 0, 0, 0, 0, 0, 0, 0])]
    fn wkb_rejects_malformed_payload(#[case] bytes: &[u8]) {
        let err = parse_wkb(bytes).expect_err("malformed WKB should fail");
        assert!(matches!(err, GeometryError::Wkb { .. }));
    }

    #[rstest]
    fn wkb_rejects_trailing_bytes() {
        let mut bytes = little_endian_point(1, &[0.0, 0.0]);
        bytes.push(0);
        let err = parse_wkb(&bytes).expect_err("trailing byte should fail");
        assert_eq!(
            err,
            GeometryError::Wkb {
                message: String::from("1 trailing bytes after geometry")
            }
        );
    }

    #[rstest]
    fn wkb_rejects_empty_point() {
        let bytes = little_endian_point(1, &[f64::NAN, f64::NAN]);
        let err = parse_wkb(&bytes).expect_err("empty point should fail");
        assert!(matches!(err, GeometryError::Wkb { .. }));
    }

    #[rstest]
    fn wkb_rejects_runaway_nesting() {
        let mut bytes = Vec::new();
        for _ in 0..=MAX_NESTING + 1 {
            bytes.push(1);
            bytes.extend_from_slice(&7_u32.to_le_bytes());
            bytes.extend_from_slice(&1_u32.to_le_bytes());
        }
        let err = parse_wkb(&bytes).expect_err("deep nesting should fail");
        assert!(matches!(err, GeometryError::Wkb { .. }));
    }
}
