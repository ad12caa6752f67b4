//! Property tests for engine-native blob and binary payload validation.

use geo::{Geometry, Point};
use geofeature_core::blob::{
    BLOB_MAGIC, BLOB_VERSION, DEFAULT_SRID, decode_blob, encode_blob, read_header,
};
use geofeature_core::{FeatureDefinition, GeometryError};
use proptest::prelude::*;

proptest! {
    #[test]
    fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let result = read_header(&bytes);
        if !bytes.starts_with(&BLOB_MAGIC) {
            prop_assert!(result.is_err());
        }
    }

    #[test]
    fn header_keeps_any_srid(srid in any::<i32>(), x in -180.0_f64..180.0, y in -90.0_f64..90.0) {
        let point = Geometry::Point(Point::new(x, y));
        let blob = encode_blob(&point, srid).expect("encode blob");
        let header = read_header(&blob).expect("read header");
        prop_assert_eq!(header.srid, srid);
        prop_assert_eq!(header.version, BLOB_VERSION);
        let (_, decoded) = decode_blob(&blob).expect("decode blob");
        prop_assert_eq!(decoded, point);
    }

    #[test]
    fn truncated_headers_report_length(len in 0_usize..10) {
        let blob = encode_blob(&Geometry::Point(Point::new(0.0, 0.0)), 4326).expect("encode blob");
        let truncated = blob.get(..len).expect("prefix within blob");
        prop_assert_eq!(
            read_header(truncated),
            Err(GeometryError::TruncatedBlob { expected: 10, found: len })
        );
    }

    #[test]
    fn arbitrary_wkb_never_panics(
        order in 0_u8..3,
        code in prop_oneof![1_u32..8, 1001_u32..1008, 3001_u32..3008, any::<u32>()],
        tail in proptest::collection::vec(any::<u8>(), 0..96),
    ) {
        let mut bytes = vec![order];
        bytes.extend_from_slice(&code.to_le_bytes());
        bytes.extend_from_slice(&tail);
        let _ = FeatureDefinition::from_wkb("fuzz", bytes.clone()).geometry();

        let mut blob = Vec::from(BLOB_MAGIC);
        blob.extend_from_slice(&BLOB_VERSION.to_le_bytes());
        blob.extend_from_slice(&DEFAULT_SRID.to_le_bytes());
        blob.extend_from_slice(&bytes);
        let _ = decode_blob(&blob);
    }
}
