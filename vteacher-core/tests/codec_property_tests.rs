//! Property-Based Tests for the Location Codec and Stream Framing
//!
//! - decode(encode(l)) == l for every location
//! - equal locations produce equal cache keys
//! - arbitrary input never panics the decoder
//! - a framed stream decodes to the same chunks however it is split

use proptest::prelude::*;
use vteacher_core::{
    encode_frame, FrameDecoder, Location, LocationError, Node, RecordId, SlotId, StreamErrorCode,
    TreeChunk,
};

// ============================================================================
// GENERATORS
// ============================================================================

fn arb_location() -> impl Strategy<Value = Location> {
    prop_oneof![
        Just(Location::list()),
        (1i64..=i64::MAX).prop_map(|v| Location::selected(RecordId::new(v).unwrap())),
    ]
}

fn arb_leaf() -> impl Strategy<Value = Node> {
    prop_oneof![
        "[a-zA-Z0-9 \\n\"{}]{0,24}".prop_map(Node::text),
        (0u32..8).prop_map(|s| Node::deferred(SlotId(s))),
    ]
}

fn arb_node() -> impl Strategy<Value = Node> {
    arb_leaf().prop_recursive(3, 24, 4, |inner| {
        ("[a-z]{1,8}", prop::collection::vec(inner, 0..4))
            .prop_map(|(tag, children)| Node::element(tag).children(children))
    })
}

fn arb_chunk() -> impl Strategy<Value = TreeChunk> {
    prop_oneof![
        arb_node().prop_map(|node| TreeChunk::Root { node }),
        (0u32..8, arb_node()).prop_map(|(s, node)| TreeChunk::Resolve { slot: SlotId(s), node }),
        ".{0,32}".prop_map(|message| TreeChunk::Error {
            code: StreamErrorCode::StoreUnavailable,
            message,
        }),
        Just(TreeChunk::End),
    ]
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #[test]
    fn prop_location_round_trip(location in arb_location()) {
        prop_assert_eq!(Location::decode(&location.encode()), Ok(location));
    }

    #[test]
    fn prop_encoded_location_is_url_safe(location in arb_location()) {
        let encoded = location.encode();
        prop_assert!(encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '%' | '-' | '_' | '.' | '~')));
    }

    #[test]
    fn prop_numeric_string_ids_share_key(value in 1i64..1_000_000) {
        let from_number = Location::decode(&format!("{{\"selectedId\":{}}}", value)).unwrap();
        let from_string = Location::decode(&format!("{{\"selectedId\":\"{}\"}}", value)).unwrap();
        prop_assert_eq!(from_number.encode(), from_string.encode());
    }

    #[test]
    fn prop_decode_never_panics(input in ".{0,64}") {
        match Location::decode(&input) {
            Ok(location) => prop_assert_eq!(Location::decode(&location.encode()), Ok(location)),
            Err(LocationError::Malformed { .. }) => {}
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }

    #[test]
    fn prop_framing_survives_any_split(
        chunks in prop::collection::vec(arb_chunk(), 1..6),
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..6),
    ) {
        let mut bytes = Vec::new();
        for chunk in &chunks {
            bytes.extend_from_slice(&encode_frame(chunk).unwrap());
        }

        let mut offsets: Vec<usize> = cuts.iter().map(|i| i.index(bytes.len() + 1)).collect();
        offsets.push(0);
        offsets.push(bytes.len());
        offsets.sort_unstable();
        offsets.dedup();

        let mut decoder = FrameDecoder::new();
        let mut decoded = Vec::new();
        for window in offsets.windows(2) {
            decoded.extend(decoder.push(&bytes[window[0]..window[1]]).unwrap());
        }
        prop_assert!(decoder.finish().is_ok());
        prop_assert_eq!(decoded, chunks);
    }
}
