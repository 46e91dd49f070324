//! End-to-end coverage of the universal wire-format properties: round-trip,
//! cross-trip, length-prefix consistency, tiny-int ranges, VLQ width,
//! datetime invariants, comment skipping, map ordering, and envelope
//! classification.

use shvchainpack::chainpack;
use shvchainpack::cpon;
use shvchainpack::rpc::{FrameReader, FrameWriter, ProtocolType, RpcMessage, RpcRequestBuilder, RpcResponseBuilder};
use shvchainpack::value::{Decimal, IMap, Map, MetaData, Value};

fn sample_values() -> Vec<Value> {
    let mut list_with_meta = Value::from(vec![Value::from(1i64), Value::from("two"), Value::null()]);
    list_with_meta.set_meta_value_i(1, Value::from(7i64));
    list_with_meta.set_meta_value_s("tag", Value::from("x"));

    let mut m = Map::new();
    m.insert("b".to_owned(), Value::from(2i64));
    m.insert("a".to_owned(), Value::from(1i64));
    m.insert("c".to_owned(), Value::from(3i64));

    let mut im = IMap::new();
    im.insert(10, Value::from("ten"));
    im.insert(2, Value::from("two"));

    vec![
        Value::null(),
        Value::from(true),
        Value::from(false),
        Value::from(0i64),
        Value::from(-1i64),
        Value::from(63i64),
        Value::from(64i64),
        Value::from(-64i64),
        Value::from(i64::MAX),
        Value::from(i64::MIN + 1),
        Value::from(0u64),
        Value::from(63u64),
        Value::from(64u64),
        Value::from(u64::MAX),
        Value::from(Decimal::new(1224, 2)),
        Value::from(Decimal::new(-5, 3)),
        Value::from(b"\x00\x01\xFF".to_vec()),
        Value::from("hello, world"),
        Value::from(""),
        Value::from(m),
        Value::from(im),
        list_with_meta,
        Value::from(Vec::<Value>::new()),
    ]
}

#[test]
fn chainpack_round_trips_every_sample_value() {
    for v in sample_values() {
        let bytes = chainpack::to_bytes(&v).expect("encode");
        let back = chainpack::from_bytes(&bytes).expect("decode");
        assert_eq!(back, v, "chainpack round trip mismatch for {v:?}");
    }
}

#[test]
fn chainpack_round_trips_double() {
    // Double has a dedicated 8-byte binary tag in ChainPack, so it round-trips
    // exactly there — unlike through Cpon text, see
    // `cpon_parses_exponent_literal_as_decimal_not_double` below.
    for d in [0.0f64, 1.5e10, -1.5e-10, f64::MIN_POSITIVE, 123.456] {
        let v = Value::from(d);
        let bytes = chainpack::to_bytes(&v).unwrap();
        let back = chainpack::from_bytes(&bytes).unwrap();
        assert_eq!(back, v);
    }
}

#[test]
fn cpon_parses_exponent_literal_as_decimal_not_double() {
    // Cpon's numeric-literal grammar never produces a
    // Double from text — a `Double` written to Cpon (same lexical form as a
    // Decimal) reads back as a Decimal. This is a documented asymmetry of
    // the wire format, not a round-trip bug: ChainPack is the only format
    // that can carry a Double exactly.
    let v = Value::from(1.5e10f64);
    let text = cpon::to_string(&v);
    let back = cpon::from_str(&text).unwrap();
    assert_ne!(back.type_(), shvchainpack::value::Type::Double);
    assert!((back.as_double() - 1.5e10).abs() < 1.0);
}

#[test]
fn cpon_round_trips_every_sample_value() {
    for v in sample_values() {
        let text = cpon::to_string(&v);
        let back = cpon::from_str(&text).unwrap_or_else(|e| panic!("parse {text:?}: {e}"));
        assert_eq!(back, v, "cpon round trip mismatch for {v:?} (text={text:?})");
    }
}

#[test]
fn cross_trip_chainpack_to_cpon_and_back() {
    for v in sample_values() {
        let cp_bytes = chainpack::to_bytes(&v).unwrap();
        let via_chainpack = chainpack::from_bytes(&cp_bytes).unwrap();
        let cpon_text = cpon::to_string(&via_chainpack);
        let back = cpon::from_str(&cpon_text).unwrap();
        assert_eq!(back, v, "cross-trip mismatch for {v:?}");
    }
}

#[test]
fn tiny_int_and_uint_ranges_are_single_byte() {
    for n in 0..=63i64 {
        let bytes = chainpack::to_bytes(&Value::from(n)).unwrap();
        assert_eq!(bytes.len(), 1, "Int {n} should be one byte, got {bytes:?}");
    }
    for n in 0..=63u64 {
        let bytes = chainpack::to_bytes(&Value::from(n)).unwrap();
        assert_eq!(bytes.len(), 1, "UInt {n} should be one byte, got {bytes:?}");
    }
    // just outside the tiny range needs an explicit type byte.
    assert!(chainpack::to_bytes(&Value::from(64i64)).unwrap().len() > 1);
    assert!(chainpack::to_bytes(&Value::from(64u64)).unwrap().len() > 1);
}

#[test]
fn datetime_encode_decode_preserves_utc_instant_and_offset() {
    for (msec, tz_min) in [
        (shvchainpack::value::SHV_EPOCH_MSEC, 0),
        (shvchainpack::value::SHV_EPOCH_MSEC + 61_000, 90),
        (shvchainpack::value::SHV_EPOCH_MSEC - 3_600_000, -210),
        (shvchainpack::value::SHV_EPOCH_MSEC + 500, 0),
    ] {
        let dt = shvchainpack::value::DateTime::from_epoch_msec(msec, tz_min);
        let v = Value::from(dt);
        let bytes = chainpack::to_bytes(&v).unwrap();
        let back = chainpack::from_bytes(&bytes).unwrap().as_date_time();
        assert_eq!(back.msec_since_epoch(), msec);
        assert_eq!(back.utc_offset_min(), tz_min);
    }
}

#[test]
fn equivalent_utc_instants_under_different_offsets_agree() {
    // 2017-05-03T11:30:00-0700 and 2017-05-03T15:00:00-0330 name the same
    // absolute instant, 210 minutes apart in offset (SPEC_FULL.md §8).
    let a = cpon::from_str(r#"d"2017-05-03T11:30:00-0700""#).unwrap();
    let b = cpon::from_str(r#"d"2017-05-03T15:00:00-0330""#).unwrap();
    assert_eq!(a.as_date_time().msec_since_epoch(), b.as_date_time().msec_since_epoch());
    assert_eq!(b.as_date_time().utc_offset_min() - a.as_date_time().utc_offset_min(), 210);
}

#[test]
fn shv_epoch_point_round_trips_through_cpon() {
    let text = r#"d"2018-02-02T00:00:00Z""#;
    let v = cpon::from_str(text).unwrap();
    assert_eq!(v.as_date_time().msec_since_epoch(), shvchainpack::value::SHV_EPOCH_MSEC);
    assert_eq!(cpon::to_string(&v), text);
}

#[test]
fn comments_are_skipped_between_any_two_tokens() {
    let text = "/* leading */[1,/*mid*/2,3]// trailing\n";
    let v = cpon::from_str(text).unwrap();
    let items: Vec<i64> = v.as_list().iter().map(|x| x.as_int()).collect();
    assert_eq!(items, vec![1, 2, 3]);
}

#[test]
fn unterminated_block_comment_is_an_error() {
    assert!(cpon::from_str("[1, /* oops").is_err());
}

#[test]
fn map_and_imap_preserve_insertion_order_across_both_codecs() {
    let mut m = Map::new();
    m.insert("z".to_owned(), Value::from(1i64));
    m.insert("a".to_owned(), Value::from(2i64));
    m.insert("m".to_owned(), Value::from(3i64));
    let v = Value::from(m);

    let cp_bytes = chainpack::to_bytes(&v).unwrap();
    let back = chainpack::from_bytes(&cp_bytes).unwrap();
    let keys: Vec<_> = back.as_map().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["z".to_owned(), "a".to_owned(), "m".to_owned()]);

    let text = cpon::to_string(&v);
    let back2 = cpon::from_str(&text).unwrap();
    let keys2: Vec<_> = back2.as_map().unwrap().keys().cloned().collect();
    assert_eq!(keys2, vec!["z".to_owned(), "a".to_owned(), "m".to_owned()]);
}

#[test]
fn list_of_small_ints_matches_the_documented_byte_sequence() {
    let list = Value::from(vec![Value::from(1i64), Value::from(2i64), Value::from(3i64)]);
    assert_eq!(chainpack::to_bytes(&list).unwrap(), vec![0x88, 0x41, 0x42, 0x43, 0xFF]);

    let cpon_text = cpon::to_string(&list);
    let via_cpon = cpon::from_str(&cpon_text).unwrap();
    assert_eq!(chainpack::to_bytes(&via_cpon).unwrap(), vec![0x88, 0x41, 0x42, 0x43, 0xFF]);
}

#[test]
fn envelope_classification_follows_method_and_request_id_presence() {
    let mut meta = MetaData::new();
    meta.set_value_i(8, Value::from(42u64)); // RequestId
    meta.set_value_i(10, Value::from("ping")); // Method
    assert!(RpcMessage::meta_is_request(Some(&meta)));

    let mut notify_meta = meta.clone();
    notify_meta.set_value_i(8, Value::invalid());
    assert!(RpcMessage::meta_is_notify(Some(&notify_meta)));

    let mut response_meta = meta.clone();
    response_meta.set_value_i(10, Value::invalid());
    assert!(RpcMessage::meta_is_response(Some(&response_meta)));
}

/// Decodes a ChainPack VLQ `UInt` from the front of `bytes`, mirroring the
/// tiering rules in SPEC_FULL.md §4.1 — independent of the crate's own
/// (private) VLQ reader, so this test exercises the wire contract rather
/// than calling back into the implementation under test.
fn read_vlq_uint(bytes: &[u8], pos: &mut usize) -> u64 {
    let head = bytes[*pos];
    *pos += 1;
    if head & 0x80 == 0 {
        return head as u64;
    }
    if head & 0x40 == 0 {
        let b1 = bytes[*pos] as u64;
        *pos += 1;
        return (((head & 0x3F) as u64) << 8) | b1;
    }
    if head & 0x20 == 0 {
        let b1 = bytes[*pos] as u64;
        let b2 = bytes[*pos + 1] as u64;
        *pos += 2;
        return (((head & 0x1F) as u64) << 16) | (b1 << 8) | b2;
    }
    if head & 0x10 == 0 {
        let mut v = (head & 0x0F) as u64;
        for _ in 0..3 {
            v = (v << 8) | bytes[*pos] as u64;
            *pos += 1;
        }
        return v;
    }
    let extra = (head & 0x0F) as usize + 4;
    let mut v = 0u64;
    for _ in 0..extra {
        v = (v << 8) | bytes[*pos] as u64;
        *pos += 1;
    }
    v
}

#[test]
fn framed_message_length_prefix_matches_version_plus_meta_plus_body() {
    let writer = FrameWriter::new(ProtocolType::ChainPack);
    let msg = RpcRequestBuilder::new("getValue")
        .request_id(99)
        .shv_path("a/b/c")
        .params(Value::from("arg"))
        .build();
    writer.enqueue(msg.value()).unwrap();

    let mut wire = Vec::new();
    writer
        .flush_with(|bytes| {
            wire.extend_from_slice(bytes);
            bytes.len()
        })
        .unwrap();

    let mut pos = 0usize;
    let packet_len = read_vlq_uint(&wire, &mut pos) as usize;
    assert_eq!(pos + packet_len, wire.len(), "declared packet_len must cover exactly the rest of the wire");

    let mut reader = FrameReader::new();
    let frames = reader.feed(&wire);
    assert_eq!(frames.len(), 1);
}

#[test]
fn request_response_round_trip_through_framing_and_wire_protocol() {
    let writer = FrameWriter::new(ProtocolType::Cpon);
    let request = RpcRequestBuilder::new("getValue").request_id(5).shv_path("x/y").build();
    writer.enqueue(request.value()).unwrap();

    let mut wire = Vec::new();
    writer
        .flush_with(|bytes| {
            wire.extend_from_slice(bytes);
            bytes.len()
        })
        .unwrap();

    let mut reader = FrameReader::new();
    let frames = reader.feed(&wire);
    assert_eq!(frames.len(), 1);
    let frame = &frames[0];
    assert_eq!(frame.protocol, ProtocolType::Cpon);
    let decoded = RpcMessage::new(frame.decode_body().unwrap().with_meta(frame.meta.clone()));
    assert!(decoded.is_request());
    assert_eq!(decoded.method(), Some("getValue"));

    let response = RpcResponseBuilder::for_request(&frame.meta).result(Value::from(123i64));
    let response_writer = FrameWriter::new(ProtocolType::Cpon);
    response_writer.enqueue(response.value()).unwrap();
    let mut response_wire = Vec::new();
    response_writer
        .flush_with(|bytes| {
            response_wire.extend_from_slice(bytes);
            bytes.len()
        })
        .unwrap();

    let mut response_reader = FrameReader::new();
    let response_frames = response_reader.feed(&response_wire);
    assert_eq!(response_frames.len(), 1);
    let response_frame = &response_frames[0];
    let decoded_response =
        RpcMessage::new(response_frame.decode_body().unwrap().with_meta(response_frame.meta.clone()));
    assert!(decoded_response.is_response());
    assert_eq!(decoded_response.result().as_int(), 123);
}
