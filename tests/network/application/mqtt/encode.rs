use super::encode;
use libiot_dp::network::application::mqtt::codec::{decode_length, encode_length, length_width};
use libiot_dp::network::application::mqtt::utf8::{check_client_id, check_topic, check_utf8};
use libiot_dp::network::application::mqtt::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 2021-03-04 05:06:07.089 UTC
const SAMPLE_MS: i64 = 1_614_834_367_089;

fn options<'c>() -> ConnectOptions<'c> {
    ConnectOptions {
        client_id: "dev1",
        keep_alive_seconds: 60,
        clean_session: true,
        will: None,
        user_name: Some("u"),
        password: Some(b"p"),
    }
}

#[test]
fn test_remaining_length_boundaries() {
    let cases: [(usize, &[u8]); 8] = [
        (0, &[0x00]),
        (127, &[0x7F]),
        (128, &[0x80, 0x01]),
        (16_383, &[0xFF, 0x7F]),
        (16_384, &[0x80, 0x80, 0x01]),
        (2_097_151, &[0xFF, 0xFF, 0x7F]),
        (2_097_152, &[0x80, 0x80, 0x80, 0x01]),
        (268_435_455, &[0xFF, 0xFF, 0xFF, 0x7F]),
    ];
    for (value, wire) in cases {
        let mut out = [0u8; 4];
        assert_eq!(encode_length(value, &mut out), Ok(wire.len()));
        assert_eq!(&out[..wire.len()], wire);
        assert_eq!(length_width(value), wire.len());
        assert_eq!(decode_length(wire), Ok(Some((value, wire.len()))));
    }

    let mut out = [0u8; 4];
    assert_eq!(
        encode_length(268_435_456, &mut out),
        Err(Error::PacketTooLarge)
    );
    assert_eq!(
        decode_length(&[0xFF, 0xFF, 0xFF, 0xFF]),
        Err(Error::PacketTooLarge)
    );
    assert_eq!(decode_length(&[0x80, 0x80]), Ok(None));
}

#[test]
fn test_remaining_length_sampled() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..10_000 {
        let value = rng.gen_range(0..=268_435_455usize);
        let width = match value {
            0..=127 => 1,
            128..=16_383 => 2,
            16_384..=2_097_151 => 3,
            _ => 4,
        };
        let mut out = [0u8; 4];
        assert_eq!(encode_length(value, &mut out), Ok(width), "{}", value);
        assert_eq!(length_width(value), width);
        assert_eq!(decode_length(&out[..width]), Ok(Some((value, width))));
    }
}

#[test]
fn test_utf8_validation() {
    assert_eq!(check_utf8("températuře".as_bytes()), Ok(13));
    assert_eq!(check_utf8("\u{10FFFF}".as_bytes()), Ok(4));
    // Overlong encoding of '/'.
    assert_eq!(check_utf8(&[0xC0, 0xAF]), Err(Error::NotUtf8));
    // UTF-16 surrogate.
    assert_eq!(check_utf8(&[0xED, 0xA0, 0x80]), Err(Error::NotUtf8));
    // Above U+10FFFF.
    assert_eq!(check_utf8(&[0xF4, 0x90, 0x80, 0x80]), Err(Error::NotUtf8));
    // Truncated sequence.
    assert_eq!(check_utf8(&[b'a', 0xE2, 0x82]), Err(Error::NotUtf8));
    // Lone continuation byte.
    assert_eq!(check_utf8(&[0x80]), Err(Error::NotUtf8));
    // Overlong three-byte form just below U+0800.
    assert_eq!(check_utf8(&[0xE0, 0x9F, 0x80]), Err(Error::NotUtf8));
    // U+D7FF, the last code point before the surrogates.
    assert_eq!(check_utf8(&[0xED, 0x9F, 0xBF]), Ok(3));

    assert_eq!(check_client_id("Device42"), Ok(()));
    assert_eq!(check_client_id("dev-1"), Err(Error::IllegalCharacter));
    assert_eq!(check_topic(b"sensors/+/temp"), Err(Error::InvalidParameter));
    assert_eq!(check_topic(b"a\0b"), Err(Error::NotUtf8));
}

#[test]
fn test_connect() {
    let bytes = encode(|b| b.pack_connect(&options()));
    assert_eq!(
        bytes,
        [
            0x10, 22, 0, 4, b'M', b'Q', b'T', b'T', 4, 0xC2, 0, 60, 0, 4, b'd', b'e', b'v', b'1',
            0, 1, b'u', 0, 1, b'p',
        ]
    );
}

#[test]
fn test_connect_with_will() {
    let mut opts = options();
    opts.clean_session = false;
    opts.will = Some(Will {
        topic: "w",
        message: b"bye",
        qos: QoS::AtLeastOnce,
        retain: true,
    });
    let bytes = encode(|b| b.pack_connect(&opts));
    assert_eq!(bytes[9], 0x80 | 0x40 | 0x20 | 0x08 | 0x04);
    assert_eq!(
        &bytes[12..],
        [
            0, 4, b'd', b'e', b'v', b'1', 0, 1, b'w', 0, 3, b'b', b'y', b'e', 0, 1, b'u', 0, 1,
            b'p',
        ]
    );
    assert_eq!(bytes[1] as usize, bytes.len() - 2);
}

#[test]
fn test_connect_rejects_bad_options() {
    let mut buffer = Buffer::new();
    let mut opts = options();
    opts.client_id = "dev_1";
    assert_eq!(buffer.pack_connect(&opts), Err(Error::IllegalCharacter));

    let mut opts = options();
    opts.password = None;
    assert_eq!(buffer.pack_connect(&opts), Err(Error::InvalidParameter));

    let mut opts = options();
    opts.will = Some(Will {
        topic: "",
        message: b"",
        qos: QoS::AtMostOnce,
        retain: false,
    });
    assert_eq!(buffer.pack_connect(&opts), Err(Error::InvalidParameter));

    let mut opts = options();
    opts.will = Some(Will {
        topic: "w",
        message: &[0xC0, 0xAF, 0xFF],
        qos: QoS::AtMostOnce,
        retain: false,
    });
    assert_eq!(buffer.pack_connect(&opts), Err(Error::NotUtf8));
    assert!(buffer.is_empty());
}

#[test]
fn test_publish() {
    let bytes = encode(|b| b.pack_publish(0, "a/b", Payload::Copied(b"x"), QoS::AtMostOnce, true));
    assert_eq!(bytes, [0x31, 6, 0, 3, b'a', b'/', b'b', b'x']);

    let bytes = encode(|b| b.pack_publish(9, "t", Payload::Copied(b""), QoS::ExactlyOnce, false));
    assert_eq!(bytes, [0x34, 5, 0, 1, b't', 0, 9]);
}

#[test]
fn test_publish_borrows_large_payload() {
    let payload = vec![0x5Au8; 300];
    let mut buffer = Buffer::new();
    buffer
        .pack_publish(1, "big", Payload::Borrowed(&payload), QoS::AtLeastOnce, false)
        .unwrap();

    let bytes = buffer.to_vec();
    // 2 + 3 + 2 + 300 = 307 = 0x133
    assert_eq!(&bytes[..3], &[0x32, 0xB3, 0x02]);
    assert_eq!(bytes.len(), 3 + 307);
    let last = buffer.slices().last().unwrap();
    assert_eq!(last.as_ptr(), payload.as_ptr());
}

#[test]
fn test_publish_rejects_bad_input() {
    let mut buffer = Buffer::new();
    assert_eq!(
        buffer.pack_publish(0, "t", Payload::Copied(b"x"), QoS::AtLeastOnce, false),
        Err(Error::InvalidParameter)
    );
    assert_eq!(
        buffer.pack_publish(1, "", Payload::Copied(b"x"), QoS::AtLeastOnce, false),
        Err(Error::InvalidParameter)
    );
    assert_eq!(
        buffer.pack_publish(1, "a/#", Payload::Copied(b"x"), QoS::AtLeastOnce, false),
        Err(Error::InvalidParameter)
    );
    assert!(buffer.is_empty());
}

#[test]
fn test_set_dup() {
    let mut buffer = Buffer::new();
    buffer
        .pack_publish(4, "t", Payload::Copied(b"x"), QoS::AtLeastOnce, false)
        .unwrap();
    buffer.set_dup().unwrap();
    assert_eq!(buffer.to_vec()[0], 0x3A);

    let mut buffer = Buffer::new();
    buffer
        .pack_publish(0, "t", Payload::Copied(b"x"), QoS::AtMostOnce, false)
        .unwrap();
    assert_eq!(buffer.set_dup(), Err(Error::InvalidParameter));

    let mut buffer = Buffer::new();
    buffer.pack_ping_req().unwrap();
    assert_eq!(buffer.set_dup(), Err(Error::InvalidParameter));
}

#[test]
fn test_acknowledgements() {
    assert_eq!(encode(|b| b.pack_puback(0x1234)), [0x40, 2, 0x12, 0x34]);
    assert_eq!(encode(|b| b.pack_pubrec(1)), [0x50, 2, 0, 1]);
    assert_eq!(encode(|b| b.pack_pubrel(1)), [0x62, 2, 0, 1]);
    assert_eq!(encode(|b| b.pack_pubcomp(1)), [0x70, 2, 0, 1]);

    let mut buffer = Buffer::new();
    assert_eq!(buffer.pack_puback(0), Err(Error::InvalidParameter));
    assert_eq!(buffer.pack_pubrec(0), Err(Error::InvalidParameter));
    assert_eq!(buffer.pack_pubrel(0), Err(Error::InvalidParameter));
    assert_eq!(buffer.pack_pubcomp(0), Err(Error::InvalidParameter));
}

#[test]
fn test_ping_and_disconnect() {
    assert_eq!(encode(|b| b.pack_ping_req()), [0xC0, 0]);
    assert_eq!(encode(|b| b.pack_disconnect()), [0xE0, 0]);
}

#[test]
fn test_subscribe_with_appended_topics() {
    let bytes = encode(|b| {
        b.pack_subscribe(10, &[("a", QoS::AtLeastOnce)])?;
        b.append_subscribe_topic("bb", QoS::ExactlyOnce)?;
        b.append_subscribe_topic("ccc", QoS::AtMostOnce)
    });
    assert_eq!(
        bytes,
        [
            0x82, 17, 0, 10, 0, 1, b'a', 1, 0, 2, b'b', b'b', 2, 0, 3, b'c', b'c', b'c', 0,
        ]
    );
}

/// Split a SUBSCRIBE frame into its packet id and (topic, QoS) entries.
fn decode_subscribe(bytes: &[u8]) -> (u16, Vec<(String, u8)>) {
    assert_eq!(bytes[0], 0x82);
    let (remaining, width) = decode_length(&bytes[1..]).unwrap().unwrap();
    let body = &bytes[1 + width..];
    assert_eq!(body.len(), remaining);

    let packet_id = u16::from_be_bytes([body[0], body[1]]);
    let mut topics = Vec::new();
    let mut rest = &body[2..];
    while !rest.is_empty() {
        let len = u16::from_be_bytes([rest[0], rest[1]]) as usize;
        let topic = String::from_utf8(rest[2..2 + len].to_vec()).unwrap();
        topics.push((topic, rest[2 + len]));
        rest = &rest[3 + len..];
    }
    (packet_id, topics)
}

#[test]
fn test_subscribe_decodes_in_order() {
    let bytes = encode(|b| {
        b.pack_subscribe(3, &[("a/b", QoS::AtLeastOnce), ("a/c", QoS::ExactlyOnce)])?;
        b.append_subscribe_topic("a/d", QoS::AtMostOnce)
    });
    assert_eq!(bytes[1] as usize, 2 + 3 * (2 + 3 + 1));

    let (packet_id, topics) = decode_subscribe(&bytes);
    assert_eq!(packet_id, 3);
    assert_eq!(
        topics,
        [
            ("a/b".to_string(), 1),
            ("a/c".to_string(), 2),
            ("a/d".to_string(), 0),
        ]
    );
}

#[test]
fn test_subscribe_length_grows_a_byte() {
    let long_topic = "x".repeat(200);
    let mut buffer = Buffer::new();
    buffer.pack_subscribe(1, &[("a", QoS::AtMostOnce)]).unwrap();
    assert_eq!(buffer.len(), 2 + 6);
    buffer
        .append_subscribe_topic(&long_topic, QoS::AtLeastOnce)
        .unwrap();

    let bytes = buffer.to_vec();
    let remaining = 6 + 2 + 200 + 1;
    assert_eq!(decode_length(&bytes[1..]), Ok(Some((remaining, 2))));
    assert_eq!(bytes.len(), 1 + 2 + remaining);
    assert_eq!(buffer.len(), bytes.len());
    assert_eq!(*bytes.last().unwrap(), 1);
}

#[test]
fn test_subscribe_rejects_bad_input() {
    let mut buffer = Buffer::new();
    assert_eq!(
        buffer.pack_subscribe(0, &[("a", QoS::AtMostOnce)]),
        Err(Error::InvalidParameter)
    );
    assert_eq!(
        buffer.append_subscribe_topic("a", QoS::AtMostOnce),
        Err(Error::InvalidParameter)
    );
    assert_eq!(
        buffer.pack_subscribe(1, &[("a/+", QoS::AtMostOnce)]),
        Err(Error::InvalidParameter)
    );

    buffer.pack_unsubscribe(1, &["a"]).unwrap();
    assert_eq!(
        buffer.append_subscribe_topic("b", QoS::AtMostOnce),
        Err(Error::InvalidParameter)
    );
}

#[test]
fn test_append_topic_needs_a_single_packet() {
    let mut buffer = Buffer::new();
    buffer.pack_subscribe(1, &[("a", QoS::AtMostOnce)]).unwrap();
    buffer.pack_ping_req().unwrap();
    let before = buffer.to_vec();
    assert_eq!(
        buffer.append_subscribe_topic("b", QoS::AtLeastOnce),
        Err(Error::InvalidParameter)
    );
    assert_eq!(buffer.to_vec(), before);

    let mut buffer = Buffer::new();
    buffer.pack_unsubscribe(1, &["a"]).unwrap();
    buffer.pack_disconnect().unwrap();
    assert_eq!(
        buffer.append_unsubscribe_topic("b"),
        Err(Error::InvalidParameter)
    );
    assert_eq!(buffer.to_vec(), [0xA2, 5, 0, 1, 0, 1, b'a', 0xE0, 0]);
}

#[test]
fn test_unsubscribe_with_appended_topic() {
    let bytes = encode(|b| {
        b.pack_unsubscribe(5, &["x"])?;
        b.append_unsubscribe_topic("yz")
    });
    assert_eq!(bytes, [0xA2, 9, 0, 5, 0, 1, b'x', 0, 2, b'y', b'z']);

    let mut buffer = Buffer::new();
    assert_eq!(buffer.pack_unsubscribe(0, &["x"]), Err(Error::InvalidParameter));
    assert_eq!(
        buffer.append_unsubscribe_topic("x"),
        Err(Error::InvalidParameter)
    );
}

#[test]
fn test_command_response() {
    let bytes = encode(|b| b.pack_cmd_response(3, "abc", Payload::Copied(b"ok"), QoS::AtLeastOnce));
    let mut expected = vec![0x32, 15, 0, 9];
    expected.extend_from_slice(b"$crsp/abc");
    expected.extend_from_slice(&[0, 3, b'o', b'k']);
    assert_eq!(bytes, expected);

    // QoS 2 is not offered for responses.
    let bytes = encode(|b| b.pack_cmd_response(3, "abc", Payload::Copied(b"ok"), QoS::ExactlyOnce));
    let mut expected = vec![0x30, 13, 0, 9];
    expected.extend_from_slice(b"$crsp/abc");
    expected.extend_from_slice(b"ok");
    assert_eq!(bytes, expected);

    let mut buffer = Buffer::new();
    assert_eq!(
        buffer.pack_cmd_response(3, "", Payload::Copied(b"ok"), QoS::AtMostOnce),
        Err(Error::InvalidParameter)
    );
}

#[test]
fn test_data_point_by_string() {
    let bytes = encode(|b| {
        b.pack_data_point_by_string(
            1,
            DataPointType::String,
            None,
            Payload::Copied(b"a,1;b,2"),
            QoS::AtLeastOnce,
            false,
        )
    });
    let mut expected = vec![0x32, 17, 0, 3, b'$', b'd', b'p', 0, 1, 5, 0, 7];
    expected.extend_from_slice(b"a,1;b,2");
    assert_eq!(bytes, expected);
}

#[test]
fn test_data_point_by_string_with_time() {
    let bytes = encode(|b| {
        b.pack_data_point_by_string(
            0,
            DataPointType::StringWithTime,
            Some(SAMPLE_MS),
            Payload::Copied(b",;t,1"),
            QoS::AtMostOnce,
            false,
        )
    });
    assert_eq!(
        &bytes[7..],
        [0x86, 21, 3, 4, 5, 6, 7, 0, 5, b',', b';', b't', b',', b'1']
    );
    assert_eq!(bytes[1] as usize, bytes.len() - 2);

    let floats = [0u8, 1, 2, 3, 4, 5, 6, 7];
    let bytes = encode(|b| {
        b.pack_data_point_by_string(
            0,
            DataPointType::Float,
            Some(SAMPLE_MS),
            Payload::Copied(&[0, 1, 2, 3, 4, 5, 6, 7]),
            QoS::AtMostOnce,
            false,
        )
    });
    assert_eq!(&bytes[7..14], [0x87, 21, 3, 4, 5, 6, 7]);
    assert_eq!(&bytes[14..], floats);
}

#[test]
fn test_data_point_by_string_rejects_bad_input() {
    let mut buffer = Buffer::new();
    assert_eq!(
        buffer.pack_data_point_by_string(
            1,
            DataPointType::String,
            Some(SAMPLE_MS),
            Payload::Copied(b"x"),
            QoS::AtLeastOnce,
            false,
        ),
        Err(Error::InvalidParameter)
    );
    assert_eq!(
        buffer.pack_data_point_by_string(
            1,
            DataPointType::Binary,
            None,
            Payload::Copied(b"x"),
            QoS::AtLeastOnce,
            false,
        ),
        Err(Error::InvalidParameter)
    );
    assert_eq!(
        buffer.pack_data_point_by_string(
            1,
            DataPointType::FullJson,
            None,
            Payload::Copied(&[b'{', 0xFF, b'}']),
            QoS::AtLeastOnce,
            false,
        ),
        Err(Error::NotUtf8)
    );
    assert!(buffer.is_empty());
}

#[test]
fn test_data_point_by_binary() {
    let image = [1u8, 2, 3];
    let mut buffer = Buffer::new();
    buffer
        .pack_data_point_by_binary(
            2,
            "cam",
            Some("pic"),
            SAMPLE_MS,
            Payload::Borrowed(&image),
            QoS::AtLeastOnce,
            false,
        )
        .unwrap();

    let bytes = buffer.to_vec();
    let json = br#"{"ds_id":"cam","at":"2021-03-04 05:06:07","desc":"pic"}"#;
    let mut payload = vec![0x02, 0, json.len() as u8];
    payload.extend_from_slice(json);
    payload.extend_from_slice(&[0, 0, 0, 3, 1, 2, 3]);

    let header_len = 2 + 3 + 2;
    assert_eq!(bytes[0], 0x32);
    assert_eq!(
        decode_length(&bytes[1..]),
        Ok(Some((header_len + payload.len(), 1)))
    );
    assert_eq!(&bytes[2 + header_len..], payload);
}

#[test]
fn test_data_point_by_binary_without_description() {
    let bytes = encode(|b| {
        b.pack_data_point_by_binary(
            0,
            "cam",
            None,
            SAMPLE_MS,
            Payload::Copied(b"z"),
            QoS::AtMostOnce,
            false,
        )
    });
    let json = br#"{"ds_id":"cam","at":"2021-03-04 05:06:07"}"#;
    assert_eq!(&bytes[7..10], [0x02, 0, json.len() as u8]);
    assert_eq!(&bytes[10..10 + json.len()], &json[..]);
    assert_eq!(&bytes[10 + json.len()..], [0, 0, 0, 1, b'z']);
}

#[test]
fn test_buffer_holds_several_packets() {
    let mut buffer = Buffer::new();
    buffer.pack_ping_req().unwrap();
    buffer.pack_puback(7).unwrap();
    buffer.pack_disconnect().unwrap();
    assert_eq!(buffer.to_vec(), [0xC0, 0, 0x40, 2, 0, 7, 0xE0, 0]);
    assert_eq!(buffer.chunk_count(), 1);

    buffer.reset();
    assert!(buffer.is_empty());
    assert_eq!(buffer.len(), 0);
    assert_eq!(buffer.chunk_count(), 0);
}
