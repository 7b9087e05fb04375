//! Integration tests for the wuart-core packet pipeline.
//!
//! These tests drive packets through the public API the way a sender and a
//! receiver would: build, escape, frame, send, split into arbitrary chunks,
//! parse, unescape.

use wuart_core::{
    describe,
    protocol::{
        escape::{decode, decode_strict, encode, EscapeError},
        frame::{encode_frame, END_BYTES, START_BYTES},
        transport::{send_packet, MemorySink},
    },
    xor_checksum, Frame, FrameConfig, FrameParser, Packet, PacketError,
};

/// Sends `packets` through a memory sink and returns the concatenated stream.
fn transmit(packets: &[Packet], config: &FrameConfig) -> Vec<u8> {
    let mut sink = MemorySink::new();
    for packet in packets {
        send_packet(&mut sink, packet, config).expect("send must succeed");
    }
    sink.frames.concat()
}

/// Feeds `stream` to a fresh parser in chunks of `chunk` bytes.
fn receive(stream: &[u8], chunk: usize, config: &FrameConfig) -> Vec<Packet> {
    let mut parser = FrameParser::new(config);
    stream
        .chunks(chunk)
        .flat_map(|c| parser.push(c))
        .map(|frame| frame.to_packet().expect("payload must be a packet"))
        .collect()
}

fn escaped(key: &str, raw: &[u8]) -> Packet {
    let mut packet = Packet::with_key_value(key, raw).expect("valid key");
    packet.encode_value().expect("encode must succeed");
    packet
}

#[test]
fn test_generator_session_round_trips_in_any_chunking() {
    // Arrange – the command sequence the packet generator sends to a device.
    let config = FrameConfig::default();
    let packets = vec![
        Packet::with_key_value("path", b"/dev/ttyUSB0").unwrap(),
        Packet::with_key_value("baud", b"115200").unwrap(),
        Packet::with_key_value("start", &[]).unwrap(),
        escaped("data", &[0x00, 0x0D, 0x0A, 0x5C, 0x23, 0x24, 0xFF]),
        Packet::with_key_value("stop", &[]).unwrap(),
    ];
    let stream = transmit(&packets, &config);

    for chunk in [1, 2, 3, 7, 64, stream.len()] {
        // Act
        let received = receive(&stream, chunk, &config);

        // Assert
        assert_eq!(received, packets, "chunk size {chunk}");
    }
}

#[test]
fn test_binary_value_survives_escape_frame_and_unescape() {
    let raw: Vec<u8> = (0u8..=255).collect();
    let stream = transmit(&[escaped("data", &raw)], &FrameConfig::default());

    let mut received = receive(&stream, 5, &FrameConfig::default()).remove(0);
    received.decode_value().unwrap();

    assert_eq!(received.value(), raw.as_slice());
    assert_eq!(received.key(), "data");
}

#[test]
fn test_escaped_value_is_printable_on_the_wire() {
    let packet = escaped("data", &[0x00, 0x01, 0x7F, 0x80, 0xFE]);
    let bytes = Frame::from_packet(&packet)
        .unwrap()
        .encode(&FrameConfig::default())
        .unwrap();
    let payload = &bytes[6..bytes.len() - 1];
    assert!(payload.iter().all(|b| (0x20..=0x7E).contains(b)));
}

#[test]
fn test_stream_with_noise_and_corruption_recovers() {
    // Arrange
    let config = FrameConfig {
        append_end_symbol: true,
        ..FrameConfig::default()
    };
    let good_a = encode_frame(b"baud=9600", &config).unwrap();
    let mut corrupt = encode_frame(b"data=hello", &config).unwrap();
    corrupt[8] ^= 0x01;
    let good_b = encode_frame(b"stop", &config).unwrap();

    let mut stream = b"\x00\xffboot noise".to_vec();
    stream.extend(&good_a);
    stream.extend(&corrupt);
    stream.extend(&END_BYTES);
    stream.extend(&good_b);

    // Act
    let mut parser = FrameParser::new(&config);
    let frames: Vec<_> = stream.chunks(4).flat_map(|c| parser.push(c)).collect();

    // Assert
    let payloads: Vec<&[u8]> = frames.iter().map(|f| f.payload()).collect();
    assert_eq!(payloads, vec![&b"baud=9600"[..], &b"stop"[..]]);
    assert_eq!(parser.stats().checksum_failures, 1);
    assert_eq!(parser.buffered(), 0);
}

#[test]
fn test_frame_checksum_matches_packet_checksum() {
    let packet = Packet::with_key_value("key2", b"123").unwrap();
    let frame = Frame::from_packet(&packet).unwrap();
    assert_eq!(frame.checksum(), packet.checksum());
    assert_eq!(packet.checksum(), xor_checksum(b"key2=123"));
}

#[test]
fn test_frame_starts_with_little_endian_start_symbol() {
    let bytes = encode_frame(b"start", &FrameConfig::default()).unwrap();
    assert_eq!(bytes[..2], START_BYTES);
    assert_eq!(u16::from_le_bytes([bytes[0], bytes[1]]), 0x2423);
}

#[test]
fn test_released_packet_cannot_be_sent() {
    let mut packet = Packet::with_key_value("stop", &[]).unwrap();
    packet.release();

    let mut sink = MemorySink::new();
    let result = send_packet(&mut sink, &packet, &FrameConfig::default());

    assert!(result.is_err());
    assert!(sink.frames.is_empty());
    assert_eq!(describe(Some(&packet)), "Packet(ready=0)");
}

#[test]
fn test_key_with_separator_is_rejected() {
    assert_eq!(
        Packet::with_key_value("a=b", b"c"),
        Err(PacketError::ReservedSeparator { position: 1 })
    );
}

#[test]
fn test_lenient_and_strict_decoders_disagree_only_on_malformed_input() {
    assert_eq!(decode(&encode(b"\x00ok\\")), b"\x00ok\\");
    assert_eq!(decode(b"\\xZZ"), b"\\xZZ");
    assert_eq!(
        decode_strict(b"\\xZZ"),
        Err(EscapeError::MalformedEscape { offset: 0 })
    );
}

#[test]
fn test_flipped_length_bit_does_not_stall_the_receiver() {
    // Arrange – one bit flip turns the first frame's length 4 into 2052.
    let config = FrameConfig::default();
    let mut packets = vec![Packet::with_key_value("stop", b"").unwrap()];
    packets.extend((0..5).map(|_| Packet::with_key_value("baud", b"9600").unwrap()));
    let mut stream = transmit(&packets, &config);
    stream[3] ^= 0x08;

    // Act
    let mut parser = FrameParser::new(&config);
    let mut frames: Vec<Frame> = stream.chunks(7).flat_map(|c| parser.push(c)).collect();
    frames.extend(parser.finish());

    // Assert
    assert_eq!(frames.len(), 5);
    assert!(frames.iter().all(|f| f.payload() == b"baud=9600"));
    assert_eq!(parser.stats().abandoned, 1);
    assert_eq!(parser.buffered(), 0);
}
