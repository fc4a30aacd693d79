//! Codec Tests
//!
//! Tests for command encoding and incremental response decoding.

use beanwire::protocol::{
    decode_command, encode_command, encode_frame, Command, Field, FrameDecoder, ResponseFrame,
    Status, MAX_LINE_LENGTH,
};
use beanwire::BeanError;
use proptest::prelude::*;

// =============================================================================
// Helper Functions
// =============================================================================

fn decode_all(bytes: &[u8]) -> Vec<ResponseFrame> {
    FrameDecoder::new().feed(bytes).unwrap()
}

fn assert_violation<T: std::fmt::Debug>(result: Result<T, BeanError>) {
    match result {
        Err(BeanError::ProtocolViolation(_)) => {}
        other => panic!("Expected protocol violation, got {:?}", other),
    }
}

fn assert_invalid(command: Command) {
    match encode_command(&command) {
        Err(BeanError::InvalidCommand(_)) => {}
        other => panic!("Expected invalid command, got {:?}", other),
    }
}

// =============================================================================
// Command Encoding Tests
// =============================================================================

#[test]
fn test_encode_put_exact_bytes() {
    let cmd = Command::put(100, 0, 60, "hello");
    let encoded = encode_command(&cmd).unwrap();

    assert_eq!(&encoded[..], b"put 100 0 60 5\r\nhello\r\n");
}

#[test]
fn test_encode_command_without_args() {
    let encoded = encode_command(&Command::reserve()).unwrap();
    assert_eq!(&encoded[..], b"reserve\r\n");
}

#[test]
fn test_encode_command_with_args() {
    let encoded = encode_command(&Command::release(7, 1024, 30)).unwrap();
    assert_eq!(&encoded[..], b"release 7 1024 30\r\n");
}

#[test]
fn test_encode_empty_body() {
    let encoded = encode_command(&Command::put(0, 0, 1, Vec::new())).unwrap();
    assert_eq!(&encoded[..], b"put 0 0 1 0\r\n\r\n");
}

#[test]
fn test_encode_rejects_line_terminator_in_arg() {
    assert_invalid(Command::use_tube("evil\r\nput"));
    assert_invalid(Command::new("watch").arg("a\nb"));
}

#[test]
fn test_encode_rejects_whitespace_and_empty_tokens() {
    assert_invalid(Command::new("use").arg("two words"));
    assert_invalid(Command::new("use").arg(""));
    assert_invalid(Command::new(""));
    assert_invalid(Command::new("stats\t"));
}

#[test]
fn test_encode_rejects_body_mismatch() {
    // put needs a body
    assert_invalid(Command::new("put").arg(0).arg(0).arg(60));
    // delete must not have one
    assert_invalid(Command::delete(1).body("x"));
}

#[test]
fn test_encode_unknown_verb_passes_through() {
    let encoded = encode_command(&Command::new("frobnicate").arg(1)).unwrap();
    assert_eq!(&encoded[..], b"frobnicate 1\r\n");
}

// =============================================================================
// Command Decoding Tests
// =============================================================================

#[test]
fn test_command_round_trip_binary_body() {
    let body: Vec<u8> = b"line1\r\nline2\0\r\n\n\r".to_vec();
    let cmd = Command::put(5, 10, 120, body.clone());
    let encoded = encode_command(&cmd).unwrap();

    let (decoded, used) = decode_command(&encoded).unwrap().unwrap();
    assert_eq!(used, encoded.len());
    assert_eq!(decoded.verb(), "put");
    assert_eq!(decoded.args(), &["5", "10", "120"]);
    assert_eq!(&decoded.payload().unwrap()[..], &body[..]);
    assert_eq!(decoded, cmd);
}

#[test]
fn test_decode_command_needs_more_bytes() {
    let encoded = encode_command(&Command::put(1, 2, 3, "payload")).unwrap();

    for cut in 0..encoded.len() {
        assert!(
            decode_command(&encoded[..cut]).unwrap().is_none(),
            "prefix of {} bytes decoded",
            cut
        );
    }
}

#[test]
fn test_decode_command_leaves_trailing_bytes() {
    let mut bytes = encode_command(&Command::delete(9)).unwrap().to_vec();
    bytes.extend_from_slice(b"stats\r\n");

    let (first, used) = decode_command(&bytes).unwrap().unwrap();
    assert_eq!(first, Command::delete(9));

    let (second, _) = decode_command(&bytes[used..]).unwrap().unwrap();
    assert_eq!(second, Command::stats());
}

// =============================================================================
// Frame Decoding Tests
// =============================================================================

#[test]
fn test_decode_inserted() {
    let frames = decode_all(b"INSERTED 42\r\n");

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].status, Status::Inserted);
    assert_eq!(frames[0].number(0), Some(42));
    assert!(frames[0].body.is_none());
}

#[test]
fn test_decode_reserved_body_is_opaque() {
    // Body contains CRLF and NUL; only the declared length counts
    let frames = decode_all(b"RESERVED 7 8\r\nab\r\n\0\r\nz\r\n");

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].status, Status::Reserved);
    assert_eq!(frames[0].number(0), Some(7));
    assert_eq!(&frames[0].body.as_ref().unwrap()[..], b"ab\r\n\0\r\nz");
}

#[test]
fn test_decode_using_name_field() {
    let frames = decode_all(b"USING my-tube\r\n");
    assert_eq!(frames[0].name(0), Some("my-tube"));
}

#[test]
fn test_decode_optional_fields() {
    let frames = decode_all(b"BURIED\r\nBURIED 12\r\nKICKED\r\nKICKED 3\r\n");

    assert_eq!(frames.len(), 4);
    assert_eq!(frames[0].number(0), None);
    assert_eq!(frames[1].number(0), Some(12));
    assert_eq!(frames[2].number(0), None);
    assert_eq!(frames[3].number(0), Some(3));
}

#[test]
fn test_decode_multiple_frames_in_one_chunk() {
    let frames = decode_all(b"INSERTED 1\r\nOK 4\r\n---\n\r\nDELETED\r\nTIMED_OUT\r\n");

    let statuses: Vec<Status> = frames.iter().map(|f| f.status).collect();
    assert_eq!(
        statuses,
        vec![Status::Inserted, Status::Ok, Status::Deleted, Status::TimedOut]
    );
    assert_eq!(&frames[1].body.as_ref().unwrap()[..], b"---\n");
}

#[test]
fn test_decode_waits_for_full_body() {
    let mut decoder = FrameDecoder::new();

    assert!(decoder.feed(b"FOUND 3 10\r\n01234").unwrap().is_empty());
    assert!(decoder.feed(b"56789").unwrap().is_empty());
    assert!(decoder.feed(b"\r").unwrap().is_empty());

    let frames = decoder.feed(b"\n").unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(&frames[0].body.as_ref().unwrap()[..], b"0123456789");
    assert_eq!(decoder.buffered(), 0);
}

#[test]
fn test_decode_every_split_point() {
    let frame = ResponseFrame::with_body(
        Status::Reserved,
        vec![Field::Number(99)],
        b"body\r\nwith\0bytes".to_vec(),
    );
    let bytes = encode_frame(&frame);

    for split in 0..=bytes.len() {
        let mut decoder = FrameDecoder::new();
        let mut frames = decoder.feed(&bytes[..split]).unwrap();
        frames.extend(decoder.feed(&bytes[split..]).unwrap());

        assert_eq!(frames, vec![frame.clone()], "split at {}", split);
    }
}

#[test]
fn test_decode_byte_at_a_time() {
    let bytes = b"WATCHING 2\r\nOK 12\r\n---\n- a\n- b\n\r\nNOT_FOUND\r\n";
    let mut decoder = FrameDecoder::new();

    let mut frames = Vec::new();
    for b in bytes.iter() {
        frames.extend(decoder.feed(std::slice::from_ref(b)).unwrap());
    }

    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].number(0), Some(2));
    assert_eq!(&frames[1].body.as_ref().unwrap()[..], b"---\n- a\n- b\n");
    assert_eq!(frames[2].status, Status::NotFound);
}

// =============================================================================
// Protocol Violation Tests
// =============================================================================

#[test]
fn test_unknown_status_poisons_decoder() {
    let mut decoder = FrameDecoder::new();

    assert_violation(decoder.feed(b"WHATEVER 1\r\n"));
    assert!(decoder.is_poisoned());

    // Nothing after the bad frame is trusted, even valid bytes
    assert_violation(decoder.feed(b"DELETED\r\n"));
}

#[test]
fn test_frames_ahead_of_violation_are_kept() {
    let mut decoder = FrameDecoder::new();

    let frames = decoder.feed(b"INSERTED 1\r\nDELETED\r\nGARBAGE\r\nINSERTED 2\r\n").unwrap();
    let statuses: Vec<Status> = frames.iter().map(|f| f.status).collect();
    assert_eq!(statuses, vec![Status::Inserted, Status::Deleted]);
    assert!(decoder.is_poisoned());

    // The violation is reported on the next call, with its cause
    match decoder.feed(b"") {
        Err(BeanError::ProtocolViolation(msg)) => assert!(msg.contains("GARBAGE"), "{}", msg),
        other => panic!("Expected protocol violation, got {:?}", other),
    }
}

#[test]
fn test_non_numeric_body_length() {
    assert_violation(FrameDecoder::new().feed(b"RESERVED 1 abc\r\n"));
    assert_violation(FrameDecoder::new().feed(b"OK -5\r\n"));
}

#[test]
fn test_wrong_field_count() {
    assert_violation(FrameDecoder::new().feed(b"DELETED 5\r\n"));
    assert_violation(FrameDecoder::new().feed(b"INSERTED\r\n"));
    assert_violation(FrameDecoder::new().feed(b"RESERVED 1\r\n"));
}

#[test]
fn test_body_without_trailing_crlf() {
    assert_violation(FrameDecoder::new().feed(b"RESERVED 1 3\r\nabcXY"));
}

#[test]
fn test_body_over_limit() {
    let mut decoder = FrameDecoder::with_max_body(4);
    // Rejected on the status line, before any body arrives
    assert_violation(decoder.feed(b"OK 5\r\n"));
}

#[test]
fn test_overlong_status_line() {
    let line = vec![b'A'; MAX_LINE_LENGTH + 2];
    assert_violation(FrameDecoder::new().feed(&line));
}

#[test]
fn test_bare_lf_terminator() {
    assert_violation(FrameDecoder::new().feed(b"DELETED\n"));
}

#[test]
fn test_double_space_is_malformed() {
    assert_violation(FrameDecoder::new().feed(b"INSERTED  1\r\n"));
}

#[test]
fn test_partial_line_is_not_an_error() {
    let mut decoder = FrameDecoder::new();
    assert!(decoder.feed(b"INSERT").unwrap().is_empty());
    assert!(!decoder.is_poisoned());
    assert_eq!(decoder.feed(b"ED 5\r\n").unwrap()[0].number(0), Some(5));
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #[test]
    fn prop_put_round_trips(
        body in proptest::collection::vec(any::<u8>(), 0..512),
        priority in any::<u32>(),
        ttr in 1u32..86_400,
    ) {
        let cmd = Command::put(priority, 0, ttr, body);
        let encoded = encode_command(&cmd).unwrap();

        let (decoded, used) = decode_command(&encoded).unwrap().unwrap();
        prop_assert_eq!(used, encoded.len());
        prop_assert_eq!(decoded, cmd);
    }

    #[test]
    fn prop_split_reads_yield_one_identical_frame(
        body in proptest::collection::vec(any::<u8>(), 0..256),
        id in any::<u64>(),
        split in any::<usize>(),
    ) {
        let frame = ResponseFrame::with_body(Status::Found, vec![Field::Number(id)], body);
        let bytes = encode_frame(&frame);
        let split = split % (bytes.len() + 1);

        let mut decoder = FrameDecoder::new();
        let mut frames = decoder.feed(&bytes[..split]).unwrap();
        frames.extend(decoder.feed(&bytes[split..]).unwrap());

        prop_assert_eq!(frames, vec![frame]);
    }
}
