use crate::error::RpcError;
use crate::transport::framing::{ANTI_HIJACK_PREAMBLE, FrameReader, split_frames};

fn assemble(payloads: &[&[u8]]) -> Vec<u8> {
    let mut body = ANTI_HIJACK_PREAMBLE.to_vec();
    body.push(b'\n');
    for payload in payloads {
        body.extend_from_slice(format!("{}\n", payload.len()).as_bytes());
        body.extend_from_slice(payload);
        body.push(b'\n');
    }
    body
}

/// **VALUE**: Verifies the de-framer reconstructs every payload exactly, however the
/// bytes are split across network reads.
///
/// **WHY THIS MATTERS**: The body arrives as an arbitrary sequence of TCP chunks. A
/// length line or payload may straddle any boundary, including the preamble itself.
///
/// **BUG THIS CATCHES**: Would catch a reader that assumes one chunk per frame, or that
/// drops bytes buffered between `push` calls.
#[test]
fn given_byte_at_a_time_stream_when_reading_then_reconstructs_payloads() {
    // GIVEN: Three payloads, one of them empty
    let payloads: [&[u8]; 3] = [b"[\"first\"]", b"", b"[[\"wrb.fr\",\"A\"]]"];
    let body = assemble(&payloads);

    // WHEN: Pushing one byte at a time
    let mut reader = FrameReader::new();
    let mut frames = Vec::new();
    for byte in &body {
        reader.push(std::slice::from_ref(byte));
        while let Some(frame) = reader.next_frame().unwrap() {
            frames.push(frame);
        }
    }
    reader.finish().unwrap();

    // THEN: Payloads come back in order, byte for byte
    let read: Vec<&[u8]> = frames.iter().map(|f| f.payload.as_slice()).collect();
    assert_eq!(read, payloads.to_vec());
    assert_eq!(frames[2].declared_length, payloads[2].len());
}

/// **VALUE**: Verifies that a stream ending mid-chunk is a framing error, not a short frame.
///
/// **WHY THIS MATTERS**: Passing a truncated payload to the JSON layer would surface as a
/// confusing parse failure, or worse, a silently partial decode.
///
/// **BUG THIS CATCHES**: Would catch a `finish()` that ignores leftover bytes.
#[test]
fn given_truncated_final_chunk_when_finishing_then_returns_framing_error() {
    // GIVEN: A complete frame followed by a chunk declaring 50 bytes but carrying 5
    let mut body = assemble(&[b"[1]"]);
    body.extend_from_slice(b"50\n[2,3");
    let truncated_line_offset = body.len() - "50\n[2,3".len();

    // WHEN: Reading everything, then finishing
    let mut reader = FrameReader::new();
    reader.push(&body);
    let first = reader.next_frame().unwrap().expect("first frame is complete");
    let second = reader.next_frame().unwrap();
    let result = reader.finish();

    // THEN: The first frame survives, the second never appears, finish reports the cut
    assert_eq!(first.payload, b"[1]");
    assert!(second.is_none());
    match result.unwrap_err() {
        RpcError::Framing { message, offset, .. } => {
            assert!(message.contains("declared 50 bytes, received 4"), "{message}");
            assert_eq!(offset, truncated_line_offset);
        }
        other => panic!("Expected Framing, got {other:?}"),
    }
}

#[test]
fn given_unparseable_length_when_reading_then_returns_framing_error_with_offset() {
    let mut body = ANTI_HIJACK_PREAMBLE.to_vec();
    body.extend_from_slice(b"\nabc\n[]\n");

    let result = split_frames(&body);

    match result.unwrap_err() {
        RpcError::Framing { message, offset, .. } => {
            assert!(message.contains("unparseable chunk length"), "{message}");
            assert_eq!(offset, ANTI_HIJACK_PREAMBLE.len() + 1);
        }
        other => panic!("Expected Framing, got {other:?}"),
    }
}

/// **VALUE**: Verifies the preamble is checked verbatim.
///
/// **WHY THIS MATTERS**: A body without the sentinel is not a batch response at all
/// (typically an HTML login page). Treating it as frames yields nonsense lengths.
///
/// **BUG THIS CATCHES**: Would catch a reader that skips the first line without looking.
#[test]
fn given_body_without_preamble_when_reading_then_fails_at_offset_zero() {
    // GIVEN: An HTML page
    let mut reader = FrameReader::new();
    reader.push(b"<!DOCTYPE html><html>ServiceLogin</html>");

    // WHEN: Reading
    let result = reader.next_frame();

    // THEN: Framing error at the very start, preamble not matched
    match result.unwrap_err() {
        RpcError::Framing { offset, .. } => assert_eq!(offset, 0),
        other => panic!("Expected Framing, got {other:?}"),
    }
    assert!(!reader.preamble_matched());
}

#[test]
fn given_partial_preamble_when_reading_then_waits_for_more_bytes() {
    let mut reader = FrameReader::new();
    reader.push(b")]");

    assert!(reader.next_frame().unwrap().is_none());

    reader.push(b"}'\n2\n[]");
    let frame = reader.next_frame().unwrap().expect("frame after preamble");
    assert_eq!(frame.payload, b"[]");
    assert!(reader.preamble_matched());
}

/// **VALUE**: Verifies declared lengths count bytes, not characters.
///
/// **WHY THIS MATTERS**: Titles and notes are routinely non-ASCII. Counting chars would
/// cut multi-byte payloads short and misalign every following frame.
///
/// **BUG THIS CATCHES**: Would catch a switch to `str::chars().count()` style counting.
#[test]
fn given_multibyte_payload_when_reading_then_length_counts_bytes() {
    // GIVEN: A payload with a two-byte character
    let payload = "[\"café\"]".as_bytes();
    let body = assemble(&[payload, b"[0]"]);

    // WHEN: Splitting
    let frames = split_frames(&body).unwrap();

    // THEN: Both frames intact
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].payload, payload);
    assert_eq!(frames[1].payload, b"[0]");
}

#[test]
fn given_blank_lines_between_chunks_when_reading_then_ignores_them() {
    let mut body = ANTI_HIJACK_PREAMBLE.to_vec();
    body.extend_from_slice(b"\n\n\r\n3\n[1]\n\n\n3\n[2]\n");

    let frames = split_frames(&body).unwrap();

    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1].payload, b"[2]");
}

#[test]
fn given_empty_stream_when_finishing_then_reports_missing_preamble() {
    let reader = FrameReader::new();

    let result = reader.finish();

    assert!(matches!(result, Err(RpcError::Framing { offset: 0, .. })));
}

#[test]
fn given_preamble_only_when_finishing_then_succeeds_with_no_frames() {
    let frames = split_frames(b")]}'\n").unwrap();

    assert!(frames.is_empty());
}

#[test]
fn given_frame_when_read_then_offset_points_at_payload() {
    let body = assemble(&[b"[7]"]);

    let frames = split_frames(&body).unwrap();

    let offset = frames[0].offset;
    assert_eq!(&body[offset..offset + 3], b"[7]");
}
