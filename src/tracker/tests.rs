use super::http::{parse_announce_body, percent_encode};
use super::*;

#[test]
fn compact_peers_parse() {
    let data = [
        192, 168, 1, 1, 0x1A, 0xE1, // 192.168.1.1:6881
        10, 0, 0, 1, 0x1B, 0x39, // 10.0.0.1:6969
    ];
    let peers = parse_compact_peers(&data).unwrap();

    assert_eq!(peers.len(), 2);
    assert_eq!(peers[0].to_string(), "192.168.1.1:6881");
    assert_eq!(peers[1].to_string(), "10.0.0.1:6969");
}

#[test]
fn compact_peers_reject_partial_entries() {
    assert!(matches!(
        parse_compact_peers(&[1, 2, 3, 4, 5]),
        Err(TrackerError::InvalidResponse(_))
    ));
}

#[test]
fn percent_encoding_roundtrips_raw_bytes() {
    // Unreserved characters pass through, everything else is %XX.
    assert_eq!(percent_encode(b"abc-_.~"), "abc-_.~");
    assert_eq!(percent_encode(&[0x00, 0xff, b' ']), "%00%FF%20");
    // 20 arbitrary hash bytes always produce a pure-ASCII query value.
    let encoded = percent_encode(&[0xd6; 20]);
    assert!(encoded.chars().all(|c| c.is_ascii()));
}

#[test]
fn announce_body_with_compact_peers() {
    let body = b"d8:completei3e10:incompletei1e8:intervali1800e5:peers6:\x7f\x00\x00\x01\x1a\xe1e";
    let response = parse_announce_body(body).unwrap();

    assert_eq!(response.interval, Some(1800));
    assert_eq!(response.complete, Some(3));
    assert_eq!(response.incomplete, Some(1));
    assert_eq!(response.peers.len(), 1);
    assert_eq!(response.peers[0].to_string(), "127.0.0.1:6881");
}

#[test]
fn announce_body_failure_reason() {
    let body = b"d14:failure reason11:not allowede";
    assert!(matches!(
        parse_announce_body(body),
        Err(TrackerError::Failure(reason)) if reason == "not allowed"
    ));
}

#[test]
fn announce_body_empty_peer_list() {
    let body = b"d8:intervali1800e5:peers0:e";
    assert!(matches!(
        parse_announce_body(body),
        Err(TrackerError::NoPeers)
    ));
}

#[test]
fn announce_body_missing_peers() {
    assert!(matches!(
        parse_announce_body(b"d8:intervali1800ee"),
        Err(TrackerError::InvalidResponse(_))
    ));
}

#[test]
fn rejects_non_http_announce_url() {
    assert!(matches!(
        HttpTracker::new("udp://tracker.example:6969"),
        Err(TrackerError::InvalidUrl(_))
    ));
}
