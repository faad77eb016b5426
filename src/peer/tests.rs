use bytes::Bytes;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use super::session::{assemble_blocks, block_count, verify_piece};
use super::*;
use crate::metainfo::InfoHash;

#[test]
fn handshake_is_68_bytes() {
    let handshake = Handshake::new([0xaa; 20], [0xbb; 20]);
    let encoded = handshake.encode();

    assert_eq!(encoded.len(), HANDSHAKE_LEN);
    assert_eq!(encoded[0], 19);
    assert_eq!(&encoded[1..20], PROTOCOL);
    assert_eq!(&encoded[20..28], &[0u8; 8]);
    assert_eq!(&encoded[28..48], &[0xaa; 20]);
    assert_eq!(&encoded[48..68], &[0xbb; 20]);
}

#[test]
fn handshake_extension_bit() {
    let plain = Handshake::new([0; 20], [0; 20]);
    assert!(!plain.supports_extension_protocol());

    let extended = Handshake::with_extensions([0; 20], [0; 20]);
    assert_eq!(extended.reserved[5], 0x10);
    assert!(extended.supports_extension_protocol());

    let decoded = Handshake::decode(&extended.encode()).unwrap();
    assert!(decoded.supports_extension_protocol());
}

#[test]
fn handshake_rejects_wrong_protocol() {
    let mut bad = Handshake::new([0; 20], [0; 20]).encode().to_vec();
    bad[1] = b'X';
    assert!(matches!(
        Handshake::decode(&bad),
        Err(PeerError::InvalidHandshake)
    ));

    assert!(matches!(
        Handshake::decode(&[19; 10]),
        Err(PeerError::InvalidHandshake)
    ));
}

#[test]
fn message_roundtrips() {
    let messages = [
        Message::KeepAlive,
        Message::Choke,
        Message::Unchoke,
        Message::Interested,
        Message::NotInterested,
        Message::Have { piece: 9 },
        Message::Bitfield(Bytes::from_static(&[0xff, 0x00])),
        Message::Request {
            index: 1,
            begin: 16384,
            length: 16384,
        },
        Message::Piece {
            index: 1,
            begin: 16384,
            data: Bytes::from_static(b"block data"),
        },
        Message::Cancel {
            index: 1,
            begin: 0,
            length: 16384,
        },
        Message::Extended {
            id: 3,
            payload: Bytes::from_static(b"d1:mdee"),
        },
    ];

    for message in messages {
        let decoded = Message::decode(message.encode()).unwrap();
        assert_eq!(decoded, message);
    }
}

#[test]
fn keep_alive_is_length_zero() {
    assert_eq!(Message::KeepAlive.encode().as_ref(), &[0, 0, 0, 0]);
    assert_eq!(
        Message::decode(Bytes::from_static(&[0, 0, 0, 0])).unwrap(),
        Message::KeepAlive
    );
}

#[test]
fn message_decode_rejects_garbage() {
    assert!(matches!(
        Message::decode(Bytes::from_static(&[0, 0])),
        Err(PeerError::InvalidMessage(_))
    ));
    // Declared length longer than the data.
    assert!(matches!(
        Message::decode(Bytes::from_static(&[0, 0, 0, 9, 7, 0])),
        Err(PeerError::InvalidMessage(_))
    ));
    // Unknown id.
    assert!(matches!(
        Message::decode(Bytes::from_static(&[0, 0, 0, 1, 42])),
        Err(PeerError::InvalidMessageId(42))
    ));
}

#[test]
fn request_payload_layout() {
    let encoded = Message::Request {
        index: 2,
        begin: 32768,
        length: 16384,
    }
    .encode();

    assert_eq!(&encoded[0..4], &[0, 0, 0, 13]);
    assert_eq!(encoded[4], MessageId::Request as u8);
    assert_eq!(&encoded[5..9], &2u32.to_be_bytes());
    assert_eq!(&encoded[9..13], &32768u32.to_be_bytes());
    assert_eq!(&encoded[13..17], &16384u32.to_be_bytes());
}

#[test]
fn extension_handshake_roundtrip() {
    let local = ExtensionHandshake::local();
    let encoded = local.encode();
    assert_eq!(encoded.as_ref(), b"d1:md11:ut_metadatai1eee");

    let decoded = ExtensionHandshake::decode(&encoded).unwrap();
    assert_eq!(decoded.ut_metadata(), Some(LOCAL_UT_METADATA_ID));
}

#[test]
fn extension_handshake_reads_peer_fields() {
    let payload = b"d1:md11:ut_metadatai42ee13:metadata_sizei31235ee";
    let handshake = ExtensionHandshake::decode(payload).unwrap();

    assert_eq!(handshake.ut_metadata(), Some(42));
    assert_eq!(handshake.metadata_size, Some(31235));
}

#[test]
fn extension_handshake_ignores_disabled_extensions() {
    let payload = b"d1:md11:ut_metadatai0eee";
    let handshake = ExtensionHandshake::decode(payload).unwrap();
    assert_eq!(handshake.ut_metadata(), None);
}

#[test]
fn metadata_request_encoding() {
    let encoded = MetadataMessage::request(0).encode();
    assert_eq!(encoded.as_ref(), b"d8:msg_typei0e5:piecei0ee");
}

#[test]
fn metadata_data_message_splits_dict_and_payload() {
    let raw = b"d8:msg_typei1e5:piecei0e10:total_sizei10eeinfo bytes";
    let message = MetadataMessage::decode(raw).unwrap();

    assert_eq!(message.msg_type, MetadataMessageType::Data);
    assert_eq!(message.piece, 0);
    assert_eq!(message.total_size, Some(10));
    assert_eq!(message.data.as_deref(), Some(b"info bytes".as_slice()));
}

#[test]
fn metadata_reject_message() {
    let message = MetadataMessage::decode(b"d8:msg_typei2e5:piecei3ee").unwrap();
    assert_eq!(message.msg_type, MetadataMessageType::Reject);
    assert_eq!(message.piece, 3);
    assert!(message.data.is_none());
}

#[test]
fn metadata_piece_counts() {
    assert_eq!(metadata_piece_count(1), 1);
    assert_eq!(metadata_piece_count(16384), 1);
    assert_eq!(metadata_piece_count(16385), 2);
    assert_eq!(metadata_piece_count(50000), 4);
}

#[test]
fn block_counts_cover_partial_final_block() {
    assert_eq!(block_count(16384), 1);
    assert_eq!(block_count(32768), 2);
    assert_eq!(block_count(40000), 3);
    assert_eq!(block_count(1), 1);
}

#[test]
fn blocks_reassemble_regardless_of_arrival_order() {
    let first = Bytes::from(vec![1u8; BLOCK_SIZE as usize]);
    let second = Bytes::from(vec![2u8; 100]);

    // The 32768+100 piece arrives tail-first.
    let blocks = vec![
        (2 * BLOCK_SIZE, second.clone()),
        (0, first.clone()),
        (BLOCK_SIZE, first.clone()),
    ];
    let piece = assemble_blocks(0, blocks, 2 * u64::from(BLOCK_SIZE) + 100).unwrap();

    assert_eq!(piece.len(), 2 * BLOCK_SIZE as usize + 100);
    assert_eq!(&piece[..BLOCK_SIZE as usize], first.as_ref());
    assert_eq!(&piece[2 * BLOCK_SIZE as usize..], second.as_ref());
}

#[test]
fn reassembly_rejects_gaps() {
    let blocks = vec![
        (0u32, Bytes::from(vec![0u8; BLOCK_SIZE as usize])),
        // Offset 2*BLOCK_SIZE leaves a hole.
        (2 * BLOCK_SIZE, Bytes::from(vec![0u8; 100])),
    ];
    assert!(matches!(
        assemble_blocks(7, blocks, 3 * u64::from(BLOCK_SIZE)),
        Err(PeerError::BlockOutOfOrder { index: 7, .. })
    ));
}

#[test]
fn reassembly_rejects_wrong_total_length() {
    let blocks = vec![(0u32, Bytes::from(vec![0u8; 10]))];
    assert!(matches!(
        assemble_blocks(0, blocks, 11),
        Err(PeerError::Protocol(_))
    ));
}

#[test]
fn piece_verification() {
    let data = b"piece contents";
    let good: [u8; 20] = Sha1::digest(data).into();

    assert!(verify_piece(0, data, &good).is_ok());
    assert!(matches!(
        verify_piece(5, data, &[0u8; 20]),
        Err(PeerError::PieceHashMismatch { index: 5 })
    ));
}

#[test]
fn peer_id_has_prefix_and_varies() {
    let a = PeerId::generate();
    let b = PeerId::generate();

    assert_eq!(&a.as_bytes()[..8], b"-BG0001-");
    assert_ne!(a.as_bytes(), b.as_bytes());
}

// Scripted-peer tests: a task on the other end of a loopback socket plays
// the remote side of the protocol, byte for byte.

async fn read_frame(stream: &mut TcpStream) -> Message {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await.unwrap();
    let len = u32::from_be_bytes(len_buf) as usize;

    let mut frame = len_buf.to_vec();
    frame.resize(4 + len, 0);
    stream.read_exact(&mut frame[4..]).await.unwrap();
    Message::decode(Bytes::from(frame)).unwrap()
}

#[tokio::test]
async fn downloads_piece_with_pipelined_requests_in_any_order() {
    let piece: Vec<u8> = (0..32768u32).map(|i| (i % 251) as u8).collect();
    let expected: [u8; 20] = Sha1::digest(&piece).into();
    let info_hash = InfoHash([0x21; 20]);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let served_piece = piece.clone();
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut raw = [0u8; HANDSHAKE_LEN];
        stream.read_exact(&mut raw).await.unwrap();
        let theirs = Handshake::decode(&raw).unwrap();
        assert_eq!(theirs.info_hash, [0x21; 20]);
        assert!(!theirs.supports_extension_protocol());

        let reply = Handshake::new([0x21; 20], [0x99; 20]);
        stream.write_all(&reply.encode()).await.unwrap();
        stream
            .write_all(&Message::Bitfield(Bytes::from_static(&[0xff])).encode())
            .await
            .unwrap();

        assert_eq!(read_frame(&mut stream).await, Message::Interested);

        // A keep-alive in the middle must be skipped by the client.
        stream.write_all(&Message::KeepAlive.encode()).await.unwrap();
        stream.write_all(&Message::Unchoke.encode()).await.unwrap();

        // A 32768-byte piece is exactly two standard blocks.
        let mut begins = Vec::new();
        for _ in 0..2 {
            match read_frame(&mut stream).await {
                Message::Request {
                    index,
                    begin,
                    length,
                } => {
                    assert_eq!(index, 0);
                    assert_eq!(length, BLOCK_SIZE);
                    begins.push(begin);
                }
                other => panic!("expected request, got {other:?}"),
            }
        }
        assert_eq!(begins, vec![0, BLOCK_SIZE]);

        // Serve the blocks tail-first; reassembly must not care.
        for &begin in begins.iter().rev() {
            let start = begin as usize;
            let data =
                Bytes::copy_from_slice(&served_piece[start..start + BLOCK_SIZE as usize]);
            stream
                .write_all(
                    &Message::Piece {
                        index: 0,
                        begin,
                        data,
                    }
                    .encode(),
                )
                .await
                .unwrap();
        }

        // No third request may follow.
        let mut rest = Vec::new();
        stream.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    });

    let peer_id = PeerId::generate();
    let mut session = PeerSession::connect(addr, &info_hash, &peer_id, false)
        .await
        .unwrap();
    assert_eq!(session.remote_peer_id(), &[0x99; 20]);

    session.await_bitfield().await.unwrap();
    session.express_interest().await.unwrap();
    let downloaded = session.download_piece(0, 32768, &expected).await.unwrap();
    assert_eq!(downloaded.as_ref(), piece.as_slice());

    drop(session);
    server.await.unwrap();
}

#[tokio::test]
async fn fetches_and_verifies_multi_piece_metadata() {
    // An info dictionary whose encoding spans two metadata pieces.
    let piece_hashes = vec![0xabu8; 850 * 20];
    let mut blob = Vec::new();
    blob.extend_from_slice(b"d6:lengthi13926400e4:name1:x12:piece lengthi16384e6:pieces17000:");
    blob.extend_from_slice(&piece_hashes);
    blob.push(b'e');
    assert!(blob.len() > METADATA_PIECE_SIZE);

    let info_hash = InfoHash(Sha1::digest(&blob).into());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let served_blob = blob.clone();
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut raw = [0u8; HANDSHAKE_LEN];
        stream.read_exact(&mut raw).await.unwrap();
        let theirs = Handshake::decode(&raw).unwrap();
        assert!(theirs.supports_extension_protocol());

        let reply = Handshake::with_extensions(theirs.info_hash, [0x77; 20]);
        stream.write_all(&reply.encode()).await.unwrap();
        stream
            .write_all(&Message::Bitfield(Bytes::from_static(&[0xff])).encode())
            .await
            .unwrap();

        // Their extension handshake advertises ut_metadata = 1.
        match read_frame(&mut stream).await {
            Message::Extended { id, payload } => {
                assert_eq!(id, EXTENSION_HANDSHAKE_ID);
                let handshake = ExtensionHandshake::decode(&payload).unwrap();
                assert_eq!(handshake.ut_metadata(), Some(LOCAL_UT_METADATA_ID));
            }
            other => panic!("expected extension handshake, got {other:?}"),
        }

        // Ours picks 7 for ut_metadata.
        let ours = ExtensionHandshake {
            extensions: [("ut_metadata".to_string(), 7u8)].into_iter().collect(),
            metadata_size: Some(served_blob.len() as i64),
        };
        stream
            .write_all(
                &Message::Extended {
                    id: EXTENSION_HANDSHAKE_ID,
                    payload: ours.encode(),
                }
                .encode(),
            )
            .await
            .unwrap();

        // Serve both metadata pieces on request.
        for piece in 0..2u32 {
            match read_frame(&mut stream).await {
                Message::Extended { id, payload } => {
                    assert_eq!(id, 7);
                    let request = MetadataMessage::decode(&payload).unwrap();
                    assert_eq!(request.msg_type, MetadataMessageType::Request);
                    assert_eq!(request.piece, piece);
                }
                other => panic!("expected metadata request, got {other:?}"),
            }

            let start = piece as usize * METADATA_PIECE_SIZE;
            let end = (start + METADATA_PIECE_SIZE).min(served_blob.len());
            let data = MetadataMessage {
                msg_type: MetadataMessageType::Data,
                piece,
                total_size: Some(served_blob.len() as u64),
                data: Some(Bytes::copy_from_slice(&served_blob[start..end])),
            };
            stream
                .write_all(
                    &Message::Extended {
                        id: LOCAL_UT_METADATA_ID,
                        payload: data.encode(),
                    }
                    .encode(),
                )
                .await
                .unwrap();
        }
    });

    let peer_id = PeerId::generate();
    let mut session = PeerSession::connect(addr, &info_hash, &peer_id, true)
        .await
        .unwrap();
    assert!(session.supports_extensions());

    session.await_bitfield().await.unwrap();
    let handshake = session.exchange_extension_handshake().await.unwrap();
    assert_eq!(session.peer_metadata_id(), Some(7));
    assert_eq!(handshake.metadata_size, Some(blob.len() as i64));

    let fetched = session.fetch_metadata(&info_hash).await.unwrap();
    assert_eq!(fetched.as_ref(), blob.as_slice());

    drop(session);
    server.await.unwrap();
}

#[tokio::test]
async fn metadata_hash_mismatch_is_detected() {
    let blob = b"d6:lengthi1e4:name1:x12:piece lengthi1e6:pieces20:aaaaaaaaaaaaaaaaaaaae".to_vec();
    // Deliberately not the hash of `blob`.
    let wrong_hash = InfoHash([0x13; 20]);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let served_blob = blob.clone();
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut raw = [0u8; HANDSHAKE_LEN];
        stream.read_exact(&mut raw).await.unwrap();
        let theirs = Handshake::decode(&raw).unwrap();
        let reply = Handshake::with_extensions(theirs.info_hash, [0x77; 20]);
        stream.write_all(&reply.encode()).await.unwrap();
        stream
            .write_all(&Message::Bitfield(Bytes::from_static(&[0xff])).encode())
            .await
            .unwrap();

        let _ = read_frame(&mut stream).await;
        let ours = ExtensionHandshake {
            extensions: [("ut_metadata".to_string(), 3u8)].into_iter().collect(),
            metadata_size: None,
        };
        stream
            .write_all(
                &Message::Extended {
                    id: EXTENSION_HANDSHAKE_ID,
                    payload: ours.encode(),
                }
                .encode(),
            )
            .await
            .unwrap();

        let _ = read_frame(&mut stream).await;
        let data = MetadataMessage {
            msg_type: MetadataMessageType::Data,
            piece: 0,
            total_size: Some(served_blob.len() as u64),
            data: Some(Bytes::from(served_blob)),
        };
        stream
            .write_all(
                &Message::Extended {
                    id: LOCAL_UT_METADATA_ID,
                    payload: data.encode(),
                }
                .encode(),
            )
            .await
            .unwrap();
    });

    let peer_id = PeerId::generate();
    let mut session = PeerSession::connect(addr, &wrong_hash, &peer_id, true)
        .await
        .unwrap();
    session.await_bitfield().await.unwrap();
    session.exchange_extension_handshake().await.unwrap();

    assert!(matches!(
        session.fetch_metadata(&wrong_hash).await,
        Err(PeerError::MetadataHashMismatch)
    ));

    drop(session);
    server.await.unwrap();
}
