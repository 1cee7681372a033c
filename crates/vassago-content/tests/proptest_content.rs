//! Property-based tests for container headers and content reading.
//!
//! - Parsing a prologue is independent of the payload and stable across re-parses
//! - Arbitrary payload bytes produce errors, never panics
//! - A failed manifest leaves the registry as it found it
//!
//! Run with: cargo test -p vassago-content --test proptest_content

use std::io::{Cursor, Read, Seek, SeekFrom};

use proptest::prelude::*;

use vassago_content::readers::{
    list_reader_name, BOOLEAN_READER, DOUBLE_READER, INT32_READER, LIST_OF_STRING_READER, STRING_READER,
    VECTOR2_READER,
};
use vassago_content::testing::{compressed_container, plain_container, ContentWriter};
use vassago_content::{AssetHeader, ContentReader, Error, HeaderOptions, TypeReaderRegistry};

const LEAF_READERS: [&str; 5] = [BOOLEAN_READER, DOUBLE_READER, INT32_READER, STRING_READER, VECTOR2_READER];

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        max_shrink_iters: 100,
        ..ProptestConfig::default()
    })]

    /// Property: re-parsing a prologue yields the same header and stream position.
    #[test]
    fn prop_header_reparse_is_stable(
        profile in 0u8..0x80,
        payload in prop::collection::vec(any::<u8>(), 0..2000),
        compressed in any::<bool>(),
    ) {
        let file = if compressed {
            compressed_container(profile, &payload)
        } else {
            plain_container(profile, &payload)
        };
        let options = HeaderOptions::default();
        let mut cursor = Cursor::new(file);

        let first = AssetHeader::parse(&mut cursor, &options).unwrap();
        let after_first = cursor.stream_position().unwrap();
        cursor.seek(SeekFrom::Start(0)).unwrap();
        let second = AssetHeader::parse(&mut cursor, &options).unwrap();

        prop_assert_eq!(first, second);
        prop_assert_eq!(cursor.stream_position().unwrap(), after_first);
        prop_assert_eq!(after_first, first.prologue_size() as u64);
        prop_assert_eq!(first.graphics_profile.id(), profile);
        prop_assert_eq!(first.content_size() as usize, payload.len());
    }

    /// Property: a prepared container yields the payload it was built from.
    #[test]
    fn prop_prepared_payload_matches(
        payload in prop::collection::vec(any::<u8>(), 0..3000),
        compressed in any::<bool>(),
    ) {
        let file = if compressed {
            compressed_container(0, &payload)
        } else {
            plain_container(0, &payload)
        };
        let (header, mut stream) = AssetHeader::prepare(Cursor::new(file), &HeaderOptions::default()).unwrap();
        prop_assert_eq!(header.compressed, compressed);

        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        prop_assert_eq!(out, payload);
    }

    /// Property: reading an asset from arbitrary bytes never panics.
    #[test]
    fn prop_reader_rejects_garbage_cleanly(
        manifest_len in 0usize..4,
        tail in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let registry = TypeReaderRegistry::with_default_readers();
        let entries: Vec<(&str, i32)> = LEAF_READERS.iter().take(manifest_len).map(|name| (*name, 0)).collect();
        let mut writer = ContentWriter::new();
        writer.manifest(&entries).bytes(&tail);

        let mut input = ContentReader::new(Cursor::new(writer.into_bytes()), &registry);
        let _ = input.read_asset::<i32>();
        let mut input = ContentReader::new(Cursor::new(tail.clone()), &registry);
        let _ = input.read_asset::<String>();
    }

    /// Property: strings survive a List<String> asset unchanged.
    #[test]
    fn prop_string_list(items in prop::collection::vec(".{0,40}", 0..20)) {
        let registry = TypeReaderRegistry::with_default_readers();
        let mut writer = ContentWriter::new();
        writer
            .manifest(&[(LIST_OF_STRING_READER, 0), (STRING_READER, 0)])
            .encoded_int(0)
            .encoded_int(1)
            .i32(items.len() as i32);
        for item in &items {
            writer.encoded_int(2).string(item);
        }

        let mut input = ContentReader::new(Cursor::new(writer.into_bytes()), &registry);
        let list: Vec<String> = input.read_asset().unwrap();
        prop_assert_eq!(list, items);
    }

    /// Property: a version mismatch at entry `k` removes every reader the
    /// manifest created before it.
    #[test]
    fn prop_manifest_rollback(
        warm in prop::collection::vec(0usize..LEAF_READERS.len(), 0..3),
        fresh in prop::collection::vec(0usize..LEAF_READERS.len(), 0..5),
        bad_version in 1i32..100,
    ) {
        let registry = TypeReaderRegistry::with_default_readers();
        for index in &warm {
            let mut writer = ContentWriter::new();
            writer.string(LEAF_READERS[*index]).i32(0);
            let mut input = ContentReader::new(Cursor::new(writer.into_bytes()), &registry);
            registry.read_manifest(1, &mut input).unwrap();
        }
        let baseline = registry.len();
        let vector_list = list_reader_name("Microsoft.Xna.Framework.Vector2");

        let mut writer = ContentWriter::new();
        for index in &fresh {
            writer.string(LEAF_READERS[*index]).i32(0);
        }
        writer.string(&vector_list).i32(bad_version);
        let mut input = ContentReader::new(Cursor::new(writer.into_bytes()), &registry);
        let err = registry.read_manifest(fresh.len() + 1, &mut input).err().expect("expected error");

        prop_assert!(matches!(err, Error::TypeVersionMismatch { .. }), "unexpected error: {}", err);
        prop_assert_eq!(registry.len(), baseline);
        for index in &fresh {
            prop_assert_eq!(
                registry.reader_for_name(LEAF_READERS[*index]).is_some(),
                warm.contains(index)
            );
        }
    }
}
