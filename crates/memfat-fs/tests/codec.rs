use memfat_fs::{
    BlockPtr, DecodeError, DirEntry, FileType, DIRECTORY_ENTRY_SIZE, FAT_EOF, FAT_FREE,
    MAX_FILENAME_LEN,
};

#[test]
fn encode_places_fields_at_contract_offsets() {
    let entry = DirEntry::new("report.txt", FileType::Directory, BlockPtr::Index(7), 1234, 99_999);
    let bytes = entry.encode();

    assert_eq!(&bytes[..10], b"report.txt");
    assert!(bytes[10..28].iter().all(|&b| b == 0), "name must be null padded");
    assert_eq!(bytes[28], 1, "directory type byte");
    assert_eq!(bytes[29..33], 7i32.to_le_bytes());
    assert_eq!(bytes[33..41], 1234i64.to_le_bytes());
    assert_eq!(bytes[41..49], 99_999i64.to_le_bytes());
}

#[test]
fn file_type_byte_is_zero() {
    let entry = DirEntry::new("a", FileType::File, BlockPtr::Eof, 0, 0);
    assert_eq!(entry.encode()[28], 0);
}

#[test]
fn sentinels_encode_as_negative_wire_values() {
    let eof = DirEntry::new("e", FileType::File, BlockPtr::Eof, 0, 0);
    assert_eq!(eof.encode()[29..33], FAT_EOF.to_le_bytes());

    let free = DirEntry::new("f", FileType::File, BlockPtr::Free, 0, 0);
    assert_eq!(free.encode()[29..33], FAT_FREE.to_le_bytes());
}

#[test]
fn decode_then_encode_is_identity() {
    let entry = DirEntry::new("notes", FileType::File, BlockPtr::Index(42), 517, 1_700_000_000);
    let bytes = entry.encode();
    let decoded = DirEntry::decode(&bytes).unwrap();
    assert_eq!(decoded, entry);
    assert_eq!(decoded.encode(), bytes);
}

#[test]
fn decode_needs_a_full_record() {
    let bytes = DirEntry::new("x", FileType::File, BlockPtr::Eof, 0, 0).encode();
    let err = DirEntry::decode(&bytes[..DIRECTORY_ENTRY_SIZE - 1]).unwrap_err();
    assert_eq!(
        err,
        DecodeError::Truncated {
            expected: DIRECTORY_ENTRY_SIZE,
            actual: DIRECTORY_ENTRY_SIZE - 1
        }
    );
}

#[test]
fn decode_rejects_unknown_type_byte() {
    let mut bytes = DirEntry::new("x", FileType::File, BlockPtr::Eof, 0, 0).encode();
    bytes[28] = 7;
    assert_eq!(DirEntry::decode(&bytes).unwrap_err(), DecodeError::UnknownType(7));
}

#[test]
fn decode_keeps_out_of_range_start_blocks() {
    // range validation belongs to chain walkers, not the codec
    let entry = DirEntry::new("x", FileType::File, BlockPtr::Index(100_000), 1, 0);
    let decoded = DirEntry::decode(&entry.encode()).unwrap();
    assert_eq!(decoded.start_block, BlockPtr::Index(100_000));
    assert_eq!(decoded.start_block.index(), None);
}

#[test]
fn block_ptr_raw_round_trip() {
    for raw in [FAT_FREE, FAT_EOF, 0, 1, 255, -7, 4096] {
        assert_eq!(BlockPtr::from_raw(raw).to_raw(), raw);
    }
    assert_eq!(BlockPtr::from_raw(-2), BlockPtr::Free);
    assert_eq!(BlockPtr::from_raw(-1), BlockPtr::Eof);
    assert_eq!(BlockPtr::from_raw(3), BlockPtr::Index(3));
}

#[test]
fn name_bytes_stop_at_first_null() {
    let entry = DirEntry::new("abc", FileType::File, BlockPtr::Eof, 0, 0);
    assert_eq!(entry.name_bytes(), b"abc");

    let full = DirEntry::new("abcdefghijklmnopqrstuvwxyz01", FileType::File, BlockPtr::Eof, 0, 0);
    assert_eq!(full.name_bytes().len(), MAX_FILENAME_LEN);
}
