mod common;

use memfat_engine::{
    new_filesystem, BlockPtr, DirEntry, FsError, BLOCK_SIZE, DIRECTORY_ENTRY_SIZE,
    ENTRIES_PER_BLOCK,
};

#[test]
fn new_directory_points_at_itself_and_its_parent() {
    common::init();
    let (mut fs, _) = new_filesystem();
    let d = fs.create_directory(BlockPtr::ROOT, "d").unwrap();

    let entries = fs.list_entries(d.start_block).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name_bytes(), b".");
    assert_eq!(entries[0].start_block, d.start_block);
    assert_eq!(entries[1].name_bytes(), b"..");
    assert_eq!(entries[1].start_block, BlockPtr::ROOT);
    assert!(entries.iter().all(|e| e.is_directory()));
}

#[test]
fn full_directory_rejects_new_entries() {
    common::init();
    let (mut fs, _) = new_filesystem();
    // the root's single block holds ENTRIES_PER_BLOCK slots, two of which
    // are '.' and '..'
    for i in 0..ENTRIES_PER_BLOCK - 2 {
        fs.create_file(BlockPtr::ROOT, &format!("f{}", i)).unwrap();
    }
    let allocated_before = fs.fat().iter().filter(|&&e| e != BlockPtr::Free).count();

    let err = fs.create_file(BlockPtr::ROOT, "one-too-many").unwrap_err();
    assert!(matches!(err, FsError::DirectoryFull));

    // the block allocated for the rejected file was released again
    let allocated_after = fs.fat().iter().filter(|&&e| e != BlockPtr::Free).count();
    assert_eq!(allocated_after, allocated_before);
}

#[test]
fn deleting_a_non_empty_directory_changes_nothing() {
    common::init();
    let (mut fs, _) = new_filesystem();
    let d = fs.create_directory(BlockPtr::ROOT, "d").unwrap();
    fs.create_file(d.start_block, "x").unwrap();

    let fat_before = fs.fat().to_vec();
    let err = fs.delete_entry(BlockPtr::ROOT, "d").unwrap_err();
    assert!(matches!(err, FsError::DirectoryNotEmpty { entries: 1, .. }));
    assert_eq!(fs.fat(), &fat_before[..]);
    assert!(fs.find_entry(BlockPtr::ROOT, "d").is_ok());
}

#[test]
fn emptied_directory_can_be_deleted() {
    common::init();
    let (mut fs, _) = new_filesystem();
    let fat_fresh = fs.fat().to_vec();

    let d = fs.create_directory(BlockPtr::ROOT, "d").unwrap();
    fs.create_file(d.start_block, "x").unwrap();
    fs.delete_entry(d.start_block, "x").unwrap();
    fs.delete_entry(BlockPtr::ROOT, "d").unwrap();

    assert_eq!(fs.fat(), &fat_fresh[..]);
    assert!(matches!(
        fs.find_entry(BlockPtr::ROOT, "d").unwrap_err(),
        FsError::EntryNotFound(_)
    ));
}

#[test]
fn tombstoned_slot_is_reused_first() {
    common::init();
    let (mut fs, _) = new_filesystem();
    fs.create_file(BlockPtr::ROOT, "t").unwrap();
    fs.create_file(BlockPtr::ROOT, "keep").unwrap();
    fs.delete_entry(BlockPtr::ROOT, "t").unwrap();

    // 't' lived in the third slot; its tombstone must be taken before any
    // later slot
    let slot = 2 * DIRECTORY_ENTRY_SIZE;
    let root = fs.block(BlockPtr::ROOT).unwrap();
    assert_eq!(root[slot], 0);

    fs.create_file(BlockPtr::ROOT, "u").unwrap();
    let root = fs.block(BlockPtr::ROOT).unwrap();
    let reused = DirEntry::decode(&root[slot..slot + DIRECTORY_ENTRY_SIZE]).unwrap();
    assert_eq!(reused.name_bytes(), b"u");
}

#[test]
fn create_and_delete_restore_the_fat() {
    common::init();
    let (mut fs, _) = new_filesystem();
    let fat_before = fs.fat().to_vec();

    fs.create_file(BlockPtr::ROOT, "f").unwrap();
    fs.delete_entry(BlockPtr::ROOT, "f").unwrap();
    assert_eq!(fs.fat(), &fat_before[..]);

    fs.create_directory(BlockPtr::ROOT, "d").unwrap();
    fs.delete_entry(BlockPtr::ROOT, "d").unwrap();
    assert_eq!(fs.fat(), &fat_before[..]);
}

#[test]
fn deleting_a_file_frees_its_whole_chain() {
    common::init();
    let (mut fs, _) = new_filesystem();
    let fat_fresh = fs.fat().to_vec();

    let mut f = fs.create_file(BlockPtr::ROOT, "f").unwrap();
    fs.write_file(&mut f, BlockPtr::ROOT, &vec![9u8; 2 * BLOCK_SIZE])
        .unwrap();
    fs.delete_entry(BlockPtr::ROOT, "f").unwrap();

    assert_eq!(fs.fat(), &fat_fresh[..]);
    assert!(matches!(
        fs.find_entry(BlockPtr::ROOT, "f").unwrap_err(),
        FsError::EntryNotFound(_)
    ));
}

#[test]
fn name_length_limits() {
    common::init();
    for len in [1usize, 27, 28] {
        let (mut fs, _) = new_filesystem();
        let name = "n".repeat(len);
        fs.create_file(BlockPtr::ROOT, &name).unwrap();
        assert!(fs.find_entry(BlockPtr::ROOT, &name).is_ok(), "length {}", len);
    }

    let (mut fs, _) = new_filesystem();
    let err = fs.create_file(BlockPtr::ROOT, &"n".repeat(29)).unwrap_err();
    assert!(matches!(err, FsError::NameTooLong(29)));
    let err = fs.create_directory(BlockPtr::ROOT, "").unwrap_err();
    assert!(matches!(err, FsError::NameEmpty));
}

#[test]
fn dot_entries_cannot_be_deleted() {
    common::init();
    let (mut fs, _) = new_filesystem();
    assert!(matches!(
        fs.delete_entry(BlockPtr::ROOT, ".").unwrap_err(),
        FsError::ReservedName(_)
    ));
    assert!(matches!(
        fs.delete_entry(BlockPtr::ROOT, "..").unwrap_err(),
        FsError::ReservedName(_)
    ));
    assert!(matches!(
        fs.delete_entry(BlockPtr::ROOT, "").unwrap_err(),
        FsError::NameEmpty
    ));
}

#[test]
fn duplicate_names_are_rejected() {
    common::init();
    let (mut fs, _) = new_filesystem();
    fs.create_file(BlockPtr::ROOT, "a").unwrap();
    assert!(matches!(
        fs.create_file(BlockPtr::ROOT, "a").unwrap_err(),
        FsError::DuplicateName(_)
    ));
    assert!(matches!(
        fs.create_directory(BlockPtr::ROOT, "a").unwrap_err(),
        FsError::DuplicateName(_)
    ));
}

#[test]
fn listing_handles_unallocated_and_invalid_starts() {
    common::init();
    let (fs, _) = new_filesystem();
    assert!(fs.list_entries(BlockPtr::Free).unwrap().is_empty());
    assert!(matches!(
        fs.list_entries(BlockPtr::Index(999)).unwrap_err(),
        FsError::InvalidBlock(999)
    ));
    assert!(matches!(
        fs.list_entries(BlockPtr::Eof).unwrap_err(),
        FsError::InvalidBlock(-1)
    ));
}
