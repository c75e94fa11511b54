mod common;

use common::{payload, TempFile};
use file_stamp::crypto::hashing::{fingerprint_source, EMPTY_DIGEST};
use file_stamp::digest_bytes;
use file_stamp::domain::certification::PayloadSource;
use file_stamp::infra::blob_store::{MAX_UPLOAD_BYTES, MIB};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

#[test]
fn digest_is_64_lowercase_hex() {
    for len in [0usize, 1, 55, 64, 10 * 1024, 1024 * 1024 + 3] {
        let digest = digest_bytes(&payload(len));
        assert_eq!(digest.as_str().len(), 64, "len {}", len);
        assert!(
            digest
                .as_str()
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)),
            "not lowercase hex: {}",
            digest
        );
    }
}

#[test]
fn digest_matches_independent_sha256() {
    let bytes = payload(10 * 1024);
    let expected = hex::encode(Sha256::digest(&bytes));
    assert_eq!(digest_bytes(&bytes).as_str(), expected);
}

#[test]
fn empty_payload_has_the_well_known_digest() {
    assert_eq!(digest_bytes(b"").as_str(), EMPTY_DIGEST);
    assert_eq!(
        EMPTY_DIGEST,
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[test]
fn identical_bytes_give_identical_digests() {
    let a = digest_bytes(b"certify me");
    let b = digest_bytes(b"certify me");
    let c = digest_bytes(b"certify me!");
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn file_on_disk_hashes_like_the_same_bytes_in_memory() {
    let bytes = payload(4096);
    let file = TempFile::new("report.pdf", &bytes);

    let from_disk = fingerprint_source(&PayloadSource::Path(file.path.clone()), u64::MAX).unwrap();
    let in_memory = PayloadSource::Memory(bytes.clone().into());
    let from_memory = fingerprint_source(&in_memory, u64::MAX).unwrap();

    assert_eq!(from_disk.digest, from_memory.digest);
    assert_eq!(from_disk.size, 4096);
    assert_eq!(from_disk.payload.unwrap().as_ref(), bytes.as_slice());
}

#[test]
fn large_file_is_hashed_without_retaining_its_bytes() {
    let len = 200 * MIB;
    let file = TempFile::sparse("disk-image.raw", len);

    let source = PayloadSource::Path(file.path.clone());
    let hashed = fingerprint_source(&source, MAX_UPLOAD_BYTES).unwrap();

    let mut expected = Sha256::new();
    let zeros = vec![0u8; MIB as usize];
    for _ in 0..200 {
        expected.update(&zeros);
    }
    assert_eq!(hashed.digest.as_str(), hex::encode(expected.finalize()));
    assert_eq!(hashed.size, len);
    assert!(hashed.payload.is_none());
}

#[test]
fn payload_at_the_upload_ceiling_is_retained() {
    let bytes = payload(1000);
    let file = TempFile::new("edge.bin", &bytes);

    let hashed = fingerprint_source(&PayloadSource::Path(file.path.clone()), 1000).unwrap();
    assert_eq!(hashed.payload.unwrap().len(), 1000);

    let hashed = fingerprint_source(&PayloadSource::Path(file.path.clone()), 999).unwrap();
    assert!(hashed.payload.is_none());
    assert_eq!(hashed.digest, digest_bytes(&bytes));
}

#[test]
fn unreadable_source_is_a_hashing_failure() {
    let missing = PathBuf::from("/definitely/not/here/file-stamp.bin");
    let err = fingerprint_source(&PayloadSource::Path(missing), MAX_UPLOAD_BYTES).unwrap_err();
    assert!(err.to_string().starts_with("Failed to calculate file hash"));
}
