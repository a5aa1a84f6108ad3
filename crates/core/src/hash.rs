//! Hasher — SPEC_FULL §4.B.
//!
//! Grounded on the streaming-hash pattern in
//! `other_examples/.../fastnode-core/src/build/hash.rs`, adapted from
//! blake3 to SHA-256 per the data model in SPEC_FULL §3.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::GraphError;

pub struct FileHash {
    pub size: u64,
    pub hash_hex: String,
}

const CHUNK_SIZE: usize = 64 * 1024;

/// Open `abs_path`, stream it through SHA-256, return stat-size and lowercase hex digest.
pub fn hash_file(abs_path: &Path) -> Result<FileHash, GraphError> {
    let mut file =
        File::open(abs_path).map_err(|e| GraphError::io(abs_path.to_string_lossy(), e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];
    let mut size: u64 = 0;

    loop {
        let n = read_chunk(&mut file, &mut buf)
            .map_err(|e| GraphError::io(abs_path.to_string_lossy(), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }

    let hash_hex = hex::encode(hasher.finalize());
    Ok(FileHash { size, hash_hex })
}

fn read_chunk(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    file.read(buf)
}

/// Best-effort wrapper: returns `None` instead of propagating an error.
pub fn try_hash_file(abs_path: &Path) -> Option<FileHash> {
    hash_file(abs_path).ok()
}
