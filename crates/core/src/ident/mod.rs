//! Content-derived entry identification.
//!
//! The token produced here is the feed entry's primary key and the on-disk
//! artifact's base name. Remote sources reuse their canonical id, which is
//! already short and deterministic. Uploaded files are identified by a hash
//! of their bytes, so uploading byte-identical content twice yields the same
//! token regardless of file name.

use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};

/// Hex characters kept from the content hash.
const CONTENT_TOKEN_LEN: usize = 16;

/// Read buffer for hashing uploaded files.
const HASH_BUF_SIZE: usize = 64 * 1024;

/// Entry id for a remote source: the canonical id verbatim.
pub fn entry_id_for_source(source: &crate::resolver::CanonicalSourceId) -> String {
    source.as_str().to_string()
}

/// Entry id for uploaded bytes: truncated SHA-256 of the file contents.
pub async fn entry_id_for_file(path: &Path) -> std::io::Result<String> {
    let file = File::open(path).await?;
    let mut reader = BufReader::with_capacity(HASH_BUF_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_BUF_SIZE];

    loop {
        let n = reader.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    let digest = format!("{:x}", hasher.finalize());
    Ok(digest[..CONTENT_TOKEN_LEN].to_string())
}
