use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::debug;

use crate::clip::Fingerprint;
use crate::error::Result;

/// Compute the content fingerprint of a file.
///
/// Only the bytes are hashed; the file name, location and timestamps play no part, so two
/// copies of the same audio always resolve to the same clip record.
pub fn fingerprint_file<P: AsRef<Path>>(path: P) -> Result<Fingerprint> {
    let path = path.as_ref();
    let mut file = File::open(path)?;

    let mut hasher = Sha256::new();
    let bytes = io::copy(&mut file, &mut hasher)?;
    let digest = format!("{:x}", hasher.finalize());

    debug!("Fingerprinted {} ({} bytes): {}", path.display(), bytes, digest);
    Ok(Fingerprint::new(digest))
}
