use sha1::{Digest, Sha1};

/// Lowercase hex digests of a file, as published next to it in `.md5` and `.sha1` files
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ChecksumPair {
    pub md5: String,
    pub sha1: String,
}

impl ChecksumPair {
    pub fn of(data: &[u8]) -> ChecksumPair {
        ChecksumPair {
            md5: format!("{:x}", md5::compute(data)),
            sha1: hex::encode(Sha1::digest(data)),
        }
    }

    /// (file extension, checksum) in upload order
    pub fn files(&self) -> [(&'static str, &str); 2] {
        [("md5", self.md5.as_str()), ("sha1", self.sha1.as_str())]
    }
}
