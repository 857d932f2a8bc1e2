//! File digests for the assembly file table.
//!
//! Linked net-modules are recorded in the `File` table together with a digest of their
//! image, computed with the assembly's hash algorithm (`AssemblyAlgorithmIdAttribute`,
//! SHA1 by default). The algorithm id is an arbitrary 32-bit value supplied by the user;
//! [`compute_file_hash`] returns `None` for ids it cannot service.

use md5::{Digest as Md5Digest, Md5};
use sha1::{Digest as Sha1Digest, Sha1};
use sha2::{Digest as Sha2Digest, Sha256, Sha384, Sha512};

use crate::metadata::wellknown::AssemblyHashAlgorithm;

/// Computes the MD5 hash of the given data.
#[must_use]
pub fn compute_md5(data: &[u8]) -> Vec<u8> {
    let mut hasher = Md5::new();
    Md5Digest::update(&mut hasher, data);
    hasher.finalize().to_vec()
}

/// Computes the SHA1 hash of the given data.
#[must_use]
pub fn compute_sha1(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha1::new();
    Sha1Digest::update(&mut hasher, data);
    hasher.finalize().to_vec()
}

/// Computes the SHA256 hash of the given data.
#[must_use]
pub fn compute_sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    Sha2Digest::update(&mut hasher, data);
    hasher.finalize().to_vec()
}

/// Computes the SHA384 hash of the given data.
#[must_use]
pub fn compute_sha384(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha384::new();
    Sha2Digest::update(&mut hasher, data);
    hasher.finalize().to_vec()
}

/// Computes the SHA512 hash of the given data.
#[must_use]
pub fn compute_sha512(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha512::new();
    Sha2Digest::update(&mut hasher, data);
    hasher.finalize().to_vec()
}

/// Hash `data` with the algorithm identified by the raw `AssemblyHashAlgorithm` value.
///
/// Returns `None` for `NONE` and every id outside MD5/SHA1/SHA256/SHA384/SHA512.
#[must_use]
pub fn compute_file_hash(algorithm: u32, data: &[u8]) -> Option<Vec<u8>> {
    match algorithm {
        AssemblyHashAlgorithm::MD5 => Some(compute_md5(data)),
        AssemblyHashAlgorithm::SHA1 => Some(compute_sha1(data)),
        AssemblyHashAlgorithm::SHA256 => Some(compute_sha256(data)),
        AssemblyHashAlgorithm::SHA384 => Some(compute_sha384(data)),
        AssemblyHashAlgorithm::SHA512 => Some(compute_sha512(data)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_lengths() {
        let data = b"module image";
        assert_eq!(compute_file_hash(AssemblyHashAlgorithm::MD5, data).unwrap().len(), 16);
        assert_eq!(compute_file_hash(AssemblyHashAlgorithm::SHA1, data).unwrap().len(), 20);
        assert_eq!(compute_file_hash(AssemblyHashAlgorithm::SHA256, data).unwrap().len(), 32);
        assert_eq!(compute_file_hash(AssemblyHashAlgorithm::SHA384, data).unwrap().len(), 48);
        assert_eq!(compute_file_hash(AssemblyHashAlgorithm::SHA512, data).unwrap().len(), 64);
    }

    #[test]
    fn known_sha1_vector() {
        assert_eq!(
            compute_sha1(b"abc"),
            vec![
                0xa9, 0x99, 0x3e, 0x36, 0x47, 0x06, 0x81, 0x6a, 0xba, 0x3e, 0x25, 0x71, 0x78, 0x50,
                0xc2, 0x6c, 0x9c, 0xd0, 0xd8, 0x9d
            ]
        );
    }

    #[test]
    fn unsupported_ids() {
        assert!(compute_file_hash(AssemblyHashAlgorithm::NONE, b"x").is_none());
        assert!(compute_file_hash(12345, b"x").is_none());
    }
}
