//! HMAC-SHA256 digest helper for the complex handshake.
//!
//! There isn't a clean official spec for this part of the protocol; this follows the
//! widely mirrored description at
//! <https://blog.csdn.net/win_lin/article/details/13006803>.

use bytes::Bytes;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::SchemaVersion;
use super::error::ComplexHandshakeError;
use crate::handshake::define::{CHUNK_LENGTH, TIME_VERSION_LENGTH};

const RTMP_DIGEST_LENGTH: usize = 32;

/// The three parts of a schema-tagged handshake chunk, split around the digest so the
/// digest can be computed without copying the surrounding random data.
pub struct GeneratedDigest {
    left: Bytes,
    digest: Bytes,
    right: Bytes,
}

impl GeneratedDigest {
    pub fn write_to(&self, output: &mut Vec<u8>) -> Result<(), ComplexHandshakeError> {
        output.extend_from_slice(&self.left);
        output.extend_from_slice(&self.digest);
        output.extend_from_slice(&self.right);
        Ok(())
    }
}

pub struct DigestProcessor {
    data: Bytes,
    key: Bytes,
}

impl DigestProcessor {
    pub fn new(data: Bytes, key: &[u8]) -> Self {
        Self {
            data,
            key: Bytes::copy_from_slice(key),
        }
    }

    /// Locates the digest in `self.data`, trying schema 0 then schema 1, and returns the
    /// matching digest bytes along with the schema that validated.
    pub fn read_digest(&self) -> Result<(Bytes, SchemaVersion), ComplexHandshakeError> {
        if let Ok(digest) = self.generate_and_validate(SchemaVersion::Schema0) {
            Ok((digest, SchemaVersion::Schema0))
        } else {
            let digest = self.generate_and_validate(SchemaVersion::Schema1)?;
            Ok((digest, SchemaVersion::Schema1))
        }
    }

    pub fn generate_and_fill_digest(&self, version: SchemaVersion) -> Result<GeneratedDigest, ComplexHandshakeError> {
        let (left, _, right) = self.cook_raw_message(version)?;
        let digest = self.make_digest(&left, &right)?;
        Ok(GeneratedDigest { left, digest, right })
    }

    fn find_digest_offset(&self, version: SchemaVersion) -> Result<usize, ComplexHandshakeError> {
        const OFFSET_LENGTH: usize = 4;

        // Schema 0: time, version, key, digest. Schema 1: time, version, digest, key.
        let schema_offset = match version {
            SchemaVersion::Schema0 => CHUNK_LENGTH + TIME_VERSION_LENGTH,
            SchemaVersion::Schema1 => TIME_VERSION_LENGTH,
        };

        let sum = *self.data.get(schema_offset).ok_or(ComplexHandshakeError::NotEnoughData)? as usize
            + *self.data.get(schema_offset + 1).ok_or(ComplexHandshakeError::NotEnoughData)? as usize
            + *self.data.get(schema_offset + 2).ok_or(ComplexHandshakeError::NotEnoughData)? as usize
            + *self.data.get(schema_offset + 3).ok_or(ComplexHandshakeError::NotEnoughData)? as usize;

        Ok(sum % (CHUNK_LENGTH - RTMP_DIGEST_LENGTH - OFFSET_LENGTH) + schema_offset + OFFSET_LENGTH)
    }

    fn cook_raw_message(&self, version: SchemaVersion) -> Result<(Bytes, Bytes, Bytes), ComplexHandshakeError> {
        let digest_offset = self.find_digest_offset(version)?;

        if self.data.len() < digest_offset + RTMP_DIGEST_LENGTH {
            return Err(ComplexHandshakeError::NotEnoughData);
        }

        let left = self.data.slice(0..digest_offset);
        let digest = self.data.slice(digest_offset..digest_offset + RTMP_DIGEST_LENGTH);
        let right = self.data.slice(digest_offset + RTMP_DIGEST_LENGTH..);

        Ok((left, digest, right))
    }

    pub fn make_digest(&self, left: &[u8], right: &[u8]) -> Result<Bytes, ComplexHandshakeError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key).map_err(|_| ComplexHandshakeError::CannotGenerate)?;
        mac.update(left);
        mac.update(right);

        let result = mac.finalize().into_bytes();
        if result.len() != RTMP_DIGEST_LENGTH {
            return Err(ComplexHandshakeError::DigestLengthNotCorrect);
        }

        Ok(Bytes::copy_from_slice(&result))
    }

    fn generate_and_validate(&self, version: SchemaVersion) -> Result<Bytes, ComplexHandshakeError> {
        let (left, digest, right) = self.cook_raw_message(version)?;

        if digest == self.make_digest(&left, &right)? {
            Ok(digest)
        } else {
            Err(ComplexHandshakeError::CannotGenerate)
        }
    }
}
