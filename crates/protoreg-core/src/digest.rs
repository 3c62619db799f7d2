//! Content and module digests.
//!
//! Two digest families coexist:
//!
//! - **Content digests** identify blobs and manifests. Always SHAKE256 with a
//!   fixed 64-byte output; string form `shake256:<128-hex>`.
//! - **Module digests** capture module identity per commit. `B4` is the
//!   SHAKE256 of the serialized manifest (string form `shake256:<hex>` for
//!   backward compatibility); `B5` folds the B4 digest together with all
//!   dependency B5 digests (string form `b5:<hex>`).
//!
//! The two families must never cross silently: constructors refuse unknown
//! prefixes and non-B5 dependency digests.

use crate::errors::{RegistryError, Result};
use crate::manifest::Manifest;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;

/// Fixed SHAKE256 output length in bytes (128 hex characters)
pub const DIGEST_LENGTH: usize = 64;

/// Canonical name of the content digest algorithm
pub const SHAKE256: &str = "shake256";

/// Compute the SHAKE256 digest of `data` with the fixed 64-byte output
pub fn shake256(data: &[u8]) -> [u8; DIGEST_LENGTH] {
    let mut hasher = Shake256::default();
    hasher.update(data);
    let mut out = [0u8; DIGEST_LENGTH];
    hasher.finalize_xof().read(&mut out);
    out
}

/// Content digest: an algorithm tag plus a raw digest value.
///
/// Digests produced by this store are always `shake256` with 64 bytes of
/// output; `parse` accepts any `<algo>:<hex>` pair so manifests from future
/// algorithm generations still round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    algorithm: String,
    value: Vec<u8>,
}

impl Digest {
    /// Compute the SHAKE256 content digest of `data`
    pub fn shake256_of(data: &[u8]) -> Self {
        Self {
            algorithm: SHAKE256.to_string(),
            value: shake256(data).to_vec(),
        }
    }

    /// Parse a `<algo>:<hex>` digest string.
    ///
    /// # Errors
    ///
    /// Returns `MalformedDigest` when the algorithm prefix is absent or the
    /// hex value is invalid or odd-length.
    pub fn parse(s: &str) -> Result<Self> {
        let (algorithm, hex_value) =
            s.split_once(':')
                .ok_or_else(|| RegistryError::MalformedDigest {
                    input: s.to_string(),
                    reason: "missing algorithm prefix".to_string(),
                })?;

        if algorithm.is_empty() {
            return Err(RegistryError::MalformedDigest {
                input: s.to_string(),
                reason: "empty algorithm prefix".to_string(),
            });
        }

        let value = hex::decode(hex_value).map_err(|e| RegistryError::MalformedDigest {
            input: s.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            algorithm: algorithm.to_string(),
            value,
        })
    }

    /// Get the algorithm tag (e.g. `shake256`)
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Get the raw digest bytes
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Get the lowercase hex encoding of the digest value
    pub fn hex(&self) -> String {
        hex::encode(&self.value)
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, hex::encode(&self.value))
    }
}

impl std::str::FromStr for Digest {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Digest::parse(&s).map_err(D::Error::custom)
    }
}

/// Module digest generation discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleDigestType {
    /// Legacy: SHAKE256 of the serialized manifest alone
    B4,
    /// Current: composed from the B4 digest and all dependency B5 digests
    B5,
}

impl ModuleDigestType {
    /// Get the wire prefix for this digest type
    pub fn prefix(&self) -> &'static str {
        match self {
            ModuleDigestType::B4 => SHAKE256,
            ModuleDigestType::B5 => "b5",
        }
    }
}

/// Module digest: a tagged 64-byte value identifying one module version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleDigest {
    digest_type: ModuleDigestType,
    value: Vec<u8>,
}

impl ModuleDigest {
    /// Parse a module digest string.
    ///
    /// Accepts `shake256:<hex>` (B4) and `b5:<hex>` (B5).
    ///
    /// # Errors
    ///
    /// - `UnknownDigestType` for any other prefix (or a missing one)
    /// - `MalformedDigest` for invalid hex or a value that is not 64 bytes
    pub fn parse(s: &str) -> Result<Self> {
        let (prefix, hex_value) =
            s.split_once(':')
                .ok_or_else(|| RegistryError::UnknownDigestType {
                    prefix: s.to_string(),
                })?;

        let digest_type = match prefix {
            SHAKE256 => ModuleDigestType::B4,
            "b5" => ModuleDigestType::B5,
            other => {
                return Err(RegistryError::UnknownDigestType {
                    prefix: other.to_string(),
                })
            }
        };

        let value = hex::decode(hex_value).map_err(|e| RegistryError::MalformedDigest {
            input: s.to_string(),
            reason: e.to_string(),
        })?;

        if value.len() != DIGEST_LENGTH {
            return Err(RegistryError::MalformedDigest {
                input: s.to_string(),
                reason: format!("expected {}-byte value, got {}", DIGEST_LENGTH, value.len()),
            });
        }

        Ok(Self { digest_type, value })
    }

    /// Compute the B4 digest of a manifest (SHAKE256 of its serialized form)
    pub fn b4(manifest: &Manifest) -> Self {
        Self {
            digest_type: ModuleDigestType::B4,
            value: shake256(manifest.serialize().as_bytes()).to_vec(),
        }
    }

    /// Compute the B5 digest from a manifest and its dependencies' B5 digests.
    ///
    /// The input to the hash is the B4 digest string followed by every
    /// dependency digest string sorted lexicographically, joined by `"\n"`.
    /// An empty dependency list hashes the B4 string alone.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDepDigest` when any dependency digest is not B5.
    pub fn b5(manifest: &Manifest, deps: &[ModuleDigest]) -> Result<Self> {
        let files_digest = manifest.digest();

        let mut dep_strings = Vec::with_capacity(deps.len());
        for dep in deps {
            if dep.digest_type() != ModuleDigestType::B5 {
                return Err(RegistryError::InvalidDepDigest {
                    digest: dep.to_string(),
                });
            }
            dep_strings.push(dep.to_string());
        }
        dep_strings.sort();

        let mut input = files_digest.to_string();
        for dep in &dep_strings {
            input.push('\n');
            input.push_str(dep);
        }

        Ok(Self {
            digest_type: ModuleDigestType::B5,
            value: shake256(input.as_bytes()).to_vec(),
        })
    }

    /// Get the digest type discriminator
    pub fn digest_type(&self) -> ModuleDigestType {
        self.digest_type
    }

    /// Get the raw digest bytes
    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

impl std::fmt::Display for ModuleDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}",
            self.digest_type.prefix(),
            hex::encode(&self.value)
        )
    }
}

impl std::str::FromStr for ModuleDigest {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for ModuleDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ModuleDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ModuleDigest::parse(&s).map_err(D::Error::custom)
    }
}
