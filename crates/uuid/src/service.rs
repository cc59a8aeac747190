//! Identifier implementations.

use crate::{UuidError, UuidResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Returns `parent_dir/<s1>/<s2>/<key>/` for a 32-character lowercase hex key.
fn shard(parent_dir: &Path, key: &str) -> PathBuf {
    let s1 = &key[0..2];
    let s2 = &key[2..4];
    parent_dir.join(s1).join(s2).join(key)
}

fn is_lower_hex_32(input: &str) -> bool {
    input.len() == 32
        && input
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Canonical assessment identifier (32 lowercase hex characters, no hyphens).
///
/// Once constructed the contained UUID is guaranteed to be in canonical form, so it is safe to
/// derive storage paths from it.
///
/// # Construction
/// - [`AssessmentId::new`] allocates a fresh identifier for a new assessment.
/// - [`AssessmentId::parse`] validates an identifier supplied by a client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssessmentId(Uuid);

impl Default for AssessmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl AssessmentId {
    /// Generates a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be in canonical form.
    ///
    /// Hyphenated or uppercase forms are rejected rather than normalised, so one assessment
    /// can only ever be addressed by one string.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not in canonical form.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(format!(
                "assessment id must be 32 lowercase hex characters without hyphens, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(e.to_string()))
    }

    /// Returns the underlying `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is a canonical assessment identifier.
    pub fn is_canonical(input: &str) -> bool {
        is_lower_hex_32(input)
    }

    /// Returns `parent_dir/<s1>/<s2>/<id>/`.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        shard(parent_dir, &self.0.simple().to_string())
    }
}

impl fmt::Display for AssessmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for AssessmentId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssessmentId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for AssessmentId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for AssessmentId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        AssessmentId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Storage key for a patient, derived from the hospital number.
///
/// Hospital numbers are free text typed by staff. Hashing them gives a fixed-width key that is
/// safe as a directory name and spreads patients evenly across shards.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PatientKey(String);

impl PatientKey {
    /// Derives the key for `hospital_number`.
    ///
    /// The caller is expected to pass the trimmed hospital number; the same trimmed value must
    /// always produce the same key.
    pub fn for_hospital_number(hospital_number: &str) -> Self {
        let digest = Sha256::digest(hospital_number.as_bytes());
        Self(format!("{:x}", digest)[..32].to_string())
    }

    /// Validates a key read back from a directory name.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if is_lower_hex_32(input) {
            Ok(Self(input.to_string()))
        } else {
            Err(UuidError::InvalidInput(format!(
                "patient key must be 32 lowercase hex characters, got: '{}'",
                input
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `parent_dir/<s1>/<s2>/<key>/`.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        shard(parent_dir, &self.0)
    }
}

impl fmt::Display for PatientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generates_canonical_id() {
        let id = AssessmentId::new();
        let canonical = id.to_string();
        assert!(AssessmentId::is_canonical(&canonical));
        assert_eq!(AssessmentId::parse(&canonical).unwrap(), id);
    }

    #[test]
    fn test_parse_rejects_hyphenated_uuid() {
        let result = AssessmentId::parse("550e8400-e29b-41d4-a716-446655440000");
        assert!(matches!(result, Err(UuidError::InvalidInput(_))));
    }

    #[test]
    fn test_parse_rejects_uppercase_uuid() {
        assert!(AssessmentId::parse("550E8400E29B41D4A716446655440000").is_err());
    }

    #[test]
    fn test_parse_rejects_wrong_length_and_characters() {
        assert!(AssessmentId::parse("550e8400e29b41d4a71644665544000").is_err());
        assert!(AssessmentId::parse("550e8400e29b41d4a7164466554400000").is_err());
        assert!(AssessmentId::parse("550e8400e29b41d4a716446655440zzz").is_err());
        assert!(AssessmentId::parse("").is_err());
    }

    #[test]
    fn test_sharded_dir_structure() {
        let id = AssessmentId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let dir = id.sharded_dir(Path::new("/records/assessments"));
        assert_eq!(
            dir,
            PathBuf::from("/records/assessments/55/0e/550e8400e29b41d4a716446655440000")
        );
    }

    #[test]
    fn test_serde_round_trips_as_string() {
        let id = AssessmentId::parse("00112233445566778899aabbccddeeff").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00112233445566778899aabbccddeeff\"");
        let back: AssessmentId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<AssessmentId>("\"nope\"").is_err());
    }

    #[test]
    fn test_patient_key_is_stable_and_canonical() {
        let a = PatientKey::for_hospital_number("HN-0001");
        let b = PatientKey::for_hospital_number("HN-0001");
        let c = PatientKey::for_hospital_number("HN-0002");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(is_lower_hex_32(a.as_str()));
        assert_eq!(PatientKey::parse(a.as_str()).unwrap(), a);
    }

    #[test]
    fn test_patient_key_handles_path_hostile_input() {
        let key = PatientKey::for_hospital_number("../../etc/passwd");
        let dir = key.sharded_dir(Path::new("/records/patients"));
        assert!(dir.starts_with("/records/patients"));
        assert_eq!(dir.components().count(), 6);
    }

    #[test]
    fn test_patient_key_parse_rejects_non_hex() {
        assert!(PatientKey::parse("not-a-key").is_err());
    }

    #[test]
    fn test_real_fs_sharding_creates_nested_dirs() {
        let temp = tempfile::TempDir::new().expect("Failed to create temp dir");
        let id = AssessmentId::new();
        let dir = id.sharded_dir(temp.path());
        std::fs::create_dir_all(&dir).expect("should create sharded dir");
        assert!(dir.is_dir());
        assert_eq!(dir.parent().unwrap().parent().unwrap().parent().unwrap(), temp.path());
    }
}
