use chrono::{DateTime, Utc};
use mongodb::bson;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of the public verification code printed on a certificate.
pub const VERIFICATION_HASH_LEN: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub user_name: String,
    pub user_email: String,
    pub course_id: ObjectId,
    pub course_title: String,
    pub verification_hash: String,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CertificateResponse {
    pub id: String,
    pub user_name: String,
    pub course_id: String,
    pub course_title: String,
    pub verification_hash: String,
    pub issued_at: DateTime<Utc>,
}

impl From<Certificate> for CertificateResponse {
    fn from(cert: Certificate) -> Self {
        CertificateResponse {
            id: cert.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_name: cert.user_name,
            course_id: cert.course_id.to_hex(),
            course_title: cert.course_title,
            verification_hash: cert.verification_hash,
            issued_at: cert.issued_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateCertificate {
    pub course_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AdminIssueCertificate {
    pub user_id: String,
    pub course_id: String,
}

/// Derives the public verification code for a certificate.
///
/// The nonce keeps two issuances at the same millisecond distinct; the unique
/// index on `verification_hash` rejects the astronomically unlikely collision.
pub fn verification_hash(
    user_id: &ObjectId,
    course_id: &ObjectId,
    issued_at: DateTime<Utc>,
    nonce: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.bytes());
    hasher.update(course_id.bytes());
    hasher.update(issued_at.timestamp_millis().to_be_bytes());
    hasher.update(nonce.as_bytes());
    let digest = format!("{:X}", hasher.finalize());
    digest[..VERIFICATION_HASH_LEN].to_string()
}

pub fn is_well_formed_hash(hash: &str) -> bool {
    hash.len() == VERIFICATION_HASH_LEN
        && hash.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_shape() {
        let hash = verification_hash(&ObjectId::new(), &ObjectId::new(), Utc::now(), "n1");
        assert!(is_well_formed_hash(&hash), "unexpected hash {}", hash);
    }

    #[test]
    fn test_hash_is_deterministic_for_same_inputs() {
        let (user, course, at) = (ObjectId::new(), ObjectId::new(), Utc::now());
        assert_eq!(
            verification_hash(&user, &course, at, "nonce"),
            verification_hash(&user, &course, at, "nonce")
        );
    }

    #[test]
    fn test_nonce_and_pair_change_the_hash() {
        let (user, course, at) = (ObjectId::new(), ObjectId::new(), Utc::now());
        let base = verification_hash(&user, &course, at, "a");
        assert_ne!(base, verification_hash(&user, &course, at, "b"));
        assert_ne!(base, verification_hash(&ObjectId::new(), &course, at, "a"));
    }

    #[test]
    fn test_malformed_hashes() {
        assert!(!is_well_formed_hash("abc"));
        assert!(!is_well_formed_hash(&"g".repeat(VERIFICATION_HASH_LEN)));
        assert!(!is_well_formed_hash(&"a".repeat(VERIFICATION_HASH_LEN)));
    }
}
