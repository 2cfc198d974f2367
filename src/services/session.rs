use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{AppError, Result};
use crate::models::user::{Claims, User};

const RESET_PURPOSE: &str = "password_reset";
const RESET_TOKEN_MINUTES: i64 = 10;

#[derive(Debug, Serialize, Deserialize)]
struct ResetClaims {
    email: String,
    purpose: String,
    /// Fingerprint of the password hash at issue time.
    pwd: String,
    exp: usize,
}

/// Any password change rotates the bcrypt salt, so the fingerprint changes with it.
fn password_fingerprint(password_hash: &str) -> String {
    format!("{:x}", Sha256::digest(password_hash.as_bytes()))
}

/// Issues and checks the HS256 tokens used for sessions and password resets.
#[derive(Clone)]
pub struct SessionService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionService {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, user: &User) -> Result<(String, DateTime<Utc>)> {
        let expires_at = Utc::now() + self.ttl;
        let claims = Claims {
            sub: user.id_hex(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            exp: expires_at.timestamp() as usize,
        };

        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::service(format!("Token generation failed: {}", e)))?;
        Ok((token, expires_at))
    }

    pub fn decode(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|_| AppError::MissingSession)
    }

    /// Short-lived token proving the holder verified an email OTP.
    /// It stops validating once the account's password changes.
    pub fn issue_reset_token(&self, user: &User) -> Result<String> {
        let claims = ResetClaims {
            email: user.email.clone(),
            purpose: RESET_PURPOSE.to_string(),
            pwd: password_fingerprint(&user.password_hash),
            exp: (Utc::now() + Duration::minutes(RESET_TOKEN_MINUTES)).timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::service(format!("Token generation failed: {}", e)))
    }

    pub fn check_reset_token(&self, token: &str, user: &User) -> Result<()> {
        let claims = decode::<ResetClaims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|_| AppError::invalid_data("Invalid or expired reset token"))?
            .claims;

        if claims.purpose != RESET_PURPOSE
            || claims.email != user.email
            || claims.pwd != password_fingerprint(&user.password_hash)
        {
            return Err(AppError::invalid_data("Invalid or expired reset token"));
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn issue_with_exp(&self, user: &User, exp: i64) -> String {
        let claims = Claims {
            sub: user.id_hex(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            exp: exp as usize,
        };
        encode(&Header::default(), &claims, &self.encoding).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::oid::ObjectId;

    use super::*;
    use crate::models::user::{AuthProvider, Role};

    fn user(role: Role) -> User {
        let mut user = User::new(
            "Asha",
            "asha@example.com",
            "9876543210",
            "$2b$04$hash",
            role,
            AuthProvider::Password,
        );
        user.id = Some(ObjectId::new());
        user
    }

    #[test]
    fn test_session_carries_role() {
        let sessions = SessionService::new("test-secret", 24);
        let (token, _) = sessions.issue(&user(Role::Admin)).unwrap();

        let claims = sessions.decode(&token).unwrap();
        assert!(claims.is_admin());
        assert_eq!(claims.email, "asha@example.com");
    }

    #[test]
    fn test_expired_or_foreign_tokens_rejected() {
        let sessions = SessionService::new("test-secret", 24);
        let expired = sessions.issue_with_exp(&user(Role::Student), Utc::now().timestamp() - 3600);
        assert!(matches!(sessions.decode(&expired), Err(AppError::MissingSession)));

        let other = SessionService::new("other-secret", 24);
        let (token, _) = other.issue(&user(Role::Student)).unwrap();
        assert!(sessions.decode(&token).is_err());
    }

    #[test]
    fn test_reset_token_bound_to_email() {
        let sessions = SessionService::new("test-secret", 24);
        let asha = user(Role::Student);
        let token = sessions.issue_reset_token(&asha).unwrap();

        assert!(sessions.check_reset_token(&token, &asha).is_ok());

        let mut ravi = asha.clone();
        ravi.email = "ravi@example.com".to_string();
        assert!(sessions.check_reset_token(&token, &ravi).is_err());

        // A session token is not a reset token.
        let (session, _) = sessions.issue(&asha).unwrap();
        assert!(sessions.check_reset_token(&session, &asha).is_err());
    }

    #[test]
    fn test_reset_token_dies_with_password_change() {
        let sessions = SessionService::new("test-secret", 24);
        let mut asha = user(Role::Student);
        let token = sessions.issue_reset_token(&asha).unwrap();

        asha.password_hash = "$2b$04$rotated".to_string();
        assert!(matches!(
            sessions.check_reset_token(&token, &asha),
            Err(AppError::ValidationError(_))
        ));
    }
}
