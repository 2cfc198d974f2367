use reqwest::Client;
use serde::Deserialize;

use crate::errors::{AppError, Result};
use crate::services::account_service::FederatedIdentity;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Fields of Google's tokeninfo response we rely on. Booleans arrive as strings.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    email: Option<String>,
    email_verified: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Clone)]
pub struct GoogleAuthService {
    client_id: String,
    client: Client,
}

impl GoogleAuthService {
    pub fn new(client_id: String) -> Self {
        Self {
            client_id,
            client: Client::new(),
        }
    }

    /// Validates a Google ID token and returns the identity it asserts.
    pub async fn verify_id_token(&self, id_token: &str) -> Result<FederatedIdentity> {
        let response = self
            .client
            .get(TOKENINFO_URL)
            .query(&[("id_token", id_token)])
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!("Google rejected ID token with status {}", response.status());
            return Err(AppError::AuthError);
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| AppError::external_api(format!("Invalid tokeninfo response: {}", e)))?;

        identity_from(info, &self.client_id)
    }
}

fn identity_from(info: TokenInfo, client_id: &str) -> Result<FederatedIdentity> {
    if info.aud != client_id {
        tracing::warn!("Google token audience mismatch");
        return Err(AppError::AuthError);
    }

    if info.email_verified.as_deref() != Some("true") {
        return Err(AppError::AuthError);
    }

    let email = info.email.ok_or(AppError::AuthError)?;
    let name = info
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or("Learner").to_string());

    Ok(FederatedIdentity {
        subject: info.sub,
        email,
        name,
        picture: info.picture,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(aud: &str, verified: &str) -> TokenInfo {
        TokenInfo {
            aud: aud.to_string(),
            sub: "1234567890".to_string(),
            email: Some("learner@example.com".to_string()),
            email_verified: Some(verified.to_string()),
            name: None,
            picture: Some("https://img/a.png".to_string()),
        }
    }

    #[test]
    fn test_accepts_matching_audience() {
        let identity = identity_from(info("client-1", "true"), "client-1").unwrap();
        assert_eq!(identity.subject, "1234567890");
        assert_eq!(identity.name, "learner");
    }

    #[test]
    fn test_rejects_foreign_audience_or_unverified_email() {
        assert!(matches!(identity_from(info("client-2", "true"), "client-1"), Err(AppError::AuthError)));
        assert!(matches!(identity_from(info("client-1", "false"), "client-1"), Err(AppError::AuthError)));
    }
}
