use std::sync::Arc;

use mongodb::bson::oid::ObjectId;

use crate::errors::{AppError, Result};
use crate::models::user::{AuthProvider, Role, User};
use crate::services::user_store::UserStore;
use crate::utils::identifier::{self, IdentifierKind, RESERVED_MOBILE_PREFIX};
use crate::utils::password::{hash_password, validate_password, verify_password};

/// Salted re-folds tried when a subject's placeholder is already held.
const PLACEHOLDER_ATTEMPTS: u32 = 8;

/// Identity asserted by a verified federated token.
#[derive(Debug, Clone)]
pub struct FederatedIdentity {
    pub subject: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub password: String,
}

/// Signup details accepted alongside a verified mobile OTP.
#[derive(Debug, Clone)]
pub struct MobileSignup {
    pub name: String,
    pub email: String,
}

/// Result of a find-or-create login path.
#[derive(Debug)]
pub struct Resolved {
    pub user: User,
    pub created: bool,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    admin_emails: Arc<Vec<String>>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>, admin_emails: Vec<String>) -> Self {
        Self {
            users,
            admin_emails: Arc::new(admin_emails),
        }
    }

    fn role_for(&self, email: &str) -> Role {
        if self.admin_emails.iter().any(|e| e == email) {
            Role::Admin
        } else {
            Role::Student
        }
    }

    pub async fn find_by_id(&self, id: &ObjectId) -> Result<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.users.find_by_email(&identifier::normalize_email(email)).await
    }

    /// Looks up an account by a free-text identifier.
    pub async fn lookup(&self, raw: &str) -> Result<(IdentifierKind, Option<User>)> {
        let id = identifier::resolve(raw)?;
        let user = match id.kind {
            IdentifierKind::Email => self.users.find_by_email(&id.value).await?,
            IdentifierKind::Mobile => self.users.find_by_mobile(&id.value).await?,
        };
        Ok((id.kind, user))
    }

    pub async fn register(&self, account: NewAccount) -> Result<User> {
        let email = identifier::normalize_email(&account.email);
        if !identifier::is_email(&email) {
            return Err(AppError::invalid_data("Invalid email address"));
        }
        let mobile = identifier::require_mobile(&account.mobile)?;
        validate_password(&account.password)?;

        self.ensure_available(&email, &mobile).await?;

        let user = User::new(
            account.name.trim(),
            email.as_str(),
            mobile,
            hash_password(&account.password)?,
            self.role_for(&email),
            AuthProvider::Password,
        );
        let user = self.users.insert(user).await?;
        tracing::info!("✅ Registered account {}", user.id_hex());
        Ok(user)
    }

    /// Password login by email or mobile. Every failure looks the same to the caller.
    pub async fn authenticate(&self, raw_identifier: &str, password: &str) -> Result<User> {
        let (_, user) = self.lookup(raw_identifier).await.map_err(|e| match e {
            AppError::InvalidIdentifier => AppError::AuthError,
            other => other,
        })?;

        let user = user.ok_or(AppError::AuthError)?;
        if !verify_password(password, &user.password_hash) {
            return Err(AppError::AuthError);
        }
        Ok(user)
    }

    /// Checked before the OTP is consumed: an unknown number needs signup details.
    pub async fn mobile_login_ready(&self, mobile: &str, has_signup: bool) -> Result<()> {
        let mobile = identifier::require_mobile(mobile)?;
        if has_signup || self.users.find_by_mobile(&mobile).await?.is_some() {
            return Ok(());
        }
        Err(AppError::not_found("Account for this mobile number"))
    }

    /// Called after the mobile OTP has been verified.
    pub async fn resolve_mobile_login(
        &self,
        mobile: &str,
        signup: Option<MobileSignup>,
    ) -> Result<Resolved> {
        let mobile = identifier::require_mobile(mobile)?;

        if let Some(user) = self.users.find_by_mobile(&mobile).await? {
            return Ok(Resolved { user, created: false });
        }

        let signup = signup.ok_or_else(|| AppError::not_found("Account for this mobile number"))?;
        let email = identifier::normalize_email(&signup.email);
        if !identifier::is_email(&email) {
            return Err(AppError::invalid_data("Invalid email address"));
        }
        if signup.name.trim().is_empty() {
            return Err(AppError::invalid_data("Name is required"));
        }
        self.ensure_available(&email, &mobile).await?;

        let user = User::new(
            signup.name.trim(),
            email.as_str(),
            mobile,
            hash_password(&placeholder_secret("mobile", &email))?,
            self.role_for(&email),
            AuthProvider::MobileOtp,
        );
        let user = self.users.insert(user).await?;
        tracing::info!("✅ Created account {} from mobile OTP login", user.id_hex());
        Ok(Resolved { user, created: true })
    }

    /// Find-or-create for a verified federated identity.
    pub async fn resolve_federated(&self, identity: FederatedIdentity) -> Result<Resolved> {
        let email = identifier::normalize_email(&identity.email);

        if let Some(mut user) = self.users.find_by_email(&email).await? {
            if let (Some(picture), Some(id)) = (identity.picture.as_deref(), user.id) {
                if user.avatar_url.as_deref() != Some(picture) {
                    self.users.set_avatar(&id, picture).await?;
                    user.avatar_url = Some(picture.to_string());
                }
            }
            return Ok(Resolved { user, created: false });
        }

        let mobile = self.free_placeholder(&identity.subject).await?;
        let mut user = User::new(
            identity.name.trim(),
            email.as_str(),
            mobile,
            hash_password(&placeholder_secret("google", &identity.subject))?,
            self.role_for(&email),
            AuthProvider::Google,
        );
        user.avatar_url = identity.picture;

        let user = self.users.insert(user).await?;
        tracing::info!("✅ Created account {} from Google login", user.id_hex());
        Ok(Resolved { user, created: true })
    }

    pub async fn change_password(&self, user: &User, current: &str, new_password: &str) -> Result<()> {
        if !verify_password(current, &user.password_hash) {
            return Err(AppError::AuthError);
        }
        self.set_password(user, new_password).await
    }

    pub async fn reset_password(&self, user: &User, new_password: &str) -> Result<()> {
        self.set_password(user, new_password).await
    }

    async fn set_password(&self, user: &User, new_password: &str) -> Result<()> {
        validate_password(new_password)?;
        let id = user.id.ok_or_else(|| AppError::not_found("User"))?;
        self.users
            .set_password_hash(&id, &hash_password(new_password)?)
            .await
    }

    /// First placeholder in the subject's fold sequence that no account holds yet.
    async fn free_placeholder(&self, subject: &str) -> Result<String> {
        for attempt in 0..PLACEHOLDER_ATTEMPTS {
            let candidate = match attempt {
                0 => placeholder_mobile(subject),
                n => placeholder_mobile(&format!("{}#{}", subject, n)),
            };
            if self.users.find_by_mobile(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(AppError::conflict("Could not allocate a mobile placeholder for this account"))
    }

    async fn ensure_available(&self, email: &str, mobile: &str) -> Result<()> {
        if self.users.find_by_email(email).await?.is_some() {
            return Err(AppError::conflict("Email is already registered"));
        }
        if self.users.find_by_mobile(mobile).await?.is_some() {
            return Err(AppError::conflict("Mobile number is already registered"));
        }
        Ok(())
    }
}

/// Ten-digit stand-in for the required mobile field on federated accounts.
///
/// Starts with `RESERVED_MOBILE_PREFIX`, which `normalize_mobile` rejects, so no
/// login or lookup can ever reach an account through it. Each character code of
/// the subject is folded into one of the nine remaining slots; slots no character
/// reached are filled with 9.
pub fn placeholder_mobile(subject: &str) -> String {
    let mut slots: [Option<u32>; 9] = [None; 9];
    for (i, ch) in subject.chars().enumerate() {
        let slot = &mut slots[i % 9];
        *slot = Some((slot.unwrap_or(0) + ch as u32) % 10);
    }
    std::iter::once(RESERVED_MOBILE_PREFIX)
        .chain(
            slots
                .iter()
                .map(|d| char::from_digit(d.unwrap_or(9), 10).unwrap_or('9')),
        )
        .collect()
}

/// Unguessable password material for accounts that never log in with a password.
fn placeholder_secret(tag: &str, subject: &str) -> String {
    format!("{}:{}:{}", tag, subject, uuid::Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::session::SessionService;
    use crate::services::user_store::memory::MemoryUserStore;

    fn service() -> (AccountService, Arc<MemoryUserStore>) {
        let store = Arc::new(MemoryUserStore::default());
        let svc = AccountService::new(store.clone(), vec!["boss@example.com".to_string()]);
        (svc, store)
    }

    const SUBJECT: &str = "109876543210987654321";

    fn google(picture: &str) -> FederatedIdentity {
        FederatedIdentity {
            subject: SUBJECT.to_string(),
            email: "Learner@Example.com".to_string(),
            name: "Learner".to_string(),
            picture: Some(picture.to_string()),
        }
    }

    fn account(email: &str, mobile: &str) -> NewAccount {
        NewAccount {
            name: "Asha".to_string(),
            email: email.to_string(),
            mobile: mobile.to_string(),
            password: "password123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_federated_first_login_creates_one_user() {
        let (svc, store) = service();

        let first = svc.resolve_federated(google("https://img/a.png")).await.unwrap();
        assert!(first.created);
        assert_eq!(store.count().await, 1);
        assert_eq!(first.user.email, "learner@example.com");
        assert_eq!(first.user.auth_provider, AuthProvider::Google);
        assert_eq!(first.user.mobile.len(), 10);
        assert_eq!(first.user.avatar_url.as_deref(), Some("https://img/a.png"));
    }

    #[tokio::test]
    async fn test_federated_second_login_reuses_and_refreshes_avatar() {
        let (svc, store) = service();
        let first = svc.resolve_federated(google("https://img/a.png")).await.unwrap();

        let second = svc.resolve_federated(google("https://img/b.png")).await.unwrap();
        assert!(!second.created);
        assert_eq!(store.count().await, 1);
        assert_eq!(second.user.id, first.user.id);
        assert_eq!(second.user.avatar_url.as_deref(), Some("https://img/b.png"));
        assert_eq!(second.user.name, first.user.name);
        assert_eq!(second.user.mobile, first.user.mobile);

        let stored = store.find_by_id(&first.user.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.avatar_url.as_deref(), Some("https://img/b.png"));
        assert_eq!(stored.password_hash, first.user.password_hash);
    }

    #[test]
    fn test_placeholder_mobile_is_deterministic_ten_digits() {
        let a = placeholder_mobile(SUBJECT);
        assert_eq!(a.len(), 10);
        assert!(a.chars().all(|c| c.is_ascii_digit()));
        assert!(a.starts_with(RESERVED_MOBILE_PREFIX));
        assert_eq!(a, placeholder_mobile(SUBJECT));
        assert_ne!(a, placeholder_mobile("109876543210987654322"));

        // Short subjects are padded with 9s.
        assert_eq!(&placeholder_mobile("ab")[3..], "9999999");
    }

    #[tokio::test]
    async fn test_google_account_unreachable_through_its_placeholder() {
        let (svc, store) = service();
        let google_user = svc.resolve_federated(google("https://img/a.png")).await.unwrap().user;
        let placeholder = google_user.mobile.clone();

        assert!(matches!(
            svc.resolve_mobile_login(&placeholder, None).await,
            Err(AppError::ValidationError(_))
        ));
        let signup = MobileSignup {
            name: "Mallory".to_string(),
            email: "mallory@example.com".to_string(),
        };
        assert!(svc.resolve_mobile_login(&placeholder, Some(signup)).await.is_err());
        assert!(svc.mobile_login_ready(&placeholder, false).await.is_err());
        assert!(matches!(svc.lookup(&placeholder).await, Err(AppError::InvalidIdentifier)));
        assert!(matches!(
            svc.authenticate(&placeholder, "password123").await,
            Err(AppError::AuthError)
        ));
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_federated_signup_skips_taken_mobiles() {
        let (svc, store) = service();

        // A real subscriber whose number matches the subject's fold outside the reserved digit.
        let real = format!("7{}", &placeholder_mobile(SUBJECT)[1..]);
        svc.register(account("owner@example.com", &real)).await.unwrap();

        // Another federated account already holding the subject's first placeholder.
        let holder = User::new(
            "Holder",
            "holder@example.com",
            placeholder_mobile(SUBJECT),
            "$2b$04$hash",
            Role::Student,
            AuthProvider::Google,
        );
        store.insert(holder).await.unwrap();

        let resolved = svc.resolve_federated(google("https://img/a.png")).await.unwrap();
        assert!(resolved.created);
        assert!(resolved.user.mobile.starts_with(RESERVED_MOBILE_PREFIX));
        assert_ne!(resolved.user.mobile, placeholder_mobile(SUBJECT));
        assert_eq!(store.count().await, 3);

        let again = svc.resolve_federated(google("https://img/a.png")).await.unwrap();
        assert!(!again.created);
        assert_eq!(again.user.id, resolved.user.id);
    }

    #[tokio::test]
    async fn test_register_and_conflicts() {
        let (svc, _store) = service();
        let user = svc.register(account("asha@example.com", "98765 43210")).await.unwrap();
        assert_eq!(user.mobile, "9876543210");
        assert_eq!(user.role, Role::Student);
        assert_ne!(user.password_hash, "password123");

        let dup_email = svc.register(account("ASHA@example.com", "9123456780")).await;
        assert!(matches!(dup_email, Err(AppError::DuplicateKey(_))));

        let dup_mobile = svc.register(account("ravi@example.com", "9876543210")).await;
        assert!(matches!(dup_mobile, Err(AppError::DuplicateKey(_))));
    }

    #[tokio::test]
    async fn test_admin_emails_get_admin_role() {
        let (svc, _store) = service();
        let user = svc.register(account("boss@example.com", "9000000001")).await.unwrap();
        assert_eq!(user.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_authenticate_by_email_or_mobile() {
        let (svc, _store) = service();
        svc.register(account("asha@example.com", "9876543210")).await.unwrap();

        assert!(svc.authenticate("asha@example.com", "password123").await.is_ok());
        assert!(svc.authenticate("9876543210", "password123").await.is_ok());
        assert!(matches!(
            svc.authenticate("asha@example.com", "wrong-pass1").await,
            Err(AppError::AuthError)
        ));
        assert!(matches!(
            svc.authenticate("nobody@example.com", "password123").await,
            Err(AppError::AuthError)
        ));
        assert!(matches!(svc.authenticate("12345", "password123").await, Err(AppError::AuthError)));
    }

    #[tokio::test]
    async fn test_mobile_login_requires_signup_details_for_new_numbers() {
        let (svc, store) = service();

        let missing = svc.resolve_mobile_login("9876543210", None).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
        assert_eq!(store.count().await, 0);

        let signup = MobileSignup {
            name: "Ravi".to_string(),
            email: "ravi@example.com".to_string(),
        };
        let created = svc.resolve_mobile_login("9876543210", Some(signup)).await.unwrap();
        assert!(created.created);
        assert_eq!(created.user.auth_provider, AuthProvider::MobileOtp);

        let again = svc.resolve_mobile_login("9876543210", None).await.unwrap();
        assert!(!again.created);
        assert_eq!(again.user.id, created.user.id);
    }

    #[tokio::test]
    async fn test_mobile_login_ready_before_otp_is_spent() {
        let (svc, _store) = service();

        assert!(matches!(
            svc.mobile_login_ready("9876543210", false).await,
            Err(AppError::NotFound(_))
        ));
        assert!(svc.mobile_login_ready("9876543210", true).await.is_ok());
        assert!(matches!(
            svc.mobile_login_ready("12345", true).await,
            Err(AppError::ValidationError(_))
        ));

        svc.register(account("asha@example.com", "9876543210")).await.unwrap();
        assert!(svc.mobile_login_ready("98765 43210", false).await.is_ok());
    }

    #[tokio::test]
    async fn test_reset_token_is_single_use() {
        let (svc, store) = service();
        let sessions = SessionService::new("test-secret", 24);
        let user = svc.register(account("asha@example.com", "9876543210")).await.unwrap();

        let token = sessions.issue_reset_token(&user).unwrap();
        sessions.check_reset_token(&token, &user).unwrap();
        svc.reset_password(&user, "newpass456").await.unwrap();

        let user = store.find_by_id(&user.id.unwrap()).await.unwrap().unwrap();
        assert!(sessions.check_reset_token(&token, &user).is_err());
    }

    #[tokio::test]
    async fn test_reset_and_change_password() {
        let (svc, store) = service();
        let user = svc.register(account("asha@example.com", "9876543210")).await.unwrap();

        svc.reset_password(&user, "newpass456").await.unwrap();
        assert!(svc.authenticate("asha@example.com", "newpass456").await.is_ok());

        let user = store.find_by_id(&user.id.unwrap()).await.unwrap().unwrap();
        assert!(matches!(
            svc.change_password(&user, "password123", "another789").await,
            Err(AppError::AuthError)
        ));
        svc.change_password(&user, "newpass456", "another789").await.unwrap();
        assert!(svc.authenticate("9876543210", "another789").await.is_ok());
    }
}
