use chrono::{DateTime, Utc};
use mongodb::bson;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }
}

/// How the account was first created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthProvider {
    Password,
    MobileOtp,
    Google,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub email_notifications: bool,
    pub sms_notifications: bool,
    pub language: String,
    pub theme: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            email_notifications: true,
            sms_notifications: false,
            language: "en".to_string(),
            theme: "light".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub password_hash: String,
    pub role: Role,
    pub auth_provider: AuthProvider,

    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub settings: UserSettings,
    #[serde(default)]
    pub enrolled_courses: Vec<ObjectId>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        mobile: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
        auth_provider: AuthProvider,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
            mobile: mobile.into(),
            password_hash: password_hash.into(),
            role,
            auth_provider,
            avatar_url: None,
            bio: None,
            city: None,
            settings: UserSettings::default(),
            enrolled_courses: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }

    pub fn is_enrolled(&self, course_id: &ObjectId) -> bool {
        self.enrolled_courses.contains(course_id)
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub role: Role,
    pub auth_provider: AuthProvider,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub enrolled_courses: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id_hex(),
            name: user.name,
            email: user.email,
            mobile: user.mobile,
            role: user.role,
            auth_provider: user.auth_provider,
            avatar_url: user.avatar_url,
            bio: user.bio,
            city: user.city,
            enrolled_courses: user.enrolled_courses.iter().map(|id| id.to_hex()).collect(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Session token payload.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> crate::errors::Result<ObjectId> {
        ObjectId::parse_str(&self.sub).map_err(|_| crate::errors::AppError::MissingSession)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
