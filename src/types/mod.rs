use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============= Identifiers =============

/// A 12-byte document identifier, rendered as 24 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Generates a new random identifier.
    pub fn new() -> Self {
        Self(rand::random::<[u8; 12]>())
    }

    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a 24-character hex string, rejecting anything else as an
    /// invalid resource identifier.
    pub fn parse_str(s: &str) -> Result<Self> {
        if s.len() != 24 {
            return Err(AppError::InvalidResourceId);
        }
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| AppError::InvalidResourceId)?;
        Ok(Self(bytes))
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_str(&s).map_err(|_| serde::de::Error::custom(format!("invalid object id: {s}")))
    }
}

// ============= Roles =============

/// Platform role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    JobSeeker,
    Company,
    Faculty,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::JobSeeker, Role::Company, Role::Faculty, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::JobSeeker => "jobSeeker",
            Role::Company => "company",
            Role::Faculty => "faculty",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| AppError::InvalidInput(format!("unknown role: {s}")))
    }
}

// ============= Persistence Records =============

/// User record as returned by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: ObjectId,
    pub email: String,
    pub name: String,
    #[serde(default, rename = "avatarURL")]
    pub avatar_url: String,
    pub role: Role,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub banned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: ObjectId,
    #[serde(rename = "companyID")]
    pub company_id: ObjectId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    pub id: ObjectId,
    #[serde(rename = "jobID")]
    pub job_id: ObjectId,
    #[serde(rename = "applicantID")]
    pub applicant_id: ObjectId,
}

/// Stored file metadata; `user_id` is the uploader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: ObjectId,
    #[serde(rename = "userID")]
    pub user_id: ObjectId,
}

// ============= Authentication Types =============

/// Identity handed over by the OAuth collaborator after its handshake and
/// user upsert. Role and account state come from the store, not from here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: ObjectId,
    pub email: String,
    pub name: String,
    pub avatar_url: String,
}

/// Discriminates access tokens from refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims carried by both token kinds. Immutable snapshot of the user at
/// issuance time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub email: String,
    pub name: String,
    #[serde(rename = "avatarURL")]
    pub avatar_url: String,
    pub role: Role,
    pub verified: bool,
    pub banned: bool,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
}

/// Access/refresh pair produced at login.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub access_expires_at: i64,
    pub refresh_token: String,
    pub refresh_expires_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
}

/// The authenticated identity attached to a request.
///
/// Authentication builds it from the token. Once authorization passes, role
/// and the account flags are replaced with the stored values.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
    pub email: String,
    pub name: String,
    pub verified: bool,
    pub banned: bool,
}

impl Principal {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            user_id: claims.user_id.clone(),
            role: claims.role,
            email: claims.email.clone(),
            name: claims.name.clone(),
            verified: claims.verified,
            banned: claims.banned,
        }
    }

    pub fn object_id(&self) -> Result<ObjectId> {
        ObjectId::parse_str(&self.user_id)
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("authorization token required (cookie or header)")]
    MissingCredentials,

    #[error("invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("token has been revoked")]
    TokenRevoked,

    #[error("account no longer exists")]
    UnknownAccount,

    #[error("Your account has been banned. Please contact support.")]
    AccountBanned,

    #[error("You do not have permission to access this resource")]
    InsufficientPermissions,

    #[error("You do not own this resource")]
    NotResourceOwner,

    #[error("Invalid resource ID")]
    InvalidResourceId,

    #[error("Resource not found")]
    ResourceNotFound,

    #[error("Forbidden origin")]
    ForbiddenOrigin,

    #[error("too many requests, please try again in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("could not sign token: {0}")]
    Signing(String),

    #[error("persistence call timed out: {0}")]
    PersistenceTimeout(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code for the JSON body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::MissingCredentials => "missing_credentials",
            AppError::InvalidOrExpiredToken => "invalid_token",
            AppError::TokenRevoked => "token_revoked",
            AppError::UnknownAccount => "unknown_account",
            AppError::AccountBanned => "account_banned",
            AppError::InsufficientPermissions => "insufficient_permissions",
            AppError::NotResourceOwner => "not_owner",
            AppError::InvalidResourceId => "invalid_resource_id",
            AppError::ResourceNotFound => "resource_not_found",
            AppError::ForbiddenOrigin => "forbidden_origin",
            AppError::RateLimited { .. } => "rate_limited",
            AppError::Signing(_) => "signing_error",
            AppError::PersistenceTimeout(_) => "persistence_timeout",
            AppError::Database(_) => "database_error",
            AppError::Configuration(_) => "configuration_error",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;

        match self {
            AppError::MissingCredentials
            | AppError::InvalidOrExpiredToken
            | AppError::TokenRevoked
            | AppError::UnknownAccount => StatusCode::UNAUTHORIZED,
            AppError::AccountBanned
            | AppError::InsufficientPermissions
            | AppError::NotResourceOwner
            | AppError::ForbiddenOrigin => StatusCode::FORBIDDEN,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::InvalidResourceId | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::ResourceNotFound => StatusCode::NOT_FOUND,
            AppError::PersistenceTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Signing(_)
            | AppError::Database(_)
            | AppError::Configuration(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "{}", self);
        }

        let message = match &self {
            // Internal details stay in the logs.
            AppError::Signing(_) => "could not generate token".to_string(),
            AppError::Database(_) | AppError::Internal(_) | AppError::Configuration(_) => {
                "internal server error".to_string()
            }
            AppError::PersistenceTimeout(_) => "service temporarily unavailable, retry".to_string(),
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "error": self.code(),
            "message": message,
        });

        let mut response = (status, axum::Json(body)).into_response();
        if let AppError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(axum::http::header::RETRY_AFTER, retry_after_secs.into());
        }
        response
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
