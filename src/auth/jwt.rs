use crate::auth::revocation::RevocationStore;
use crate::db::{Repository, with_timeout};
use crate::types::{AppError, Claims, Identity, ObjectId, Result, TokenPair, TokenType, User};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::sync::Arc;

/// Access tokens live for a fixed 15 minutes.
pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 15;

fn access_ttl() -> Duration {
    Duration::minutes(ACCESS_TOKEN_TTL_MINUTES)
}

/// A freshly signed token and its expiry (unix seconds).
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Token service for issuing, verifying, refreshing and revoking JWTs.
///
/// Role, ban and verification state embedded in a token always come from a
/// user record loaded at issuance time, never from the caller or from an
/// older token.
pub struct TokenService {
    jwt_secret: String,
    refresh_ttl: Duration,
    repository: Arc<dyn Repository>,
    revocations: Arc<RevocationStore>,
    lookup_timeout: std::time::Duration,
}

impl TokenService {
    /// Creates a new TokenService.
    ///
    /// # Arguments
    /// * `jwt_secret` - HMAC secret for signing (should be at least 32 chars)
    /// * `refresh_days` - Refresh token validity in days
    /// * `repository` - User lookups for issuance and refresh
    /// * `revocations` - Shared revocation store
    /// * `lookup_timeout` - Bound on each persistence call
    pub fn new(
        jwt_secret: String,
        refresh_days: i64,
        repository: Arc<dyn Repository>,
        revocations: Arc<RevocationStore>,
        lookup_timeout: std::time::Duration,
    ) -> Self {
        Self {
            jwt_secret,
            refresh_ttl: Duration::try_days(refresh_days).unwrap_or(Duration::MAX),
            repository,
            revocations,
            lookup_timeout,
        }
    }

    pub fn revocations(&self) -> &Arc<RevocationStore> {
        &self.revocations
    }

    /// Issues an access/refresh pair for a user who just completed the
    /// OAuth handshake.
    pub async fn issue(&self, identity: &Identity) -> Result<TokenPair> {
        let user = self.load_user(&identity.user_id).await?;
        let now = Utc::now();

        let access = self.build_claims(identity, &user, TokenType::Access, now, access_ttl())?;
        // Never let the access token outlive its sibling.
        let refresh_ttl = self.refresh_ttl.max(access_ttl());
        let refresh = self.build_claims(identity, &user, TokenType::Refresh, now, refresh_ttl)?;

        let access_token = self.sign(&access)?;
        let refresh_token = self.sign(&refresh)?;

        tracing::info!(user_id = %identity.user_id, role = %user.role, "issued token pair");

        Ok(TokenPair {
            access_token,
            access_expires_at: access.exp,
            refresh_token,
            refresh_expires_at: refresh.exp,
        })
    }

    /// Mints a new access token from a refresh token.
    ///
    /// The account is reloaded and rejected if banned since the refresh
    /// token was issued; the new token reflects the current record.
    pub async fn refresh(&self, refresh_token: &str) -> Result<IssuedToken> {
        if self.revocations.is_revoked(refresh_token) {
            return Err(AppError::TokenRevoked);
        }

        let claims = self.decode(refresh_token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(AppError::InvalidOrExpiredToken);
        }

        let user_id =
            ObjectId::parse_str(&claims.user_id).map_err(|_| AppError::InvalidOrExpiredToken)?;
        let user = self.load_user(&user_id).await?;

        if user.banned {
            tracing::warn!(user_id = %user.id, "refresh rejected for banned account");
            return Err(AppError::AccountBanned);
        }

        let issued = self.mint_access(&user)?;
        tracing::debug!(user_id = %user.id, "access token refreshed");
        Ok(issued)
    }

    /// Signs an access token from a user record.
    pub fn mint_access(&self, user: &User) -> Result<IssuedToken> {
        let identity = Identity {
            user_id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
        };
        let claims = self.build_claims(&identity, user, TokenType::Access, Utc::now(), access_ttl())?;

        Ok(IssuedToken {
            token: self.sign(&claims)?,
            expires_at: claims.exp,
        })
    }

    /// Verifies an access token's signature, expiry and type.
    pub fn verify_access(&self, token: &str) -> Result<Claims> {
        let claims = self.decode(token)?;
        if claims.token_type != TokenType::Access {
            return Err(AppError::InvalidOrExpiredToken);
        }
        Ok(claims)
    }

    /// Revokes a token until `expires_at`.
    pub fn invalidate(&self, token: &str, expires_at: DateTime<Utc>) {
        self.revocations.add(token, expires_at);
    }

    /// Revokes a token of either type until its own expiry, if it verifies.
    /// Returns whether anything was revoked.
    pub fn invalidate_if_valid(&self, token: &str) -> bool {
        let Ok(claims) = self.decode(token) else {
            return false;
        };
        match DateTime::<Utc>::from_timestamp(claims.exp, 0) {
            Some(expires_at) => {
                self.invalidate(token, expires_at);
                true
            }
            None => false,
        }
    }

    fn build_claims(
        &self,
        identity: &Identity,
        user: &User,
        token_type: TokenType,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Claims> {
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::Signing(format!("token lifetime of {} days is out of range", ttl.num_days())))?;

        Ok(Claims {
            user_id: identity.user_id.to_hex(),
            email: identity.email.clone(),
            name: identity.name.clone(),
            avatar_url: identity.avatar_url.clone(),
            role: user.role,
            verified: user.verified,
            banned: user.banned,
            token_type,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String> {
        if self.jwt_secret.is_empty() {
            return Err(AppError::Signing("signing secret unavailable".to_string()));
        }

        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Signing(e.to_string()))
    }

    fn decode(&self, token: &str) -> Result<Claims> {
        if self.jwt_secret.is_empty() {
            return Err(AppError::InvalidOrExpiredToken);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(reason = %e, "token rejected");
            AppError::InvalidOrExpiredToken
        })
    }

    async fn load_user(&self, id: &ObjectId) -> Result<User> {
        with_timeout(self.lookup_timeout, "user lookup", self.repository.find_user(id))
            .await?
            .ok_or(AppError::UnknownAccount)
    }
}
