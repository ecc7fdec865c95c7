//! Access token verification and issuance.
//!
//! Tokens are HS256 JWTs carrying `userId` and `type = "access"`. Verification
//! resolves the user in the store on every call, so deactivation and role
//! changes take effect immediately.

use crate::db::{Role, Store};
use crate::error::ApiError;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use uuid::Uuid;

/// Token type accepted by the verifier.
const ACCESS_TOKEN_TYPE: &str = "access";

/// Token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Subject user.
    pub user_id: Uuid,
    /// Token kind, `access` or `refresh`.
    #[serde(rename = "type")]
    pub token_type: String,
    /// Issued-at, seconds since the epoch.
    pub iat: u64,
    /// Expiry, seconds since the epoch.
    pub exp: u64,
}

/// Identity attached to an authenticated request or connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    /// Authenticated user.
    pub user_id: Uuid,
    /// Role at verification time.
    pub role: Role,
}

impl AuthUser {
    /// Whether the user is an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Extracts the credential from an `Authorization: Bearer` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Verifies access tokens against the store.
#[derive(Clone)]
pub struct AuthVerifier {
    store: Arc<dyn Store>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_ttl_secs: u64,
}

impl AuthVerifier {
    /// Creates a verifier for the given HS256 secret.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, secret: &str, access_token_ttl_secs: u64) -> Self {
        Self {
            store,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_ttl_secs,
        }
    }

    /// Issues an access token for `user_id`.
    ///
    /// # Errors
    /// Returns `ApiError::Internal` if signing fails.
    pub fn issue_access_token(&self, user_id: Uuid) -> Result<String, ApiError> {
        let iat = now_epoch_secs();
        let claims = Claims {
            user_id,
            token_type: ACCESS_TOKEN_TYPE.to_string(),
            iat,
            exp: iat + self.access_token_ttl_secs,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
    }

    /// Decodes and checks the signature, expiry and token type.
    fn decode_claims(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let decoded = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            debug!("Rejected token: {}", e);
            ApiError::Unauthorized("Invalid token".to_string())
        })?;

        if decoded.claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(ApiError::Unauthorized("Invalid token".to_string()));
        }
        Ok(decoded.claims)
    }

    /// Verifies a credential and resolves the active user behind it.
    ///
    /// # Errors
    /// Returns `ApiError::Unauthorized` for a bad token or an unknown or
    /// inactive user. Store faults propagate as their own kinds.
    pub async fn verify(&self, token: &str) -> Result<AuthUser, ApiError> {
        let claims = self.decode_claims(token)?;
        let user = self
            .store
            .get_active_user(claims.user_id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("User not found or inactive".to_string()))?;

        Ok(AuthUser {
            user_id: user.id,
            role: user.role,
        })
    }
}
