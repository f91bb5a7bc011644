use chrono::Duration;
use chrono::Utc;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::error::ApiError;
use crate::schema::{Id, User};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub email: String,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, email: String, lifetime: Duration) -> Self {
        let now = Utc::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: id,
            email,
            iat,
            exp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: Id,
    pub email: String,
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            email: value.email,
        }
    }
}

#[derive(Clone)]
pub struct SessionKeys {
    key: Hmac<Sha256>,
    lifetime: Duration,
}

impl SessionKeys {
    pub fn new(secret: &[u8], lifetime: Duration) -> Result<Self, ApiError> {
        let key = Hmac::new_from_slice(secret)
            .map_err(|e| ApiError::Internal(format!("Invalid session secret: {e}")))?;

        Ok(Self { key, lifetime })
    }

    pub fn generate_jwt_session(&self, user: &User) -> Result<String, ApiError> {
        let claims = JwtSessionData::new(user.id, user.email.to_owned(), self.lifetime);

        claims
            .sign_with_key(&self.key)
            .map_err(|e| ApiError::Internal(format!("Failed to sign session: {e}")))
    }

    pub fn verify_jwt_session(&self, token: &str) -> Result<JwtSessionData, ApiError> {
        let session: JwtSessionData = token
            .verify_with_key(&self.key)
            .map_err(|_| ApiError::InvalidToken("signature or format rejected"))?;

        if session.exp < Utc::now().timestamp() {
            return Err(ApiError::InvalidToken("token expired"));
        }

        Ok(session)
    }
}
