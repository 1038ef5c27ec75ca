pub mod context;
pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::database::models::{Requester, Reviewer};
use crate::types::PrincipalKind;

pub use context::AccessContext;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub id: Uuid,
    pub email: String,
    pub nama: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn for_requester(requester: &Requester, lifetime: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: requester.id,
            email: requester.email.clone(),
            nama: requester.nama.clone(),
            role_id: None,
            role_name: None,
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn for_reviewer(reviewer: &Reviewer, lifetime: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: reviewer.id,
            email: reviewer.email.clone(),
            nama: reviewer.nama.clone(),
            role_id: Some(reviewer.role_id),
            role_name: Some(reviewer.nama_role.clone()),
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("JWT secret for {0} tokens is not configured")]
    MissingSecret(&'static str),

    #[error("Requester and reviewer tokens must use different secrets")]
    SharedSecret,

    #[error("JWT generation error: {0}")]
    Generation(String),

    #[error("Invalid JWT token: {0}")]
    Invalid(String),
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// HS256 token issuing and verification, one secret per principal kind.
///
/// The kind is chosen by the caller (route group or login endpoint), never
/// read from the token, so a token signed for one kind cannot verify as the other.
pub struct TokenService {
    requester: KeyPair,
    reviewer: KeyPair,
    lifetime: Duration,
}

impl TokenService {
    pub fn new(config: &SecurityConfig) -> Result<Self, TokenError> {
        if config.requester_jwt_secret.trim().is_empty() {
            return Err(TokenError::MissingSecret("requester"));
        }
        if config.reviewer_jwt_secret.trim().is_empty() {
            return Err(TokenError::MissingSecret("reviewer"));
        }
        if config.requester_jwt_secret == config.reviewer_jwt_secret {
            return Err(TokenError::SharedSecret);
        }

        Ok(Self {
            requester: KeyPair::from_secret(&config.requester_jwt_secret),
            reviewer: KeyPair::from_secret(&config.reviewer_jwt_secret),
            lifetime: Duration::minutes(config.jwt_expiry_minutes),
        })
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    fn keys(&self, kind: PrincipalKind) -> &KeyPair {
        match kind {
            PrincipalKind::Requester => &self.requester,
            PrincipalKind::Reviewer => &self.reviewer,
        }
    }

    pub fn issue(&self, claims: &Claims, kind: PrincipalKind) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.keys(kind).encoding)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }

    pub fn verify(&self, token: &str, kind: PrincipalKind) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.keys(kind).decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| TokenError::Invalid(e.to_string()))
    }
}
