use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};
use crate::model::Role;

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// User role
    pub role: Role,
    /// Issued at (timestamp)
    pub iat: i64,
    /// Expiration time (timestamp)
    pub exp: i64,
}

impl Claims {
    /// Create new claims with the given subject, role, and expiration duration in seconds
    pub fn new(subject: String, role: Role, expires_in_seconds: i64) -> Self {
        let now = Utc::now();
        let expiration = now + Duration::seconds(expires_in_seconds);

        Self {
            sub: subject,
            role,
            iat: now.timestamp(),
            exp: expiration.timestamp(),
        }
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    /// The numeric user id carried in `sub`.
    pub fn user_id(&self) -> Result<i64> {
        self.sub
            .parse()
            .map_err(|_| AuthError::InvalidToken("subject is not a user id".to_string()))
    }
}

/// Signs and checks stateless session tokens (HS256).
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expires_in_seconds: i64,
}

impl TokenIssuer {
    /// # Arguments
    /// * `secret` - The secret key for signing tokens
    /// * `expires_in_seconds` - Token lifetime (e.g., 3600 for 1 hour)
    pub fn new(secret: &str, expires_in_seconds: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expires_in_seconds,
        }
    }

    /// Issue a token for `user_id` carrying `role`.
    pub fn issue(&self, user_id: i64, role: Role) -> Result<String> {
        let claims = Claims::new(user_id.to_string(), role, self.expires_in_seconds);

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenGenerationError(e.to_string()))
    }

    /// Check signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            })?;

        let claims = token_data.claims;

        // Validation allows some leeway on `exp`; tokens here expire on the second.
        if claims.is_expired() {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("expires_in_seconds", &self.expires_in_seconds)
            .finish_non_exhaustive()
    }
}
