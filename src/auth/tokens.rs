//! Bearer token issuance and validation.
//!
//! HS256 JWTs signed with the mall's configured secret. Each token carries a
//! `jti`; revocation blacklists the `jti` until the token's natural expiry,
//! after which the maintenance sweep drops the entry.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::errors::AuthError;
use crate::economy::Role;

/// JWT claims for mallpoints tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the username.
    pub sub: String,
    /// Role string ("member" / "staff" / "admin").
    pub role: String,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
    /// Token id, used for revocation.
    pub jti: String,
}

/// A validated identity extracted from a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIdentity {
    pub username: String,
    pub role: Role,
    pub jti: String,
}

/// Issues, validates, and revokes bearer tokens.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    /// jti -> expiry of revoked tokens. Pruned once the expiry passes.
    revoked: RwLock<HashMap<String, i64>>,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::minutes(ttl_minutes.max(1)),
            revoked: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `(username, role)` valid for the configured TTL.
    pub fn issue(
        &self,
        username: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: username.to_string(),
            role: role.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Validate a bearer token: signature, expiry, revocation, role.
    pub fn validate(&self, token: &str) -> Result<TokenIdentity, AuthError> {
        let validation = Validation::default();
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid(e),
            }
        })?;
        let claims = data.claims;

        {
            let revoked = self.revoked.read().expect("revocation lock poisoned");
            if revoked.contains_key(&claims.jti) {
                return Err(AuthError::TokenRevoked);
            }
        }

        let role = Role::parse(&claims.role).ok_or(AuthError::UnknownRole(claims.role))?;
        Ok(TokenIdentity {
            username: claims.sub,
            role,
            jti: claims.jti,
        })
    }

    /// Revoke a token by blacklisting its jti until the token would have
    /// expired anyway. Accepts already-expired tokens without error.
    pub fn revoke(&self, token: &str) -> Result<(), AuthError> {
        // Expiry no longer matters for revocation; decode without checking it.
        let mut validation = Validation::default();
        validation.validate_exp = false;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        let mut revoked = self.revoked.write().expect("revocation lock poisoned");
        revoked.insert(data.claims.jti, data.claims.exp);
        Ok(())
    }

    pub fn revoked_count(&self) -> usize {
        self.revoked.read().expect("revocation lock poisoned").len()
    }

    /// Drop revocation entries whose tokens have expired on their own.
    pub fn prune_revoked(&self, now: DateTime<Utc>) -> usize {
        let mut revoked = self.revoked.write().expect("revocation lock poisoned");
        let before = revoked.len();
        let cutoff = now.timestamp();
        revoked.retain(|_, exp| *exp > cutoff);
        before - revoked.len()
    }
}
