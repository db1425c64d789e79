//! Account registration, login, and session management.
//!
//! Passwords are hashed with Argon2id. Logins are rate limited per username
//! and update the daily streak before a bearer token is issued. Sessions are
//! an in-memory registry keyed by token id; the store remains the source of
//! record for accounts.

pub mod errors;
pub mod rate_limit;
pub mod tokens;

use std::collections::HashMap;
use std::sync::RwLock;

use argon2::Argon2;
use chrono::{DateTime, Utc};
use log::{info, warn};
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier};

pub use errors::AuthError;
pub use rate_limit::{LoginRateLimiter, RateLimitReason};
pub use tokens::{Claims, TokenIdentity, TokenService};

use crate::economy::{MallStore, Role, StreakOutcome, UserRecord};
use crate::logutil::escape_log;
use crate::validation::validate_username;

const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;

/// A live session tracked for its token's lifetime.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub username: String,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub username: String,
    pub role: Role,
    pub login_streak: u32,
    pub streak: StreakOutcome,
}

/// Authentication manager: hashing, tokens, rate limiting, sessions.
pub struct AuthManager {
    argon2: Argon2<'static>,
    tokens: TokenService,
    limiter: LoginRateLimiter,
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl AuthManager {
    pub fn new(tokens: TokenService, limiter: LoginRateLimiter) -> Self {
        Self {
            argon2: Argon2::default(),
            tokens,
            limiter,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = password_hash::SaltString::generate(&mut rand::thread_rng());
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify_password(&self, password: &str, stored: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(stored).map_err(|e| AuthError::Hash(e.to_string()))?;
        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    fn check_password_policy(password: &str) -> Result<(), AuthError> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::InvalidPassword(format!(
                "too short (minimum {} characters)",
                MIN_PASSWORD_LEN
            )));
        }
        if password.len() > MAX_PASSWORD_LEN {
            return Err(AuthError::InvalidPassword("too long".to_string()));
        }
        Ok(())
    }

    /// Register a new member account.
    pub fn register(
        &self,
        store: &MallStore,
        username: &str,
        display_name: &str,
        password: &str,
    ) -> Result<UserRecord, AuthError> {
        let username =
            validate_username(username).map_err(|e| AuthError::InvalidUsername(e.to_string()))?;
        Self::check_password_policy(password)?;
        if store.user_exists(&username)? {
            return Err(crate::economy::EconomyError::UserExists(username).into());
        }
        let hash = self.hash_password(password)?;
        let user = UserRecord::new(&username, display_name, &hash);
        store.put_user(user.clone())?;
        info!("registered account {}", escape_log(&username));
        Ok(user)
    }

    /// Log a member in: rate limit, verify, update streak, issue a token.
    pub fn login(
        &self,
        store: &MallStore,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<LoginOutcome, AuthError> {
        let key = username.to_ascii_lowercase();
        if let Err(RateLimitReason::LockedOut { seconds_remaining }) = self.limiter.check(&key, now)
        {
            warn!("login for {} rate limited", escape_log(&key));
            return Err(AuthError::RateLimited {
                retry_after_secs: seconds_remaining,
            });
        }

        let mut user = match store.get_user(username) {
            Ok(user) => user,
            Err(crate::economy::EconomyError::NotFound(_)) => {
                // Burn an attempt so unknown names can't be probed for free.
                self.limiter.record_failure(&key, now);
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        if !self.verify_password(password, &user.password_hash)? {
            self.limiter.record_failure(&key, now);
            return Err(AuthError::InvalidCredentials);
        }
        self.limiter.clear(&key);

        let streak = user.record_login(now);
        let login_streak = user.login_streak;
        let role = user.role;
        store.put_user(user)?;

        let token = self.tokens.issue(username, role, now)?;
        let identity = self.tokens.validate(&token)?;
        self.sessions
            .write()
            .expect("session lock poisoned")
            .insert(
                identity.jti,
                SessionEntry {
                    username: username.to_string(),
                    role,
                    issued_at: now,
                    expires_at: now + self.tokens.ttl(),
                },
            );

        info!("login ok for {} (streak {})", escape_log(username), login_streak);
        Ok(LoginOutcome {
            token,
            username: username.to_string(),
            role,
            login_streak,
            streak,
        })
    }

    /// Validate a bearer token to an identity.
    pub fn validate_token(&self, token: &str) -> Result<TokenIdentity, AuthError> {
        self.tokens.validate(token)
    }

    /// Log out: revoke the token and drop its session.
    pub fn logout(&self, token: &str) -> Result<(), AuthError> {
        let identity = self.tokens.validate(token)?;
        self.tokens.revoke(token)?;
        self.sessions
            .write()
            .expect("session lock poisoned")
            .remove(&identity.jti);
        Ok(())
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.read().expect("session lock poisoned").len()
    }

    /// Drop expired sessions, stale revocations, and idle rate-limit state.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().expect("session lock poisoned");
        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at > now);
        let dropped = before - sessions.len();
        drop(sessions);

        self.tokens.prune_revoked(now) + self.limiter.prune(now) + dropped
    }
}
