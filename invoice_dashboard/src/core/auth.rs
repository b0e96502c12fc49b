//! Credential sign-in for the dashboard.
//!
//! Passwords are stored as Argon2id PHC strings (`$argon2id$v=19$...`) and
//! sessions live in memory, keyed by a random token carried in the `session`
//! cookie.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use dashmap::DashMap;
use log::{info, warn};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::core::error::AuthError;
use crate::core::store::InvoiceStore;

/// Name of the cookie holding the session token
pub const SESSION_COOKIE: &str = "session";

/// Form state string returned when credentials are rejected
pub const CREDENTIALS_SIGNIN_STATE: &str = "CredentialSignin";

const MIN_PASSWORD_LEN: usize = 6;

/// Email and password as submitted by the login form
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Check the shape of the submitted credentials, `None` if they cannot possibly match
    pub fn parse(email: Option<&str>, password: Option<&str>) -> Option<Credentials> {
        let email = email?.trim();
        let password = password?;
        if !is_valid_email(email) || password.chars().count() < MIN_PASSWORD_LEN {
            return None;
        }
        Some(Credentials {
            email: email.to_string(),
            password: password.to_string(),
        })
    }
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Check a password against a stored hash; malformed hashes never match
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// A signed-in user
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub user_name: String,
}

/// In-memory session registry
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, user_id: &str, user_name: &str) -> Session {
        let mut token = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut token);
        let session = Session {
            token: hex::encode(token),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
        };
        self.sessions.insert(session.token.clone(), session.clone());
        session
    }

    pub fn get(&self, token: &str) -> Option<Session> {
        self.sessions.get(token).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, token: &str) -> Option<Session> {
        self.sessions.remove(token).map(|(_, session)| session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}

/// Credentials callback: verify the user and open a session
///
/// Rejected credentials of any kind surface as `AuthError::CredentialsSignin`;
/// store failures are passed through untouched.
pub async fn authenticate(
    store: &dyn InvoiceStore,
    sessions: &SessionStore,
    email: Option<&str>,
    password: Option<&str>,
) -> Result<Session, AuthError> {
    let credentials = match Credentials::parse(email, password) {
        Some(credentials) => credentials,
        None => {
            warn!("Rejected malformed credentials");
            return Err(AuthError::CredentialsSignin);
        }
    };

    let user = match store.get_user_by_email(&credentials.email).await? {
        Some(user) => user,
        None => {
            warn!("Sign-in attempt for unknown user");
            return Err(AuthError::CredentialsSignin);
        }
    };

    if !verify_password(&credentials.password, &user.password) {
        warn!("Password mismatch for user {}", user.id);
        return Err(AuthError::CredentialsSignin);
    }

    let session = sessions.create(&user.id, &user.name);
    info!("User {} signed in", user.id);
    Ok(session)
}
