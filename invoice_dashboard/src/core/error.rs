use std::error::Error;
use std::fmt::{Debug, Display};

/// Error type for relational store operations
#[derive(Debug)]
pub enum StoreError {
    /// Error raised by the SQLite driver
    DatabaseError(String),
    /// Row data could not be mapped onto a domain type
    CorruptRowError(String),
    /// Error while creating or seeding the schema
    InitializationError(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            StoreError::CorruptRowError(msg) => write!(f, "Corrupt row: {}", msg),
            StoreError::InitializationError(msg) => write!(f, "Initialization error: {}", msg),
        }
    }
}

impl Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::DatabaseError(err.to_string())
    }
}

/// Error type for the credentials sign-in flow
#[derive(Debug)]
pub enum AuthError {
    /// Credentials were malformed, unknown or did not match
    CredentialsSignin,
    /// The user lookup itself failed
    Store(StoreError),
    /// A password could not be hashed
    Hashing(String),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::CredentialsSignin => write!(f, "CredentialsSignin"),
            AuthError::Store(err) => write!(f, "Sign-in failed: {}", err),
            AuthError::Hashing(msg) => write!(f, "Password hashing failed: {}", msg),
        }
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AuthError::Store(err) => Some(err),
            AuthError::CredentialsSignin | AuthError::Hashing(_) => None,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::Store(err)
    }
}

/// Error type for configuration loading
#[derive(Debug)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed
    InvalidValue { key: String, value: String, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue { key, value, reason } => {
                write!(f, "Invalid value {:?} for {}: {}", value, key, reason)
            }
        }
    }
}

impl Error for ConfigError {}
