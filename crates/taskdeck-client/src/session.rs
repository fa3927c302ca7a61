//! Stored session record.
//!
//! The external auth flow writes a small JSON record holding the bearer token
//! and the signed-in user. This crate only ever reads it.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use taskdeck_proto::UserId;

use crate::error::SessionError;

/// Signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Stable user id.
    #[serde(alias = "_id")]
    pub id: UserId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Email address, if the auth flow stored one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Authenticated session: bearer token plus the user it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token attached to the realtime handshake and REST requests.
    pub token: String,
    /// Signed-in user.
    pub user: CurrentUser,
}

impl Session {
    /// Session for `user` authenticated with `token`.
    pub fn new(token: impl Into<String>, user: CurrentUser) -> Self {
        Self { token: token.into(), user }
    }

    /// Parse a session record.
    ///
    /// # Errors
    ///
    /// - `SessionError::Json` if the record is malformed
    /// - `SessionError::MissingToken` if the token is blank
    pub fn from_json(text: &str) -> Result<Self, SessionError> {
        let session: Self = serde_json::from_str(text)?;
        if session.token.trim().is_empty() {
            return Err(SessionError::MissingToken);
        }
        Ok(session)
    }

    /// Read and parse the session record at `path`.
    ///
    /// # Errors
    ///
    /// - `SessionError::Io` if the file cannot be read
    /// - otherwise as [`Session::from_json`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|source| SessionError::Io { path: path.to_path_buf(), source })?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_auth_record() {
        let session = Session::from_json(
            r#"{"token":"abc","user":{"_id":"u1","name":"Ada","email":"ada@example.com"}}"#,
        )
        .unwrap();

        assert_eq!(session.token, "abc");
        assert_eq!(session.user.id, UserId::from("u1"));
        assert_eq!(session.user.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn blank_token_is_rejected() {
        let err = Session::from_json(r#"{"token":" ","user":{"id":"u1"}}"#).unwrap_err();
        assert!(matches!(err, SessionError::MissingToken));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{"token":"t","user":{"id":7,"name":"Bob"}}"#).unwrap();

        let session = Session::load(&path).unwrap();
        assert_eq!(session.user.id, UserId::from("7"));
    }

    #[test]
    fn missing_file_names_path() {
        let err = Session::load("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
