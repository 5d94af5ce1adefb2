use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Username and password for the portal. Only ever held in memory, and every
/// copy is zeroed when it is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Whether the held credentials were accepted by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validity {
    #[default]
    Unknown,
    Valid,
    Invalid,
}

/// The identity of the current session.
#[derive(Debug, Default)]
pub struct UserSession {
    credentials: Option<Credentials>,
    pub validity: Validity,
    pub login_is_pending: bool,
}

impl UserSession {
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn username(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.username.as_str())
    }

    /// Stores new credentials. Validity goes back to unknown until checked.
    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.clear();
        self.credentials = Some(credentials);
    }

    /// Credentials that have been accepted by the portal.
    pub fn valid_credentials(&self) -> Option<&Credentials> {
        match self.validity {
            Validity::Valid => self.credentials.as_ref(),
            _ => None,
        }
    }

    pub fn mark_checked(&mut self, is_valid: bool) {
        self.login_is_pending = false;
        self.validity = if is_valid {
            Validity::Valid
        } else {
            Validity::Invalid
        };
    }

    pub fn clear(&mut self) {
        self.credentials = None;
        self.validity = Validity::Unknown;
        self.login_is_pending = false;
    }
}
