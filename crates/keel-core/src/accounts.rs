use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::RegistryError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl Account {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
        }
    }
}

/// A logged-in session. The token is what clients send as `session_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Session {
    pub id: Uuid,
    pub token: String,
    pub account_id: Uuid,
}

impl Session {
    pub fn new(account: &Account, token: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            token: token.into(),
            account_id: account.id,
        }
    }
}

/// A calling application, identified on every request by its `client_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Application {
    pub id: Uuid,
    pub name: String,
    pub client_id: String,
    pub premium: bool,
    pub creator_id: Uuid,
}

impl Application {
    pub fn new(
        name: impl Into<String>,
        client_id: impl Into<String>,
        premium: bool,
        creator: &Account,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            client_id: client_id.into(),
            premium,
            creator_id: creator.id,
        }
    }
}

/// Read-only lookups the admission pipeline needs from the account store.
pub trait AccountDirectory {
    fn application_by_client_id(&self, client_id: &str)
        -> Result<Option<Application>, RegistryError>;
    fn session_by_token(&self, token: &str) -> Result<Option<Session>, RegistryError>;
    fn account_by_session(&self, session: &Session) -> Result<Option<Account>, RegistryError>;
}
