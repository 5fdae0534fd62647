use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::accounts::{Account, AccountDirectory, Application, Session};
use crate::errors::RegistryError;

/// Per-route admission configuration, fixed when the route is declared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePolicy {
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub premium: bool,
}

impl RoutePolicy {
    pub const fn new(authenticated: bool, premium: bool) -> Self {
        Self {
            authenticated,
            premium,
        }
    }

    pub const fn authenticated() -> Self {
        Self::new(true, false)
    }

    pub const fn premium() -> Self {
        Self::new(false, true)
    }

    /// The checks this policy requires, in execution order.
    pub fn checks(&self) -> Vec<Check> {
        let mut checks = vec![Check::Application];
        if self.premium {
            checks.push(Check::Premium);
        }
        if self.authenticated {
            checks.push(Check::Session);
        }
        checks
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Application,
    Premium,
    Session,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ClientId,
    SessionId,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::ClientId => "client_id",
            Field::SessionId => "session_id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Required,
    Unknown,
    Forbidden,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::Required => "required",
            Reason::Unknown => "unknown",
            Reason::Forbidden => "forbidden",
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            Reason::Required => 400,
            Reason::Forbidden => 403,
            Reason::Unknown => 404,
        }
    }
}

/// Why a request was refused. Clients parse the `(status, field, error)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    pub field: Field,
    pub reason: Reason,
}

impl Rejection {
    pub const fn new(field: Field, reason: Reason) -> Self {
        Self { field, reason }
    }

    pub fn status(&self) -> u16 {
        self.reason.status()
    }

    pub fn body(&self) -> RejectionBody {
        RejectionBody {
            status: self.status(),
            field: self.field,
            error: self.reason,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.status(), self.field.as_str(), self.reason.as_str())
    }
}

/// Wire form of a [`Rejection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RejectionBody {
    #[schema(example = 400)]
    pub status: u16,
    pub field: Field,
    pub error: Reason,
}

#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("request rejected: {0}")]
    Rejected(Rejection),

    #[error(transparent)]
    Store(#[from] RegistryError),
}

impl From<Rejection> for AdmissionError {
    fn from(rejection: Rejection) -> Self {
        AdmissionError::Rejected(rejection)
    }
}

/// The raw identifiers a request carried, wherever they were read from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub client_id: Option<String>,
    pub session_id: Option<String>,
}

impl Credentials {
    pub fn new(client_id: Option<&str>, session_id: Option<&str>) -> Self {
        Self {
            client_id: client_id.map(str::to_string),
            session_id: session_id.map(str::to_string),
        }
    }

    /// Fills whichever values are still missing from `other`.
    pub fn or(self, other: Credentials) -> Self {
        Self {
            client_id: present(self.client_id).or_else(|| present(other.client_id)),
            session_id: present(self.session_id).or_else(|| present(other.session_id)),
        }
    }

    /// Whether every value `policy` reads is already present.
    pub fn satisfies(&self, policy: RoutePolicy) -> bool {
        self.client_id().is_some() && (!policy.authenticated || self.session_id().is_some())
    }

    fn client_id(&self) -> Option<&str> {
        non_blank(self.client_id.as_deref())
    }

    fn session_id(&self) -> Option<&str> {
        non_blank(self.session_id.as_deref())
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Identity attached to a request once admission succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Principal {
    pub application: Application,
    pub session: Option<Session>,
    pub account: Option<Account>,
}

/// Runs the checks of `policy` in order and stops at the first failure.
pub fn admit<D>(
    policy: RoutePolicy,
    credentials: &Credentials,
    directory: &D,
) -> Result<Principal, AdmissionError>
where
    D: AccountDirectory + ?Sized,
{
    let mut application: Option<Application> = None;
    let mut session: Option<Session> = None;
    let mut account: Option<Account> = None;

    for check in policy.checks() {
        match check {
            Check::Application => {
                let client_id = credentials
                    .client_id()
                    .ok_or(Rejection::new(Field::ClientId, Reason::Required))?;
                let found = directory
                    .application_by_client_id(client_id)?
                    .ok_or(Rejection::new(Field::ClientId, Reason::Unknown))?;
                application = Some(found);
            }
            Check::Premium => {
                if !application.as_ref().is_some_and(|app| app.premium) {
                    return Err(Rejection::new(Field::ClientId, Reason::Forbidden).into());
                }
            }
            Check::Session => {
                let token = credentials
                    .session_id()
                    .ok_or(Rejection::new(Field::SessionId, Reason::Required))?;
                let found = directory
                    .session_by_token(token)?
                    .ok_or(Rejection::new(Field::SessionId, Reason::Unknown))?;
                // A session whose account is gone cannot authenticate anyone.
                let owner = directory
                    .account_by_session(&found)?
                    .ok_or(Rejection::new(Field::SessionId, Reason::Unknown))?;
                session = Some(found);
                account = Some(owner);
            }
        }
    }

    let application = application.ok_or(Rejection::new(Field::ClientId, Reason::Required))?;
    Ok(Principal {
        application,
        session,
        account,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryDirectory {
        accounts: HashMap<uuid::Uuid, Account>,
        sessions: HashMap<String, Session>,
        applications: HashMap<String, Application>,
        session_lookups: Cell<usize>,
        unavailable: bool,
    }

    impl AccountDirectory for MemoryDirectory {
        fn application_by_client_id(
            &self,
            client_id: &str,
        ) -> Result<Option<Application>, RegistryError> {
            if self.unavailable {
                return Err(RegistryError::Unavailable("down".to_string()));
            }
            Ok(self.applications.get(client_id).cloned())
        }

        fn session_by_token(&self, token: &str) -> Result<Option<Session>, RegistryError> {
            self.session_lookups.set(self.session_lookups.get() + 1);
            Ok(self.sessions.get(token).cloned())
        }

        fn account_by_session(&self, session: &Session) -> Result<Option<Account>, RegistryError> {
            Ok(self.accounts.get(&session.account_id).cloned())
        }
    }

    struct Fixture {
        directory: MemoryDirectory,
        account: Account,
    }

    fn fixture() -> Fixture {
        let account = Account::new("Babausse", "babausse@example.com");
        let session = Session::new(&account, "session_token");
        let app = Application::new("app", "basic_app", false, &account);
        let premium = Application::new("premium", "premium_app", true, &account);

        let mut directory = MemoryDirectory::default();
        directory.accounts.insert(account.id, account.clone());
        directory.sessions.insert(session.token.clone(), session);
        directory.applications.insert(app.client_id.clone(), app);
        directory.applications.insert(premium.client_id.clone(), premium);
        Fixture { directory, account }
    }

    fn rejection(result: Result<Principal, AdmissionError>) -> (u16, Field, Reason) {
        match result {
            Err(AdmissionError::Rejected(r)) => (r.status(), r.field, r.reason),
            other => panic!("expected a rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_checks_are_ordered() {
        assert_eq!(RoutePolicy::default().checks(), vec![Check::Application]);
        assert_eq!(
            RoutePolicy::new(true, true).checks(),
            vec![Check::Application, Check::Premium, Check::Session]
        );
    }

    #[test]
    fn test_missing_client_id_is_required_for_every_policy() {
        let f = fixture();
        for policy in [
            RoutePolicy::default(),
            RoutePolicy::authenticated(),
            RoutePolicy::premium(),
            RoutePolicy::new(true, true),
        ] {
            let creds = Credentials::new(None, Some("session_token"));
            assert_eq!(
                rejection(admit(policy, &creds, &f.directory)),
                (400, Field::ClientId, Reason::Required)
            );
        }
    }

    #[test]
    fn test_blank_client_id_counts_as_missing() {
        let f = fixture();
        let creds = Credentials::new(Some("  "), None);
        assert_eq!(
            rejection(admit(RoutePolicy::default(), &creds, &f.directory)),
            (400, Field::ClientId, Reason::Required)
        );
    }

    #[test]
    fn test_unknown_client_id() {
        let f = fixture();
        let creds = Credentials::new(Some("nope"), Some("session_token"));
        assert_eq!(
            rejection(admit(RoutePolicy::authenticated(), &creds, &f.directory)),
            (404, Field::ClientId, Reason::Unknown)
        );
        assert_eq!(f.directory.session_lookups.get(), 0);
    }

    #[test]
    fn test_premium_is_checked_before_the_session() {
        let f = fixture();
        for session in [None, Some("bogus")] {
            let creds = Credentials::new(Some("basic_app"), session);
            assert_eq!(
                rejection(admit(RoutePolicy::new(true, true), &creds, &f.directory)),
                (403, Field::ClientId, Reason::Forbidden)
            );
        }
        assert_eq!(f.directory.session_lookups.get(), 0);
    }

    #[test]
    fn test_missing_and_unknown_session() {
        let f = fixture();
        let missing = Credentials::new(Some("basic_app"), None);
        assert_eq!(
            rejection(admit(RoutePolicy::authenticated(), &missing, &f.directory)),
            (400, Field::SessionId, Reason::Required)
        );

        let unknown = Credentials::new(Some("basic_app"), Some("unknown session token"));
        assert_eq!(
            rejection(admit(RoutePolicy::authenticated(), &unknown, &f.directory)),
            (404, Field::SessionId, Reason::Unknown)
        );
    }

    #[test]
    fn test_orphaned_session_is_unknown() {
        let mut f = fixture();
        f.directory.accounts.clear();
        let creds = Credentials::new(Some("basic_app"), Some("session_token"));
        assert_eq!(
            rejection(admit(RoutePolicy::authenticated(), &creds, &f.directory)),
            (404, Field::SessionId, Reason::Unknown)
        );
    }

    #[test]
    fn test_authenticated_principal_is_bound_to_the_session_owner() {
        let f = fixture();
        let creds = Credentials::new(Some("basic_app"), Some("session_token"));
        let principal = admit(RoutePolicy::authenticated(), &creds, &f.directory).unwrap();
        assert_eq!(principal.application.client_id, "basic_app");
        assert_eq!(principal.account, Some(f.account.clone()));
        assert_eq!(principal.session.unwrap().token, "session_token");
    }

    #[test]
    fn test_unauthenticated_route_ignores_session() {
        let f = fixture();
        let creds = Credentials::new(Some("premium_app"), Some("bogus"));
        let principal = admit(RoutePolicy::premium(), &creds, &f.directory).unwrap();
        assert!(principal.account.is_none());
        assert_eq!(f.directory.session_lookups.get(), 0);
    }

    #[test]
    fn test_store_failure_is_not_a_rejection() {
        let mut f = fixture();
        f.directory.unavailable = true;
        let creds = Credentials::new(Some("basic_app"), None);
        assert!(matches!(
            admit(RoutePolicy::default(), &creds, &f.directory),
            Err(AdmissionError::Store(RegistryError::Unavailable(_)))
        ));
    }

    #[test]
    fn test_credentials_fall_back_per_field() {
        let header = Credentials::new(Some("basic_app"), Some(""));
        let query = Credentials::new(Some("other"), Some("session_token"));
        assert_eq!(
            header.or(query),
            Credentials::new(Some("basic_app"), Some("session_token"))
        );
    }

    #[test]
    fn test_rejection_display() {
        let err = AdmissionError::from(Rejection::new(Field::ClientId, Reason::Forbidden));
        assert_eq!(err.to_string(), "request rejected: 403 client_id forbidden");
    }

    #[test]
    fn test_credentials_satisfy_policy() {
        let client_only = Credentials::new(Some("basic_app"), None);
        assert!(client_only.satisfies(RoutePolicy::default()));
        assert!(client_only.satisfies(RoutePolicy::premium()));
        assert!(!client_only.satisfies(RoutePolicy::authenticated()));

        let blank = Credentials::new(Some(" "), Some("session_token"));
        assert!(!blank.satisfies(RoutePolicy::default()));
    }

    #[test]
    fn test_rejection_body_schema_example() {
        let (name, schema) = <RejectionBody as ToSchema>::schema();
        assert_eq!(name, "RejectionBody");
        let schema = serde_json::to_value(schema).unwrap();
        assert_eq!(schema["properties"]["status"]["example"], 400);
    }

    #[test]
    fn test_rejection_body_shape() {
        let body = Rejection::new(Field::SessionId, Reason::Required).body();
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": 400, "field": "session_id", "error": "required"})
        );
    }
}
