use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult, Row};
use uuid::Uuid;

use keel_core::gateway::normalize_pattern;
use keel_core::service::{mount_path, validate_key};
use keel_core::{
    time, Account, AccountDirectory, Application, Gateway, Instance, InstanceKind,
    RegistryError, RegistryStore, Route, Service, Session, Websocket,
};

/// SQLite-backed registry and account directory.
///
/// Every `find_or_create_*` is an `INSERT .. ON CONFLICT DO NOTHING` on the
/// unique key followed by a read of that key, so processes booting at the
/// same time against one database file converge on a single row.
pub struct DbRegistry {
    conn: Mutex<Connection>,
}

impl DbRegistry {
    pub fn new(path: &str) -> SqlResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_tables()?;
        Ok(db)
    }

    pub fn in_memory() -> SqlResult<Self> {
        Self::new(":memory:")
    }

    fn init_tables(&self) -> SqlResult<()> {
        let conn = self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS services (
                id TEXT PRIMARY KEY,
                key TEXT NOT NULL UNIQUE,
                path TEXT NOT NULL,
                test_mode INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS instances (
                id TEXT PRIMARY KEY,
                service_key TEXT NOT NULL,
                url TEXT NOT NULL,
                kind TEXT NOT NULL,
                running INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE(service_key, url),
                FOREIGN KEY(service_key) REFERENCES services(key)
            );
            CREATE TABLE IF NOT EXISTS gateways (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS routes (
                id TEXT PRIMARY KEY,
                gateway_id TEXT NOT NULL,
                pattern TEXT NOT NULL,
                service_key TEXT NOT NULL,
                UNIQUE(gateway_id, pattern),
                FOREIGN KEY(gateway_id) REFERENCES gateways(id),
                FOREIGN KEY(service_key) REFERENCES services(key)
            );
            CREATE TABLE IF NOT EXISTS websockets (
                id TEXT PRIMARY KEY,
                url TEXT NOT NULL UNIQUE,
                created_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                token TEXT NOT NULL UNIQUE,
                account_id TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS applications (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                client_id TEXT NOT NULL UNIQUE,
                premium INTEGER NOT NULL DEFAULT 0,
                creator_id TEXT NOT NULL,
                FOREIGN KEY(creator_id) REFERENCES accounts(id)
            );
            ",
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, RegistryError> {
        self.conn
            .lock()
            .map_err(|_| RegistryError::Unavailable("connection lock poisoned".to_string()))
    }

    pub fn add_account(&self, account: &Account) -> Result<(), RegistryError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO accounts (id, username, email) VALUES (?1, ?2, ?3)",
            params![account.id.to_string(), account.username, account.email],
        )
        .map_err(|e| write_error(e, &format!("account {}", account.username)))?;
        Ok(())
    }

    pub fn get_account(&self, username: &str) -> Result<Option<Account>, RegistryError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, username, email FROM accounts WHERE username = ?1",
            [username],
            row_to_account,
        )
        .optional()
        .map_err(unavailable)
    }

    /// Sessions are not constrained to live accounts; the directory treats a
    /// session whose account is gone as unknown.
    pub fn add_session(&self, session: &Session) -> Result<(), RegistryError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions (id, token, account_id) VALUES (?1, ?2, ?3)",
            params![
                session.id.to_string(),
                session.token,
                session.account_id.to_string()
            ],
        )
        .map_err(|e| write_error(e, "session token"))?;
        Ok(())
    }

    pub fn add_application(&self, application: &Application) -> Result<(), RegistryError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO applications (id, name, client_id, premium, creator_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                application.id.to_string(),
                application.name,
                application.client_id,
                application.premium,
                application.creator_id.to_string()
            ],
        )
        .map_err(|e| write_error(e, &format!("application {}", application.client_id)))?;
        Ok(())
    }
}

impl RegistryStore for DbRegistry {
    fn find_or_create_service(&self, key: &str) -> Result<Service, RegistryError> {
        validate_key(key)?;
        let conn = self.conn()?;
        let now = time::now() as i64;
        let inserted = conn
            .execute(
                "INSERT INTO services (id, key, path, test_mode, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 0, ?4, ?4)
                 ON CONFLICT(key) DO NOTHING",
                params![Uuid::new_v4().to_string(), key, mount_path(key), now],
            )
            .map_err(unavailable)?;
        if inserted > 0 {
            tracing::debug!(service = key, "service created");
        }
        service_by_key(&conn, key)
    }

    fn get_service(&self, key: &str) -> Result<Service, RegistryError> {
        let conn = self.conn()?;
        service_by_key(&conn, key)
    }

    fn get_all_services(&self) -> Result<Vec<Service>, RegistryError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("{SERVICE_COLUMNS} ORDER BY key"))
            .map_err(unavailable)?;
        let rows = stmt.query_map([], row_to_service).map_err(unavailable)?;
        rows.collect::<SqlResult<Vec<_>>>().map_err(unavailable)
    }

    fn set_test_mode(&self, service: &Service, test_mode: bool) -> Result<(), RegistryError> {
        let conn = self.conn()?;
        let updated = conn
            .execute(
                "UPDATE services SET test_mode = ?1, updated_at = ?2 WHERE key = ?3",
                params![test_mode, time::now() as i64, service.key],
            )
            .map_err(unavailable)?;
        if updated == 0 {
            return Err(RegistryError::ServiceNotFound(service.key.clone()));
        }
        Ok(())
    }

    fn find_or_create_instance(
        &self,
        service: &Service,
        url: &str,
        kind: &InstanceKind,
    ) -> Result<Instance, RegistryError> {
        let conn = self.conn()?;
        let now = time::now() as i64;
        let inserted = conn
            .execute(
                "INSERT INTO instances (id, service_key, url, kind, running, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)
                 ON CONFLICT(service_key, url) DO NOTHING",
                params![
                    Uuid::new_v4().to_string(),
                    service.key,
                    url,
                    kind.to_string(),
                    now
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(f, _)
                    if f.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    RegistryError::ServiceNotFound(service.key.clone())
                }
                other => unavailable(other),
            })?;
        if inserted > 0 {
            tracing::debug!(service = %service.key, url, "instance created");
        }
        conn.query_row(
            &format!("{INSTANCE_COLUMNS} WHERE service_key = ?1 AND url = ?2"),
            params![service.key, url],
            row_to_instance,
        )
        .map_err(unavailable)
    }

    fn set_running(&self, instance: &Instance, running: bool) -> Result<(), RegistryError> {
        let conn = self.conn()?;
        let updated = conn
            .execute(
                "UPDATE instances SET running = ?1, updated_at = ?2 WHERE id = ?3",
                params![running, time::now() as i64, instance.id.to_string()],
            )
            .map_err(unavailable)?;
        if updated == 0 {
            return Err(RegistryError::InstanceNotFound);
        }
        Ok(())
    }

    fn get_instances(&self, service_key: &str) -> Result<Vec<Instance>, RegistryError> {
        let conn = self.conn()?;
        service_by_key(&conn, service_key)?;
        let mut stmt = conn
            .prepare(&format!("{INSTANCE_COLUMNS} WHERE service_key = ?1 ORDER BY created_at, url"))
            .map_err(unavailable)?;
        let rows = stmt
            .query_map([service_key], row_to_instance)
            .map_err(unavailable)?;
        rows.collect::<SqlResult<Vec<_>>>().map_err(unavailable)
    }

    fn get_all_instances(&self) -> Result<Vec<Instance>, RegistryError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("{INSTANCE_COLUMNS} ORDER BY service_key, created_at, url"))
            .map_err(unavailable)?;
        let rows = stmt.query_map([], row_to_instance).map_err(unavailable)?;
        rows.collect::<SqlResult<Vec<_>>>().map_err(unavailable)
    }

    fn find_or_create_gateway(&self, name: &str) -> Result<Gateway, RegistryError> {
        if name.trim().is_empty() {
            return Err(RegistryError::InvalidKey(name.to_string()));
        }
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO gateways (id, name) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
            params![Uuid::new_v4().to_string(), name],
        )
        .map_err(unavailable)?;
        gateway_by_name(&conn, name)
    }

    fn get_all_gateways(&self) -> Result<Vec<Gateway>, RegistryError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, name FROM gateways ORDER BY name")
            .map_err(unavailable)?;
        let rows = stmt.query_map([], row_to_gateway).map_err(unavailable)?;
        rows.collect::<SqlResult<Vec<_>>>().map_err(unavailable)
    }

    fn add_route(
        &self,
        gateway: &Gateway,
        pattern: &str,
        service_key: &str,
    ) -> Result<Route, RegistryError> {
        let pattern = normalize_pattern(pattern)?;
        let conn = self.conn()?;
        service_by_key(&conn, service_key)?;
        conn.execute(
            "INSERT INTO routes (id, gateway_id, pattern, service_key)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(gateway_id, pattern) DO NOTHING",
            params![
                Uuid::new_v4().to_string(),
                gateway.id.to_string(),
                pattern,
                service_key
            ],
        )
        .map_err(unavailable)?;

        let route = conn
            .query_row(
                "SELECT id, gateway_id, pattern, service_key FROM routes
                 WHERE gateway_id = ?1 AND pattern = ?2",
                params![gateway.id.to_string(), pattern],
                row_to_route,
            )
            .optional()
            .map_err(unavailable)?
            .ok_or_else(|| RegistryError::GatewayNotFound(gateway.name.clone()))?;

        if route.service_key != service_key {
            return Err(RegistryError::AmbiguousRoute {
                gateway: gateway.name.clone(),
                pattern,
                existing: route.service_key,
            });
        }
        Ok(route)
    }

    fn get_routes(&self, gateway_name: &str) -> Result<Vec<Route>, RegistryError> {
        let conn = self.conn()?;
        let gateway = gateway_by_name(&conn, gateway_name)?;
        let mut stmt = conn
            .prepare(
                "SELECT id, gateway_id, pattern, service_key FROM routes
                 WHERE gateway_id = ?1 ORDER BY pattern",
            )
            .map_err(unavailable)?;
        let rows = stmt
            .query_map([gateway.id.to_string()], row_to_route)
            .map_err(unavailable)?;
        rows.collect::<SqlResult<Vec<_>>>().map_err(unavailable)
    }

    fn find_or_create_websocket(&self, url: &str) -> Result<Websocket, RegistryError> {
        if url.trim().is_empty() {
            return Err(RegistryError::InvalidKey(url.to_string()));
        }
        let conn = self.conn()?;
        let inserted = conn
            .execute(
                "INSERT INTO websockets (id, url, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(url) DO NOTHING",
                params![Uuid::new_v4().to_string(), url, time::now() as i64],
            )
            .map_err(unavailable)?;
        if inserted > 0 {
            tracing::debug!(url, "websocket created");
        }
        conn.query_row(
            "SELECT id, url, created_at FROM websockets WHERE url = ?1",
            [url],
            row_to_websocket,
        )
        .map_err(unavailable)
    }

    fn get_all_websockets(&self) -> Result<Vec<Websocket>, RegistryError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, url, created_at FROM websockets ORDER BY url")
            .map_err(unavailable)?;
        let rows = stmt.query_map([], row_to_websocket).map_err(unavailable)?;
        rows.collect::<SqlResult<Vec<_>>>().map_err(unavailable)
    }
}

impl AccountDirectory for DbRegistry {
    fn application_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<Application>, RegistryError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, client_id, premium, creator_id FROM applications WHERE client_id = ?1",
            [client_id],
            |row| {
                Ok(Application {
                    id: uuid_at(row, 0)?,
                    name: row.get(1)?,
                    client_id: row.get(2)?,
                    premium: row.get(3)?,
                    creator_id: uuid_at(row, 4)?,
                })
            },
        )
        .optional()
        .map_err(unavailable)
    }

    fn session_by_token(&self, token: &str) -> Result<Option<Session>, RegistryError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, token, account_id FROM sessions WHERE token = ?1",
            [token],
            |row| {
                Ok(Session {
                    id: uuid_at(row, 0)?,
                    token: row.get(1)?,
                    account_id: uuid_at(row, 2)?,
                })
            },
        )
        .optional()
        .map_err(unavailable)
    }

    fn account_by_session(&self, session: &Session) -> Result<Option<Account>, RegistryError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, username, email FROM accounts WHERE id = ?1",
            [session.account_id.to_string()],
            row_to_account,
        )
        .optional()
        .map_err(unavailable)
    }
}

const SERVICE_COLUMNS: &str =
    "SELECT id, key, path, test_mode, created_at, updated_at FROM services";

const INSTANCE_COLUMNS: &str =
    "SELECT id, service_key, url, kind, running, created_at, updated_at FROM instances";

fn service_by_key(conn: &Connection, key: &str) -> Result<Service, RegistryError> {
    conn.query_row(
        &format!("{SERVICE_COLUMNS} WHERE key = ?1"),
        [key],
        row_to_service,
    )
    .optional()
    .map_err(unavailable)?
    .ok_or_else(|| RegistryError::ServiceNotFound(key.to_string()))
}

fn gateway_by_name(conn: &Connection, name: &str) -> Result<Gateway, RegistryError> {
    conn.query_row(
        "SELECT id, name FROM gateways WHERE name = ?1",
        [name],
        row_to_gateway,
    )
    .optional()
    .map_err(unavailable)?
    .ok_or_else(|| RegistryError::GatewayNotFound(name.to_string()))
}

fn row_to_service(row: &Row<'_>) -> SqlResult<Service> {
    Ok(Service {
        id: uuid_at(row, 0)?,
        key: row.get(1)?,
        path: row.get(2)?,
        test_mode: row.get(3)?,
        created_at: row.get::<_, i64>(4)? as u64,
        updated_at: row.get::<_, i64>(5)? as u64,
    })
}

fn row_to_instance(row: &Row<'_>) -> SqlResult<Instance> {
    let kind: String = row.get(3)?;
    Ok(Instance {
        id: uuid_at(row, 0)?,
        service_key: row.get(1)?,
        url: row.get(2)?,
        kind: kind.parse().unwrap_or_default(),
        running: row.get(4)?,
        created_at: row.get::<_, i64>(5)? as u64,
        updated_at: row.get::<_, i64>(6)? as u64,
    })
}

fn row_to_gateway(row: &Row<'_>) -> SqlResult<Gateway> {
    Ok(Gateway {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
    })
}

fn row_to_route(row: &Row<'_>) -> SqlResult<Route> {
    Ok(Route {
        id: uuid_at(row, 0)?,
        gateway_id: uuid_at(row, 1)?,
        pattern: row.get(2)?,
        service_key: row.get(3)?,
    })
}

fn row_to_websocket(row: &Row<'_>) -> SqlResult<Websocket> {
    Ok(Websocket {
        id: uuid_at(row, 0)?,
        url: row.get(1)?,
        created_at: row.get::<_, i64>(2)? as u64,
    })
}

fn row_to_account(row: &Row<'_>) -> SqlResult<Account> {
    Ok(Account {
        id: uuid_at(row, 0)?,
        username: row.get(1)?,
        email: row.get(2)?,
    })
}

fn uuid_at(row: &Row<'_>, idx: usize) -> SqlResult<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn unavailable(e: rusqlite::Error) -> RegistryError {
    RegistryError::Unavailable(e.to_string())
}

fn write_error(e: rusqlite::Error, what: &str) -> RegistryError {
    match e {
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            RegistryError::Duplicate(what.to_string())
        }
        other => unavailable(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> DbRegistry {
        DbRegistry::in_memory().unwrap()
    }

    #[test]
    fn test_service_is_created_once() {
        let db = registry();
        let first = db.find_or_create_service("billing").unwrap();
        let second = db.find_or_create_service("billing").unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.path, "/billing");
        assert_eq!(db.get_all_services().unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_service_key() {
        let db = registry();
        assert!(matches!(
            db.find_or_create_service("a b"),
            Err(RegistryError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_same_url_yields_one_instance() {
        let db = registry();
        let service = db.find_or_create_service("billing").unwrap();

        let first = db
            .find_or_create_instance(&service, "http://billing:8080", &InstanceKind::Heroku)
            .unwrap();
        db.set_running(&first, true).unwrap();
        let second = db
            .find_or_create_instance(&service, "http://billing:8080", &InstanceKind::Docker)
            .unwrap();
        db.set_running(&second, true).unwrap();

        let instances = db.get_instances("billing").unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].id, first.id);
        assert_eq!(instances[0].kind, InstanceKind::Heroku);
        assert!(instances[0].running);
    }

    #[test]
    fn test_two_connections_converge_on_one_instance() {
        let path = std::env::temp_dir().join(format!("keel-{}.db", Uuid::new_v4()));
        let path = path.to_string_lossy().to_string();
        {
            let a = DbRegistry::new(&path).unwrap();
            let b = DbRegistry::new(&path).unwrap();

            let service_a = a.find_or_create_service("billing").unwrap();
            let service_b = b.find_or_create_service("billing").unwrap();
            assert_eq!(service_a.id, service_b.id);

            let ia = a
                .find_or_create_instance(&service_a, "http://shared:80", &InstanceKind::Local)
                .unwrap();
            let ib = b
                .find_or_create_instance(&service_b, "http://shared:80", &InstanceKind::Local)
                .unwrap();
            assert_eq!(ia.id, ib.id);
            assert_eq!(a.get_all_instances().unwrap().len(), 1);
        }
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_custom_kind_is_persisted() {
        let db = registry();
        let service = db.find_or_create_service("billing").unwrap();
        let kind = InstanceKind::Custom("fly.io".to_string());
        db.find_or_create_instance(&service, "http://fly", &kind).unwrap();
        assert_eq!(db.get_all_instances().unwrap()[0].kind, kind);
    }

    #[test]
    fn test_running_and_test_mode_updates() {
        let db = registry();
        let service = db.find_or_create_service("billing").unwrap();
        let instance = db
            .find_or_create_instance(&service, "http://billing:8080", &InstanceKind::Local)
            .unwrap();
        assert!(!instance.running);

        db.set_running(&instance, true).unwrap();
        db.set_test_mode(&service, true).unwrap();
        assert!(db.get_instances("billing").unwrap()[0].running);
        assert!(db.get_service("billing").unwrap().test_mode);

        db.set_running(&instance, false).unwrap();
        assert!(!db.get_instances("billing").unwrap()[0].running);
    }

    #[test]
    fn test_missing_records() {
        let db = registry();
        let ghost = Instance::new("billing", "http://nowhere", InstanceKind::Local, 0);
        assert!(matches!(db.set_running(&ghost, true), Err(RegistryError::InstanceNotFound)));
        assert!(matches!(db.get_service("nope"), Err(RegistryError::ServiceNotFound(_))));
        assert!(matches!(db.get_instances("nope"), Err(RegistryError::ServiceNotFound(_))));
        assert!(matches!(db.get_routes("front"), Err(RegistryError::GatewayNotFound(_))));
    }

    #[test]
    fn test_routes_are_idempotent_and_unambiguous() {
        let db = registry();
        db.find_or_create_service("billing").unwrap();
        db.find_or_create_service("invoices").unwrap();
        let gateway = db.find_or_create_gateway("front").unwrap();
        assert_eq!(db.find_or_create_gateway("front").unwrap().id, gateway.id);

        let route = db.add_route(&gateway, "/billing/", "billing").unwrap();
        assert_eq!(route.pattern, "/billing");
        let again = db.add_route(&gateway, "billing", "billing").unwrap();
        assert_eq!(again.id, route.id);

        let err = db.add_route(&gateway, "/billing", "invoices").unwrap_err();
        assert!(matches!(err, RegistryError::AmbiguousRoute { existing, .. } if existing == "billing"));

        assert!(matches!(
            db.add_route(&gateway, "/x", "unknown"),
            Err(RegistryError::ServiceNotFound(_))
        ));
        assert_eq!(db.get_routes("front").unwrap().len(), 1);
    }

    #[test]
    fn test_websocket_is_recorded_once() {
        let db = registry();
        let first = db.find_or_create_websocket("wss://ws.example.com").unwrap();
        let second = db.find_or_create_websocket("wss://ws.example.com").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(db.get_all_websockets().unwrap(), vec![first]);
        assert!(matches!(
            db.find_or_create_websocket(" "),
            Err(RegistryError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_directory_lookups() {
        let db = registry();
        let account = Account::new("Babausse", "babausse@example.com");
        db.add_account(&account).unwrap();
        let session = Session::new(&account, "session_token");
        db.add_session(&session).unwrap();
        let app = Application::new("My app", "client", true, &account);
        db.add_application(&app).unwrap();

        assert_eq!(db.application_by_client_id("client").unwrap(), Some(app));
        assert!(db.application_by_client_id("other").unwrap().is_none());

        let found = db.session_by_token("session_token").unwrap().unwrap();
        assert_eq!(db.account_by_session(&found).unwrap(), Some(account.clone()));
        assert!(db.session_by_token("nope").unwrap().is_none());
        assert_eq!(db.get_account("Babausse").unwrap(), Some(account));
    }

    #[test]
    fn test_duplicate_directory_records() {
        let db = registry();
        let account = Account::new("Babausse", "babausse@example.com");
        db.add_account(&account).unwrap();
        let clash = Account::new("Babausse", "other@example.com");
        assert!(matches!(db.add_account(&clash), Err(RegistryError::Duplicate(_))));
    }
}
