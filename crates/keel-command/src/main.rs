use std::error::Error;
use std::io::{self, Write};

use clap::{Parser, Subcommand};
use keel_core::{Account, Application, InstanceKind, RegistryStore, RouteTable, Session};
use keel_db::DbRegistry;

#[derive(Parser)]
#[command(name = "keel")]
#[command(about = "Keel registry administrative CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, env = "DATABASE_URL", default_value = "keel.db")]
    db: String,

    /// Print records as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Service management
    Service {
        #[command(subcommand)]
        sub: ServiceCommands,
    },
    /// Instance management
    Instance {
        #[command(subcommand)]
        sub: InstanceCommands,
    },
    /// Gateway routing tables
    Gateway {
        #[command(subcommand)]
        sub: GatewayCommands,
    },
    /// Create an account
    Account {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
    },
    /// Application (client_id) management
    Application {
        #[command(subcommand)]
        sub: ApplicationCommands,
    },
    /// Session management
    Session {
        #[command(subcommand)]
        sub: SessionCommands,
    },
    /// Show registry status overview
    Status,
}

#[derive(Subcommand)]
enum ServiceCommands {
    /// Register a service, or show it if the key is already taken
    Register {
        #[arg(long)]
        key: String,
    },
    /// List all registered services
    List,
    /// Turn a service's test mode on or off
    TestMode {
        #[arg(long)]
        key: String,
        #[arg(long, action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

#[derive(Subcommand)]
enum InstanceCommands {
    /// Record an instance of an existing service
    Add {
        #[arg(long)]
        service: String,
        #[arg(long)]
        url: String,
        #[arg(long, default_value = "heroku")]
        kind: String,
        /// Mark the instance running right away
        #[arg(long)]
        running: bool,
    },
    /// List instances for a service or all instances
    List {
        #[arg(long)]
        service: Option<String>,
    },
    /// Mark an instance as not running
    Stop {
        #[arg(long)]
        service: String,
        #[arg(long)]
        url: String,
    },
}

#[derive(Subcommand)]
enum GatewayCommands {
    /// Route a path prefix of a gateway to a service
    AddRoute {
        #[arg(long)]
        gateway: String,
        #[arg(long)]
        pattern: String,
        #[arg(long)]
        service: String,
    },
    /// List the routes of a gateway
    Routes {
        #[arg(long)]
        gateway: String,
    },
    /// Show which service a path would be dispatched to
    Resolve {
        #[arg(long)]
        gateway: String,
        #[arg(long)]
        path: String,
    },
}

#[derive(Subcommand)]
enum ApplicationCommands {
    /// Register an application owned by an account
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        creator: String,
        /// Generated when omitted
        #[arg(long)]
        client_id: Option<String>,
        #[arg(long)]
        premium: bool,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Open a session for an account and print its token
    Open {
        #[arg(long)]
        username: String,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let db = DbRegistry::new(&cli.db)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(cli.command, &db, cli.json, &mut out)
}

fn run(
    command: Commands,
    db: &DbRegistry,
    json: bool,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let registry: &dyn RegistryStore = db;

    match command {
        Commands::Service { sub } => match sub {
            ServiceCommands::Register { key } => {
                let service = registry.find_or_create_service(&key)?;
                writeln!(out, "Service registered: {} mounted on {}", service.key, service.path)?;
            }
            ServiceCommands::List => {
                let services = registry.get_all_services()?;
                if json {
                    writeln!(out, "{}", serde_json::to_string_pretty(&services)?)?;
                    return Ok(());
                }
                writeln!(out, "Registered Services:")?;
                writeln!(out, "{:<20} {:<20} {:<10}", "Key", "Path", "Test mode")?;
                writeln!(out, "{}", "-".repeat(52))?;
                for svc in services {
                    writeln!(out, "{:<20} {:<20} {:<10}", svc.key, svc.path, svc.test_mode)?;
                }
            }
            ServiceCommands::TestMode { key, enabled } => {
                let service = registry.get_service(&key)?;
                registry.set_test_mode(&service, enabled)?;
                writeln!(out, "Test mode of {} set to {}", key, enabled)?;
            }
        },
        Commands::Instance { sub } => match sub {
            InstanceCommands::Add {
                service,
                url,
                kind,
                running,
            } => {
                let service = registry.get_service(&service)?;
                let kind: InstanceKind = kind.parse()?;
                let instance = registry.find_or_create_instance(&service, &url, &kind)?;
                if running {
                    registry.set_running(&instance, true)?;
                }
                writeln!(out, "Instance {} recorded for service: {}", instance.id, service.key)?;
            }
            InstanceCommands::List { service } => {
                let instances = match service {
                    Some(key) => registry.get_instances(&key)?,
                    None => registry.get_all_instances()?,
                };
                if json {
                    writeln!(out, "{}", serde_json::to_string_pretty(&instances)?)?;
                    return Ok(());
                }
                writeln!(out, "Service Instances:")?;
                writeln!(
                    out,
                    "{:<16} {:<32} {:<12} {:<8} {:<36}",
                    "Service", "URL", "Kind", "Running", "ID"
                )?;
                writeln!(out, "{}", "-".repeat(108))?;
                for inst in instances {
                    writeln!(
                        out,
                        "{:<16} {:<32} {:<12} {:<8} {:<36}",
                        inst.service_key,
                        inst.url,
                        inst.kind.to_string(),
                        inst.running,
                        inst.id
                    )?;
                }
            }
            InstanceCommands::Stop { service, url } => {
                let instance = registry
                    .get_instances(&service)?
                    .into_iter()
                    .find(|i| i.url == url)
                    .ok_or_else(|| format!("No instance of {} at {}", service, url))?;
                registry.set_running(&instance, false)?;
                writeln!(out, "Instance {} marked as stopped", instance.id)?;
            }
        },
        Commands::Gateway { sub } => match sub {
            GatewayCommands::AddRoute {
                gateway,
                pattern,
                service,
            } => {
                let gateway = registry.find_or_create_gateway(&gateway)?;
                let route = registry.add_route(&gateway, &pattern, &service)?;
                writeln!(
                    out,
                    "Route {} -> {} on gateway {}",
                    route.pattern, route.service_key, gateway.name
                )?;
            }
            GatewayCommands::Routes { gateway } => {
                let routes = registry.get_routes(&gateway)?;
                if json {
                    writeln!(out, "{}", serde_json::to_string_pretty(&routes)?)?;
                    return Ok(());
                }
                writeln!(out, "Routes of {}:", gateway)?;
                for route in routes {
                    writeln!(out, "{:<30} -> {}", route.pattern, route.service_key)?;
                }
            }
            GatewayCommands::Resolve { gateway, path } => {
                let table = RouteTable::from_routes(gateway.as_str(), registry.get_routes(&gateway)?)?;
                match table.resolve(&path) {
                    Some(route) => writeln!(out, "{} -> {} (via {})", path, route.service_key, route.pattern)?,
                    None => return Err(format!("No route of {} matches {}", gateway, path).into()),
                }
            }
        },
        Commands::Account { username, email } => {
            let account = Account::new(username, email);
            db.add_account(&account)?;
            writeln!(out, "Account created: {} ({})", account.username, account.id)?;
        }
        Commands::Application { sub } => match sub {
            ApplicationCommands::Add {
                name,
                creator,
                client_id,
                premium,
            } => {
                let creator = db
                    .get_account(&creator)?
                    .ok_or_else(|| format!("Unknown account: {}", creator))?;
                let client_id = client_id.unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
                let application = Application::new(name, client_id, premium, &creator);
                db.add_application(&application)?;
                writeln!(
                    out,
                    "Application {} created with client_id {}{}",
                    application.name,
                    application.client_id,
                    if application.premium { " (premium)" } else { "" }
                )?;
            }
        },
        Commands::Session { sub } => match sub {
            SessionCommands::Open { username } => {
                let account = db
                    .get_account(&username)?
                    .ok_or_else(|| format!("Unknown account: {}", username))?;
                let session = Session::new(&account, uuid::Uuid::new_v4().simple().to_string());
                db.add_session(&session)?;
                writeln!(out, "{}", session.token)?;
            }
        },
        Commands::Status => {
            let services = registry.get_all_services()?;
            let instances = registry.get_all_instances()?;
            let gateways = registry.get_all_gateways()?;
            let websockets = registry.get_all_websockets()?;

            writeln!(out, "Keel Registry Status Overview")?;
            writeln!(out, "{}", "=".repeat(35))?;
            writeln!(out, "Total Services:  {}", services.len())?;
            writeln!(out, "Test mode:       {}", services.iter().filter(|s| s.test_mode).count())?;
            writeln!(out, "Total Instances: {}", instances.len())?;

            let running = instances.iter().filter(|i| i.running).count();
            writeln!(out, "Running:         {}", running)?;
            writeln!(out, "Stopped:         {}", instances.len() - running)?;
            writeln!(out, "Gateways:        {}", gateways.len())?;
            writeln!(out, "Websockets:      {}", websockets.len())?;
            for websocket in &websockets {
                writeln!(out, "  {}", websocket.url)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::AccountDirectory;

    fn exec(db: &DbRegistry, args: &[&str]) -> Result<String, Box<dyn Error>> {
        let cli = Cli::try_parse_from(std::iter::once("keel").chain(args.iter().copied()))?;
        let mut out = Vec::new();
        run(cli.command, db, cli.json, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn test_service_and_instance_lifecycle() {
        let db = DbRegistry::in_memory().unwrap();
        let out = exec(&db, &["service", "register", "--key", "billing"]).unwrap();
        assert!(out.contains("mounted on /billing"));

        exec(
            &db,
            &["instance", "add", "--service", "billing", "--url", "http://b:80", "--running"],
        )
        .unwrap();
        exec(
            &db,
            &["instance", "add", "--service", "billing", "--url", "http://b:80", "--kind", "docker"],
        )
        .unwrap();
        let instances = db.get_instances("billing").unwrap();
        assert_eq!(instances.len(), 1);
        assert!(instances[0].running);

        exec(&db, &["instance", "stop", "--service", "billing", "--url", "http://b:80"]).unwrap();
        assert!(!db.get_instances("billing").unwrap()[0].running);

        db.find_or_create_websocket("wss://ws.example.com").unwrap();
        let status = exec(&db, &["status"]).unwrap();
        assert!(status.contains("Total Instances: 1"));
        assert!(status.contains("Stopped:         1"));
        assert!(status.contains("Websockets:      1"));
        assert!(status.contains("  wss://ws.example.com"));
    }

    #[test]
    fn test_test_mode_flag() {
        let db = DbRegistry::in_memory().unwrap();
        exec(&db, &["service", "register", "--key", "billing"]).unwrap();
        exec(&db, &["service", "test-mode", "--key", "billing", "--enabled", "true"]).unwrap();
        assert!(db.get_service("billing").unwrap().test_mode);
    }

    #[test]
    fn test_gateway_commands() {
        let db = DbRegistry::in_memory().unwrap();
        exec(&db, &["service", "register", "--key", "billing"]).unwrap();
        exec(
            &db,
            &["gateway", "add-route", "--gateway", "front", "--pattern", "/billing", "--service", "billing"],
        )
        .unwrap();

        let out = exec(&db, &["gateway", "resolve", "--gateway", "front", "--path", "/billing/42"]).unwrap();
        assert!(out.contains("-> billing"));
        assert!(exec(&db, &["gateway", "resolve", "--gateway", "front", "--path", "/nope"]).is_err());

        let json = exec(&db, &["gateway", "routes", "--gateway", "front", "--json"]).unwrap();
        let routes: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(routes[0]["service_key"], "billing");
    }

    #[test]
    fn test_directory_seeding() {
        let db = DbRegistry::in_memory().unwrap();
        exec(&db, &["account", "--username", "Babausse", "--email", "b@example.com"]).unwrap();
        exec(
            &db,
            &["application", "add", "--name", "app", "--creator", "Babausse", "--client-id", "cid", "--premium"],
        )
        .unwrap();
        let token = exec(&db, &["session", "open", "--username", "Babausse"]).unwrap();

        assert!(db.application_by_client_id("cid").unwrap().unwrap().premium);
        assert!(db.session_by_token(token.trim()).unwrap().is_some());
        assert!(exec(&db, &["session", "open", "--username", "ghost"]).is_err());
    }
}
