//! Office registry command-line host.
//!
//! # Responsibility
//! - Resolve configuration from environment, then apply flag overrides.
//! - Drive the request boundary and print its JSON responses.
//!
//! # Usage
//!
//! ```text
//! office-registry create --name HeadOffice --opening-date 1997-12-26 --hierarchy .
//! office-registry get 1
//! office-registry get-by-external-id HO
//! office-registry list
//! office-registry children 1
//! office-registry update 2 --external-id BR-1
//! office-registry count
//! ```

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use office_api::{ApiResponse, OfficeApi};
use office_core::{init_logging, OfficeId, OfficeRegistry, RegistryConfig};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "office-registry", version, about = "Manage the office registry")]
struct Cli {
    /// SQLite database path; overrides OFFICE_REGISTRY_DB_PATH.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Absolute log directory; overrides OFFICE_REGISTRY_LOG_DIR.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Log level; overrides OFFICE_REGISTRY_LOG_LEVEL.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Authorization header value, e.g. `Basic <token>`.
    #[arg(long, global = true, env = "OFFICE_REGISTRY_AUTH")]
    auth: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an office.
    Create(CreateArgs),
    /// Show one office by id.
    Get { id: OfficeId },
    /// Show one office by external id.
    GetByExternalId { external_id: String },
    /// List every office, parents before children.
    List,
    /// List direct children of an office.
    Children { id: OfficeId },
    /// Change name, external id or opening date of an office.
    Update(UpdateArgs),
    /// Print the number of stored offices.
    Count,
}

#[derive(Args, Debug)]
struct CreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    external_id: Option<String>,
    #[arg(long)]
    opening_date: String,
    /// `.` for the root office, otherwise the parent's child path (`.1.`).
    #[arg(long)]
    hierarchy: String,
    /// Pattern for `--opening-date`, e.g. `dd MMMM yyyy`.
    #[arg(long)]
    date_format: Option<String>,
}

#[derive(Args, Debug)]
struct UpdateArgs {
    id: OfficeId,
    #[arg(long)]
    name: Option<String>,
    #[arg(long, conflicts_with = "clear_external_id")]
    external_id: Option<String>,
    /// Remove the external id.
    #[arg(long)]
    clear_external_id: bool,
    #[arg(long)]
    opening_date: Option<String>,
    #[arg(long)]
    date_format: Option<String>,
}

impl Cli {
    fn config(&self) -> RegistryConfig {
        let mut config = RegistryConfig::from_env();
        if let Some(db) = &self.db {
            config.db_path = db.clone();
        }
        if let Some(log_dir) = &self.log_dir {
            config.log_dir = Some(log_dir.clone());
        }
        if let Some(log_level) = &self.log_level {
            config.log_level = log_level.clone();
        }
        config
    }
}

impl CreateArgs {
    fn payload(&self) -> Value {
        let mut body = Map::new();
        body.insert("name".into(), json!(self.name));
        body.insert("openingDate".into(), json!(self.opening_date));
        body.insert("hierarchy".into(), json!(self.hierarchy));
        if let Some(external_id) = &self.external_id {
            body.insert("externalId".into(), json!(external_id));
        }
        if let Some(date_format) = &self.date_format {
            body.insert("dateFormat".into(), json!(date_format));
        }
        Value::Object(body)
    }
}

impl UpdateArgs {
    fn payload(&self) -> Value {
        let mut body = Map::new();
        if let Some(name) = &self.name {
            body.insert("name".into(), json!(name));
        }
        if self.clear_external_id {
            body.insert("externalId".into(), Value::Null);
        } else if let Some(external_id) = &self.external_id {
            body.insert("externalId".into(), json!(external_id));
        }
        if let Some(opening_date) = &self.opening_date {
            body.insert("openingDate".into(), json!(opening_date));
        }
        if let Some(date_format) = &self.date_format {
            body.insert("dateFormat".into(), json!(date_format));
        }
        Value::Object(body)
    }
}

fn run(cli: &Cli) -> Result<ApiResponse> {
    let config = cli.config();
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir).context("failed to initialize logging")?;
    }

    let registry = OfficeRegistry::open(&config.db_path).with_context(|| {
        format!("failed to open registry at {}", config.db_path.display())
    })?;
    let api = OfficeApi::new(Arc::new(registry));
    let auth = cli.auth.as_deref();

    let response = match &cli.command {
        Command::Create(args) => api.create_office(auth, &args.payload().to_string()),
        Command::Get { id } => api.get_office(auth, *id),
        Command::GetByExternalId { external_id } => {
            api.get_office_by_external_id(auth, external_id)
        }
        Command::List => api.list_offices(auth),
        Command::Children { id } => api.list_children(auth, *id),
        Command::Update(args) => api.update_office(auth, args.id, &args.payload().to_string()),
        Command::Count => api.office_count(auth),
    };
    Ok(response)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let response = run(&cli)?;
    println!("{}", serde_json::to_string_pretty(&response.body)?);
    if !response.is_success() {
        bail!("request failed with status {}", response.status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{run, Cli, Command};
    use clap::Parser;
    use serde_json::{json, Value};

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("office-registry").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn parses_create_with_global_flags() {
        let cli = parse(&[
            "--db",
            "/tmp/offices.db",
            "create",
            "--name",
            "HeadOffice",
            "--opening-date",
            "1997-12-26",
            "--hierarchy",
            ".",
            "--auth",
            "Basic abc",
        ]);
        assert_eq!(cli.config().db_path, std::path::PathBuf::from("/tmp/offices.db"));
        assert_eq!(cli.auth.as_deref(), Some("Basic abc"));
        let Command::Create(args) = &cli.command else {
            panic!("expected create command");
        };
        assert_eq!(
            args.payload(),
            json!({ "name": "HeadOffice", "openingDate": "1997-12-26", "hierarchy": "." })
        );
    }

    #[test]
    fn update_clear_external_id_sends_null() {
        let cli = parse(&["update", "2", "--clear-external-id"]);
        let Command::Update(args) = &cli.command else {
            panic!("expected update command");
        };
        assert_eq!(args.payload(), json!({ "externalId": Value::Null }));

        assert!(Cli::try_parse_from([
            "office-registry",
            "update",
            "2",
            "--external-id",
            "X",
            "--clear-external-id",
        ])
        .is_err());
    }

    #[test]
    fn create_requires_opening_date_and_hierarchy() {
        assert!(
            Cli::try_parse_from(["office-registry", "create", "--name", "HeadOffice"]).is_err()
        );
        assert!(Cli::try_parse_from(["office-registry", "get", "not-a-number"]).is_err());
    }

    #[test]
    fn commands_round_trip_through_file_registry() {
        let dir = tempfile::tempdir().expect("temp dir");
        let db = dir.path().join("offices.sqlite3");
        let db = db.to_str().expect("utf-8 path");

        let created = run(&parse(&[
            "--db",
            db,
            "--auth",
            "Bearer token",
            "create",
            "--name",
            "HeadOffice",
            "--external-id",
            "HO",
            "--opening-date",
            "26 December 1997",
            "--date-format",
            "dd MMMM yyyy",
            "--hierarchy",
            ".",
        ]))
        .expect("create should run");
        assert!(created.is_success());
        assert_eq!(created.body["officeId"], 1);

        let fetched = run(&parse(&[
            "--db",
            db,
            "--auth",
            "Bearer token",
            "get-by-external-id",
            "HO",
        ]))
        .expect("get should run");
        assert_eq!(fetched.body["openingDate"], "1997-12-26");

        let anonymous_count = run(&parse(&["--db", db, "count"])).expect("count should run");
        assert_eq!(anonymous_count.status.as_u16(), 401);

        let count = run(&parse(&["--db", db, "--auth", "Bearer token", "count"]))
            .expect("count should run");
        assert_eq!(count.body, json!({ "count": 1 }));

        let unauthorized = run(&parse(&["--db", db, "list"])).expect("list should run");
        assert_eq!(unauthorized.status.as_u16(), 401);
    }
}
