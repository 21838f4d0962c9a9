//! Office repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide persistence APIs over the canonical `offices` table.
//! - Keep SQL details and constraint mapping inside the repository boundary.
//!
//! # Invariants
//! - Reads reject invalid persisted state instead of masking it.
//! - Storage-level UNIQUE violations surface as `RepoError::UniqueViolation`.
//! - Callers own transaction scope; this repository never commits.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::hierarchy::Hierarchy;
use crate::model::office::{NewOffice, Office, OfficeId};
use chrono::NaiveDate;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const OFFICE_SELECT_SQL: &str = "SELECT
    id,
    name,
    external_id,
    opening_date,
    hierarchy,
    parent_id
FROM offices";

const OPENING_DATE_FORMAT: &str = "%Y-%m-%d";

pub type RepoResult<T> = Result<T, RepoError>;

/// Unique keys guarded by storage indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueKey {
    Name,
    ExternalId,
    Root,
}

impl Display for UniqueKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::ExternalId => write!(f, "external_id"),
            Self::Root => write!(f, "root"),
        }
    }
}

/// Errors from office repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target office does not exist.
    NotFound(OfficeId),
    /// Write rejected by a storage uniqueness constraint.
    UniqueViolation(UniqueKey),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid office.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "office not found: {id}"),
            Self::UniqueViolation(key) => write!(f, "office {key} already exists"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "office repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "office repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted office data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match unique_violation_key(&value) {
            Some(key) => Self::UniqueViolation(key),
            None => Self::Db(DbError::Sqlite(value)),
        }
    }
}

/// Repository interface for office persistence.
pub trait OfficeRepository {
    /// Inserts a validated office and returns it with its assigned id.
    fn insert_office(&self, office: &NewOffice) -> RepoResult<Office>;
    /// Persists `name`, `external_id` and `opening_date` of an existing office.
    fn update_office(&self, office: &Office) -> RepoResult<()>;
    fn get_office(&self, id: OfficeId) -> RepoResult<Option<Office>>;
    fn find_by_name(&self, name: &str) -> RepoResult<Option<Office>>;
    fn find_by_external_id(&self, external_id: &str) -> RepoResult<Option<Office>>;
    fn find_root(&self) -> RepoResult<Option<Office>>;
    /// Lists every office, parents before children, siblings by id.
    fn list_offices(&self) -> RepoResult<Vec<Office>>;
    /// Lists direct children of one office ordered by id.
    fn list_children(&self, parent_id: OfficeId) -> RepoResult<Vec<Office>>;
    fn count_offices(&self) -> RepoResult<u64>;
}

/// SQLite-backed office repository.
pub struct SqliteOfficeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOfficeRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_office_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_one(&self, filter: &str, value: &dyn rusqlite::ToSql) -> RepoResult<Option<Office>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{OFFICE_SELECT_SQL} WHERE {filter};"))?;
        let mut rows = stmt.query([value])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_office_row(row)?));
        }
        Ok(None)
    }

    fn query_many(&self, sql: &str, values: &[&dyn rusqlite::ToSql]) -> RepoResult<Vec<Office>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(values)?;
        let mut offices = Vec::new();
        while let Some(row) = rows.next()? {
            offices.push(parse_office_row(row)?);
        }
        Ok(offices)
    }
}

impl OfficeRepository for SqliteOfficeRepository<'_> {
    fn insert_office(&self, office: &NewOffice) -> RepoResult<Office> {
        self.conn.execute(
            "INSERT INTO offices (
                name,
                external_id,
                opening_date,
                hierarchy,
                parent_id
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                office.name.as_str(),
                office.external_id.as_deref(),
                format_opening_date(office.opening_date),
                office.hierarchy.to_string(),
                office.parent_id(),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        self.get_office(id)?.ok_or(RepoError::NotFound(id))
    }

    fn update_office(&self, office: &Office) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE offices
             SET
                name = ?1,
                external_id = ?2,
                opening_date = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?4;",
            params![
                office.name.as_str(),
                office.external_id.as_deref(),
                format_opening_date(office.opening_date),
                office.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(office.id));
        }
        Ok(())
    }

    fn get_office(&self, id: OfficeId) -> RepoResult<Option<Office>> {
        self.query_one("id = ?1", &id)
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Option<Office>> {
        self.query_one("name = ?1", &name)
    }

    fn find_by_external_id(&self, external_id: &str) -> RepoResult<Option<Office>> {
        self.query_one("external_id = ?1", &external_id)
    }

    fn find_root(&self) -> RepoResult<Option<Office>> {
        self.query_one("parent_id IS NULL AND hierarchy = ?1", &".")
    }

    fn list_offices(&self) -> RepoResult<Vec<Office>> {
        let mut offices = self.query_many(&format!("{OFFICE_SELECT_SQL} ORDER BY id ASC;"), &[])?;
        offices.sort_by_cached_key(Office::child_hierarchy);
        Ok(offices)
    }

    fn list_children(&self, parent_id: OfficeId) -> RepoResult<Vec<Office>> {
        self.query_many(
            &format!("{OFFICE_SELECT_SQL} WHERE parent_id = ?1 ORDER BY id ASC;"),
            &[&parent_id],
        )
    }

    fn count_offices(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM offices;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative office count `{count}`")))
    }
}

fn parse_office_row(row: &Row<'_>) -> RepoResult<Office> {
    let id: OfficeId = row.get("id")?;

    let opening_date_text: String = row.get("opening_date")?;
    let opening_date = NaiveDate::parse_from_str(&opening_date_text, OPENING_DATE_FORMAT)
        .map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid opening date `{opening_date_text}` in offices.opening_date (id {id})"
            ))
        })?;

    let hierarchy_text: String = row.get("hierarchy")?;
    let hierarchy = Hierarchy::parse(&hierarchy_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid hierarchy `{hierarchy_text}` in offices.hierarchy (id {id})"
        ))
    })?;

    let parent_id: Option<OfficeId> = row.get("parent_id")?;
    if parent_id != hierarchy.parent_id() {
        return Err(RepoError::InvalidData(format!(
            "offices.parent_id {parent_id:?} disagrees with hierarchy `{hierarchy}` (id {id})"
        )));
    }

    Ok(Office {
        id,
        name: row.get("name")?,
        external_id: row.get("external_id")?,
        opening_date,
        hierarchy,
        parent_id,
    })
}

fn format_opening_date(value: NaiveDate) -> String {
    value.format(OPENING_DATE_FORMAT).to_string()
}

fn unique_violation_key(err: &rusqlite::Error) -> Option<UniqueKey> {
    let rusqlite::Error::SqliteFailure(failure, Some(message)) = err else {
        return None;
    };
    if failure.code != ErrorCode::ConstraintViolation
        || failure.extended_code != rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    {
        return None;
    }

    if message.contains("offices.name") || message.contains("ux_offices_name") {
        Some(UniqueKey::Name)
    } else if message.contains("offices.external_id") || message.contains("ux_offices_external_id")
    {
        Some(UniqueKey::ExternalId)
    } else if message.contains("ux_offices_single_root") {
        Some(UniqueKey::Root)
    } else {
        None
    }
}

fn ensure_office_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1
             FROM sqlite_master
             WHERE type = 'table' AND name = 'offices';",
            [],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(RepoError::MissingRequiredTable("offices"));
    }
    Ok(())
}
