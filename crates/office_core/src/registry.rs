//! Office registry facade.
//!
//! # Responsibility
//! - Own the registry connection and serialize every write through it.
//! - Run each mutating use-case inside one `IMMEDIATE` transaction so that
//!   uniqueness checks and the insert form a single critical section.
//! - Emit metadata-only `office_*` logging events.
//!
//! # Invariants
//! - Two concurrent creates with the same name or external id never both
//!   succeed.
//! - A failed write leaves storage untouched (transaction rolls back on drop).
//! - Office names and external ids are never written to logs.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::model::office::{CreateOfficeRequest, Office, OfficeChanges, OfficeId};
use crate::repo::office_repo::{RepoError, SqliteOfficeRepository};
use crate::service::office_service::{OfficeResult, OfficeService, OfficeServiceError};
use chrono::{Local, NaiveDate};
use log::{debug, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Source of the current calendar date.
pub type Clock = fn() -> NaiveDate;

/// Local calendar date of the running process.
pub fn system_today() -> NaiveDate {
    Local::now().date_naive()
}

type Service<'conn> = OfficeService<SqliteOfficeRepository<'conn>>;

/// Thread-safe single source of truth for office records.
pub struct OfficeRegistry {
    conn: Mutex<Connection>,
    clock: Clock,
}

impl OfficeRegistry {
    /// Opens a file-backed registry, applying migrations.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    /// Opens a private in-memory registry.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            clock: system_today,
        }
    }

    /// Replaces the date source used for future-date checks.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Validates and persists a new office, returning it with its new id.
    pub fn create_office(&self, request: &CreateOfficeRequest) -> OfficeResult<Office> {
        let started_at = Instant::now();
        let result = self.write(|service| service.create_office(request));
        match &result {
            Ok(office) => info!(
                "event=office_create module=registry status=ok office_id={} depth={} duration_ms={}",
                office.id,
                office.hierarchy.depth(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_rejection("office_create", err, started_at),
        }
        result
    }

    /// Applies partial changes to an existing office.
    pub fn update_office(&self, id: OfficeId, changes: &OfficeChanges) -> OfficeResult<Office> {
        let started_at = Instant::now();
        let result = self.write(|service| service.update_office(id, changes));
        match &result {
            Ok(_) => info!(
                "event=office_update module=registry status=ok office_id={id} duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_rejection("office_update", err, started_at),
        }
        result
    }

    pub fn get_office(&self, id: OfficeId) -> OfficeResult<Office> {
        self.read(|service| service.get_office(id))
    }

    pub fn get_office_by_external_id(&self, external_id: &str) -> OfficeResult<Office> {
        self.read(|service| service.get_office_by_external_id(external_id))
    }

    pub fn list_offices(&self) -> OfficeResult<Vec<Office>> {
        self.read(|service| service.list_offices())
    }

    pub fn list_children(&self, id: OfficeId) -> OfficeResult<Vec<Office>> {
        self.read(|service| service.list_children(id))
    }

    pub fn office_count(&self) -> OfficeResult<u64> {
        self.read(|service| service.office_count())
    }

    fn write<T>(&self, op: impl FnOnce(&Service<'_>) -> OfficeResult<T>) -> OfficeResult<T> {
        let conn = self.lock();
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;
        let service = OfficeService::new(SqliteOfficeRepository::try_new(&tx)?, (self.clock)());
        let value = op(&service)?;
        tx.commit().map_err(RepoError::from)?;
        Ok(value)
    }

    fn read<T>(&self, op: impl FnOnce(&Service<'_>) -> OfficeResult<T>) -> OfficeResult<T> {
        let conn = self.lock();
        let service = OfficeService::new(SqliteOfficeRepository::try_new(&conn)?, (self.clock)());
        op(&service)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-write drops its transaction, so the connection is clean.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Stable `error_code` label for logs.
pub fn error_code(err: &OfficeServiceError) -> &'static str {
    match err {
        OfficeServiceError::Validation(_) => "validation_failed",
        OfficeServiceError::DuplicateName(_) => "duplicate_name",
        OfficeServiceError::DuplicateExternalId(_) => "duplicate_external_id",
        OfficeServiceError::NotFound(_) => "not_found",
        OfficeServiceError::Repo(_) => "storage_failed",
    }
}

fn log_rejection(event: &str, err: &OfficeServiceError, started_at: Instant) {
    let duration_ms = started_at.elapsed().as_millis();
    match err {
        OfficeServiceError::Repo(source) => warn!(
            "event={event} module=registry status=error error_code={} duration_ms={duration_ms} error={source}",
            error_code(err)
        ),
        OfficeServiceError::Validation(validation) => debug!(
            "event={event} module=registry status=rejected error_code={} field={} reason={} duration_ms={duration_ms}",
            error_code(err),
            validation.field().as_str(),
            validation.reason()
        ),
        _ => debug!(
            "event={event} module=registry status=rejected error_code={} duration_ms={duration_ms}",
            error_code(err)
        ),
    }
}
