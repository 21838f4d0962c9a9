//! Office use-case service.
//!
//! # Responsibility
//! - Validate office requests and placement above the repository layer.
//! - Enforce name/external id uniqueness before any write.
//! - Provide create, update, lookup and listing entry points.
//!
//! # Invariants
//! - Check order for creates: field validation, name uniqueness, external id
//!   uniqueness, placement. The first violation wins.
//! - A child never opens before its parent.
//! - Only one office may sit at the root path `"."`.
//! - The service never commits; callers wrap it in a write transaction.

use crate::model::hierarchy::Hierarchy;
use crate::model::office::{
    CreateOfficeRequest, NewOffice, Office, OfficeChanges, OfficeId, OfficeValidationError,
};
use crate::repo::office_repo::{OfficeRepository, RepoError, UniqueKey};
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type OfficeResult<T> = Result<T, OfficeServiceError>;

/// Key used for a failed lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfficeLookup {
    Id(OfficeId),
    ExternalId(String),
}

impl Display for OfficeLookup {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::ExternalId(external_id) => write!(f, "externalId `{external_id}`"),
        }
    }
}

/// Errors from office service operations.
#[derive(Debug)]
pub enum OfficeServiceError {
    /// A field is missing, malformed, or violates placement rules.
    Validation(OfficeValidationError),
    /// Another office already uses this name.
    DuplicateName(String),
    /// Another office already uses this external id.
    DuplicateExternalId(String),
    /// No office matches the lookup key.
    NotFound(OfficeLookup),
    /// Repository-level failure.
    Repo(RepoError),
}

impl Display for OfficeServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateName(name) => write!(f, "office with name `{name}` already exists"),
            Self::DuplicateExternalId(external_id) => {
                write!(f, "office with externalId `{external_id}` already exists")
            }
            Self::NotFound(lookup) => write!(f, "office not found: {lookup}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for OfficeServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<OfficeValidationError> for OfficeServiceError {
    fn from(value: OfficeValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for OfficeServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(OfficeLookup::Id(id)),
            RepoError::UniqueViolation(UniqueKey::Root) => {
                Self::Validation(OfficeValidationError::RootAlreadyExists)
            }
            other => Self::Repo(other),
        }
    }
}

/// Office use-case service facade.
pub struct OfficeService<R: OfficeRepository> {
    repo: R,
    today: NaiveDate,
}

impl<R: OfficeRepository> OfficeService<R> {
    /// Creates a service; `today` bounds opening dates for this unit of work.
    pub fn new(repo: R, today: NaiveDate) -> Self {
        Self { repo, today }
    }

    /// Validates and persists a new office.
    pub fn create_office(&self, request: &CreateOfficeRequest) -> OfficeResult<Office> {
        let new_office = request.validate(self.today)?;

        self.ensure_name_available(&new_office.name, None)?;
        if let Some(external_id) = new_office.external_id.as_deref() {
            self.ensure_external_id_available(external_id, None)?;
        }
        self.ensure_placement(&new_office)?;

        self.repo
            .insert_office(&new_office)
            .map_err(|err| write_error(err, &new_office.name, new_office.external_id.as_deref()))
    }

    /// Applies partial changes to an existing office.
    ///
    /// Placement never changes; uniqueness is checked against every other
    /// office, and date ordering against the parent and direct children.
    pub fn update_office(&self, id: OfficeId, changes: &OfficeChanges) -> OfficeResult<Office> {
        let current = self.get_office(id)?;
        if changes.is_empty() {
            return Ok(current);
        }

        let next = changes.apply_to(&current, self.today)?;
        if next.name != current.name {
            self.ensure_name_available(&next.name, Some(id))?;
        }
        if next.external_id != current.external_id {
            if let Some(external_id) = next.external_id.as_deref() {
                self.ensure_external_id_available(external_id, Some(id))?;
            }
        }
        if next.opening_date != current.opening_date {
            self.ensure_opening_date_fits_tree(&next)?;
        }

        self.repo
            .update_office(&next)
            .map_err(|err| write_error(err, &next.name, next.external_id.as_deref()))?;
        Ok(next)
    }

    pub fn get_office(&self, id: OfficeId) -> OfficeResult<Office> {
        self.repo
            .get_office(id)?
            .ok_or(OfficeServiceError::NotFound(OfficeLookup::Id(id)))
    }

    pub fn get_office_by_external_id(&self, external_id: &str) -> OfficeResult<Office> {
        self.repo
            .find_by_external_id(external_id.trim())?
            .ok_or_else(|| {
                OfficeServiceError::NotFound(OfficeLookup::ExternalId(external_id.to_string()))
            })
    }

    pub fn list_offices(&self) -> OfficeResult<Vec<Office>> {
        Ok(self.repo.list_offices()?)
    }

    /// Lists direct children of an existing office.
    pub fn list_children(&self, id: OfficeId) -> OfficeResult<Vec<Office>> {
        self.get_office(id)?;
        Ok(self.repo.list_children(id)?)
    }

    pub fn office_count(&self) -> OfficeResult<u64> {
        Ok(self.repo.count_offices()?)
    }

    fn ensure_name_available(&self, name: &str, own_id: Option<OfficeId>) -> OfficeResult<()> {
        match self.repo.find_by_name(name)? {
            Some(existing) if Some(existing.id) != own_id => {
                Err(OfficeServiceError::DuplicateName(name.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn ensure_external_id_available(
        &self,
        external_id: &str,
        own_id: Option<OfficeId>,
    ) -> OfficeResult<()> {
        match self.repo.find_by_external_id(external_id)? {
            Some(existing) if Some(existing.id) != own_id => Err(
                OfficeServiceError::DuplicateExternalId(external_id.to_string()),
            ),
            _ => Ok(()),
        }
    }

    fn ensure_placement(&self, new_office: &NewOffice) -> OfficeResult<()> {
        let Some(parent_id) = new_office.parent_id() else {
            if self.repo.find_root()?.is_some() {
                return Err(OfficeValidationError::RootAlreadyExists.into());
            }
            return Ok(());
        };

        let parent = self.load_parent(parent_id)?;
        ensure_child_path(&new_office.hierarchy, &parent)?;
        ensure_not_before_parent(new_office.opening_date, &parent)?;
        Ok(())
    }

    fn ensure_opening_date_fits_tree(&self, office: &Office) -> OfficeResult<()> {
        if let Some(parent_id) = office.parent_id {
            let parent = self.load_parent(parent_id)?;
            ensure_not_before_parent(office.opening_date, &parent)?;
        }

        let earliest_child = self
            .repo
            .list_children(office.id)?
            .into_iter()
            .filter(|child| child.opening_date < office.opening_date)
            .min_by_key(|child| (child.opening_date, child.id));
        if let Some(child) = earliest_child {
            return Err(OfficeValidationError::OpeningDateAfterChild {
                opening_date: office.opening_date,
                child_id: child.id,
                child_opening_date: child.opening_date,
            }
            .into());
        }
        Ok(())
    }

    fn load_parent(&self, parent_id: OfficeId) -> OfficeResult<Office> {
        self.repo
            .get_office(parent_id)?
            .ok_or_else(|| OfficeValidationError::ParentNotFound(parent_id).into())
    }
}

fn ensure_child_path(hierarchy: &Hierarchy, parent: &Office) -> Result<(), OfficeValidationError> {
    let expected = parent.child_hierarchy();
    if *hierarchy != expected {
        return Err(OfficeValidationError::DanglingHierarchy {
            hierarchy: hierarchy.clone(),
            expected,
        });
    }
    Ok(())
}

fn ensure_not_before_parent(
    opening_date: NaiveDate,
    parent: &Office,
) -> Result<(), OfficeValidationError> {
    if opening_date < parent.opening_date {
        return Err(OfficeValidationError::OpeningDateBeforeParent {
            opening_date,
            parent_opening_date: parent.opening_date,
        });
    }
    Ok(())
}

/// Maps storage-level uniqueness failures that slipped past the service
/// checks onto the same typed duplicate errors.
fn write_error(err: RepoError, name: &str, external_id: Option<&str>) -> OfficeServiceError {
    match err {
        RepoError::UniqueViolation(UniqueKey::Name) => {
            OfficeServiceError::DuplicateName(name.to_string())
        }
        RepoError::UniqueViolation(UniqueKey::ExternalId) => {
            OfficeServiceError::DuplicateExternalId(external_id.unwrap_or_default().to_string())
        }
        other => other.into(),
    }
}
