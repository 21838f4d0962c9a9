//! Office domain model.
//!
//! # Responsibility
//! - Define the canonical office record and its write-side request shapes.
//! - Validate request fields as a unit before they reach the registry.
//!
//! # Invariants
//! - `id` is assigned by storage and never reused.
//! - `parent_id` always equals `hierarchy.parent_id()`.
//! - Stored `name` and `external_id` are trimmed and non-empty.

use crate::model::hierarchy::{Hierarchy, HierarchyParseError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// System-assigned office identifier.
pub type OfficeId = i64;

/// Maximum accepted office name length, in characters.
pub const NAME_MAX_CHARS: usize = 50;
/// Maximum accepted external id length, in characters.
pub const EXTERNAL_ID_MAX_CHARS: usize = 100;

/// Canonical office record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Office {
    pub id: OfficeId,
    pub name: String,
    pub external_id: Option<String>,
    /// Serialized as ISO `yyyy-MM-dd`.
    pub opening_date: NaiveDate,
    pub hierarchy: Hierarchy,
    /// Derived from `hierarchy`; relation only.
    pub parent_id: Option<OfficeId>,
}

impl Office {
    pub fn is_root(&self) -> bool {
        self.hierarchy.is_root()
    }

    /// Path a direct child of this office must carry.
    pub fn child_hierarchy(&self) -> Hierarchy {
        self.hierarchy.child_path(self.id)
    }
}

/// Input for office creation.
///
/// Fields are optional so that missing values surface as validation errors
/// instead of parse failures at the request boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOfficeRequest {
    pub name: Option<String>,
    pub external_id: Option<String>,
    pub opening_date: Option<NaiveDate>,
    /// Placement path: `"."` for the root, otherwise the parent's child path.
    pub hierarchy: Option<String>,
    /// Supplied values that could not be decoded into their field type.
    /// Each one is reported at its field's position in the check order.
    pub rejected: Vec<OfficeValidationError>,
}

/// Create request after field-level validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOffice {
    pub name: String,
    pub external_id: Option<String>,
    pub opening_date: NaiveDate,
    pub hierarchy: Hierarchy,
}

impl NewOffice {
    pub fn parent_id(&self) -> Option<OfficeId> {
        self.hierarchy.parent_id()
    }
}

impl CreateOfficeRequest {
    /// Validates every field in order `name`, `externalId`, `openingDate`,
    /// `hierarchy`, returning the first violation.
    ///
    /// `today` is the creation date used for the future-date check.
    pub fn validate(&self, today: NaiveDate) -> Result<NewOffice, OfficeValidationError> {
        ensure_decoded(&self.rejected, OfficeField::Name)?;
        let name = normalize_name(self.name.as_deref())?;
        ensure_decoded(&self.rejected, OfficeField::ExternalId)?;
        let external_id = normalize_external_id(self.external_id.as_deref())?;
        ensure_decoded(&self.rejected, OfficeField::OpeningDate)?;
        let opening_date = self
            .opening_date
            .ok_or(OfficeValidationError::MissingOpeningDate)?;
        ensure_not_in_future(opening_date, today)?;
        ensure_decoded(&self.rejected, OfficeField::Hierarchy)?;
        let hierarchy = parse_hierarchy(self.hierarchy.as_deref())?;

        Ok(NewOffice {
            name,
            external_id,
            opening_date,
            hierarchy,
        })
    }
}

/// Partial update for an existing office.
///
/// `None` leaves a field unchanged. `external_id: Some(None)` clears it.
/// A `hierarchy` is accepted only when it repeats the current placement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfficeChanges {
    pub name: Option<String>,
    pub external_id: Option<Option<String>>,
    pub opening_date: Option<NaiveDate>,
    pub hierarchy: Option<String>,
    /// Supplied values that could not be decoded into their field type.
    pub rejected: Vec<OfficeValidationError>,
}

impl OfficeChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.external_id.is_none()
            && self.opening_date.is_none()
            && self.hierarchy.is_none()
            && self.rejected.is_empty()
    }

    /// Applies validated changes on top of `current`.
    pub fn apply_to(
        &self,
        current: &Office,
        today: NaiveDate,
    ) -> Result<Office, OfficeValidationError> {
        let mut next = current.clone();
        ensure_decoded(&self.rejected, OfficeField::Name)?;
        if let Some(name) = self.name.as_deref() {
            next.name = normalize_name(Some(name))?;
        }
        ensure_decoded(&self.rejected, OfficeField::ExternalId)?;
        if let Some(external_id) = &self.external_id {
            next.external_id = normalize_external_id(external_id.as_deref())?;
        }
        ensure_decoded(&self.rejected, OfficeField::OpeningDate)?;
        if let Some(opening_date) = self.opening_date {
            ensure_not_in_future(opening_date, today)?;
            next.opening_date = opening_date;
        }
        ensure_decoded(&self.rejected, OfficeField::Hierarchy)?;
        if let Some(requested) = self.hierarchy.as_deref() {
            let requested = parse_hierarchy(Some(requested))?;
            if requested != current.hierarchy {
                return Err(OfficeValidationError::HierarchyCannotChange {
                    current: current.hierarchy.clone(),
                    requested,
                });
            }
        }
        Ok(next)
    }
}

/// Request fields an error can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfficeField {
    Name,
    ExternalId,
    OpeningDate,
    Hierarchy,
}

impl OfficeField {
    /// Wire name of the field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::ExternalId => "externalId",
            Self::OpeningDate => "openingDate",
            Self::Hierarchy => "hierarchy",
        }
    }
}

/// Field-level and placement validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfficeValidationError {
    MissingName,
    /// Name was supplied with a non-text value.
    MalformedName(String),
    NameTooLong { max_chars: usize },
    BlankExternalId,
    MalformedExternalId(String),
    ExternalIdTooLong { max_chars: usize },
    MissingOpeningDate,
    /// Opening date could not be parsed at the request boundary.
    MalformedOpeningDate(String),
    OpeningDateInFuture {
        opening_date: NaiveDate,
        today: NaiveDate,
    },
    OpeningDateBeforeParent {
        opening_date: NaiveDate,
        parent_opening_date: NaiveDate,
    },
    /// Only reachable through updates: a child would open before its parent.
    OpeningDateAfterChild {
        opening_date: NaiveDate,
        child_id: OfficeId,
        child_opening_date: NaiveDate,
    },
    MissingHierarchy,
    MalformedHierarchy(String),
    /// Offices are never re-parented.
    HierarchyCannotChange {
        current: Hierarchy,
        requested: Hierarchy,
    },
    RootAlreadyExists,
    ParentNotFound(OfficeId),
    /// Path prefix does not match the parent's actual placement.
    DanglingHierarchy {
        hierarchy: Hierarchy,
        expected: Hierarchy,
    },
}

impl OfficeValidationError {
    pub fn field(&self) -> OfficeField {
        match self {
            Self::MissingName | Self::MalformedName(_) | Self::NameTooLong { .. } => {
                OfficeField::Name
            }
            Self::BlankExternalId
            | Self::MalformedExternalId(_)
            | Self::ExternalIdTooLong { .. } => OfficeField::ExternalId,
            Self::MissingOpeningDate
            | Self::MalformedOpeningDate(_)
            | Self::OpeningDateInFuture { .. }
            | Self::OpeningDateBeforeParent { .. }
            | Self::OpeningDateAfterChild { .. } => OfficeField::OpeningDate,
            Self::MissingHierarchy
            | Self::MalformedHierarchy(_)
            | Self::HierarchyCannotChange { .. }
            | Self::RootAlreadyExists
            | Self::ParentNotFound(_)
            | Self::DanglingHierarchy { .. } => OfficeField::Hierarchy,
        }
    }

    /// Stable machine-readable reason suffix, e.g. `cannot.be.blank`.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingName
            | Self::BlankExternalId
            | Self::MissingOpeningDate
            | Self::MissingHierarchy => "cannot.be.blank",
            Self::NameTooLong { .. } | Self::ExternalIdTooLong { .. } => {
                "exceeds.max.length"
            }
            Self::MalformedName(_)
            | Self::MalformedExternalId(_)
            | Self::MalformedOpeningDate(_)
            | Self::MalformedHierarchy(_) => "invalid.format",
            Self::HierarchyCannotChange { .. } => "cannot.be.changed",
            Self::OpeningDateInFuture { .. } => "cannot.be.in.future",
            Self::OpeningDateBeforeParent { .. } => "before.parent.opening.date",
            Self::OpeningDateAfterChild { .. } => "after.child.opening.date",
            Self::RootAlreadyExists => "root.already.exists",
            Self::ParentNotFound(_) => "parent.not.found",
            Self::DanglingHierarchy { .. } => "does.not.match.parent",
        }
    }
}

impl Display for OfficeValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "name must not be blank"),
            Self::MalformedName(value) => write!(f, "name `{value}` must be text"),
            Self::NameTooLong { max_chars } => {
                write!(f, "name must not exceed {max_chars} characters")
            }
            Self::BlankExternalId => write!(f, "externalId must not be blank when provided"),
            Self::MalformedExternalId(value) => write!(f, "externalId `{value}` must be text"),
            Self::ExternalIdTooLong { max_chars } => {
                write!(f, "externalId must not exceed {max_chars} characters")
            }
            Self::MissingOpeningDate => write!(f, "openingDate is required"),
            Self::MalformedOpeningDate(value) => {
                write!(f, "openingDate `{value}` is not a valid date")
            }
            Self::OpeningDateInFuture {
                opening_date,
                today,
            } => write!(
                f,
                "openingDate {opening_date} must not be after the current date {today}"
            ),
            Self::OpeningDateBeforeParent {
                opening_date,
                parent_opening_date,
            } => write!(
                f,
                "openingDate {opening_date} must not be before the parent opening date {parent_opening_date}"
            ),
            Self::OpeningDateAfterChild {
                opening_date,
                child_id,
                child_opening_date,
            } => write!(
                f,
                "openingDate {opening_date} must not be after the opening date {child_opening_date} of child office {child_id}"
            ),
            Self::MissingHierarchy => write!(f, "hierarchy is required"),
            Self::MalformedHierarchy(value) => {
                write!(f, "hierarchy `{value}` is not a dotted-integer path")
            }
            Self::HierarchyCannotChange { current, requested } => write!(
                f,
                "hierarchy cannot change from `{current}` to `{requested}`"
            ),
            Self::RootAlreadyExists => write!(f, "a root office already exists"),
            Self::ParentNotFound(id) => write!(f, "parent office not found: {id}"),
            Self::DanglingHierarchy {
                hierarchy,
                expected,
            } => write!(
                f,
                "hierarchy `{hierarchy}` does not match parent placement `{expected}`"
            ),
        }
    }
}

impl Error for OfficeValidationError {}

impl From<HierarchyParseError> for OfficeValidationError {
    fn from(value: HierarchyParseError) -> Self {
        Self::MalformedHierarchy(value.input)
    }
}

fn ensure_decoded(
    rejected: &[OfficeValidationError],
    field: OfficeField,
) -> Result<(), OfficeValidationError> {
    match rejected.iter().find(|err| err.field() == field) {
        Some(err) => Err(err.clone()),
        None => Ok(()),
    }
}

fn normalize_name(value: Option<&str>) -> Result<String, OfficeValidationError> {
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(OfficeValidationError::MissingName);
    }
    if trimmed.chars().count() > NAME_MAX_CHARS {
        return Err(OfficeValidationError::NameTooLong {
            max_chars: NAME_MAX_CHARS,
        });
    }
    Ok(trimmed.to_string())
}

fn normalize_external_id(value: Option<&str>) -> Result<Option<String>, OfficeValidationError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(OfficeValidationError::BlankExternalId);
    }
    if trimmed.chars().count() > EXTERNAL_ID_MAX_CHARS {
        return Err(OfficeValidationError::ExternalIdTooLong {
            max_chars: EXTERNAL_ID_MAX_CHARS,
        });
    }
    Ok(Some(trimmed.to_string()))
}

fn ensure_not_in_future(
    opening_date: NaiveDate,
    today: NaiveDate,
) -> Result<(), OfficeValidationError> {
    if opening_date > today {
        return Err(OfficeValidationError::OpeningDateInFuture {
            opening_date,
            today,
        });
    }
    Ok(())
}

fn parse_hierarchy(value: Option<&str>) -> Result<Hierarchy, OfficeValidationError> {
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(OfficeValidationError::MissingHierarchy);
    }
    Ok(Hierarchy::parse(trimmed)?)
}
