use chrono::NaiveDate;
use office_core::{
    CreateOfficeRequest, OfficeRegistry, OfficeServiceError, OfficeValidationError,
};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn fixed_today() -> NaiveDate {
    date(2026, 3, 1)
}

fn setup() -> OfficeRegistry {
    OfficeRegistry::open_in_memory()
        .unwrap()
        .with_clock(fixed_today)
}

fn request(name: &str, external_id: Option<&str>, hierarchy: &str) -> CreateOfficeRequest {
    CreateOfficeRequest {
        name: Some(name.to_string()),
        external_id: external_id.map(str::to_string),
        opening_date: Some(date(1997, 12, 26)),
        hierarchy: Some(hierarchy.to_string()),
        rejected: Vec::new(),
    }
}

fn with_head_office() -> OfficeRegistry {
    let registry = setup();
    registry
        .create_office(&request("HeadOffice", Some("HO"), "."))
        .unwrap();
    registry
}

#[test]
fn head_office_gets_first_id() {
    let registry = setup();

    let office = registry
        .create_office(&request("HeadOffice", None, "."))
        .unwrap();

    assert_eq!(office.id, 1);
    assert_eq!(office.name, "HeadOffice");
    assert_eq!(office.opening_date, date(1997, 12, 26));
    assert_eq!(office.hierarchy.to_string(), ".");
    assert_eq!(office.parent_id, None);
    assert_eq!(registry.office_count().unwrap(), 1);
}

#[test]
fn duplicate_name_is_rejected_and_not_persisted() {
    let registry = with_head_office();

    let err = registry
        .create_office(&request("HeadOffice", Some("OTHER"), ".1."))
        .unwrap_err();

    assert!(matches!(err, OfficeServiceError::DuplicateName(ref name) if name == "HeadOffice"));
    assert_eq!(registry.office_count().unwrap(), 1);
}

#[test]
fn duplicate_name_wins_over_root_placement() {
    let registry = with_head_office();

    let err = registry
        .create_office(&request("HeadOffice", None, "."))
        .unwrap_err();

    assert!(matches!(err, OfficeServiceError::DuplicateName(_)));
    assert_eq!(registry.office_count().unwrap(), 1);
}

#[test]
fn name_match_is_case_sensitive() {
    let registry = with_head_office();

    let office = registry
        .create_office(&request("headoffice", None, ".1."))
        .unwrap();

    assert_eq!(office.id, 2);
}

#[test]
fn duplicate_external_id_is_rejected_and_not_persisted() {
    let registry = with_head_office();

    let err = registry
        .create_office(&request("Branch", Some("HO"), ".1."))
        .unwrap_err();

    assert!(matches!(err, OfficeServiceError::DuplicateExternalId(ref id) if id == "HO"));
    assert_eq!(registry.office_count().unwrap(), 1);
}

#[test]
fn name_conflict_is_reported_before_external_id_conflict() {
    let registry = with_head_office();

    let err = registry
        .create_office(&request("HeadOffice", Some("HO"), ".1."))
        .unwrap_err();

    assert!(matches!(err, OfficeServiceError::DuplicateName(_)));
}

#[test]
fn distinct_external_id_without_name_conflict_succeeds() {
    let registry = with_head_office();

    let with_external = registry
        .create_office(&request("Branch A", Some("BR-A"), ".1."))
        .unwrap();
    let without_external = registry
        .create_office(&request("Branch B", None, ".1."))
        .unwrap();
    let also_without_external = registry
        .create_office(&request("Branch C", None, ".1."))
        .unwrap();

    assert_eq!(with_external.external_id.as_deref(), Some("BR-A"));
    assert_eq!(without_external.external_id, None);
    assert_eq!(also_without_external.external_id, None);
    assert_eq!(registry.office_count().unwrap(), 4);
}

#[test]
fn empty_name_is_rejected_and_not_persisted() {
    let registry = setup();

    for name in [None, Some(String::new())] {
        let err = registry
            .create_office(&CreateOfficeRequest {
                name,
                ..request("unused", None, ".")
            })
            .unwrap_err();
        assert!(matches!(
            err,
            OfficeServiceError::Validation(OfficeValidationError::MissingName)
        ));
    }
    assert_eq!(registry.office_count().unwrap(), 0);
}

#[test]
fn future_opening_date_is_rejected() {
    let registry = setup();

    let err = registry
        .create_office(&CreateOfficeRequest {
            opening_date: Some(date(2026, 3, 2)),
            ..request("HeadOffice", None, ".")
        })
        .unwrap_err();

    assert!(matches!(
        err,
        OfficeServiceError::Validation(OfficeValidationError::OpeningDateInFuture { .. })
    ));
    assert_eq!(registry.office_count().unwrap(), 0);
}

#[test]
fn missing_opening_date_is_rejected() {
    let registry = setup();

    let err = registry
        .create_office(&CreateOfficeRequest {
            opening_date: None,
            ..request("HeadOffice", None, ".")
        })
        .unwrap_err();

    assert!(matches!(
        err,
        OfficeServiceError::Validation(OfficeValidationError::MissingOpeningDate)
    ));
}

#[test]
fn ids_keep_increasing_after_rejected_creates() {
    let registry = with_head_office();

    registry
        .create_office(&request("HeadOffice", None, ".1."))
        .unwrap_err();
    let second = registry
        .create_office(&request("Branch", None, ".1."))
        .unwrap();
    let third = registry
        .create_office(&request("Branch 2", None, ".1."))
        .unwrap();

    assert!(second.id > 1);
    assert!(third.id > second.id);
}

#[test]
fn lookups_by_id_and_external_id() {
    let registry = with_head_office();

    let by_id = registry.get_office(1).unwrap();
    let by_external = registry.get_office_by_external_id("HO").unwrap();
    assert_eq!(by_id, by_external);

    assert!(matches!(
        registry.get_office(99),
        Err(OfficeServiceError::NotFound(_))
    ));
    let err = registry.get_office_by_external_id("missing").unwrap_err();
    assert!(matches!(err, OfficeServiceError::NotFound(_)));
    assert!(err.to_string().contains("missing"));
}
