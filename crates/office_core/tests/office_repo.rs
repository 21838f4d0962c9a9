use chrono::NaiveDate;
use office_core::db::open_db_in_memory;
use office_core::{
    Hierarchy, NewOffice, OfficeRepository, RepoError, SqliteOfficeRepository, UniqueKey,
};
use rusqlite::Connection;

fn new_office(name: &str, external_id: Option<&str>, hierarchy: &str) -> NewOffice {
    NewOffice {
        name: name.to_string(),
        external_id: external_id.map(str::to_string),
        opening_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
        hierarchy: Hierarchy::parse(hierarchy).unwrap(),
    }
}

#[test]
fn insert_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOfficeRepository::try_new(&conn).unwrap();

    let inserted = repo
        .insert_office(&new_office("HeadOffice", Some("HO"), "."))
        .unwrap();
    let loaded = repo.get_office(inserted.id).unwrap().unwrap();

    assert_eq!(loaded, inserted);
    assert_eq!(repo.find_by_name("HeadOffice").unwrap(), Some(inserted.clone()));
    assert_eq!(repo.find_by_external_id("HO").unwrap(), Some(inserted.clone()));
    assert_eq!(repo.find_root().unwrap(), Some(inserted));
    assert_eq!(repo.find_by_name("headoffice").unwrap(), None);
    assert_eq!(repo.count_offices().unwrap(), 1);
}

#[test]
fn storage_constraints_surface_as_unique_violations() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOfficeRepository::try_new(&conn).unwrap();
    repo.insert_office(&new_office("HeadOffice", Some("HO"), "."))
        .unwrap();

    let err = repo
        .insert_office(&new_office("HeadOffice", None, ".1."))
        .unwrap_err();
    assert!(matches!(err, RepoError::UniqueViolation(UniqueKey::Name)));

    let err = repo
        .insert_office(&new_office("Branch", Some("HO"), ".1."))
        .unwrap_err();
    assert!(matches!(err, RepoError::UniqueViolation(UniqueKey::ExternalId)));

    let err = repo
        .insert_office(&new_office("Second root", None, "."))
        .unwrap_err();
    assert!(matches!(err, RepoError::UniqueViolation(UniqueKey::Root)));

    assert_eq!(repo.count_offices().unwrap(), 1);
}

#[test]
fn null_external_ids_do_not_collide() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOfficeRepository::try_new(&conn).unwrap();

    repo.insert_office(&new_office("HeadOffice", None, ".")).unwrap();
    repo.insert_office(&new_office("A", None, ".1.")).unwrap();
    repo.insert_office(&new_office("B", None, ".1.")).unwrap();

    assert_eq!(repo.list_children(1).unwrap().len(), 2);
}

#[test]
fn update_missing_office_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOfficeRepository::try_new(&conn).unwrap();
    let mut office = repo
        .insert_office(&new_office("HeadOffice", None, "."))
        .unwrap();
    office.id = 77;

    let err = repo.update_office(&office).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(77)));
}

#[test]
fn try_new_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let err = SqliteOfficeRepository::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn read_rejects_corrupted_rows() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO offices (name, opening_date, hierarchy) VALUES ('HeadOffice', '26/12/1997', '.');",
        [],
    )
    .unwrap();
    let repo = SqliteOfficeRepository::try_new(&conn).unwrap();

    let err = repo.get_office(1).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(ref message) if message.contains("opening_date")));
}
