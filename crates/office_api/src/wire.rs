//! Wire payloads for office requests.
//!
//! # Responsibility
//! - Deserialize office JSON payloads leniently so bad or missing fields
//!   surface as field-level validation errors.
//! - Parse `openingDate` from ISO strings, `dateFormat` patterns, or
//!   `[year, month, day]` arrays.
//!
//! # Invariants
//! - JSON `null`, absent and `""` opening dates all mean "missing".
//! - A value of the wrong JSON type, or an unparseable date, is carried to
//!   validation as an `invalid.format` error for its field, never dropped.

use chrono::NaiveDate;
use office_core::{CreateOfficeRequest, OfficeChanges, OfficeValidationError};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Office create/update payload as sent by callers.
///
/// Fields stay untyped until decoding so that a type mismatch is reported
/// against the field instead of failing the whole body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficePayload {
    pub name: Option<Value>,
    /// Absent: `None`. Explicit `null`: `Some(Value::Null)`.
    #[serde(default, deserialize_with = "present_or_null")]
    pub external_id: Option<Value>,
    pub opening_date: Option<Value>,
    pub hierarchy: Option<Value>,
    /// Alias accepted for `hierarchy`.
    pub parent_hierarchy: Option<Value>,
    /// Java-style pattern for textual `openingDate`, e.g. `dd MMMM yyyy`.
    pub date_format: Option<Value>,
    /// Accepted for compatibility; month names are parsed in English.
    pub locale: Option<Value>,
}

impl OfficePayload {
    /// Parses a JSON document into a payload.
    ///
    /// Fails only for documents that are not a JSON object.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// Builds a create request; decode failures travel in `rejected`.
    pub fn into_create_request(self) -> CreateOfficeRequest {
        let mut rejected = Vec::new();
        let name = text_field(self.name, OfficeValidationError::MalformedName, &mut rejected);
        let external_id = external_id_field(self.external_id, &mut rejected).flatten();
        let opening_date = decode_opening_date(
            self.opening_date.as_ref(),
            self.date_format.as_ref(),
            &mut rejected,
        );
        let hierarchy = text_field(
            placement(self.hierarchy, self.parent_hierarchy),
            OfficeValidationError::MalformedHierarchy,
            &mut rejected,
        );
        CreateOfficeRequest {
            name,
            external_id,
            opening_date,
            hierarchy,
            rejected,
        }
    }

    /// Builds partial changes for an update.
    ///
    /// A supplied `hierarchy` is passed through so that validation can
    /// reject any attempt to move the office.
    pub fn into_changes(self) -> OfficeChanges {
        let mut rejected = Vec::new();
        let name = text_field(self.name, OfficeValidationError::MalformedName, &mut rejected);
        let external_id = external_id_field(self.external_id, &mut rejected);
        let opening_date = decode_opening_date(
            self.opening_date.as_ref(),
            self.date_format.as_ref(),
            &mut rejected,
        );
        let hierarchy = text_field(
            placement(self.hierarchy, self.parent_hierarchy),
            OfficeValidationError::MalformedHierarchy,
            &mut rejected,
        );
        OfficeChanges {
            name,
            external_id,
            opening_date,
            hierarchy,
            rejected,
        }
    }
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// `hierarchy` wins over `parentHierarchy` unless it is absent or null.
fn placement(hierarchy: Option<Value>, parent_hierarchy: Option<Value>) -> Option<Value> {
    match hierarchy {
        None | Some(Value::Null) => parent_hierarchy,
        supplied => supplied,
    }
}

fn text_field(
    value: Option<Value>,
    malformed: fn(String) -> OfficeValidationError,
    rejected: &mut Vec<OfficeValidationError>,
) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => {
            rejected.push(malformed(other.to_string()));
            None
        }
    }
}

/// `None` when absent, `Some(None)` for explicit `null`.
fn external_id_field(
    value: Option<Value>,
    rejected: &mut Vec<OfficeValidationError>,
) -> Option<Option<String>> {
    match value {
        None => None,
        Some(Value::Null) => Some(None),
        Some(Value::String(text)) => Some(Some(text)),
        Some(other) => {
            rejected.push(OfficeValidationError::MalformedExternalId(other.to_string()));
            None
        }
    }
}

fn decode_opening_date(
    value: Option<&Value>,
    date_format: Option<&Value>,
    rejected: &mut Vec<OfficeValidationError>,
) -> Option<NaiveDate> {
    match parse_opening_date(value, date_format) {
        Ok(opening_date) => opening_date,
        Err(err) => {
            rejected.push(err);
            None
        }
    }
}

fn parse_opening_date(
    value: Option<&Value>,
    date_format: Option<&Value>,
) -> Result<Option<NaiveDate>, OfficeValidationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
        Some(Value::String(text)) => {
            let date_format = match date_format {
                None | Some(Value::Null) => None,
                Some(Value::String(pattern)) => Some(pattern.as_str()),
                Some(_) => {
                    return Err(OfficeValidationError::MalformedOpeningDate(text.clone()))
                }
            };
            parse_date_text(text.trim(), date_format).map(Some)
        }
        Some(Value::Array(parts)) => parse_date_parts(parts).map(Some),
        Some(other) => Err(OfficeValidationError::MalformedOpeningDate(
            other.to_string(),
        )),
    }
}

fn parse_date_text(text: &str, date_format: Option<&str>) -> Result<NaiveDate, OfficeValidationError> {
    let malformed = || OfficeValidationError::MalformedOpeningDate(text.to_string());
    let pattern = match date_format.map(str::trim).filter(|value| !value.is_empty()) {
        Some(java_pattern) => translate_java_pattern(java_pattern).ok_or_else(malformed)?,
        None => ISO_DATE_FORMAT.to_string(),
    };
    NaiveDate::parse_from_str(text, &pattern).map_err(|_| malformed())
}

fn parse_date_parts(parts: &[Value]) -> Result<NaiveDate, OfficeValidationError> {
    let malformed = || OfficeValidationError::MalformedOpeningDate(Value::from(parts.to_vec()).to_string());
    let [year, month, day] = parts else {
        return Err(malformed());
    };
    let year = year.as_i64().and_then(|value| i32::try_from(value).ok());
    let month = month.as_u64().and_then(|value| u32::try_from(value).ok());
    let day = day.as_u64().and_then(|value| u32::try_from(value).ok());
    match (year, month, day) {
        (Some(year), Some(month), Some(day)) => {
            NaiveDate::from_ymd_opt(year, month, day).ok_or_else(malformed)
        }
        _ => Err(malformed()),
    }
}

/// Translates the subset of Java `SimpleDateFormat` tokens used for dates
/// into a chrono format string. Returns `None` for unsupported tokens.
fn translate_java_pattern(pattern: &str) -> Option<String> {
    let chars = pattern.chars().collect::<Vec<_>>();
    let mut out = String::new();
    let mut index = 0;
    while index < chars.len() {
        let current = chars[index];
        let run = chars[index..]
            .iter()
            .take_while(|candidate| **candidate == current)
            .count();
        index += run;

        if !current.is_ascii_alphabetic() {
            for _ in 0..run {
                match current {
                    '%' => out.push_str("%%"),
                    other => out.push(other),
                }
            }
            continue;
        }

        let token = match (current, run) {
            ('y', 4) => "%Y",
            ('y', 2) => "%y",
            ('M', 4) => "%B",
            ('M', 3) => "%b",
            ('M', 1 | 2) => "%m",
            ('d', 1 | 2) => "%d",
            _ => return None,
        };
        out.push_str(token);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::{translate_java_pattern, OfficePayload};
    use chrono::NaiveDate;
    use office_core::{OfficeField, OfficeValidationError};
    use serde_json::json;

    fn payload(value: serde_json::Value) -> OfficePayload {
        serde_json::from_value(value).unwrap()
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn translates_common_java_patterns() {
        assert_eq!(translate_java_pattern("dd MMMM yyyy").unwrap(), "%d %B %Y");
        assert_eq!(translate_java_pattern("yyyy-MM-dd").unwrap(), "%Y-%m-%d");
        assert_eq!(translate_java_pattern("d/M/yy").unwrap(), "%d/%m/%y");
        assert!(translate_java_pattern("dd HH:mm").is_none());
    }

    #[test]
    fn opening_date_accepts_iso_array_and_pattern_forms() {
        let iso = payload(json!({ "openingDate": "1997-12-26" })).into_create_request();
        assert_eq!(iso.opening_date, Some(date(1997, 12, 26)));
        assert!(iso.rejected.is_empty());

        let parts = payload(json!({ "openingDate": [1997, 12, 26] })).into_create_request();
        assert_eq!(parts.opening_date, Some(date(1997, 12, 26)));

        let patterned = payload(json!({
            "openingDate": "26 December 1997",
            "dateFormat": "dd MMMM yyyy",
            "locale": "en"
        }))
        .into_create_request();
        assert_eq!(patterned.opening_date, Some(date(1997, 12, 26)));
    }

    #[test]
    fn blank_or_null_opening_date_is_missing() {
        for value in [json!({}), json!({ "openingDate": null }), json!({ "openingDate": " " })] {
            let request = payload(value).into_create_request();
            assert_eq!(request.opening_date, None);
            assert!(request.rejected.is_empty());
        }
    }

    #[test]
    fn malformed_opening_dates_are_carried_as_rejected() {
        for value in [
            json!({ "openingDate": "26/12/1997" }),
            json!({ "openingDate": [1997, 26, 12] }),
            json!({ "openingDate": [1997, 12] }),
            json!({ "openingDate": 19971226 }),
            json!({ "openingDate": "26 Dec 1997", "dateFormat": "dd HH yyyy" }),
            json!({ "openingDate": "26 Dec 1997", "dateFormat": 7 }),
        ] {
            let request = payload(value).into_create_request();
            assert_eq!(request.opening_date, None);
            assert!(matches!(
                request.rejected.as_slice(),
                [OfficeValidationError::MalformedOpeningDate(_)]
            ));
        }
    }

    #[test]
    fn non_text_values_are_rejected_per_field() {
        let request = payload(json!({
            "name": 5,
            "externalId": ["HO"],
            "openingDate": "1997-12-26",
            "hierarchy": { "path": "." }
        }))
        .into_create_request();

        assert_eq!(request.name, None);
        assert_eq!(request.external_id, None);
        let fields = request
            .rejected
            .iter()
            .map(OfficeValidationError::field)
            .collect::<Vec<_>>();
        assert_eq!(
            fields,
            [OfficeField::Name, OfficeField::ExternalId, OfficeField::Hierarchy]
        );
        assert_eq!(
            request.rejected[0],
            OfficeValidationError::MalformedName("5".to_string())
        );
    }

    #[test]
    fn parent_hierarchy_is_an_alias_for_hierarchy() {
        let request = payload(json!({ "parentHierarchy": ".1." })).into_create_request();
        assert_eq!(request.hierarchy.as_deref(), Some(".1."));

        let request =
            payload(json!({ "hierarchy": ".", "parentHierarchy": ".1." })).into_create_request();
        assert_eq!(request.hierarchy.as_deref(), Some("."));
    }

    #[test]
    fn external_id_distinguishes_absent_from_null() {
        assert_eq!(payload(json!({})).into_changes().external_id, None);
        assert_eq!(
            payload(json!({ "externalId": null })).into_changes().external_id,
            Some(None)
        );
        assert_eq!(
            payload(json!({ "externalId": "EXT" }))
                .into_create_request()
                .external_id
                .as_deref(),
            Some("EXT")
        );
    }

    #[test]
    fn changes_keep_a_supplied_hierarchy() {
        let changes = payload(json!({ "parentHierarchy": ".1.2." })).into_changes();
        assert_eq!(changes.hierarchy.as_deref(), Some(".1.2."));
        assert!(!changes.is_empty());
    }
}
