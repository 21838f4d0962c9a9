//! Office request boundary.
//!
//! # Responsibility
//! - Turn authenticated requests into registry calls.
//! - Map typed registry outcomes onto HTTP status codes and error bodies.
//!
//! # Invariants
//! - Handlers never panic; every outcome becomes an `ApiResponse`.
//! - Storage failure details stay in logs and never reach the response body.
//! - Each request logs one `event=api_request` line keyed by `request_id`.

use crate::auth::{AuthError, RequestContext};
use crate::wire::OfficePayload;
use http::StatusCode;
use log::{info, warn};
use office_core::registry::error_code;
use office_core::{
    OfficeId, OfficeLookup, OfficeRegistry, OfficeResult, OfficeServiceError,
    OfficeValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

const VALIDATION_ERRORS_EXIST: &str = "validation.msg.validation.errors.exist";
const DUPLICATE_NAME: &str = "error.msg.office.duplicate.name";
const DUPLICATE_EXTERNAL_ID: &str = "error.msg.office.duplicate.externalId";
const OFFICE_ID_INVALID: &str = "error.msg.office.id.invalid";
const OFFICE_EXTERNAL_ID_INVALID: &str = "error.msg.office.externalId.invalid";
const NOT_AUTHENTICATED: &str = "error.msg.not.authenticated";
const INVALID_REQUEST_BODY: &str = "error.msg.invalid.request.body";
const SERVER_SIDE_ERROR: &str = "error.msg.platform.server.side.error";

/// Status code plus JSON body produced by one handler call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    fn failure(error: ApiErrorBody) -> Self {
        let status = StatusCode::from_u16(error.http_status_code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::to_value(&error).unwrap_or_else(|_| {
            json!({
                "httpStatusCode": status.as_u16(),
                "userMessageGlobalisationCode": SERVER_SIDE_ERROR,
            })
        });
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Error body returned for every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    pub http_status_code: u16,
    pub user_message_globalisation_code: String,
    pub default_user_message: String,
    pub errors: Vec<ApiParameterError>,
}

/// One offending request parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiParameterError {
    pub parameter_name: String,
    pub user_message_globalisation_code: String,
    pub default_user_message: String,
}

impl ApiErrorBody {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            http_status_code: status.as_u16(),
            user_message_globalisation_code: code.to_string(),
            default_user_message: message.into(),
            errors: Vec::new(),
        }
    }

    fn with_parameter(mut self, parameter_name: &str, code: String, message: String) -> Self {
        self.errors.push(ApiParameterError {
            parameter_name: parameter_name.to_string(),
            user_message_globalisation_code: code,
            default_user_message: message,
        });
        self
    }
}

/// Office endpoints over a shared registry.
#[derive(Clone)]
pub struct OfficeApi {
    registry: Arc<OfficeRegistry>,
}

impl OfficeApi {
    pub fn new(registry: Arc<OfficeRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &OfficeRegistry {
        &self.registry
    }

    /// `POST /offices`: returns `{"officeId", "resourceId"}` on success.
    pub fn create_office(&self, authorization: Option<&str>, body: &str) -> ApiResponse {
        self.handle("create_office", authorization, |registry| {
            let request = OfficePayload::from_json(body)
                .map_err(|err| malformed_body(&err))?
                .into_create_request();
            let office = registry.create_office(&request).map_err(service_failure)?;
            Ok(resource_created(office.id))
        })
    }

    /// `PUT /offices/{id}`: partial update of name, externalId or openingDate.
    /// A `hierarchy` other than the current one is rejected.
    pub fn update_office(
        &self,
        authorization: Option<&str>,
        id: OfficeId,
        body: &str,
    ) -> ApiResponse {
        self.handle("update_office", authorization, |registry| {
            let changes = OfficePayload::from_json(body)
                .map_err(|err| malformed_body(&err))?
                .into_changes();
            let office = registry.update_office(id, &changes).map_err(service_failure)?;
            Ok(resource_created(office.id))
        })
    }

    /// `GET /offices/{id}`.
    pub fn get_office(&self, authorization: Option<&str>, id: OfficeId) -> ApiResponse {
        self.handle("get_office", authorization, |registry| {
            office_body(registry.get_office(id))
        })
    }

    /// `GET /offices/external-id/{externalId}`.
    pub fn get_office_by_external_id(
        &self,
        authorization: Option<&str>,
        external_id: &str,
    ) -> ApiResponse {
        self.handle("get_office_by_external_id", authorization, |registry| {
            office_body(registry.get_office_by_external_id(external_id))
        })
    }

    /// `GET /offices`: depth-first listing of every office.
    pub fn list_offices(&self, authorization: Option<&str>) -> ApiResponse {
        self.handle("list_offices", authorization, |registry| {
            office_body(registry.list_offices())
        })
    }

    /// `GET /offices/{id}/children`.
    pub fn list_children(&self, authorization: Option<&str>, id: OfficeId) -> ApiResponse {
        self.handle("list_children", authorization, |registry| {
            office_body(registry.list_children(id))
        })
    }

    /// `GET /offices/count`: returns `{"count": n}`.
    pub fn office_count(&self, authorization: Option<&str>) -> ApiResponse {
        self.handle("office_count", authorization, |registry| {
            office_body(registry.office_count().map(|count| json!({ "count": count })))
        })
    }

    fn handle(
        &self,
        operation: &str,
        authorization: Option<&str>,
        op: impl FnOnce(&OfficeRegistry) -> Result<ApiResponse, ApiErrorBody>,
    ) -> ApiResponse {
        let started_at = Instant::now();
        let context = match RequestContext::from_authorization(authorization) {
            Ok(context) => context,
            Err(err) => {
                let response = ApiResponse::failure(unauthenticated(&err));
                warn!(
                    "event=api_request module=api op={operation} status=rejected http_status={} error_code=unauthenticated",
                    response.status.as_u16()
                );
                return response;
            }
        };

        let response = op(self.registry.as_ref()).unwrap_or_else(ApiResponse::failure);
        info!(
            "event=api_request module=api op={operation} request_id={} auth_scheme={} status={} http_status={} duration_ms={}",
            context.request_id,
            context.scheme.as_str(),
            if response.is_success() { "ok" } else { "rejected" },
            response.status.as_u16(),
            started_at.elapsed().as_millis()
        );
        response
    }
}

fn resource_created(id: OfficeId) -> ApiResponse {
    ApiResponse::ok(json!({ "officeId": id, "resourceId": id }))
}

fn office_body<T: Serialize>(result: OfficeResult<T>) -> Result<ApiResponse, ApiErrorBody> {
    let value = result.map_err(service_failure)?;
    serde_json::to_value(&value)
        .map(ApiResponse::ok)
        .map_err(|err| {
            warn!("event=api_encode module=api status=error error={err}");
            server_error()
        })
}

fn service_failure(err: OfficeServiceError) -> ApiErrorBody {
    match err {
        OfficeServiceError::Validation(validation) => validation_failure(validation),
        OfficeServiceError::DuplicateName(name) => duplicate(
            StatusCode::BAD_REQUEST,
            DUPLICATE_NAME,
            "name",
            format!("Office with name `{name}` already exists"),
        ),
        OfficeServiceError::DuplicateExternalId(external_id) => duplicate(
            StatusCode::CONFLICT,
            DUPLICATE_EXTERNAL_ID,
            "externalId",
            format!("Office with externalId `{external_id}` already exists"),
        ),
        OfficeServiceError::NotFound(lookup) => {
            let code = match lookup {
                OfficeLookup::Id(_) => OFFICE_ID_INVALID,
                OfficeLookup::ExternalId(_) => OFFICE_EXTERNAL_ID_INVALID,
            };
            ApiErrorBody::new(
                StatusCode::NOT_FOUND,
                code,
                format!("Office with {lookup} does not exist"),
            )
        }
        OfficeServiceError::Repo(_) => {
            warn!(
                "event=api_request module=api status=error error_code={} error={err}",
                error_code(&err)
            );
            server_error()
        }
    }
}

fn duplicate(status: StatusCode, code: &str, parameter_name: &str, message: String) -> ApiErrorBody {
    ApiErrorBody::new(status, code, message.clone()).with_parameter(
        parameter_name,
        code.to_string(),
        message,
    )
}

fn validation_failure(err: OfficeValidationError) -> ApiErrorBody {
    let field = err.field().as_str();
    ApiErrorBody::new(
        StatusCode::BAD_REQUEST,
        VALIDATION_ERRORS_EXIST,
        "Validation errors exist.",
    )
    .with_parameter(
        field,
        format!("validation.msg.office.{field}.{}", err.reason()),
        err.to_string(),
    )
}

fn malformed_body(err: &serde_json::Error) -> ApiErrorBody {
    ApiErrorBody::new(
        StatusCode::BAD_REQUEST,
        INVALID_REQUEST_BODY,
        format!("Request body is not a valid office payload: {err}"),
    )
}

fn unauthenticated(err: &AuthError) -> ApiErrorBody {
    ApiErrorBody::new(StatusCode::UNAUTHORIZED, NOT_AUTHENTICATED, err.to_string())
}

fn server_error() -> ApiErrorBody {
    ApiErrorBody::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        SERVER_SIDE_ERROR,
        "An internal error occurred while processing the request.",
    )
}
