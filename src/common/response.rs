use crate::negotiate::Representation;
use axum::{
    http::{StatusCode as HttpStatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The canonical error payload sent to clients.
///
/// Every resolved failure ends up as one of these. The three-field shape is
/// a stable contract: `code` is always present, `message` serializes as
/// `null` when absent (never skipped), `data` is `null` unless a rule
/// overrides it.
///
/// # Example
/// ```
/// use faultline::common::ApiResult;
///
/// let result = ApiResult::of(400, "boom");
/// assert_eq!(
///     serde_json::to_string(&result).unwrap(),
///     r#"{"code":400,"message":"boom","data":null}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResult {
    pub code: i32,

    pub message: Option<String>,

    pub data: Option<Value>,
}

impl ApiResult {
    /// Create a payload with a code and message, no data.
    pub fn of(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
            data: None,
        }
    }

    /// Create a payload carrying only a code.
    pub fn bare(code: i32) -> Self {
        Self {
            code,
            message: None,
            data: None,
        }
    }

    /// Attach a data payload. Normally unused on error paths.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl fmt::Display for ApiResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ApiResult{{code={}, message={:?}, data={:?}}}",
            self.code, self.message, self.data
        )
    }
}

/// A fully-formed response, ready for the transport layer.
///
/// Either a payload in a 200-style envelope (the default) or a payload under
/// a real HTTP status, in whichever representation was negotiated. Produced
/// fresh per resolved failure, never cached.
#[derive(Debug, Clone)]
pub struct Rendered {
    status: HttpStatusCode,
    representation: Representation,
    result: ApiResult,
}

impl Rendered {
    /// Wrap a payload in the standard 200 envelope, JSON by default.
    pub fn envelope(result: ApiResult) -> Self {
        Self {
            status: HttpStatusCode::OK,
            representation: Representation::Json,
            result,
        }
    }

    pub fn with_status(mut self, status: HttpStatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_representation(mut self, representation: Representation) -> Self {
        self.representation = representation;
        self
    }

    pub fn status(&self) -> HttpStatusCode {
        self.status
    }

    pub fn representation(&self) -> Representation {
        self.representation
    }

    pub fn result(&self) -> &ApiResult {
        &self.result
    }

    /// Serialize the payload in the negotiated representation.
    pub fn body(&self) -> String {
        self.representation.render(&self.result)
    }
}

impl IntoResponse for Rendered {
    fn into_response(self) -> Response {
        let body = self.body();
        (
            self.status,
            [(header::CONTENT_TYPE, self.representation.content_type())],
            body,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_contract_field_order_and_nulls() {
        let result = ApiResult::bare(405);
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"code":405,"message":null,"data":null}"#
        );
    }

    #[test]
    fn test_with_data_round_trips() {
        let result = ApiResult::of(200, "ok").with_data(serde_json::json!({"id": 1}));
        let parsed: ApiResult =
            serde_json::from_str(&serde_json::to_string(&result).unwrap()).unwrap();
        assert_eq!(parsed, result);
    }

    #[test]
    fn test_envelope_defaults() {
        let rendered = Rendered::envelope(ApiResult::of(400, "boom"));
        assert_eq!(rendered.status(), HttpStatusCode::OK);
        assert_eq!(rendered.representation(), Representation::Json);
        assert_eq!(rendered.result().code, 400);
    }

    #[test]
    fn test_into_response_sets_content_type() {
        let response = Rendered::envelope(ApiResult::of(400, "boom"))
            .with_status(HttpStatusCode::BAD_REQUEST)
            .into_response();
        assert_eq!(response.status(), HttpStatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
