#![forbid(unsafe_code)]
//! Wire contract: error codes, request/response DTOs, query-parameter
//! parsing, and the opaque list cursor.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

mod cursor;
mod dto;

pub use cursor::{decode_cursor, encode_cursor, query_hash, CursorError};
pub use dto::{
    ActiveLoanDto, AddBookRequest, BorrowRequest, FeeDto, LoanDto, PatronReportDto,
    PayFeesRequest, PaymentDto, PaymentStatusDto, RefundRequest, ReturnOutcomeDto,
    ReturnRequest,
};

pub const CRATE_NAME: &str = "libris-api";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ApiErrorCode {
    InvalidParameter,
    MissingParameter,
    InvalidCursor,
    NotFound,
    Conflict,
    LimitExceeded,
    PaymentRejected,
    RateLimited,
    NotReady,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Value,
}

impl ApiError {
    #[must_use]
    pub fn invalid_param(name: &str, value: &str) -> Self {
        Self {
            code: ApiErrorCode::InvalidParameter,
            message: format!("invalid parameter: {name}"),
            details: json!({"parameter": name, "value": value}),
        }
    }

    #[must_use]
    pub fn missing_param(name: &str) -> Self {
        Self {
            code: ApiErrorCode::MissingParameter,
            message: format!("missing parameter: {name}"),
            details: json!({"parameter": name}),
        }
    }

    #[must_use]
    pub fn not_found(what: &str) -> Self {
        Self {
            code: ApiErrorCode::NotFound,
            message: format!("{what} not found"),
            details: json!({"resource": what}),
        }
    }
}

#[must_use]
pub fn openapi_v1_spec() -> Value {
    json!({
      "openapi": "3.0.3",
      "info": {
        "title": "libris API",
        "version": "v1"
      },
      "paths": {
        "/healthz": {"get": {"responses": {"200": {"description": "ok"}}}},
        "/readyz": {"get": {"responses": {"200": {"description": "ready"}, "503": {"description": "not ready"}}}},
        "/metrics": {"get": {"responses": {"200": {"description": "request metrics"}}}},
        "/v1/version": {"get": {"responses": {"200": {"description": "build info"}}}},
        "/v1/books": {
          "get": {
            "parameters": [
              {"name": "q", "in": "query", "schema": {"type": "string"}},
              {"name": "by", "in": "query", "schema": {"type": "string", "enum": ["title", "author", "isbn"]}},
              {"name": "limit", "in": "query", "schema": {"type": "integer", "minimum": 1, "maximum": 200}},
              {"name": "cursor", "in": "query", "schema": {"type": "string"}}
            ],
            "responses": {
              "200": {"description": "book page"},
              "304": {"description": "not modified"},
              "400": {"description": "invalid query", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiError"}}}}
            }
          },
          "post": {
            "responses": {
              "200": {"description": "book stored (or already cataloged)"},
              "400": {"description": "invalid book", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiError"}}}},
              "429": {"description": "rate limited", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiError"}}}}
            }
          }
        },
        "/v1/books/{id}": {
          "get": {
            "responses": {
              "200": {"description": "book"},
              "404": {"description": "unknown book", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiError"}}}}
            }
          }
        },
        "/v1/loans": {
          "post": {
            "responses": {
              "200": {"description": "loan created"},
              "400": {"description": "invalid patron or book id"},
              "404": {"description": "unknown book"},
              "409": {"description": "no copies available or loan limit reached"}
            }
          }
        },
        "/v1/loans/return": {
          "post": {
            "responses": {
              "200": {"description": "loan closed; fee reported"},
              "404": {"description": "unknown book"},
              "409": {"description": "no active loan"}
            }
          }
        },
        "/v1/patrons/{patron_id}": {
          "get": {"responses": {"200": {"description": "status report"}, "400": {"description": "invalid patron id"}}}
        },
        "/v1/patrons/{patron_id}/fees": {
          "get": {
            "parameters": [
              {"name": "book_id", "in": "query", "required": true, "schema": {"type": "integer"}}
            ],
            "responses": {"200": {"description": "fee inquiry"}, "400": {"description": "invalid parameters"}}
          }
        },
        "/v1/payments": {
          "post": {
            "responses": {
              "200": {"description": "payment processed"},
              "402": {"description": "payment rejected"},
              "404": {"description": "unknown book"}
            }
          }
        },
        "/v1/payments/refund": {
          "post": {
            "responses": {
              "200": {"description": "refund processed"},
              "400": {"description": "invalid reference or amount"},
              "402": {"description": "refund rejected"}
            }
          }
        },
        "/v1/payments/{txn_id}": {
          "get": {"responses": {"200": {"description": "payment status"}}}
        },
        "/openapi.json": {"get": {"responses": {"200": {"description": "this document"}}}}
      },
      "components": {
        "schemas": {
          "ApiErrorCode": {
            "type": "string",
            "enum": [
              "InvalidParameter",
              "MissingParameter",
              "InvalidCursor",
              "NotFound",
              "Conflict",
              "LimitExceeded",
              "PaymentRejected",
              "RateLimited",
              "NotReady",
              "Internal"
            ]
          },
          "ApiError": {
            "type": "object",
            "required": ["code", "message", "details"],
            "additionalProperties": false,
            "properties": {
              "code": {"$ref": "#/components/schemas/ApiErrorCode"},
              "message": {"type": "string"},
              "details": {"type": "object"}
            }
          }
        }
      }
    })
}

pub mod params {
    use super::ApiError;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ListBooksParams {
        pub q: Option<String>,
        pub by: Option<String>,
        pub limit: usize,
        pub cursor: Option<String>,
        pub pretty: bool,
    }

    pub fn parse_list_books_params(
        query: &BTreeMap<String, String>,
    ) -> Result<ListBooksParams, ApiError> {
        parse_list_books_params_with_limit(query, 50, 200)
    }

    pub fn parse_list_books_params_with_limit(
        query: &BTreeMap<String, String>,
        default_limit: usize,
        max_limit: usize,
    ) -> Result<ListBooksParams, ApiError> {
        let limit = if let Some(raw) = query.get("limit") {
            let value = raw
                .parse::<usize>()
                .map_err(|_| ApiError::invalid_param("limit", raw))?;
            if value == 0 || value > max_limit {
                return Err(ApiError::invalid_param("limit", raw));
            }
            value
        } else {
            default_limit
        };

        Ok(ListBooksParams {
            q: query.get("q").cloned(),
            by: query.get("by").cloned(),
            limit,
            cursor: query.get("cursor").cloned(),
            pretty: query
                .get("pretty")
                .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::params::parse_list_books_params;
    use super::{ApiError, ApiErrorCode};
    use std::collections::BTreeMap;

    #[test]
    fn parse_params_defaults() {
        let q = BTreeMap::new();
        let parsed = parse_list_books_params(&q).expect("params parse");
        assert_eq!(parsed.limit, 50);
        assert!(parsed.q.is_none());
        assert!(!parsed.pretty);
    }

    #[test]
    fn parse_params_accepts_search_and_limit() {
        let mut q = BTreeMap::new();
        q.insert("q".to_string(), "martin".to_string());
        q.insert("by".to_string(), "author".to_string());
        q.insert("limit".to_string(), "25".to_string());
        q.insert("pretty".to_string(), "1".to_string());
        let parsed = parse_list_books_params(&q).expect("params parse");
        assert_eq!(parsed.q.as_deref(), Some("martin"));
        assert_eq!(parsed.by.as_deref(), Some("author"));
        assert_eq!(parsed.limit, 25);
        assert!(parsed.pretty);
    }

    #[test]
    fn parse_params_rejects_bad_limits() {
        for bad in ["0", "nope", "201", "-3"] {
            let mut q = BTreeMap::new();
            q.insert("limit".to_string(), bad.to_string());
            let err = parse_list_books_params(&q).expect_err("limit must be rejected");
            assert_eq!(err.code, ApiErrorCode::InvalidParameter);
        }
    }

    #[test]
    fn api_error_details_schema_stable() {
        let e = ApiError::invalid_param("limit", "nope");
        assert!(e.details.get("parameter").is_some());
        assert!(e.details.get("value").is_some());
        let m = ApiError::missing_param("book_id");
        assert_eq!(m.code, ApiErrorCode::MissingParameter);
    }
}
