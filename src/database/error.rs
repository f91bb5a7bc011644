use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use serde::Serialize;
use serde_json::json;
use warp::{http::StatusCode, reject::Reject};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn finish<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.fields().collect::<Vec<&str>>().join(", ");
        write!(f, "invalid fields: {fields}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Shopping cart is empty")]
    EmptyCart,

    #[error("Unable to log in with provided credentials")]
    InvalidCredentials,

    #[error("Authentication credentials were not provided")]
    NotAuthenticated,

    #[error("Invalid token: {0}")]
    InvalidToken(&'static str),

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::Conflict(_)
            | ApiError::BadRequest(_)
            | ApiError::EmptyCart
            | ApiError::InvalidCredentials => StatusCode::BAD_REQUEST,
            ApiError::NotAuthenticated | ApiError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body sent to the client. Internal details never leave the process.
    pub fn body(&self) -> serde_json::Value {
        match self {
            ApiError::Validation(errors) => json!(errors),
            ApiError::Conflict(_) | ApiError::BadRequest(_) | ApiError::EmptyCart => {
                json!({ "errors": self.to_string() })
            }
            ApiError::Internal(_) => json!({ "detail": "Internal server error" }),
            _ => json!({ "detail": self.to_string() }),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(value: ValidationErrors) -> Self {
        ApiError::Validation(value)
    }
}

impl Reject for ApiError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    UniqueViolation,
    RowNotFound,
    Other,
}

#[derive(Debug)]
pub struct QueryError {
    kind: QueryErrorKind,
    info: String,
}

impl QueryError {
    pub fn new(kind: QueryErrorKind, info: String) -> Self {
        Self { kind, info }
    }

    pub fn kind(&self) -> QueryErrorKind {
        self.kind
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        let other = |info: String| Self::new(QueryErrorKind::Other, info);

        match value {
            sqlx::Error::Database(e) if e.is_unique_violation() => Self::new(
                QueryErrorKind::UniqueViolation,
                e.constraint()
                    .map(|c| format!("Duplicate value violates {c}"))
                    .unwrap_or_else(|| format!("{e}")),
            ),
            sqlx::Error::Database(e) => other(format!("{e}")),
            sqlx::Error::RowNotFound => Self::new(QueryErrorKind::RowNotFound, "RowNotFound".into()),
            sqlx::Error::Configuration(e) => other(format!("{e}")),
            sqlx::Error::Io(e) => other(format!("{e}")),
            sqlx::Error::Tls(e) => other(format!("{e}")),
            sqlx::Error::Protocol(e) => other(e),
            sqlx::Error::TypeNotFound { type_name } => {
                other(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                other(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => other(e),
            sqlx::Error::ColumnDecode { index, source } => {
                other(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => other(format!("{e}")),
            sqlx::Error::PoolTimedOut => other("Pool timed out".into()),
            sqlx::Error::PoolClosed => other("Pool closed".into()),
            sqlx::Error::WorkerCrashed => other("Worker crashed".into()),
            sqlx::Error::Migrate(e) => other(format!("{e}")),
            _ => other("Unknown error".into()),
        }
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info)
    }
}

impl From<QueryError> for ApiError {
    fn from(value: QueryError) -> Self {
        match value.kind {
            QueryErrorKind::UniqueViolation => ApiError::Conflict(value.info),
            QueryErrorKind::RowNotFound => ApiError::NotFound("Not found".into()),
            QueryErrorKind::Other => {
                log::error!("Query failed: {value}");
                ApiError::Internal(value.info)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }

    pub fn info(&self) -> &str {
        &self.info
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info)
    }
}

impl std::error::Error for TypeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_group_messages_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("tags", "Duplicate tag: 1");
        errors.add("name", "This field is required.");
        errors.add("tags", "Tag 9 does not exist");

        assert_eq!(errors.get("tags").map(|m| m.len()), Some(2));
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["name", "tags"]);
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({
                "name": ["This field is required."],
                "tags": ["Duplicate tag: 1", "Tag 9 does not exist"],
            })
        );
    }

    #[test]
    fn finish_passes_value_through_when_clean() {
        assert_eq!(ValidationErrors::new().finish(7), Ok(7));
        assert!(ValidationErrors::single("x", "bad").finish(7).is_err());
    }

    #[test]
    fn statuses_follow_the_error_taxonomy() {
        assert_eq!(
            ApiError::Validation(ValidationErrors::single("name", "x")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Conflict("dup".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::EmptyCart.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotAuthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("Recipe").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_details_are_hidden_from_the_body() {
        let body = ApiError::Internal("password=hunter2".into()).body();
        assert_eq!(body, json!({ "detail": "Internal server error" }));
    }

    #[test]
    fn row_not_found_becomes_not_found() {
        let error: ApiError = QueryError::from(sqlx::Error::RowNotFound).into();
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn api_errors_convert_into_rejections() {
        fn handler() -> Result<(), warp::Rejection> {
            let denied: Result<(), ApiError> = Err(ApiError::Forbidden);
            denied?;
            Ok(())
        }

        let rejection = handler().unwrap_err();
        assert!(matches!(rejection.find::<ApiError>(), Some(ApiError::Forbidden)));
    }

    #[test]
    fn pool_errors_are_internal() {
        let error = QueryError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(error.kind(), QueryErrorKind::Other);
        assert_eq!(error.to_string(), "Pool timed out");
    }
}
