//! Request and configuration error types.

use thiserror::Error;

use crate::responses::ExceptionResponse;

/// Errors surfaced by request normalization, query execution and
/// configuration loading.
///
/// Every validation variant renders the offending query parameter name
/// in its message so clients can locate the problem.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EdrError {
    /// CRS URI not in the collection's allowed list.
    #[error("parameter '{parameter}': CRS '{value}' is not supported, valid values are: {allowed}")]
    InvalidCrs {
        parameter: String,
        value: String,
        allowed: String,
    },

    #[error("parameter 'bbox': {0}")]
    InvalidBbox(String),

    #[error("parameter 'coords': {0}")]
    InvalidCoordsWkt(String),

    /// M/Z-valued WKT combined with an explicit datetime/z parameter.
    #[error("parameter '{parameter}': {detail}")]
    ConflictingTemporalOrVerticalSpec { parameter: String, detail: String },

    #[error("parameter 'datetime': {0}")]
    InvalidDatetime(String),

    #[error("parameter 'z': {0}")]
    InvalidZ(String),

    #[error("parameter 'parameter-name': {0}")]
    InvalidParameterName(String),

    /// Unit not declared by the query archetype.
    #[error("parameter '{parameter}': unit '{value}' is not supported, valid values are: {allowed}")]
    InvalidUnit {
        parameter: String,
        value: String,
        allowed: String,
    },

    #[error("parameter '{parameter}': {detail}")]
    NaNConversionResult { parameter: String, detail: String },

    /// Any other malformed value (output format, pagination, ...).
    #[error("parameter '{parameter}': {detail}")]
    InvalidParameterValue { parameter: String, detail: String },

    #[error("parameter '{0}': missing required query parameter")]
    MissingParameter(String),

    #[error("parameter '{0}': unexpected query parameter")]
    UnexpectedQueryParameter(String),

    #[error("collection {collection} does not support {query_type}")]
    UnsupportedArchetype {
        collection: String,
        query_type: String,
    },

    #[error("no such collection: {0}")]
    CollectionNotFound(String),

    #[error("no such instance: {0}")]
    InstanceNotFound(String),

    #[error("no such location: {0}")]
    LocationNotFound(String),

    #[error("no such item: {0}")]
    ItemNotFound(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EdrError {
    /// The query parameter the error is attributed to, if any.
    pub fn parameter(&self) -> Option<&str> {
        match self {
            EdrError::InvalidCrs { parameter, .. }
            | EdrError::ConflictingTemporalOrVerticalSpec { parameter, .. }
            | EdrError::InvalidUnit { parameter, .. }
            | EdrError::NaNConversionResult { parameter, .. }
            | EdrError::InvalidParameterValue { parameter, .. } => Some(parameter),
            EdrError::MissingParameter(p) | EdrError::UnexpectedQueryParameter(p) => Some(p),
            EdrError::InvalidBbox(_) => Some("bbox"),
            EdrError::InvalidCoordsWkt(_) => Some("coords"),
            EdrError::InvalidDatetime(_) => Some("datetime"),
            EdrError::InvalidZ(_) => Some("z"),
            EdrError::InvalidParameterName(_) => Some("parameter-name"),
            _ => None,
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            EdrError::UnsupportedArchetype { .. }
            | EdrError::CollectionNotFound(_)
            | EdrError::InstanceNotFound(_)
            | EdrError::LocationNotFound(_)
            | EdrError::ItemNotFound(_) => 404,
            EdrError::InvalidConfiguration(_) | EdrError::Internal(_) => 500,
            _ => 400,
        }
    }

    /// Convert to an ExceptionResponse.
    pub fn to_exception(&self) -> ExceptionResponse {
        match self.status_code() {
            404 => ExceptionResponse::not_found(self.to_string()),
            500 => ExceptionResponse::internal_error(self.to_string()),
            _ => ExceptionResponse::bad_request(self.to_string()),
        }
    }

    /// Shorthand for an invalid value of a named parameter.
    pub fn invalid_value(parameter: &str, detail: impl Into<String>) -> Self {
        EdrError::InvalidParameterValue {
            parameter: parameter.to_string(),
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(EdrError::CollectionNotFound("x".into()).status_code(), 404);
        assert_eq!(EdrError::InstanceNotFound("x".into()).status_code(), 404);
        assert_eq!(EdrError::LocationNotFound("x".into()).status_code(), 404);
        assert_eq!(EdrError::ItemNotFound("x".into()).status_code(), 404);
        assert_eq!(
            EdrError::UnsupportedArchetype {
                collection: "mountains".into(),
                query_type: "radius".into()
            }
            .status_code(),
            404
        );
        assert_eq!(EdrError::InvalidZ("x".into()).status_code(), 400);
        assert_eq!(EdrError::UnexpectedQueryParameter("foo".into()).status_code(), 400);
        assert_eq!(EdrError::Internal("x".into()).status_code(), 500);
    }

    #[test]
    fn test_invalid_crs_names_parameter() {
        let err = EdrError::InvalidCrs {
            parameter: "crs".into(),
            value: "foo".into(),
            allowed: "CRS84".into(),
        };
        assert_eq!(err.parameter(), Some("crs"));
        assert_eq!(err.status_code(), 400);

        let exc = err.to_exception();
        assert_eq!(exc.status, Some(400));
        assert!(exc.detail.unwrap().contains("parameter 'crs'"));
    }

    #[test]
    fn test_parameter_attribution() {
        assert_eq!(EdrError::InvalidCoordsWkt("x".into()).parameter(), Some("coords"));
        assert_eq!(EdrError::InvalidDatetime("x".into()).parameter(), Some("datetime"));
        assert_eq!(
            EdrError::InvalidParameterName("x".into()).parameter(),
            Some("parameter-name")
        );
        assert_eq!(EdrError::MissingParameter("coords".into()).parameter(), Some("coords"));
        assert_eq!(EdrError::CollectionNotFound("x".into()).parameter(), None);
    }

    #[test]
    fn test_not_found_exception() {
        let exc = EdrError::CollectionNotFound("missing-collection".into()).to_exception();
        assert_eq!(exc.status, Some(404));
        assert!(exc.type_.ends_with("not-found"));
        assert!(exc.detail.unwrap().contains("missing-collection"));
    }

    #[test]
    fn test_unsupported_archetype_message() {
        let err = EdrError::UnsupportedArchetype {
            collection: "mountains".into(),
            query_type: "radius".into(),
        };
        assert_eq!(err.to_string(), "collection mountains does not support radius");
    }
}
