use axum::http::StatusCode;
use std::any::TypeId;
use std::error::Error;
use std::fmt;

/// A failure raised during request processing, tagged with the runtime type
/// of its source error.
///
/// The tag is captured at construction, so rule matching never needs live
/// reflection: the registry's ancestry table plus this `TypeId` is enough to
/// walk the failure's type chain.
pub struct Failure {
    kind: TypeId,
    type_name: &'static str,
    message: Option<String>,
    status: Option<StatusCode>,
    source: Option<Box<dyn Error + Send + Sync>>,
}

/// Tag type for failures built from a bare message or an already type-erased
/// error. Register rules against this type to claim them.
#[derive(Debug)]
pub struct OpaqueFailure(String);

impl fmt::Display for OpaqueFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for OpaqueFailure {}

/// Tag type for failures that carry only a transport-assigned status.
#[derive(Debug)]
struct StatusFailure;

impl fmt::Display for StatusFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("status failure")
    }
}

impl Error for StatusFailure {}

impl Failure {
    /// Wrap a concrete error, capturing its type tag and display message.
    pub fn from_error<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        let message = error.to_string();
        Self {
            kind: TypeId::of::<E>(),
            type_name: std::any::type_name::<E>(),
            message: (!message.is_empty()).then_some(message),
            status: None,
            source: Some(Box::new(error)),
        }
    }

    /// Build an ad-hoc failure from a message, tagged as [`OpaqueFailure`].
    pub fn msg(message: impl Into<String>) -> Self {
        Self::from_error(OpaqueFailure(message.into()))
    }

    /// Build a failure that carries only an HTTP status assigned by the
    /// transport layer (e.g. method-not-allowed before any handler ran).
    pub fn from_status(status: StatusCode) -> Self {
        Self {
            kind: TypeId::of::<StatusFailure>(),
            type_name: std::any::type_name::<StatusFailure>(),
            message: None,
            status: Some(status),
            source: None,
        }
    }

    /// Attach a transport-assigned HTTP status to this failure.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn kind(&self) -> TypeId {
        self.kind
    }

    /// Full path of the source error type, for diagnostics and the catch-all
    /// message fallback.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn source(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Check the failure's type tag.
    pub fn is<E: 'static>(&self) -> bool {
        self.kind == TypeId::of::<E>()
    }

    /// Borrow the source error as a concrete type. Rules use this when the
    /// rendered message needs more than the display output.
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.source.as_deref().and_then(|source| source.downcast_ref::<E>())
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.type_name, message),
            None => f.write_str(self.type_name),
        }
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("type_name", &self.type_name)
            .field("message", &self.message)
            .field("status", &self.status)
            .finish()
    }
}

impl From<anyhow::Error> for Failure {
    fn from(error: anyhow::Error) -> Self {
        let message = error.to_string();
        Self {
            kind: TypeId::of::<OpaqueFailure>(),
            type_name: std::any::type_name::<OpaqueFailure>(),
            message: (!message.is_empty()).then_some(message),
            status: None,
            source: Some(error.into()),
        }
    }
}

impl From<Box<dyn Error + Send + Sync>> for Failure {
    fn from(error: Box<dyn Error + Send + Sync>) -> Self {
        let message = error.to_string();
        Self {
            kind: TypeId::of::<OpaqueFailure>(),
            type_name: std::any::type_name::<OpaqueFailure>(),
            message: (!message.is_empty()).then_some(message),
            status: None,
            source: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct DivisionByZero;

    impl fmt::Display for DivisionByZero {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("/ by zero")
        }
    }

    impl Error for DivisionByZero {}

    #[test]
    fn test_from_error_captures_tag_and_message() {
        let failure = Failure::from_error(DivisionByZero);
        assert!(failure.is::<DivisionByZero>());
        assert_eq!(failure.message(), Some("/ by zero"));
        assert!(failure.status().is_none());
        assert!(failure.downcast_ref::<DivisionByZero>().is_some());
    }

    #[test]
    fn test_msg_is_tagged_opaque() {
        let failure = Failure::msg("boom");
        assert!(failure.is::<OpaqueFailure>());
        assert_eq!(failure.message(), Some("boom"));
    }

    #[test]
    fn test_from_status_carries_status_only() {
        let failure = Failure::from_status(StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(failure.status(), Some(StatusCode::METHOD_NOT_ALLOWED));
        assert!(failure.message().is_none());
        assert!(!failure.is::<OpaqueFailure>());
    }

    #[test]
    fn test_from_anyhow() {
        let failure = Failure::from(anyhow::anyhow!("wrapped"));
        assert!(failure.is::<OpaqueFailure>());
        assert_eq!(failure.message(), Some("wrapped"));
    }
}
