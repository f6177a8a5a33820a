//! Error subjects and the typed-error capability
//!
//! Fingerprinting needs to know whether an error carries a stable type
//! identity. Rather than inspecting types at runtime, callers opt in by
//! implementing [`TypedError`]; everything else is reported as a builtin
//! error and grouped by a hash of its message.

use std::borrow::Cow;
use std::error::Error;

/// An error type that exposes a stable identity for grouping
///
/// The default identity is the fully qualified Rust type name, e.g.
/// `my_service::db::ConnectionLost`. Two values of the same typed error are
/// grouped together regardless of their messages.
pub trait TypedError: Error {
    /// Stable identity used as the fingerprint
    fn type_identity(&self) -> Cow<'static, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }
}

/// The error subject of a report
#[derive(Clone, Copy)]
pub enum ReportedError<'a> {
    /// An error without a stable type identity, grouped by message hash
    Builtin(&'a (dyn Error + 'static)),
    /// An error that exposes its type identity
    Typed {
        /// The error itself
        error: &'a (dyn Error + 'static),
        /// Identity returned by [`TypedError::type_identity`]
        identity: &'a dyn TypedError,
    },
}

impl<'a> ReportedError<'a> {
    /// Wraps any error as a builtin (message-hashed) subject
    pub fn builtin(error: &'a (dyn Error + 'static)) -> Self {
        ReportedError::Builtin(error)
    }

    /// Wraps a typed error
    pub fn typed<E: TypedError + 'static>(error: &'a E) -> Self {
        ReportedError::Typed {
            error,
            identity: error,
        }
    }

    /// The underlying error
    pub fn as_error(&self) -> &'a (dyn Error + 'static) {
        match *self {
            ReportedError::Builtin(error) => error,
            ReportedError::Typed { error, .. } => error,
        }
    }

    /// Type identity, for typed errors
    pub fn type_identity(&self) -> Option<Cow<'static, str>> {
        match self {
            ReportedError::Builtin(_) => None,
            ReportedError::Typed { identity, .. } => Some(identity.type_identity()),
        }
    }

    /// Display text of the error's `source()` chain, outermost first
    pub fn source_chain(&self) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = self.as_error().source();
        while let Some(source) = current {
            chain.push(source.to_string());
            current = source.source();
        }
        chain
    }
}

impl std::fmt::Debug for ReportedError<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportedError::Builtin(error) => f.debug_tuple("Builtin").field(error).finish(),
            ReportedError::Typed { error, identity } => f
                .debug_struct("Typed")
                .field("identity", &identity.type_identity())
                .field("error", error)
                .finish(),
        }
    }
}

impl<'a, E: TypedError + 'static> From<&'a E> for ReportedError<'a> {
    fn from(error: &'a E) -> Self {
        ReportedError::typed(error)
    }
}

impl<'a> From<&'a std::io::Error> for ReportedError<'a> {
    fn from(error: &'a std::io::Error) -> Self {
        ReportedError::Builtin(error)
    }
}

impl<'a> From<&'a anyhow::Error> for ReportedError<'a> {
    fn from(error: &'a anyhow::Error) -> Self {
        let inner: &'a (dyn Error + Send + Sync + 'static) = error.as_ref();
        ReportedError::Builtin(inner)
    }
}
