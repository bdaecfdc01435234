use gi_ir::{LookupError, Span};

use crate::ErrorCode;

pub type Result<T, E = CompileError> = std::result::Result<T, E>;

/// A fatal compile error.
///
/// `span` is the provenance of the node the error was raised on, or `None`
/// when the failing operation had no node at hand. [`CompileError::at`]
/// fills it in on the way up.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("unresolved name `{name}` in scope `{scope}`")]
    UnresolvedName {
        name: String,
        scope: String,
        span: Option<Span>,
    },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: String,
        span: Option<Span>,
    },

    #[error("ambiguous reference to `{name}`: {reason}")]
    AmbiguousReference {
        name: String,
        reason: String,
        span: Option<Span>,
    },

    #[error("`{name}` is already defined in scope `{scope}`")]
    DuplicateDefinition {
        name: String,
        scope: String,
        span: Option<Span>,
    },

    #[error("type `{ty}` has no member `{member}`")]
    UnimplementedMember {
        ty: String,
        member: String,
        span: Option<Span>,
    },

    #[error("match on `{ty}` does not cover {missing}")]
    NonExhaustiveMatch {
        ty: String,
        missing: String,
        span: Option<Span>,
    },

    #[error("cannot evaluate at compile time: {reason}")]
    ConstEval { reason: String, span: Option<Span> },

    #[error("type `{ty}` contains itself")]
    RecursiveType { ty: String, span: Option<Span> },

    #[error("macro `{name}` expands without terminating")]
    RecursiveMacro { name: String, span: Option<Span> },

    #[error("internal compiler error: {message}")]
    Internal { message: String, span: Option<Span> },
}

impl CompileError {
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>, span: Span) -> Self {
        CompileError::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
            span: Some(span),
        }
    }

    pub fn unimplemented_member(ty: impl Into<String>, member: impl Into<String>, span: Span) -> Self {
        CompileError::UnimplementedMember {
            ty: ty.into(),
            member: member.into(),
            span: Some(span),
        }
    }

    pub fn const_eval(reason: impl Into<String>, span: Span) -> Self {
        CompileError::ConstEval {
            reason: reason.into(),
            span: Some(span),
        }
    }

    pub fn internal(message: impl Into<String>, span: Span) -> Self {
        CompileError::Internal {
            message: message.into(),
            span: Some(span),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            CompileError::UnresolvedName { .. } => ErrorCode::E1001,
            CompileError::AmbiguousReference { .. } => ErrorCode::E1002,
            CompileError::DuplicateDefinition { .. } => ErrorCode::E1003,
            CompileError::TypeMismatch { .. } => ErrorCode::E2001,
            CompileError::UnimplementedMember { .. } => ErrorCode::E2002,
            CompileError::RecursiveType { .. } => ErrorCode::E2003,
            CompileError::NonExhaustiveMatch { .. } => ErrorCode::E3001,
            CompileError::ConstEval { .. } => ErrorCode::E3002,
            CompileError::RecursiveMacro { .. } => ErrorCode::E3003,
            CompileError::Internal { .. } => ErrorCode::E9001,
        }
    }

    pub fn span(&self) -> Option<Span> {
        *self.span_slot()
    }

    fn span_slot(&self) -> &Option<Span> {
        match self {
            CompileError::UnresolvedName { span, .. }
            | CompileError::TypeMismatch { span, .. }
            | CompileError::AmbiguousReference { span, .. }
            | CompileError::DuplicateDefinition { span, .. }
            | CompileError::UnimplementedMember { span, .. }
            | CompileError::NonExhaustiveMatch { span, .. }
            | CompileError::ConstEval { span, .. }
            | CompileError::RecursiveType { span, .. }
            | CompileError::RecursiveMacro { span, .. }
            | CompileError::Internal { span, .. } => span,
        }
    }

    fn span_slot_mut(&mut self) -> &mut Option<Span> {
        match self {
            CompileError::UnresolvedName { span, .. }
            | CompileError::TypeMismatch { span, .. }
            | CompileError::AmbiguousReference { span, .. }
            | CompileError::DuplicateDefinition { span, .. }
            | CompileError::UnimplementedMember { span, .. }
            | CompileError::NonExhaustiveMatch { span, .. }
            | CompileError::ConstEval { span, .. }
            | CompileError::RecursiveType { span, .. }
            | CompileError::RecursiveMacro { span, .. }
            | CompileError::Internal { span, .. } => span,
        }
    }

    /// Attach `span` unless a more precise one is already recorded.
    #[must_use]
    pub fn at(mut self, span: Span) -> Self {
        let slot = self.span_slot_mut();
        if slot.is_none() && !span.is_dummy() {
            *slot = Some(span);
        }
        self
    }

    /// `error[E2001]: message` followed by the location, if known.
    pub fn report(&self) -> String {
        match self.span() {
            Some(span) => format!("error[{}]: {self}\n  --> {span}", self.code()),
            None => format!("error[{}]: {self}", self.code()),
        }
    }
}

impl From<LookupError> for CompileError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::Unresolved { name, scope } => CompileError::UnresolvedName {
                name,
                scope,
                span: None,
            },
            LookupError::Ambiguous { name, scope } => CompileError::AmbiguousReference {
                reason: format!("bound as both a type and a value in scope `{scope}`"),
                name,
                span: None,
            },
            LookupError::Duplicate { name, scope } => CompileError::DuplicateDefinition {
                name,
                scope,
                span: None,
            },
        }
    }
}

/// Attach provenance to a fallible scope operation.
pub trait ResultExt<T> {
    fn at(self, span: Span) -> Result<T>;
}

impl<T, E: Into<CompileError>> ResultExt<T> for std::result::Result<T, E> {
    fn at(self, span: Span) -> Result<T> {
        self.map_err(|err| err.into().at(span))
    }
}
