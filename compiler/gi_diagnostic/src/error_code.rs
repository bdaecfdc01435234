use std::fmt;

/// Error codes for all compiler diagnostics.
///
/// Format: E#### where first digit indicates phase:
/// - E1xxx: Name resolution errors
/// - E2xxx: Type errors
/// - E3xxx: Pattern and compile-time evaluation errors
/// - E9xxx: Internal compiler errors
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Name Resolution Errors (E1xxx)
    /// Name not found in any enclosing scope
    E1001,
    /// Name bound as both a type and a value, or several overloads match
    E1002,
    /// Name registered twice in one scope
    E1003,

    // Type Errors (E2xxx)
    /// Expression type incompatible with its expected type
    E2001,
    /// Attribute or method not found on a type
    E2002,
    /// Type whose representation contains itself
    E2003,

    // Pattern Errors (E3xxx)
    /// Value-producing match does not cover every case
    E3001,
    /// Expression cannot be evaluated at compile time
    E3002,
    /// Macro expansion does not terminate
    E3003,

    // Internal Errors (E9xxx)
    /// A pass observed a node an earlier pass must have eliminated
    E9001,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E1001 => "E1001",
            ErrorCode::E1002 => "E1002",
            ErrorCode::E1003 => "E1003",
            ErrorCode::E2001 => "E2001",
            ErrorCode::E2002 => "E2002",
            ErrorCode::E2003 => "E2003",
            ErrorCode::E3001 => "E3001",
            ErrorCode::E3002 => "E3002",
            ErrorCode::E3003 => "E3003",
            ErrorCode::E9001 => "E9001",
        }
    }

    /// Internal errors indicate a compiler bug rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(self, ErrorCode::E9001)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
