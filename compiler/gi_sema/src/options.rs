//! Compiler configuration.

/// How to pick between several overloads that all accept the arguments
/// equally well.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OverloadPolicy {
    /// Report an ambiguous reference.
    #[default]
    Strict,
    /// Take the overload declared first.
    FirstDeclared,
}

/// Options threaded through every pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileOptions {
    /// Root-scope type an integer literal gets when nothing else is expected.
    pub default_int_type: String,
    /// Root-scope type a string literal gets when nothing else is expected.
    pub default_str_type: String,
    pub overload_policy: OverloadPolicy,
    /// Subtrees whose flat rendering is shorter than this stay on one line.
    pub max_line_width: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            default_int_type: "i32".to_string(),
            default_str_type: "bytes".to_string(),
            overload_policy: OverloadPolicy::Strict,
            max_line_width: 100,
        }
    }
}

impl CompileOptions {
    #[must_use]
    pub fn with_default_int_type(mut self, name: impl Into<String>) -> Self {
        self.default_int_type = name.into();
        self
    }

    #[must_use]
    pub fn with_default_str_type(mut self, name: impl Into<String>) -> Self {
        self.default_str_type = name.into();
        self
    }

    #[must_use]
    pub fn with_overload_policy(mut self, policy: OverloadPolicy) -> Self {
        self.overload_policy = policy;
        self
    }

    #[must_use]
    pub fn with_max_line_width(mut self, width: usize) -> Self {
        self.max_line_width = width;
        self
    }
}
