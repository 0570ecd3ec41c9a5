use thiserror::Error;

/// Failure to resolve a (possibly dotted) parameter name.
///
/// Each variant carries the qualified path at which resolution stopped. The `Display` output is
/// also what gets spliced into the rendered SQL as an inline marker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("unknown param: {0}")]
    UnknownParam(String),

    #[error("nil value: {0}")]
    NilValue(String),

    #[error("not struct: {0}")]
    NotStruct(String),

    #[error("invalid method: {0}")]
    InvalidMethod(String),
}

impl ParamError {
    /// Qualified path the error refers to.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            ParamError::UnknownParam(path)
            | ParamError::NilValue(path)
            | ParamError::NotStruct(path)
            | ParamError::InvalidMethod(path) => path,
        }
    }
}

#[derive(Debug, Error)]
pub enum SqlTemplateError {
    /// A resolution failure raised by a custom function.
    #[error(transparent)]
    Param(#[from] ParamError),

    /// One or more directives could not resolve their parameter.
    ///
    /// The partially rendered SQL (with inline error markers) is kept for diagnostics.
    #[error("{}", join_errors(.errors))]
    Unresolved {
        sql: String,
        errors: Vec<ParamError>,
    },

    #[error("prohibited character in {name}: {reason}")]
    ProhibitedCharacter { name: String, reason: String },

    #[error("Template syntax error: {0}")]
    TemplateSyntax(String),

    #[error("Template execution error: {0}")]
    ExecutionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),
}

impl SqlTemplateError {
    /// Partially rendered SQL, when the render got far enough to produce one.
    #[must_use]
    pub fn partial_sql(&self) -> Option<&str> {
        if let SqlTemplateError::Unresolved { sql, .. } = self {
            Some(sql)
        } else {
            None
        }
    }

    /// Resolution errors carried by this error, if any.
    #[must_use]
    pub fn param_errors(&self) -> &[ParamError] {
        match self {
            SqlTemplateError::Unresolved { errors, .. } => errors,
            SqlTemplateError::Param(err) => std::slice::from_ref(err),
            _ => &[],
        }
    }
}

fn join_errors(errors: &[ParamError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
