//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::binding::{BoundArgs, Clock};
pub use crate::dialect::{Dialect, DialectKind};
pub use crate::engine::{RenderOptions, Rendered, SqlTemplate, render};
pub use crate::error::{ParamError, SqlTemplateError};
pub use crate::funcs::{CustomFn, FuncRegistry, escape_like};
pub use crate::record::{Member, Record};
pub use crate::types::{BindMode, NamedArg, Params, Value};
