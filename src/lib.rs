//! SQL templates that stay runnable as plain SQL.
//!
//! Directives live inside `/*% ... %*/` comments, optionally followed by a sample value that
//! lets the file run as-is in a SQL console. Rendering drops the samples, replaces each
//! directive with a dialect-specific placeholder and collects the bound arguments:
//!
//! ```rust
//! use sql_template::prelude::*;
//!
//! let params = Params::new()
//!     .with("ids", vec![1, 2, 3])
//!     .with("name", "Alex")
//!     .with("order", "name DESC");
//! let (sql, args) = SqlTemplate::new(DialectKind::Postgres).exec(
//!     "SELECT * FROM users WHERE id IN /*% in \"ids\" %*/(1, 2) \
//!      AND name = /*% p \"name\" %*/'Bob' ORDER BY /*% .order %*/id",
//!     &params,
//! )?;
//! assert_eq!(
//!     sql,
//!     "SELECT * FROM users WHERE id IN ($1, $2, $3) AND name = $4 ORDER BY name DESC"
//! );
//! assert_eq!(args.len(), 4);
//! # Ok::<(), SqlTemplateError>(())
//! ```

pub mod binding;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod funcs;
pub mod prelude;
pub mod record;
pub mod resolver;
pub mod sample;
pub mod template;
pub mod types;

pub use binding::{BindingContext, BoundArg, BoundArgs, Clock};
pub use dialect::{Dialect, DialectKind};
pub use engine::{RenderOptions, Rendered, SqlTemplate, render};
pub use error::{ParamError, SqlTemplateError};
pub use funcs::{CustomFn, FuncRegistry, escape_like};
pub use record::{Member, Record};
pub use types::{BindMode, NamedArg, Params, Value};
