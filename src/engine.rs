//! Render pipeline and the long-lived [`SqlTemplate`] builder.

use std::sync::Arc;

use crate::binding::{BindingContext, BoundArg, BoundArgs, Clock};
use crate::dialect::Dialect;
use crate::error::SqlTemplateError;
use crate::funcs::{CustomFn, FuncRegistry, Library};
use crate::sample::strip_samples;
use crate::template::{Scope, Template};
use crate::types::{BindMode, NamedArg, Params, Value};

/// Per-render options.
///
/// # Examples
/// ```rust
/// use sql_template::prelude::*;
///
/// let options = RenderOptions::default().with_annotate(true);
/// assert!(options.annotate);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Source for the `time` and `now` directives.
    pub clock: Clock,
    /// Emit `/*# name */` after placeholders and detailed error markers.
    pub annotate: bool,
}

impl RenderOptions {
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_annotate(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }
}

/// Output of a successful render.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub sql: String,
    pub args: BoundArgs,
}

/// Render `text` once with the built-in functions only.
///
/// # Examples
/// ```rust
/// use sql_template::prelude::*;
///
/// let params = Params::new().with("id", 7);
/// let rendered = render(
///     "SELECT * FROM users WHERE id = /*% p \"id\" %*/1",
///     Dialect::POSTGRES,
///     &params,
///     BindMode::Positional,
///     &RenderOptions::default(),
/// )?;
/// assert_eq!(rendered.sql, "SELECT * FROM users WHERE id = $1");
/// assert_eq!(rendered.args, BoundArgs::Positional(vec![Value::Int(7)]));
/// # Ok::<(), SqlTemplateError>(())
/// ```
///
/// # Errors
///
/// - `TemplateSyntax` when the text does not parse, including calls to unknown functions
/// - `Unresolved` when parameters could not be resolved; it carries the partial SQL
/// - `ProhibitedCharacter`, or `ExecutionError` and `Param` from custom functions, when
///   evaluation aborts
pub fn render(
    text: &str,
    dialect: Dialect,
    params: &Params,
    mode: BindMode,
    options: &RenderOptions,
) -> Result<Rendered, SqlTemplateError> {
    let (sql, args) = evaluate(text, dialect, params, mode, options, FuncRegistry::new())?;
    Ok(Rendered {
        sql,
        args: BoundArgs::from_bound(mode, args),
    })
}

fn evaluate(
    text: &str,
    dialect: Dialect,
    params: &Params,
    mode: BindMode,
    options: &RenderOptions,
    funcs: FuncRegistry,
) -> Result<(String, Vec<BoundArg>), SqlTemplateError> {
    tracing::debug!(
        dialect = dialect.name(),
        ?mode,
        len = text.len(),
        "rendering sql template"
    );

    let mut ctx = BindingContext::new(
        params,
        dialect,
        mode,
        options.clock.clone(),
        options.annotate,
    );
    let cleaned = strip_samples(text);
    let sql = {
        let mut library = Library::new(&mut ctx, funcs);
        let template = Template::parse(&cleaned, &|name| library.has_function(name))?;
        template.execute(&mut library)?
    };

    let (args, mut errors) = ctx.finish();
    if !errors.is_empty() {
        if !options.annotate {
            errors.truncate(1);
        }
        return Err(SqlTemplateError::Unresolved { sql, errors });
    }

    tracing::debug!(args = args.len(), "rendered sql template");
    Ok((sql, args))
}

/// A dialect plus custom functions and default options, reusable across renders.
///
/// # Examples
/// ```rust
/// use sql_template::prelude::*;
///
/// let tpl = SqlTemplate::new(DialectKind::Mysql);
/// let params = Params::new().with("name", "Alex");
/// let (sql, args) = tpl.exec(
///     "SELECT * FROM users WHERE name = /*% p \"name\" %*/'Bob' OR nick = /*% p \"name\" %*/'b'",
///     &params,
/// )?;
/// assert_eq!(sql, "SELECT * FROM users WHERE name = ? OR nick = ?");
/// assert_eq!(args, vec![Value::from("Alex"), Value::from("Alex")]);
/// # Ok::<(), SqlTemplateError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct SqlTemplate {
    dialect: Dialect,
    funcs: FuncRegistry,
    options: RenderOptions,
}

impl SqlTemplate {
    #[must_use]
    pub fn new(dialect: impl Into<Dialect>) -> Self {
        Self {
            dialect: dialect.into(),
            funcs: FuncRegistry::new(),
            options: RenderOptions::default(),
        }
    }

    /// Register a custom template function. Names of built-in functions are ignored.
    #[must_use]
    pub fn add_func<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, SqlTemplateError> + Send + Sync + 'static,
    {
        self.funcs.register(name, Arc::new(f));
        self
    }

    #[must_use]
    pub fn add_funcs<I, S>(mut self, funcs: I) -> Self
    where
        I: IntoIterator<Item = (S, CustomFn)>,
        S: Into<String>,
    {
        for (name, f) in funcs {
            self.funcs.register(name, f);
        }
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.options.clock = clock;
        self
    }

    #[must_use]
    pub fn annotate(mut self, annotate: bool) -> Self {
        self.options.annotate = annotate;
        self
    }

    /// Replace all default render options at once.
    #[must_use]
    pub fn options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn render_options(&self) -> &RenderOptions {
        &self.options
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[must_use]
    pub fn funcs(&self) -> &FuncRegistry {
        &self.funcs
    }

    /// Render with ordinal (or plain-token) placeholders.
    ///
    /// # Errors
    ///
    /// See [`render`].
    pub fn exec(&self, text: &str, params: &Params) -> Result<(String, Vec<Value>), SqlTemplateError> {
        let (sql, args) = self.run(text, params, BindMode::Positional)?;
        Ok((sql, args.into_iter().map(|arg| arg.value).collect()))
    }

    /// Render with named placeholders.
    ///
    /// # Errors
    ///
    /// See [`render`].
    pub fn exec_named(
        &self,
        text: &str,
        params: &Params,
    ) -> Result<(String, Vec<NamedArg>), SqlTemplateError> {
        let (sql, args) = self.run(text, params, BindMode::Named)?;
        Ok((
            sql,
            args.into_iter()
                .map(|arg| NamedArg::new(arg.name, arg.value))
                .collect(),
        ))
    }

    /// Render with an explicit mode, returning the shaped [`Rendered`] output.
    ///
    /// # Errors
    ///
    /// See [`render`].
    pub fn render(
        &self,
        text: &str,
        params: &Params,
        mode: BindMode,
    ) -> Result<Rendered, SqlTemplateError> {
        let (sql, args) = self.run(text, params, mode)?;
        Ok(Rendered {
            sql,
            args: BoundArgs::from_bound(mode, args),
        })
    }

    fn run(
        &self,
        text: &str,
        params: &Params,
        mode: BindMode,
    ) -> Result<(String, Vec<BoundArg>), SqlTemplateError> {
        evaluate(text, self.dialect, params, mode, &self.options, self.funcs.clone())
    }
}
