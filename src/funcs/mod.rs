//! Directive functions exposed to templates.
//!
//! | Function | Output |
//! |---|---|
//! | `param` / `p` | placeholder bound to the named parameter |
//! | `in` | parenthesised placeholder list, one argument per element |
//! | `time` | placeholder for a timestamp cached for the whole render |
//! | `now` | placeholder for a fresh timestamp on every call |
//! | `prefix` / `infix` / `suffix` | `LIKE` pattern with escaped wildcards |
//! | `escape` | the `LIKE`-escaped form of a value, written as text |
//! | `value` / `val` / `v` / `get` | raw parameter value, for `if` and friends |
//! | `out` | raw parameter value checked for splice safety |

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

mod escape;

pub use escape::{ESCAPE_CHAR, ESCAPE_CLAUSE, escape_like};

use crate::binding::BindingContext;
use crate::error::{ParamError, SqlTemplateError};
use crate::resolver::{CONNECTOR, Resolved};
use crate::template::Scope;
use crate::types::Value;

/// Signature of caller-supplied template functions.
pub type CustomFn = Arc<dyn Fn(&[Value]) -> Result<Value, SqlTemplateError> + Send + Sync>;

/// Names reserved by the built-in library; custom registrations under these are ignored.
pub const BUILTIN_FUNCTIONS: &[&str] = &[
    "param", "p", "in", "time", "now", "prefix", "infix", "suffix", "escape", "value", "val", "v",
    "get", "out",
];

const TIME_ARG: &str = "time__";

#[must_use]
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_FUNCTIONS.contains(&name)
}

/// Copy-on-write set of custom functions.
///
/// Cloning is cheap; registering on a clone never affects renders that already hold a snapshot.
#[derive(Clone, Default)]
pub struct FuncRegistry {
    funcs: Arc<HashMap<String, CustomFn>>,
}

impl FuncRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `f` under `name`. Returns `false` (and keeps the built-in) for reserved names.
    pub fn register(&mut self, name: impl Into<String>, f: CustomFn) -> bool {
        let name = name.into();
        if is_builtin(&name) {
            tracing::debug!(name = %name, "ignoring custom function that shadows a built-in");
            return false;
        }
        Arc::make_mut(&mut self.funcs).insert(name, f);
        true
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CustomFn> {
        self.funcs.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }
}

impl fmt::Debug for FuncRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.funcs.keys().collect();
        names.sort();
        f.debug_struct("FuncRegistry").field("funcs", &names).finish()
    }
}

/// Directive library bound to one render's [`BindingContext`].
pub struct Library<'c, 'p> {
    ctx: &'c mut BindingContext<'p>,
    custom: FuncRegistry,
    marker: Option<String>,
}

impl<'c, 'p> Library<'c, 'p> {
    pub fn new(ctx: &'c mut BindingContext<'p>, custom: FuncRegistry) -> Self {
        Self {
            ctx,
            custom,
            marker: None,
        }
    }

    /// `param` / `p`: bind the parameter and return its placeholder.
    pub fn param(&mut self, name: &str) -> String {
        match self.ctx.get(name) {
            Ok(resolved) => self.bind_resolved(name, resolved),
            Err(err) => self.ctx.fail(name, err),
        }
    }

    /// `in`: one placeholder per element of a sequence, or a single one for a scalar.
    ///
    /// Element arguments are named `<key>__1 ... <key>__N`, so a repeated `in` over the same
    /// parameter points back at the same arguments.
    pub fn in_list(&mut self, name: &str) -> String {
        let resolved = match self.ctx.get(name) {
            Ok(resolved) => resolved,
            Err(err) => return self.ctx.fail(name, err),
        };
        let Some(items) = resolved.value.sequence() else {
            return format!("({})", self.bind_resolved(name, resolved));
        };

        let mut placeholders = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            let arg = format!("{}{CONNECTOR}{}", resolved.key, i + 1);
            let placeholder = self.ctx.bind(&arg, item);
            placeholders.push(self.ctx.decorate(placeholder, &arg));
        }
        format!("({})", placeholders.join(", "))
    }

    /// `time`: the render-wide cached timestamp.
    pub fn time(&mut self) -> String {
        let ts = self.ctx.time();
        let placeholder = self.ctx.bind(TIME_ARG, Value::Timestamp(ts));
        self.ctx.decorate(placeholder, TIME_ARG)
    }

    /// `now`: a fresh timestamp under a new `now__N` argument.
    pub fn now(&mut self) -> String {
        let (seq, ts) = self.ctx.now();
        let name = format!("now{CONNECTOR}{seq}");
        self.ctx.add_arg(&name, Value::Timestamp(ts));
        let placeholder = self.ctx.placeholder(&name);
        self.ctx.decorate(placeholder, &name)
    }

    /// `prefix`: `ph || '%' ESCAPE '\'`
    pub fn prefix(&mut self, name: &str) -> String {
        format!("{} || '%'{ESCAPE_CLAUSE}", self.like_param(name))
    }

    /// `infix`: `'%' || ph || '%' ESCAPE '\'`
    pub fn infix(&mut self, name: &str) -> String {
        format!("'%' || {} || '%'{ESCAPE_CLAUSE}", self.like_param(name))
    }

    /// `suffix`: `'%' || ph ESCAPE '\'`
    pub fn suffix(&mut self, name: &str) -> String {
        format!("'%' || {}{ESCAPE_CLAUSE}", self.like_param(name))
    }

    /// `escape`: LIKE-escape a value; non-text values pass through.
    #[must_use]
    pub fn escape(&self, value: Value) -> Value {
        match value {
            Value::Text(text) => Value::Text(escape_like(&text, &self.ctx.dialect()).into_owned()),
            other => other,
        }
    }

    /// `value` / `val` / `v`: the raw resolved value.
    ///
    /// A resolution failure is recorded and yields `Null`; its marker is written in place of
    /// the directive.
    pub fn value(&mut self, name: &str) -> Value {
        match self.ctx.get(name) {
            Ok(resolved) => resolved.value,
            Err(err) => self.unresolved(name, err),
        }
    }

    /// `get`: like [`Library::value`], but an unknown top-level name is not an error.
    pub fn get(&mut self, name: &str) -> Value {
        match self.ctx.get(name) {
            Ok(resolved) => resolved.value,
            Err(ParamError::UnknownParam(path)) if !path.contains('.') => Value::Null,
            Err(err) => self.unresolved(name, err),
        }
    }

    /// `out`: the raw value, rejected if it is text that could break out of its SQL position.
    ///
    /// # Errors
    ///
    /// Returns `ProhibitedCharacter` for unsafe text.
    pub fn out(&mut self, name: &str) -> Result<Value, SqlTemplateError> {
        let value = self.value(name);
        if let Value::Text(text) = &value {
            escape::check_literal(text).map_err(|reason| SqlTemplateError::ProhibitedCharacter {
                name: name.to_string(),
                reason: reason.to_string(),
            })?;
        }
        Ok(value)
    }

    fn unresolved(&mut self, name: &str, err: ParamError) -> Value {
        let marker = self.ctx.fail(name, err);
        self.marker.get_or_insert_with(String::new).push_str(&marker);
        Value::Null
    }

    fn bind_resolved(&mut self, label: &str, resolved: Resolved) -> String {
        let placeholder = self.ctx.bind(&resolved.key, resolved.value);
        self.ctx.decorate(placeholder, label)
    }

    /// Bind the escaped value; a separate `__esc` argument only exists when escaping changed it.
    fn like_param(&mut self, name: &str) -> String {
        let resolved = match self.ctx.get(name) {
            Ok(resolved) => resolved,
            Err(err) => return self.ctx.fail(name, err),
        };
        let escaped = match &resolved.value {
            Value::Text(text) => match escape_like(text, &self.ctx.dialect()) {
                Cow::Owned(escaped) => Some(escaped),
                Cow::Borrowed(_) => None,
            },
            _ => None,
        };
        match escaped {
            Some(escaped) => self.bind_resolved(
                name,
                Resolved {
                    key: format!("{}{CONNECTOR}esc", resolved.key),
                    value: Value::Text(escaped),
                },
            ),
            None => self.bind_resolved(name, resolved),
        }
    }
}

impl Scope for Library<'_, '_> {
    fn has_function(&self, name: &str) -> bool {
        is_builtin(name) || self.custom.contains(name)
    }

    fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value, SqlTemplateError> {
        let text = |s: String| -> Result<Value, SqlTemplateError> { Ok(Value::Text(s)) };
        match name {
            "param" | "p" => text(self.param(name_arg(name, &args)?)),
            "in" => text(self.in_list(name_arg(name, &args)?)),
            "prefix" => text(self.prefix(name_arg(name, &args)?)),
            "infix" => text(self.infix(name_arg(name, &args)?)),
            "suffix" => text(self.suffix(name_arg(name, &args)?)),
            "time" => {
                arity(name, &args, 0)?;
                text(self.time())
            }
            "now" => {
                arity(name, &args, 0)?;
                text(self.now())
            }
            "escape" => {
                arity(name, &args, 1)?;
                Ok(self.escape(args.into_iter().next().unwrap_or(Value::Null)))
            }
            "value" | "val" | "v" => Ok(self.value(name_arg(name, &args)?)),
            "get" => Ok(self.get(name_arg(name, &args)?)),
            "out" => self.out(name_arg(name, &args)?),
            _ => match self.custom.get(name) {
                Some(f) => f(&args),
                None => Err(SqlTemplateError::ExecutionError(format!(
                    "function {name:?} not defined"
                ))),
            },
        }
    }

    fn lookup(&mut self, path: &str) -> Result<Value, SqlTemplateError> {
        Ok(self.get(path))
    }

    fn take_marker(&mut self) -> Option<String> {
        self.marker.take()
    }
}

fn arity(func: &str, args: &[Value], want: usize) -> Result<(), SqlTemplateError> {
    if args.len() == want {
        Ok(())
    } else {
        Err(SqlTemplateError::ExecutionError(format!(
            "wrong number of args for {func}: want {want} got {}",
            args.len()
        )))
    }
}

/// The single parameter-name argument of a directive.
fn name_arg<'a>(func: &str, args: &'a [Value]) -> Result<&'a str, SqlTemplateError> {
    arity(func, args, 1)?;
    args[0].as_text().ok_or_else(|| {
        SqlTemplateError::ExecutionError(format!(
            "{func} expects a parameter name string, got {:?}",
            args[0]
        ))
    })
}
