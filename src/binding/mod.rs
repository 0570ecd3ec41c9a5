//! Parameter store and argument allocator for a single render.

use std::collections::HashMap;

mod timer;

pub use timer::Clock;
pub(crate) use timer::Timer;

use crate::dialect::Dialect;
use crate::error::ParamError;
use crate::resolver::{Resolved, resolve};
use crate::types::{BindMode, NamedArg, Params, Value};

/// An argument allocated during a render.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArg {
    pub name: String,
    pub value: Value,
    /// 1-based position in the argument list.
    pub index: usize,
}

/// Final arguments of a render, shaped by its [`BindMode`].
#[derive(Debug, Clone, PartialEq)]
pub enum BoundArgs {
    Positional(Vec<Value>),
    Named(Vec<NamedArg>),
}

impl BoundArgs {
    /// Shape `args` for `mode`: bare values for positional renders, name/value pairs otherwise.
    #[must_use]
    pub fn from_bound(mode: BindMode, args: Vec<BoundArg>) -> Self {
        match mode {
            BindMode::Positional => {
                BoundArgs::Positional(args.into_iter().map(|arg| arg.value).collect())
            }
            BindMode::Named => BoundArgs::Named(
                args.into_iter()
                    .map(|arg| NamedArg::new(arg.name, arg.value))
                    .collect(),
            ),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            BoundArgs::Positional(values) => values.len(),
            BoundArgs::Named(args) => args.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tracks every argument bound while one template is evaluated.
///
/// Arguments are appended in first-binding order, so `BoundArg::index` always matches the
/// ordinal placeholder emitted for it. Whether a repeated name reuses its argument or appends a
/// new one is decided by [`BindingContext::bind`].
#[derive(Debug)]
pub struct BindingContext<'p> {
    params: &'p Params,
    dialect: Dialect,
    mode: BindMode,
    annotate: bool,
    args: Vec<BoundArg>,
    // first position of each name; add_arg may append duplicates after it
    positions: HashMap<String, usize>,
    timer: Timer,
    errors: Vec<ParamError>,
}

impl<'p> BindingContext<'p> {
    #[must_use]
    pub fn new(
        params: &'p Params,
        dialect: Dialect,
        mode: BindMode,
        clock: Clock,
        annotate: bool,
    ) -> Self {
        Self {
            params,
            dialect,
            mode,
            annotate,
            args: Vec::new(),
            positions: HashMap::new(),
            timer: Timer::new(clock),
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[must_use]
    pub fn mode(&self) -> BindMode {
        self.mode
    }

    #[must_use]
    pub fn annotates(&self) -> bool {
        self.annotate
    }

    /// Resolve a top-level or dotted parameter name.
    ///
    /// # Errors
    ///
    /// Returns the [`ParamError`] produced by path resolution.
    pub fn get(&self, name: &str) -> Result<Resolved, ParamError> {
        resolve(self.params, name)
    }

    /// Append an argument unconditionally and return its index.
    pub fn add_arg(&mut self, name: &str, value: Value) -> usize {
        let index = self.args.len() + 1;
        self.args.push(BoundArg {
            name: name.to_string(),
            value,
            index,
        });
        self.positions.entry(name.to_string()).or_insert(index);
        index
    }

    /// Append an argument unless one with the same name exists; return its index either way.
    pub fn merge_arg(&mut self, name: &str, value: Value) -> usize {
        match self.arg_index(name) {
            0 => self.add_arg(name, value),
            index => index,
        }
    }

    /// 1-based index of the first argument named `name`, or 0 when absent.
    #[must_use]
    pub fn arg_index(&self, name: &str) -> usize {
        self.positions.get(name).copied().unwrap_or(0)
    }

    /// Dialect-specific placeholder for an already bound argument.
    #[must_use]
    pub fn placeholder(&self, name: &str) -> String {
        self.dialect
            .placeholder_for(self.mode, name, self.arg_index(name))
    }

    /// Bind `value` under `name` and return the placeholder that refers to it.
    ///
    /// Named and ordinal renders can point at an earlier argument, so the first binding wins.
    /// Plain-token dialects (`?`) need one argument per occurrence.
    pub fn bind(&mut self, name: &str, value: Value) -> String {
        if self.dialect.reuses_arguments(self.mode) {
            self.merge_arg(name, value);
            self.placeholder(name)
        } else {
            self.add_arg(name, value);
            self.dialect.placeholder().to_string()
        }
    }

    /// Append the trace comment after a placeholder when annotating.
    #[must_use]
    pub fn decorate(&self, placeholder: String, label: &str) -> String {
        if self.annotate {
            format!("{placeholder}/*# {label} */")
        } else {
            placeholder
        }
    }

    /// Record a resolution failure and return the inline marker that replaces the directive.
    pub fn fail(&mut self, path: &str, err: ParamError) -> String {
        tracing::warn!(path, error = %err, "unresolved template parameter");
        let marker = if self.annotate {
            format!("/*# error: \"{path}\" {err} */")
        } else {
            format!("/*! {err} */")
        };
        self.errors.push(err);
        marker
    }

    pub(crate) fn time(&mut self) -> chrono::NaiveDateTime {
        self.timer.time()
    }

    pub(crate) fn now(&mut self) -> (usize, chrono::NaiveDateTime) {
        self.timer.now()
    }

    #[must_use]
    pub fn errors(&self) -> &[ParamError] {
        &self.errors
    }

    #[must_use]
    pub fn bound(&self) -> &[BoundArg] {
        &self.args
    }

    /// Bound values in index order.
    #[must_use]
    pub fn args(&self) -> Vec<Value> {
        self.args.iter().map(|arg| arg.value.clone()).collect()
    }

    /// Bound name/value pairs in index order.
    #[must_use]
    pub fn named_args(&self) -> Vec<NamedArg> {
        self.args
            .iter()
            .map(|arg| NamedArg::new(arg.name.clone(), arg.value.clone()))
            .collect()
    }

    /// Consume the context, yielding the bound arguments and the recorded errors.
    pub(crate) fn finish(self) -> (Vec<BoundArg>, Vec<ParamError>) {
        (self.args, self.errors)
    }
}
