use crate::error::SqlTemplateError;
use crate::types::Value;

use super::parsers::{Expr, Node};

/// What a template can reach while it executes: callable functions and dotted values.
///
/// The evaluator knows nothing about placeholders or binding; everything SQL-specific lives
/// behind this trait.
pub trait Scope {
    /// Whether `name` can be called. Consulted at parse time so unknown functions fail early.
    fn has_function(&self, name: &str) -> bool;

    /// Invoke function `name` with already evaluated arguments.
    ///
    /// # Errors
    ///
    /// Any error aborts the whole render.
    fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value, SqlTemplateError>;

    /// Resolve a dotted reference such as `.order` (passed without the leading dot).
    ///
    /// # Errors
    ///
    /// Any error aborts the whole render. Failures that should not abort are reported through
    /// [`Scope::take_marker`] instead.
    fn lookup(&mut self, path: &str) -> Result<Value, SqlTemplateError>;

    /// Marker left by a failed resolution since the last call.
    ///
    /// An action writes it instead of its value; a condition drops it and sees the
    /// (falsy) value the scope returned.
    fn take_marker(&mut self) -> Option<String> {
        None
    }
}

pub(super) fn execute<S: Scope + ?Sized>(
    nodes: &[Node],
    scope: &mut S,
    out: &mut String,
) -> Result<(), SqlTemplateError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Action(expr) => {
                let value = eval(expr, scope)?;
                match scope.take_marker() {
                    Some(marker) => out.push_str(&marker),
                    None => out.push_str(&value.to_string()),
                }
            }
            Node::If {
                cond,
                then,
                otherwise,
            } => {
                let truthy = eval(cond, scope)?.is_truthy();
                scope.take_marker();
                let branch = if truthy {
                    then
                } else {
                    otherwise
                };
                execute(branch, scope, out)?;
            }
        }
    }
    Ok(())
}

fn eval<S: Scope + ?Sized>(expr: &Expr, scope: &mut S) -> Result<Value, SqlTemplateError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Field(path) => scope.lookup(path),
        Expr::Call { name, args } => {
            let args = args
                .iter()
                .map(|arg| eval(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            scope.call(name, args)
        }
    }
}
