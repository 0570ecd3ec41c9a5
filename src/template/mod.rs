//! Minimal evaluator for SQL templates with `/*% ... %*/` directives.
//!
//! Supported inside a directive: function calls (`p "id"`), dotted references (`.order`),
//! string/number/bool literals, parenthesised sub-calls and `if` / `else` / `else if` / `end`
//! blocks. Go-style trim markers (`/*%- ` and ` -%*/`) strip the whitespace next to a directive.

mod eval;
mod parsers;
mod scanner;

pub use eval::Scope;

use crate::error::SqlTemplateError;

/// Opening delimiter of a directive.
pub const LEFT_DELIM: &str = "/*%";
/// Closing delimiter of a directive.
pub const RIGHT_DELIM: &str = "%*/";

/// A parsed template, ready to be executed against a [`Scope`].
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<parsers::Node>,
}

impl Template {
    /// Parse `text`. Function names are checked against `is_function`.
    ///
    /// # Errors
    ///
    /// Returns `SqlTemplateError::TemplateSyntax` for unknown functions, unbalanced blocks,
    /// unterminated directives or strings, and empty directives.
    pub fn parse(text: &str, is_function: &dyn Fn(&str) -> bool) -> Result<Self, SqlTemplateError> {
        let segments = scanner::split(text)?;
        let nodes = parsers::parse(segments, is_function)?;
        Ok(Self { nodes })
    }

    /// Execute the template and return the rendered text.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by the scope.
    pub fn execute<S: Scope + ?Sized>(&self, scope: &mut S) -> Result<String, SqlTemplateError> {
        let mut out = String::new();
        eval::execute(&self.nodes, scope, &mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use std::collections::HashMap;

    struct MapScope {
        values: HashMap<String, Value>,
        calls: Vec<String>,
        marker: Option<String>,
    }

    impl Scope for MapScope {
        fn has_function(&self, name: &str) -> bool {
            matches!(name, "upper" | "count")
        }

        fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value, SqlTemplateError> {
            self.calls.push(name.to_string());
            match name {
                "upper" => Ok(Value::Text(
                    args.first().map(ToString::to_string).unwrap_or_default().to_uppercase(),
                )),
                _ => Ok(Value::Int(self.calls.len() as i64)),
            }
        }

        fn lookup(&mut self, path: &str) -> Result<Value, SqlTemplateError> {
            if path == "broken" {
                self.marker = Some(format!("/*! bad {path} */"));
            }
            Ok(self.values.get(path).cloned().unwrap_or(Value::Null))
        }

        fn take_marker(&mut self) -> Option<String> {
            self.marker.take()
        }
    }

    fn scope() -> MapScope {
        let mut values = HashMap::new();
        values.insert("flag".to_string(), Value::Bool(true));
        values.insert("order".to_string(), Value::from("name DESC"));
        MapScope {
            values,
            calls: Vec::new(),
            marker: None,
        }
    }

    fn render(text: &str) -> String {
        let mut scope = scope();
        let template = Template::parse(text, &|name| scope.has_function(name)).unwrap();
        template.execute(&mut scope).unwrap()
    }

    #[test]
    fn renders_text_and_values() {
        assert_eq!(render("ORDER BY /*% .order %*/"), "ORDER BY name DESC");
        assert_eq!(render(r#"/*% upper "abc" %*/"#), "ABC");
        assert_eq!(render("/*% .missing %*/x"), "x");
    }

    #[test]
    fn conditional_blocks() {
        let text = "a\n/*%- if .flag %*/\nb\n/*%- else %*/\nc\n/*%- end %*/\nd";
        assert_eq!(render(text), "a\nb\nd");
        let text = "a\n/*%- if .missing %*/\nb\n/*%- else %*/\nc\n/*%- end %*/\nd";
        assert_eq!(render(text), "a\nc\nd");
    }

    #[test]
    fn untaken_branches_are_not_evaluated() {
        let mut scope = scope();
        let template = Template::parse(
            "/*% if false %*//*% count %*//*% end %*//*% count %*/",
            &|name| scope.has_function(name),
        )
        .unwrap();
        assert_eq!(template.execute(&mut scope).unwrap(), "1");
        assert_eq!(scope.calls, vec!["count".to_string()]);
    }

    #[test]
    fn markers_replace_actions_but_not_conditions() {
        assert_eq!(render("x = /*% .broken %*/ AND y"), "x = /*! bad broken */ AND y");
        assert_eq!(
            render("a/*% if .broken %*/ b/*% else %*/ c/*% end %*/ /*% .order %*/"),
            "a c name DESC"
        );
    }
}
