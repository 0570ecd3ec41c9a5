//! Accessor trait that lets dotted parameter paths walk into user types.
//!
//! A path like `user.Address.City` is resolved one segment at a time. For each segment the
//! resolver first asks the current record for a zero-argument accessor (`method`), then for a
//! plain field (`field`). Implement whichever side makes sense for your type:
//!
//! ```rust
//! use sql_template::prelude::*;
//!
//! #[derive(Debug)]
//! struct User {
//!     first: String,
//!     last: String,
//! }
//!
//! impl Record for User {
//!     fn method(&self, name: &str) -> Member {
//!         match name {
//!             "FullName" => Member::Value(format!("{} {}", self.first, self.last).into()),
//!             _ => Member::Absent,
//!         }
//!     }
//!
//!     fn field(&self, name: &str) -> Option<Value> {
//!         match name {
//!             "First" => Some(self.first.clone().into()),
//!             "Last" => Some(self.last.clone().into()),
//!             _ => None,
//!         }
//!     }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::types::Value;

/// Outcome of a zero-argument accessor lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    /// The accessor exists and produced a value. Return [`Value::Null`] for an absent reference.
    Value(Value),
    /// An accessor with this name exists but takes arguments or returns more than one value.
    InvalidSignature,
    /// No accessor with this name; the resolver falls back to field lookup.
    Absent,
}

/// A value whose members can be reached from dotted template paths.
pub trait Record: fmt::Debug + Send + Sync {
    /// Look up a zero-argument accessor.
    fn method(&self, _name: &str) -> Member {
        Member::Absent
    }

    /// Look up a field by name.
    fn field(&self, name: &str) -> Option<Value>;
}

impl Record for BTreeMap<String, Value> {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl Record for HashMap<String, Value> {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_expose_fields_only() {
        let mut map = BTreeMap::new();
        map.insert("Value".to_string(), Value::from("Alex"));
        assert_eq!(map.method("Value"), Member::Absent);
        assert_eq!(map.field("Value"), Some(Value::from("Alex")));
        assert_eq!(map.field("Other"), None);
    }
}
