//! Dotted-path resolution against the parameter table.

use serde_json::Value as JsonValue;

use crate::error::ParamError;
use crate::record::Member;
use crate::types::{Params, Value};

/// Separator used to derive argument names from paths and sub-values (`a.b` -> `a__b`).
pub const CONNECTOR: &str = "__";

/// A successfully resolved parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// Canonical argument name: path segments joined by [`CONNECTOR`].
    pub key: String,
    pub value: Value,
}

/// Resolve `path` (`"name"` or `"name.Field.Accessor"`) against `params`.
///
/// # Errors
///
/// Returns [`ParamError`] naming the qualified path at which traversal stopped:
/// - `UnknownParam` when the root or a member does not exist
/// - `NilValue` when a step would have to look inside a null value
/// - `NotStruct` when a step would have to look inside a scalar
/// - `InvalidMethod` when the accessor exists with the wrong shape
pub fn resolve(params: &Params, path: &str) -> Result<Resolved, ParamError> {
    let mut segments = path.split('.');
    let root = segments.next().unwrap_or_default();
    let mut value = params
        .get(root)
        .cloned()
        .ok_or_else(|| ParamError::UnknownParam(root.to_string()))?;

    let mut qualified = root.to_string();
    let mut key = root.to_string();
    for segment in segments {
        value = step(value, &qualified, segment)?;
        qualified.push('.');
        qualified.push_str(segment);
        key.push_str(CONNECTOR);
        key.push_str(segment);
    }

    Ok(Resolved { key, value })
}

/// Move one segment deeper: accessor first, then field.
fn step(current: Value, qualified: &str, segment: &str) -> Result<Value, ParamError> {
    let member_path = || format!("{qualified}.{segment}");
    match current {
        Value::Null | Value::Json(JsonValue::Null) => Err(ParamError::NilValue(qualified.into())),
        Value::Record(record) => match record.method(segment) {
            Member::Value(v) => Ok(v),
            Member::InvalidSignature => Err(ParamError::InvalidMethod(member_path())),
            Member::Absent => record
                .field(segment)
                .ok_or_else(|| ParamError::UnknownParam(member_path())),
        },
        Value::Json(JsonValue::Object(mut map)) => map
            .remove(segment)
            .map(Value::from)
            .ok_or_else(|| ParamError::UnknownParam(member_path())),
        _ => Err(ParamError::NotStruct(qualified.into())),
    }
}
