//! Wire Field Mapping
//!
//! Clients speak camelCase, storage speaks snake_case. The mapper is a
//! pure structural transform over JSON trees: keys are always converted,
//! values only for an explicit allow-list of enumerated fields (by
//! default just `status`, whose values like `working_on_it` surface as
//! `workingOnIt`). Unlisted string values pass through untouched.

use std::collections::HashSet;

use serde_json::{Map, Value};

pub struct FieldMapper {
    convertible_values: HashSet<String>,
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::with_convertible_fields(["status"])
    }
}

impl FieldMapper {
    /// Build a mapper with an explicit value-conversion allow-list. The
    /// entries are internal (snake_case) key names.
    pub fn with_convertible_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            convertible_values: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Internal (snake_case) tree to wire (camelCase) tree.
    pub fn to_wire(&self, value: &Value) -> Value {
        self.walk(value, true)
    }

    /// Wire (camelCase) tree to internal (snake_case) tree.
    pub fn to_internal(&self, value: &Value) -> Value {
        self.walk(value, false)
    }

    fn walk(&self, value: &Value, to_camel: bool) -> Value {
        match value {
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, val) in map {
                    let internal_key = if to_camel {
                        key.clone()
                    } else {
                        decamelize(key)
                    };
                    let converted = match val {
                        Value::String(s) if self.convertible_values.contains(&internal_key) => {
                            let s = if to_camel { camelize(s) } else { decamelize(s) };
                            Value::String(s)
                        }
                        other => self.walk(other, to_camel),
                    };
                    let out_key = if to_camel { camelize(key) } else { internal_key };
                    out.insert(out_key, converted);
                }
                Value::Object(out)
            }
            Value::Array(values) => {
                Value::Array(values.iter().map(|v| self.walk(v, to_camel)).collect())
            }
            scalar => scalar.clone(),
        }
    }
}

/// snake_case to camelCase. Strings without underscores pass through.
fn camelize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = false;
    for (i, c) in s.chars().enumerate() {
        if c == '_' && i > 0 {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// camelCase to snake_case. Already-snake strings pass through.
fn decamelize(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for c in s.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
