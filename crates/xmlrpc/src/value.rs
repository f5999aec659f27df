//! XML-RPC value model.

use crate::error::{RpcError, RpcResult};
use std::collections::BTreeMap;

/// An XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    String(String),
    Double(f64),
    /// `dateTime.iso8601`, kept verbatim.
    DateTime(String),
    Base64(Vec<u8>),
    Struct(BTreeMap<String, Value>),
    Array(Vec<Value>),
    Nil,
}

impl Value {
    /// Build a struct value from `(name, value)` pairs.
    pub fn structure<K, I>(members: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Struct(members.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Short type name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Bool(_) => "boolean",
            Value::String(_) => "string",
            Value::Double(_) => "double",
            Value::DateTime(_) => "dateTime.iso8601",
            Value::Base64(_) => "base64",
            Value::Struct(_) => "struct",
            Value::Array(_) => "array",
            Value::Nil => "nil",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Struct(members) => Some(members),
            _ => None,
        }
    }

    /// Look up a struct member.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_struct().and_then(|m| m.get(key))
    }

    /// Interpret as a string or fail with a typed error.
    pub fn expect_str(&self) -> RpcResult<&str> {
        self.as_str().ok_or_else(|| self.unexpected("string"))
    }

    /// Interpret as an integer or fail with a typed error.
    pub fn expect_i64(&self) -> RpcResult<i64> {
        self.as_i64().ok_or_else(|| self.unexpected("int"))
    }

    /// Interpret as an array or fail with a typed error.
    pub fn expect_array(&self) -> RpcResult<&[Value]> {
        self.as_array().ok_or_else(|| self.unexpected("array"))
    }

    /// Fetch a required string member of a struct.
    pub fn member_str(&self, key: &str) -> RpcResult<&str> {
        self.get(key)
            .ok_or_else(|| RpcError::protocol(format!("missing struct member '{}'", key)))?
            .expect_str()
    }

    /// Fetch a required integer member of a struct.
    pub fn member_i64(&self, key: &str) -> RpcResult<i64> {
        self.get(key)
            .ok_or_else(|| RpcError::protocol(format!("missing struct member '{}'", key)))?
            .expect_i64()
    }

    fn unexpected(&self, expected: &'static str) -> RpcError {
        RpcError::UnexpectedType {
            expected,
            found: self.type_name().to_string(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_access() {
        let v = Value::structure([("label", Value::from("rhel7")), ("id", Value::from(42))]);
        assert_eq!(v.member_str("label").unwrap(), "rhel7");
        assert_eq!(v.member_i64("id").unwrap(), 42);
        assert!(v.member_str("missing").is_err());
    }

    #[test]
    fn test_unexpected_type() {
        let err = Value::from(true).expect_str().unwrap_err();
        assert_eq!(
            err,
            RpcError::UnexpectedType {
                expected: "string",
                found: "boolean".to_string()
            }
        );
    }
}
