//! Automation against an attached process
//!
//! Scripts never touch the OS directly. Everything they can do goes through
//! [`ScriptApi`], a per-session table of operations bound to the current
//! port, scanner and region list. Interpreters plug in behind
//! [`ScriptInterpreter`]; [`ScriptHost`] runs one and turns every failure,
//! panics included, into a failed [`ScriptOutcome`].

pub mod api;
pub mod command;
pub mod host;

pub use api::{ScriptApi, HELP_TEXT};
pub use command::CommandInterpreter;
pub use host::{ScriptHost, ScriptOutcome, SUCCESS_MESSAGE};

use crate::core::types::{DataType, MemoryResult, SharedResult, Value};
use std::fmt;

/// Values that flow through scripts
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Nil,
    Bool(bool),
    Value(Value),
    Bytes(Vec<u8>),
    Type(DataType),
    Results(Vec<SharedResult>),
}

impl ScriptValue {
    pub fn is_nil(&self) -> bool {
        matches!(self, ScriptValue::Nil)
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ScriptValue::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Option<Value>> for ScriptValue {
    fn from(value: Option<Value>) -> Self {
        value.map_or(ScriptValue::Nil, ScriptValue::Value)
    }
}

impl From<Value> for ScriptValue {
    fn from(value: Value) -> Self {
        ScriptValue::Value(value)
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Nil => f.write_str("nil"),
            ScriptValue::Bool(b) => write!(f, "{}", b),
            ScriptValue::Value(v) => write!(f, "{}", v),
            ScriptValue::Bytes(bytes) => f.write_str(&hex::encode(bytes)),
            ScriptValue::Type(dt) => f.write_str(dt.display_name()),
            ScriptValue::Results(results) => {
                f.write_str("[")?;
                for (i, result) in results.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", result)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// An interpreter the host can run code with.
///
/// `execute` returns the script's return value, if it produced one. Output
/// goes through [`ScriptApi::print`].
pub trait ScriptInterpreter: Send + Sync {
    fn name(&self) -> &str;

    fn execute(&self, code: &str, api: &mut ScriptApi) -> MemoryResult<Option<ScriptValue>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Address, ScanResult};

    #[test]
    fn test_display() {
        assert_eq!(ScriptValue::Nil.to_string(), "nil");
        assert_eq!(ScriptValue::Bytes(vec![0xDE, 0xAD]).to_string(), "dead");
        assert_eq!(ScriptValue::Type(DataType::UInt16).to_string(), "UInt16");
        assert_eq!(ScriptValue::from(Some(Value::Int(-3))).to_string(), "-3");

        let results = vec![
            ScanResult::new(Address::new(0x10), vec![1], DataType::UInt8).shared(),
            ScanResult::new(Address::new(0x20), vec![2], DataType::UInt8).shared(),
        ];
        assert_eq!(ScriptValue::Results(results).to_string(), "[0x10: 1, 0x20: 2]");
    }
}
