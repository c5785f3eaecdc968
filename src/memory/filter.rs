//! Refinement predicates over an existing result set
//!
//! Every candidate is re-read at its address. A failed read or a failed
//! decode drops that candidate only. Survivors get the fresh bytes as their
//! new snapshot, except under `Unchanged` where the bytes are equal anyway.

use crate::core::codec;
use crate::core::types::{DataType, MemoryError, MemoryResult, SharedResult, Value};
use crate::memory::port::MemoryPort;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Relational operator against a caller-supplied value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Equal,
    NotEqual,
    Greater,
    Less,
}

impl Relation {
    pub fn symbol(&self) -> &'static str {
        match self {
            Relation::Equal => "=",
            Relation::NotEqual => "!=",
            Relation::Greater => ">",
            Relation::Less => "<",
        }
    }

    /// Evaluates `current <op> other`; incomparable pairs never hold
    pub fn holds(&self, current: &Value, other: &Value) -> bool {
        match current.compare(other) {
            Some(ordering) => match self {
                Relation::Equal => ordering == Ordering::Equal,
                Relation::NotEqual => ordering != Ordering::Equal,
                Relation::Greater => ordering == Ordering::Greater,
                Relation::Less => ordering == Ordering::Less,
            },
            None => false,
        }
    }
}

/// Closed set of refinement predicates
#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    /// Bytes differ from the snapshot
    Changed,
    /// Bytes equal the snapshot
    Unchanged,
    /// Decoded value is strictly greater than the decoded snapshot
    Increased,
    /// Decoded value is strictly less than the decoded snapshot
    Decreased,
    /// Decoded value compared against a fixed value
    Relational(Relation, Value),
}

impl FilterKind {
    /// Builds a predicate from its user-facing name.
    ///
    /// Relational names need `value`; the others ignore it.
    pub fn from_name(name: &str, value: Option<Value>) -> MemoryResult<Self> {
        let relation = match name.trim().to_ascii_lowercase().as_str() {
            "changed" => return Ok(FilterKind::Changed),
            "unchanged" => return Ok(FilterKind::Unchanged),
            "increased" => return Ok(FilterKind::Increased),
            "decreased" => return Ok(FilterKind::Decreased),
            "=" | "==" | "equal" => Relation::Equal,
            "!=" | "≠" | "<>" | "notequal" => Relation::NotEqual,
            ">" | "greater" => Relation::Greater,
            "<" | "less" => Relation::Less,
            other => return Err(MemoryError::UnknownFilter(other.to_string())),
        };

        let value = value.ok_or_else(|| MemoryError::MissingFilterValue(name.to_string()))?;
        Ok(FilterKind::Relational(relation, value))
    }

    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::Changed => "changed",
            FilterKind::Unchanged => "unchanged",
            FilterKind::Increased => "increased",
            FilterKind::Decreased => "decreased",
            FilterKind::Relational(relation, _) => relation.symbol(),
        }
    }

    /// Normalizes a relational operand through the codec for `data_type`
    pub fn normalized(self, data_type: DataType) -> MemoryResult<Self> {
        match self {
            FilterKind::Relational(relation, value) => Ok(FilterKind::Relational(
                relation,
                codec::normalize(&value, data_type)?,
            )),
            other => Ok(other),
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKind::Relational(relation, value) => write!(f, "{} {}", relation.symbol(), value),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for Relation {
    type Err = MemoryError;

    fn from_str(s: &str) -> MemoryResult<Self> {
        match FilterKind::from_name(s, Some(Value::Int(0)))? {
            FilterKind::Relational(relation, _) => Ok(relation),
            _ => Err(MemoryError::UnknownFilter(s.to_string())),
        }
    }
}

/// Decides one candidate, updating its snapshot when it survives
fn keep(port: &MemoryPort, result: &SharedResult, kind: &FilterKind, data_type: DataType) -> bool {
    result.with_snapshot(|snapshot| {
        let width = data_type.size().unwrap_or(snapshot.len());
        if width == 0 {
            return false;
        }
        let current = match port.read(result.address(), width) {
            Some(bytes) => bytes,
            None => return false,
        };

        let pass = match kind {
            FilterKind::Changed => current != *snapshot,
            FilterKind::Unchanged => current == *snapshot,
            FilterKind::Increased | FilterKind::Decreased => {
                // the snapshot keeps the width of the type it was scanned as
                let (now, before) = match (
                    codec::decode(&current, data_type),
                    codec::decode(snapshot, result.data_type()),
                ) {
                    (Ok(now), Ok(before)) => (now, before),
                    _ => return false,
                };
                let wanted = if *kind == FilterKind::Increased {
                    Relation::Greater
                } else {
                    Relation::Less
                };
                wanted.holds(&now, &before)
            }
            FilterKind::Relational(relation, target) => match codec::decode(&current, data_type) {
                Ok(now) => relation.holds(&now, target),
                Err(_) => false,
            },
        };

        if pass {
            *snapshot = current;
        }
        pass
    })
}

/// Returns the survivors of `results` under `kind`, preserving order
pub fn apply(
    port: &MemoryPort,
    results: &[SharedResult],
    kind: &FilterKind,
    data_type: DataType,
    parallel: bool,
) -> Vec<SharedResult> {
    if parallel {
        results
            .par_iter()
            .filter(|r| keep(port, r, kind, data_type))
            .cloned()
            .collect()
    } else {
        results
            .iter()
            .filter(|r| keep(port, r, kind, data_type))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(FilterKind::from_name("Changed", None).unwrap(), FilterKind::Changed);
        assert_eq!(FilterKind::from_name("unchanged", None).unwrap(), FilterKind::Unchanged);
        assert_eq!(
            FilterKind::from_name("≠", Some(Value::Int(3))).unwrap(),
            FilterKind::Relational(Relation::NotEqual, Value::Int(3))
        );
        assert_eq!(
            FilterKind::from_name("==", Some(Value::Int(3))).unwrap(),
            FilterKind::Relational(Relation::Equal, Value::Int(3))
        );
        assert!(matches!(
            FilterKind::from_name(">", None),
            Err(MemoryError::MissingFilterValue(name)) if name == ">"
        ));
        assert!(FilterKind::from_name("bigger", None).is_err());
        assert_eq!("<".parse::<Relation>().unwrap(), Relation::Less);
    }

    #[test]
    fn test_relation_holds() {
        assert!(Relation::Greater.holds(&Value::Int(5), &Value::UInt(4)));
        assert!(Relation::Less.holds(&Value::Float(-0.5), &Value::Int(0)));
        assert!(Relation::Equal.holds(&Value::from("abc"), &Value::from("abc")));
        assert!(!Relation::NotEqual.holds(&Value::from("abc"), &Value::Int(1)));
        assert!(!Relation::Equal.holds(&Value::from("abc"), &Value::Int(1)));
    }

    #[test]
    fn test_normalized_operand() {
        let kind = FilterKind::from_name("=", Some(Value::from("1.23456789")))
            .unwrap()
            .normalized(DataType::Float)
            .unwrap();
        assert_eq!(kind, FilterKind::Relational(Relation::Equal, Value::Float(1.234568)));
        assert!(FilterKind::from_name("=", Some(Value::Int(300)))
            .unwrap()
            .normalized(DataType::UInt8)
            .is_err());
        assert_eq!(kind.to_string(), "= 1.234568");
    }
}
