//! Named per-element operations selectable with `--op`.

use clap::ValueEnum;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OpError {
    #[error("arithmetic overflow applying {op} to {value}")]
    Overflow { op: &'static str, value: i64 },
}

/// Operations for `map`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MapOp {
    Square,
    Double,
    Negate,
    Abs,
}

impl MapOp {
    pub fn name(self) -> &'static str {
        match self {
            MapOp::Square => "square",
            MapOp::Double => "double",
            MapOp::Negate => "negate",
            MapOp::Abs => "abs",
        }
    }

    /// Apply to one element. Overflow is reported, never wrapped.
    pub fn apply(self, value: i64) -> Result<i64, OpError> {
        let out = match self {
            MapOp::Square => value.checked_mul(value),
            MapOp::Double => value.checked_mul(2),
            MapOp::Negate => value.checked_neg(),
            MapOp::Abs => value.checked_abs(),
        };
        out.ok_or(OpError::Overflow {
            op: self.name(),
            value,
        })
    }
}

/// Predicates for `filter` and `every`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PredicateOp {
    Even,
    Odd,
    Positive,
    Negative,
}

impl PredicateOp {
    pub fn test(self, value: i64) -> bool {
        match self {
            PredicateOp::Even => value % 2 == 0,
            PredicateOp::Odd => value % 2 != 0,
            PredicateOp::Positive => value > 0,
            PredicateOp::Negative => value < 0,
        }
    }
}

/// Side-effecting operations for `each`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EachOp {
    Print,
}

impl EachOp {
    pub fn visit(self, value: i64) {
        match self {
            EachOp::Print => println!("{value}"),
        }
    }
}
