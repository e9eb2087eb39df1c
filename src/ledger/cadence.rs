// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-Cadence argument encoding.
//!
//! Transaction and script arguments travel as JSON-Cadence documents, e.g.
//! `{"type":"UFix64","value":"10.00000000"}`. Values are validated when the
//! [`Argument`] is constructed so that a value that cannot be represented in
//! its wire type never reaches the ledger.

use std::fmt;

use serde_json::{json, Value};

use super::{Address, AddressError};

/// Number of decimal places carried by `UFix64`.
pub const UFIX64_DECIMALS: u32 = 8;

const UFIX64_SCALE: u64 = 10u64.pow(UFIX64_DECIMALS);

/// Errors raised while constructing or encoding an argument.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    #[error("Amount is empty")]
    Empty,

    #[error("Invalid amount format: {0}")]
    InvalidFormat(String),

    #[error("Too many decimal places (max {max})")]
    TooPrecise { max: u32 },

    #[error("Amount overflows UFix64")]
    Overflow,

    #[error("Amount must not be negative")]
    Negative,

    #[error("Invalid address argument: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("Unsupported argument type: {0}")]
    UnsupportedType(String),

    #[error("Malformed JSON-Cadence: {0}")]
    Malformed(String),
}

/// Unsigned fixed-point number with 8 decimal places, stored as raw units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UFix64(u64);

impl UFix64 {
    pub const MAX: UFix64 = UFix64(u64::MAX);

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Parse a decimal string such as `"10"` or `"1.5"`.
    ///
    /// More than 8 fractional digits is rejected, never truncated.
    pub fn parse(amount: &str) -> Result<Self, ArgumentError> {
        let amount = amount.trim();
        if amount.is_empty() {
            return Err(ArgumentError::Empty);
        }
        if amount.starts_with('-') {
            return Err(ArgumentError::Negative);
        }

        let (whole_str, frac_str) = match amount.split_once('.') {
            Some((whole, frac)) => (whole, Some(frac)),
            None => (amount, None),
        };

        let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !is_digits(whole_str) {
            return Err(ArgumentError::InvalidFormat(amount.to_string()));
        }

        let whole: u64 = whole_str
            .parse()
            .map_err(|_| ArgumentError::Overflow)?;

        let fraction = match frac_str {
            Some(frac) => {
                if !is_digits(frac) {
                    return Err(ArgumentError::InvalidFormat(amount.to_string()));
                }
                if frac.len() > UFIX64_DECIMALS as usize {
                    return Err(ArgumentError::TooPrecise {
                        max: UFIX64_DECIMALS,
                    });
                }
                let padded = format!("{:0<width$}", frac, width = UFIX64_DECIMALS as usize);
                padded
                    .parse::<u64>()
                    .map_err(|_| ArgumentError::InvalidFormat(amount.to_string()))?
            }
            None => 0,
        };

        whole
            .checked_mul(UFIX64_SCALE)
            .and_then(|w| w.checked_add(fraction))
            .map(Self)
            .ok_or(ArgumentError::Overflow)
    }
}

impl fmt::Display for UFix64 {
    /// Always renders all 8 decimals, as Cadence expects (`10.00000000`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:0width$}",
            self.0 / UFIX64_SCALE,
            self.0 % UFIX64_SCALE,
            width = UFIX64_DECIMALS as usize
        )
    }
}

/// A typed ledger argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    Address(Address),
    UFix64(UFix64),
    String(String),
    Bool(bool),
    UInt8(u8),
    UInt64(u64),
}

impl Argument {
    pub fn address(raw: &str) -> Result<Self, ArgumentError> {
        Ok(Self::Address(Address::from_hex(raw)?))
    }

    pub fn ufix64(amount: &str) -> Result<Self, ArgumentError> {
        Ok(Self::UFix64(UFix64::parse(amount)?))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// JSON-Cadence value for this argument.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Address(a) => json!({"type": "Address", "value": a.to_string()}),
            Self::UFix64(v) => json!({"type": "UFix64", "value": v.to_string()}),
            Self::String(s) => json!({"type": "String", "value": s}),
            Self::Bool(b) => json!({"type": "Bool", "value": b}),
            Self::UInt8(n) => json!({"type": "UInt8", "value": n.to_string()}),
            Self::UInt64(n) => json!({"type": "UInt64", "value": n.to_string()}),
        }
    }

    /// Encode as the JSON-Cadence bytes placed in a transaction.
    pub fn encode(&self) -> Result<Vec<u8>, ArgumentError> {
        serde_json::to_vec(&self.to_json()).map_err(|e| ArgumentError::Malformed(e.to_string()))
    }

    /// Decode a JSON-Cadence value of one of the supported types.
    pub fn from_json(value: &Value) -> Result<Self, ArgumentError> {
        let type_name = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ArgumentError::Malformed("missing `type`".into()))?;
        let inner = value
            .get("value")
            .ok_or_else(|| ArgumentError::Malformed("missing `value`".into()))?;
        let as_str = || {
            inner
                .as_str()
                .ok_or_else(|| ArgumentError::Malformed(format!("{type_name} value is not a string")))
        };

        match type_name {
            "Address" => Self::address(as_str()?),
            "UFix64" => Self::ufix64(as_str()?),
            "String" => Ok(Self::String(as_str()?.to_string())),
            "Bool" => inner
                .as_bool()
                .map(Self::Bool)
                .ok_or_else(|| ArgumentError::Malformed("Bool value is not a boolean".into())),
            "UInt8" => as_str()?
                .parse()
                .map(Self::UInt8)
                .map_err(|_| ArgumentError::Overflow),
            "UInt64" => as_str()?
                .parse()
                .map(Self::UInt64)
                .map_err(|_| ArgumentError::Overflow),
            other => Err(ArgumentError::UnsupportedType(other.to_string())),
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ArgumentError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| ArgumentError::Malformed(e.to_string()))?;
        Self::from_json(&value)
    }
}

/// Render a JSON-Cadence value in Cadence's human-readable notation.
///
/// Composites render as `A.<addr>.Contract.Type(field: value, ...)`, strings
/// are quoted, arrays use `[a, b]`. Types without a textual form fall back to
/// their raw JSON.
pub fn render_text(value: &Value) -> String {
    let type_name = value.get("type").and_then(Value::as_str).unwrap_or("");
    let inner = value.get("value").unwrap_or(&Value::Null);

    match type_name {
        "Optional" => {
            if inner.is_null() {
                "nil".to_string()
            } else {
                render_text(inner)
            }
        }
        "Void" => "()".to_string(),
        "String" | "Character" => {
            let s = inner.as_str().unwrap_or_default();
            format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
        }
        "Bool" => inner.as_bool().unwrap_or_default().to_string(),
        "Array" => {
            let items: Vec<String> = inner
                .as_array()
                .map(|a| a.iter().map(render_text).collect())
                .unwrap_or_default();
            format!("[{}]", items.join(", "))
        }
        "Dictionary" => {
            let items: Vec<String> = inner
                .as_array()
                .map(|entries| {
                    entries
                        .iter()
                        .map(|e| {
                            format!(
                                "{}: {}",
                                render_text(&e["key"]),
                                render_text(&e["value"])
                            )
                        })
                        .collect()
                })
                .unwrap_or_default();
            format!("{{{}}}", items.join(", "))
        }
        "Struct" | "Resource" | "Event" | "Contract" | "Enum" => {
            let id = inner.get("id").and_then(Value::as_str).unwrap_or("");
            let fields: Vec<String> = inner
                .get("fields")
                .and_then(Value::as_array)
                .map(|fields| {
                    fields
                        .iter()
                        .map(|f| {
                            format!(
                                "{}: {}",
                                f.get("name").and_then(Value::as_str).unwrap_or(""),
                                render_text(&f["value"])
                            )
                        })
                        .collect()
                })
                .unwrap_or_default();
            format!("{}({})", id, fields.join(", "))
        }
        _ => match inner {
            Value::String(s) => s.clone(),
            Value::Null => "nil".to_string(),
            other => other.to_string(),
        },
    }
}
