//! Canonical type vocabulary shared by every Data Canary crate.

use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Physical Data Types (Closed Vocabulary)
// ============================================================================

/// A physical type name that is not part of the supported vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported physical type '{type_name}': {reason}")]
pub struct UnsupportedTypeError {
    pub type_name: String,
    pub reason: String,
}

impl UnsupportedTypeError {
    fn new(type_name: &str, reason: impl Into<String>) -> Self {
        Self {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Physical storage type - the SINGLE SOURCE OF TRUTH for what a contract may declare.
///
/// Spelling follows the Polars dtype names produced by the profiler
/// (`Int64`, `Float32`, `Decimal(10,2)`, ...). Anything outside this enum is
/// rejected with [`UnsupportedTypeError`]; there is no fallback to `String`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    /// Fixed-point decimal (precision <= 38)
    Decimal { precision: u8, scale: u8 },
    /// UTF-8 string
    String,
    Categorical,
    Binary,
    /// Date (no time component)
    Date,
    /// Timestamp (time unit / zone are not part of the contract)
    Datetime,
    /// Time of day
    Time,
    Duration,
}

/// Grouping used to decide whether a type change is a widening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeFamily {
    Boolean,
    SignedInteger,
    UnsignedInteger,
    Float,
    Decimal,
    Text,
    Categorical,
    Binary,
    Date,
    Datetime,
    Time,
    Duration,
}

impl DataType {
    /// Every parameterless type in the vocabulary (Decimal excluded).
    pub fn all() -> Vec<DataType> {
        vec![
            DataType::Boolean,
            DataType::Int8,
            DataType::Int16,
            DataType::Int32,
            DataType::Int64,
            DataType::UInt8,
            DataType::UInt16,
            DataType::UInt32,
            DataType::UInt64,
            DataType::Float32,
            DataType::Float64,
            DataType::String,
            DataType::Categorical,
            DataType::Binary,
            DataType::Date,
            DataType::Datetime,
            DataType::Time,
            DataType::Duration,
        ]
    }

    pub fn family(&self) -> TypeFamily {
        match self {
            DataType::Boolean => TypeFamily::Boolean,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
                TypeFamily::SignedInteger
            }
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
                TypeFamily::UnsignedInteger
            }
            DataType::Float32 | DataType::Float64 => TypeFamily::Float,
            DataType::Decimal { .. } => TypeFamily::Decimal,
            DataType::String => TypeFamily::Text,
            DataType::Categorical => TypeFamily::Categorical,
            DataType::Binary => TypeFamily::Binary,
            DataType::Date => TypeFamily::Date,
            DataType::Datetime => TypeFamily::Datetime,
            DataType::Time => TypeFamily::Time,
            DataType::Duration => TypeFamily::Duration,
        }
    }

    /// Storage width in bits for fixed-width numeric types.
    pub fn bit_width(&self) -> Option<u16> {
        match self {
            DataType::Int8 | DataType::UInt8 => Some(8),
            DataType::Int16 | DataType::UInt16 => Some(16),
            DataType::Int32 | DataType::UInt32 | DataType::Float32 => Some(32),
            DataType::Int64 | DataType::UInt64 | DataType::Float64 => Some(64),
            _ => None,
        }
    }

    /// Returns true if this type is numeric
    pub fn is_numeric(&self) -> bool {
        matches!(
            self.family(),
            TypeFamily::SignedInteger
                | TypeFamily::UnsignedInteger
                | TypeFamily::Float
                | TypeFamily::Decimal
        )
    }

    /// True when `to` can hold every value of `self` and both sit in the same family.
    ///
    /// Identical types are not a widening. Decimals widen when neither the
    /// scale nor the integer digits shrink.
    pub fn is_widening_to(&self, to: &DataType) -> bool {
        if self == to || self.family() != to.family() {
            return false;
        }
        match (self, to) {
            (
                DataType::Decimal { precision: p1, scale: s1 },
                DataType::Decimal { precision: p2, scale: s2 },
            ) => s2 >= s1 && (*p2 as i16 - *s2 as i16) >= (*p1 as i16 - *s1 as i16),
            _ => match (self.bit_width(), to.bit_width()) {
                (Some(from), Some(to)) => to > from,
                _ => false,
            },
        }
    }

    fn parse_decimal(raw: &str, params: &str) -> Result<DataType, UnsupportedTypeError> {
        let mut values = Vec::with_capacity(2);
        for part in params.split(',') {
            let part = part.trim();
            let part = part
                .strip_prefix("precision=")
                .or_else(|| part.strip_prefix("scale="))
                .unwrap_or(part)
                .trim();
            let value: u8 = part.parse().map_err(|_| {
                UnsupportedTypeError::new(raw, "decimal precision and scale must be integers")
            })?;
            values.push(value);
        }
        let (precision, scale) = match values.as_slice() {
            [precision, scale] => (*precision, *scale),
            _ => {
                return Err(UnsupportedTypeError::new(
                    raw,
                    "decimal requires exactly (precision, scale)",
                ))
            }
        };
        if precision == 0 || precision > 38 {
            return Err(UnsupportedTypeError::new(
                raw,
                "decimal precision must be between 1 and 38",
            ));
        }
        if scale > precision {
            return Err(UnsupportedTypeError::new(raw, "decimal scale must be <= precision"));
        }
        Ok(DataType::Decimal { precision, scale })
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => write!(f, "Boolean"),
            DataType::Int8 => write!(f, "Int8"),
            DataType::Int16 => write!(f, "Int16"),
            DataType::Int32 => write!(f, "Int32"),
            DataType::Int64 => write!(f, "Int64"),
            DataType::UInt8 => write!(f, "UInt8"),
            DataType::UInt16 => write!(f, "UInt16"),
            DataType::UInt32 => write!(f, "UInt32"),
            DataType::UInt64 => write!(f, "UInt64"),
            DataType::Float32 => write!(f, "Float32"),
            DataType::Float64 => write!(f, "Float64"),
            DataType::Decimal { precision, scale } => write!(f, "Decimal({},{})", precision, scale),
            DataType::String => write!(f, "String"),
            DataType::Categorical => write!(f, "Categorical"),
            DataType::Binary => write!(f, "Binary"),
            DataType::Date => write!(f, "Date"),
            DataType::Datetime => write!(f, "Datetime"),
            DataType::Time => write!(f, "Time"),
            DataType::Duration => write!(f, "Duration"),
        }
    }
}

impl FromStr for DataType {
    type Err = UnsupportedTypeError;

    /// Parse a type name, accepting Polars' verbose forms such as
    /// `Datetime(time_unit='us', time_zone=None)` or
    /// `Decimal(precision=10, scale=2)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let (name, params) = match raw.split_once('(') {
            Some((name, rest)) => {
                let params = rest.strip_suffix(')').ok_or_else(|| {
                    UnsupportedTypeError::new(raw, "unbalanced parentheses")
                })?;
                (name.trim(), Some(params))
            }
            None => (raw, None),
        };

        let parsed = match name.to_lowercase().as_str() {
            "decimal" => {
                let params = params.ok_or_else(|| {
                    UnsupportedTypeError::new(raw, "decimal requires (precision, scale)")
                })?;
                return DataType::parse_decimal(raw, params);
            }
            "datetime" | "timestamp" => DataType::Datetime,
            "duration" => DataType::Duration,
            "categorical" => DataType::Categorical,
            _ if params.is_some() => {
                return Err(UnsupportedTypeError::new(raw, "type does not take parameters"));
            }
            "boolean" | "bool" => DataType::Boolean,
            "int8" => DataType::Int8,
            "int16" => DataType::Int16,
            "int32" => DataType::Int32,
            "int64" => DataType::Int64,
            "uint8" => DataType::UInt8,
            "uint16" => DataType::UInt16,
            "uint32" => DataType::UInt32,
            "uint64" => DataType::UInt64,
            "float32" => DataType::Float32,
            "float64" => DataType::Float64,
            "string" | "utf8" => DataType::String,
            "binary" => DataType::Binary,
            "date" => DataType::Date,
            "time" => DataType::Time,
            "" => return Err(UnsupportedTypeError::new(raw, "type name is empty")),
            _ => return Err(UnsupportedTypeError::new(raw, "not in the supported type vocabulary")),
        };
        Ok(parsed)
    }
}

impl Serialize for DataType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DataType::from_str(&raw).map_err(de::Error::custom)
    }
}

// ============================================================================
// Semantic Tags
// ============================================================================

/// Semantic purpose of a column inside a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnRole {
    PrimaryKey,
    Metric,
    EventMarker,
    Category,
    #[default]
    Unassigned,
}

impl ColumnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnRole::PrimaryKey => "PRIMARY_KEY",
            ColumnRole::Metric => "METRIC",
            ColumnRole::EventMarker => "EVENT_MARKER",
            ColumnRole::Category => "CATEGORY",
            ColumnRole::Unassigned => "UNASSIGNED",
        }
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ColumnRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "PRIMARY_KEY" | "PK" => Ok(ColumnRole::PrimaryKey),
            "METRIC" => Ok(ColumnRole::Metric),
            "EVENT_MARKER" => Ok(ColumnRole::EventMarker),
            "CATEGORY" => Ok(ColumnRole::Category),
            "UNASSIGNED" => Ok(ColumnRole::Unassigned),
            _ => Err(format!(
                "Invalid column role: '{}'. Expected: PRIMARY_KEY, METRIC, EVENT_MARKER, CATEGORY, UNASSIGNED",
                s
            )),
        }
    }
}

/// Logical (semantic) type proposed by the AI type review.
///
/// Deserialization is lenient: the reviewer answers in free-form labels such
/// as `UUID`, `ISO_DATE` or `CURRENCY_USD`, which are folded onto the closest
/// variant. Unrecognised labels become [`LogicalType::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
    Identifier,
    Category,
    Currency,
    Date,
    Timestamp,
    Metric,
    FreeText,
    BooleanFlag,
    Unknown,
}

impl LogicalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalType::Identifier => "IDENTIFIER",
            LogicalType::Category => "CATEGORY",
            LogicalType::Currency => "CURRENCY",
            LogicalType::Date => "DATE",
            LogicalType::Timestamp => "TIMESTAMP",
            LogicalType::Metric => "METRIC",
            LogicalType::FreeText => "FREE_TEXT",
            LogicalType::BooleanFlag => "BOOLEAN_FLAG",
            LogicalType::Unknown => "UNKNOWN",
        }
    }

    /// Role a suggestion with this logical type specifies.
    ///
    /// `PRIMARY_KEY` is never implied: identifiers are not necessarily unique keys.
    pub fn implied_role(&self) -> Option<ColumnRole> {
        match self {
            LogicalType::Category => Some(ColumnRole::Category),
            LogicalType::Metric | LogicalType::Currency => Some(ColumnRole::Metric),
            LogicalType::Date | LogicalType::Timestamp => Some(ColumnRole::EventMarker),
            LogicalType::Identifier
            | LogicalType::FreeText
            | LogicalType::BooleanFlag
            | LogicalType::Unknown => None,
        }
    }

    fn from_label(label: &str) -> LogicalType {
        let label = label.trim().to_uppercase().replace(['-', ' '], "_");
        match label.as_str() {
            "IDENTIFIER" | "ID" | "UUID" | "USER_IDENTIFIER" | "KEY" => LogicalType::Identifier,
            "CATEGORY" | "CATEGORICAL" | "ENUM" => LogicalType::Category,
            "METRIC" | "MEASURE" | "NUMERIC" | "COUNT" | "QUANTITY" => LogicalType::Metric,
            "DATE" | "ISO_DATE" => LogicalType::Date,
            "TIMESTAMP" | "DATETIME" | "ISO_TIMESTAMP" | "ISO_DATETIME" => LogicalType::Timestamp,
            "FREE_TEXT" | "TEXT" | "DESCRIPTION" => LogicalType::FreeText,
            "BOOLEAN" | "BOOLEAN_FLAG" | "FLAG" => LogicalType::BooleanFlag,
            other if other.starts_with("CURRENCY") => LogicalType::Currency,
            _ => LogicalType::Unknown,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for LogicalType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LogicalType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(LogicalType::from_label(&raw))
    }
}
