//! Codebooks: raw survey code -> canonical value lookup tables.
//!
//! A codebook file is a YAML mapping from field name to field specification.
//! Each field is either a flat map or a year-keyed map of flat maps:
//!
//! ```yaml
//! column_mappings:
//!   HOUSEID: hid
//!   TRPTRANS: mode
//! mode:
//!   default:
//!     1: walk
//!     2: bike
//!   2009:
//!     1: walk
//!     2: cycle
//! hh_income:
//!   1: [0, 9999]
//!   2: [10000, 14999]
//!   -7: ~
//! ```
//!
//! Year resolution is a pure pre-step: [`CodebookSet::resolve`] turns every
//! field into one flat [`Codebook`] for the survey year, falling back to the
//! field's `default` sub-map, so recoding never sees the year indirection.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use hts_common::format_numeric;
use hts_model::HarmonizeError;
use hts_model::columns::COLUMN_MAPPINGS;
use serde_yaml::{Mapping, Value};

use crate::error::CodebookError;

/// Sub-map used when a year-keyed field has no entry for the survey year.
pub const DEFAULT_YEAR_KEY: &str = "default";

/// A canonical value a raw code translates to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeValue {
    /// A category of the canonical taxonomy (or a canonical column name).
    Category(String),
    /// A closed numeric interval for de-bucketing, `lo <= hi`.
    Bounds(i64, i64),
    /// The raw code explicitly means "missing".
    Missing,
}

impl CodeValue {
    pub fn category(value: impl Into<String>) -> Self {
        Self::Category(value.into())
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            Self::Category(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bounds(&self) -> Option<(i64, i64)> {
        match self {
            Self::Bounds(lo, hi) => Some((*lo, *hi)),
            _ => None,
        }
    }
}

impl fmt::Display for CodeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Category(value) => write!(f, "{value}"),
            Self::Bounds(lo, hi) => write!(f, "[{lo}, {hi}]"),
            Self::Missing => write!(f, "~"),
        }
    }
}

/// A flat, year-resolved codebook for one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Codebook {
    field: String,
    entries: BTreeMap<String, CodeValue>,
}

impl Codebook {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Build a codebook of category entries.
    pub fn from_categories<I, K, V>(field: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut codebook = Self::new(field);
        for (raw, value) in entries {
            codebook.insert(raw, CodeValue::Category(value.into()));
        }
        codebook
    }

    /// Build a codebook of bound-pair entries.
    pub fn from_bounds<I, K>(field: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, (i64, i64))>,
        K: Into<String>,
    {
        let mut codebook = Self::new(field);
        for (raw, (lo, hi)) in entries {
            codebook.insert(raw, CodeValue::Bounds(lo, hi));
        }
        codebook
    }

    pub fn insert(&mut self, raw: impl Into<String>, value: CodeValue) {
        self.entries.insert(raw.into(), value);
    }

    /// Name of the field this codebook translates.
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn lookup(&self, raw: &str) -> Option<&CodeValue> {
        self.entries.get(raw.trim())
    }

    pub fn contains(&self, raw: &str) -> bool {
        self.entries.contains_key(raw.trim())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &CodeValue)> {
        self.entries.iter().map(|(raw, value)| (raw.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The same entries under another field name.
    ///
    /// Used when one codebook serves several columns, e.g. the activity map
    /// for both `oact` and `dact`.
    #[must_use]
    pub fn renamed(&self, field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            entries: self.entries.clone(),
        }
    }
}

/// A field as written in the codebook file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSpec {
    Flat(Codebook),
    YearKeyed(BTreeMap<String, Codebook>),
}

impl FieldSpec {
    /// Pick the flat codebook for `year`, falling back to `default`.
    pub fn resolve(&self, year: &str) -> Result<&Codebook, HarmonizeError> {
        match self {
            Self::Flat(codebook) => Ok(codebook),
            Self::YearKeyed(years) => years
                .get(year)
                .or_else(|| years.get(DEFAULT_YEAR_KEY))
                .ok_or_else(|| {
                    let field = years
                        .values()
                        .next()
                        .map(|codebook| codebook.field().to_string())
                        .unwrap_or_default();
                    HarmonizeError::configuration(
                        field,
                        format!("no sub-map for year {year} and no '{DEFAULT_YEAR_KEY}' sub-map"),
                    )
                }),
        }
    }

    pub fn is_year_keyed(&self) -> bool {
        matches!(self, Self::YearKeyed(_))
    }
}

/// Every field of one codebook file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodebookSet {
    source: Option<PathBuf>,
    fields: BTreeMap<String, FieldSpec>,
}

impl CodebookSet {
    /// Read and parse a codebook file.
    pub fn load(path: &Path) -> Result<Self, CodebookError> {
        let text = std::fs::read_to_string(path).map_err(|e| CodebookError::io(path, e))?;
        let value: Value =
            serde_yaml::from_str(&text).map_err(|e| CodebookError::yaml(path, e))?;
        let mut set = Self::from_value(&value)?;
        set.source = Some(path.to_path_buf());
        Ok(set)
    }

    /// Parse a codebook document held in memory.
    pub fn parse(text: &str) -> Result<Self, CodebookError> {
        let value: Value =
            serde_yaml::from_str(text).map_err(|e| CodebookError::yaml("<inline>", e))?;
        Self::from_value(&value)
    }

    fn from_value(value: &Value) -> Result<Self, CodebookError> {
        let mut fields = BTreeMap::new();
        let mapping = match value {
            Value::Mapping(mapping) => mapping,
            Value::Null => return Ok(Self::default()),
            _ => {
                return Err(CodebookError::invalid(
                    "<root>",
                    "codebook document must be a mapping of field names",
                ));
            }
        };
        for (key, spec) in mapping {
            let field = scalar_key(key).ok_or_else(|| {
                CodebookError::invalid("<root>", "field names must be scalars")
            })?;
            let spec = parse_field(&field, spec)?;
            fields.insert(field, spec);
        }
        Ok(Self {
            source: None,
            fields,
        })
    }

    /// The file this set was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Resolve one field for `year`; a field absent from the file is a
    /// configuration error.
    pub fn resolve_field(&self, name: &str, year: &str) -> Result<&Codebook, HarmonizeError> {
        self.fields
            .get(name)
            .ok_or_else(|| HarmonizeError::configuration(name, "field not present in codebook"))?
            .resolve(year)
    }

    /// Resolve every field for `year`.
    pub fn resolve(&self, year: &str) -> Result<ResolvedCodebooks, HarmonizeError> {
        let mut fields = BTreeMap::new();
        for (name, spec) in &self.fields {
            fields.insert(name.clone(), spec.resolve(year)?.clone());
        }
        Ok(ResolvedCodebooks {
            year: year.to_string(),
            fields,
        })
    }
}

/// All fields of a codebook file, flattened for one survey year.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedCodebooks {
    year: String,
    fields: BTreeMap<String, Codebook>,
}

impl ResolvedCodebooks {
    pub fn year(&self) -> &str {
        &self.year
    }

    pub fn get(&self, name: &str) -> Option<&Codebook> {
        self.fields.get(name)
    }

    /// Like [`Self::get`], but a missing field is a configuration error.
    pub fn require(&self, name: &str) -> Result<&Codebook, HarmonizeError> {
        self.fields.get(name).ok_or_else(|| {
            HarmonizeError::configuration(
                name,
                format!("field not present in codebook for year {}", self.year),
            )
        })
    }

    /// Fields other than the column mappings, in name order.
    pub fn value_fields(&self) -> impl Iterator<Item = &Codebook> {
        self.fields
            .iter()
            .filter(|(name, _)| name.as_str() != COLUMN_MAPPINGS)
            .map(|(_, codebook)| codebook)
    }

    /// Raw column name -> canonical column name.
    pub fn column_mappings(&self) -> Result<BTreeMap<String, String>, HarmonizeError> {
        let codebook = self.require(COLUMN_MAPPINGS)?;
        let mut mappings = BTreeMap::new();
        for (raw, value) in codebook.entries() {
            let CodeValue::Category(target) = value else {
                return Err(HarmonizeError::configuration(
                    COLUMN_MAPPINGS,
                    format!("column '{raw}' must map to a column name, found {value}"),
                ));
            };
            mappings.insert(raw.to_string(), target.clone());
        }
        Ok(mappings)
    }
}

fn parse_field(field: &str, spec: &Value) -> Result<FieldSpec, CodebookError> {
    let mapping = match spec {
        Value::Mapping(mapping) => mapping,
        Value::Null => return Ok(FieldSpec::Flat(Codebook::new(field))),
        _ => {
            return Err(CodebookError::invalid(
                field,
                "field specification must be a mapping",
            ));
        }
    };
    let nested = mapping
        .values()
        .filter(|value| matches!(value, Value::Mapping(_)))
        .count();
    if nested == 0 {
        return parse_flat(field, mapping).map(FieldSpec::Flat);
    }
    if nested != mapping.len() {
        return Err(CodebookError::invalid(
            field,
            "mixes year sub-maps with flat entries",
        ));
    }
    let mut years = BTreeMap::new();
    for (year, sub_map) in mapping {
        let year = scalar_key(year)
            .ok_or_else(|| CodebookError::invalid(field, "year keys must be scalars"))?;
        let Value::Mapping(sub_map) = sub_map else {
            continue;
        };
        years.insert(year, parse_flat(field, sub_map)?);
    }
    Ok(FieldSpec::YearKeyed(years))
}

fn parse_flat(field: &str, mapping: &Mapping) -> Result<Codebook, CodebookError> {
    let mut codebook = Codebook::new(field);
    for (raw, value) in mapping {
        let raw = scalar_key(raw)
            .ok_or_else(|| CodebookError::invalid(field, "raw codes must be scalars"))?;
        let value = parse_value(field, &raw, value)?;
        codebook.insert(raw, value);
    }
    Ok(codebook)
}

fn parse_value(field: &str, raw: &str, value: &Value) -> Result<CodeValue, CodebookError> {
    match value {
        Value::Null => Ok(CodeValue::Missing),
        Value::Sequence(items) => {
            let bounds: Vec<i64> = items.iter().filter_map(bound_number).collect();
            if items.len() != 2 || bounds.len() != 2 {
                return Err(CodebookError::invalid(
                    field,
                    format!("code '{raw}': bounds must be a pair of numbers"),
                ));
            }
            let (lo, hi) = (bounds[0], bounds[1]);
            if lo > hi {
                return Err(CodebookError::invalid(
                    field,
                    format!("code '{raw}': lower bound {lo} exceeds upper bound {hi}"),
                ));
            }
            Ok(CodeValue::Bounds(lo, hi))
        }
        other => scalar_key(other).map(CodeValue::Category).ok_or_else(|| {
            CodebookError::invalid(field, format!("code '{raw}': unsupported value"))
        }),
    }
}

/// String form of a scalar, matching how frame cells are keyed.
fn scalar_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                Some(v.to_string())
            } else if let Some(v) = n.as_u64() {
                Some(v.to_string())
            } else {
                n.as_f64().map(format_numeric)
            }
        }
        _ => None,
    }
}

fn bound_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|v| v.is_finite()).map(|v| v as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
