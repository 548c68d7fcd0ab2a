//! Feature encoding for ML inference
//!
//! Maps categorical columns to dense ids and standardizes numeric columns
//! using statistics captured at fit time. Encoding at inference time is a
//! pure replay of the fitted [`CodecState`].

use crate::error::CodecError;
use crate::models::{DisasterRecord, DisasterType, FeatureVector};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

/// Id every category unseen during fit is mapped to
pub const UNKNOWN_CATEGORY_ID: u32 = 0;

/// Column layout used for training and inference
pub const FEATURE_COLUMNS: [(&str, ColumnKind); 7] = [
    ("year", ColumnKind::Numeric),
    ("disaster_type", ColumnKind::Categorical),
    ("region", ColumnKind::Categorical),
    ("locality", ColumnKind::Categorical),
    ("people_affected", ColumnKind::Numeric),
    ("deaths", ColumnKind::Numeric),
    ("damages", ColumnKind::Numeric),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Categorical,
    Numeric,
}

/// A single raw cell
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Text(Cow<'a, str>),
    Number(f64),
}

/// Anything the codec can read columns from
pub trait FeatureSource {
    /// Return `None` when the column is absent or empty
    fn field(&self, column: &str) -> Option<FieldValue<'_>>;
}

impl FeatureSource for DisasterRecord {
    fn field(&self, column: &str) -> Option<FieldValue<'_>> {
        match column {
            "year" => Some(FieldValue::Number(self.year as f64)),
            "disaster_type" => Some(FieldValue::Text(Cow::Borrowed(self.disaster_type.as_str()))),
            "region" => Some(FieldValue::Text(Cow::Borrowed(&self.region))),
            "locality" => Some(FieldValue::Text(Cow::Borrowed(&self.locality))),
            "people_affected" => Some(FieldValue::Number(self.people_affected as f64)),
            "deaths" => Some(FieldValue::Number(self.deaths as f64)),
            "damages" => Some(FieldValue::Number(self.damages)),
            _ => None,
        }
    }
}

/// Untyped row keyed by column name, e.g. a parsed CSV line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord(BTreeMap<String, String>);

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }
}

impl FromIterator<(String, String)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FeatureSource for RawRecord {
    fn field(&self, column: &str) -> Option<FieldValue<'_>> {
        let value = self.0.get(column).map(|v| v.trim()).filter(|v| !v.is_empty())?;
        if column == "disaster_type" {
            // Same spelling a typed record would produce
            return Some(FieldValue::Text(Cow::Owned(DisasterType::parse(value).into())));
        }
        Some(FieldValue::Text(Cow::Borrowed(value)))
    }
}

/// Fitted encoding of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnEncoding {
    Categorical {
        name: String,
        vocabulary: BTreeMap<String, u32>,
    },
    Numeric {
        name: String,
        mean: f64,
        std_dev: f64,
    },
}

impl ColumnEncoding {
    pub fn name(&self) -> &str {
        match self {
            ColumnEncoding::Categorical { name, .. } | ColumnEncoding::Numeric { name, .. } => name,
        }
    }

    fn encode<S: FeatureSource + ?Sized>(&self, source: &S) -> Result<f32, CodecError> {
        match self {
            ColumnEncoding::Categorical { name, vocabulary } => {
                let value = read_text(source, name)?;
                Ok(vocabulary
                    .get(value.as_ref())
                    .copied()
                    .unwrap_or(UNKNOWN_CATEGORY_ID) as f32)
            }
            ColumnEncoding::Numeric { name, mean, std_dev } => {
                let value = read_number(source, name)?;
                Ok(((value - mean) / std_dev) as f32)
            }
        }
    }
}

/// Serializable codec statistics, including feature order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecState {
    pub columns: Vec<ColumnEncoding>,
}

impl CodecState {
    pub fn feature_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn num_features(&self) -> usize {
        self.columns.len()
    }

    /// Encode one record in fit-time column order
    pub fn encode<S: FeatureSource + ?Sized>(&self, record: &S) -> Result<FeatureVector, CodecError> {
        let values = self
            .columns
            .iter()
            .map(|column| column.encode(record))
            .collect::<Result<Vec<f32>, CodecError>>()?;
        Ok(FeatureVector::new(values))
    }
}

/// Fits [`CodecState`] from training records and replays it at inference time
#[derive(Debug, Clone)]
pub struct FeatureCodec {
    layout: Vec<(String, ColumnKind)>,
}

impl Default for FeatureCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureCodec {
    pub fn new() -> Self {
        Self::with_layout(FEATURE_COLUMNS.iter().map(|(name, kind)| (name.to_string(), *kind)))
    }

    pub fn with_layout(layout: impl IntoIterator<Item = (String, ColumnKind)>) -> Self {
        Self {
            layout: layout.into_iter().collect(),
        }
    }

    /// Compute vocabularies and standardization statistics over the training set
    pub fn fit<S: FeatureSource>(&self, records: &[S]) -> Result<CodecState, CodecError> {
        if records.is_empty() {
            return Err(CodecError::EmptyTrainingSet);
        }

        let mut columns = Vec::with_capacity(self.layout.len());
        for (name, kind) in &self.layout {
            let column = match kind {
                ColumnKind::Categorical => fit_categorical(name, records)?,
                ColumnKind::Numeric => fit_numeric(name, records)?,
            };
            columns.push(column);
        }

        tracing::debug!(
            records = records.len(),
            features = columns.len(),
            "Fitted feature codec"
        );
        Ok(CodecState { columns })
    }

    pub fn encode<S: FeatureSource + ?Sized>(
        &self,
        record: &S,
        state: &CodecState,
    ) -> Result<FeatureVector, CodecError> {
        state.encode(record)
    }
}

fn fit_categorical<S: FeatureSource>(name: &str, records: &[S]) -> Result<ColumnEncoding, CodecError> {
    let mut seen = BTreeSet::new();
    for record in records {
        seen.insert(read_text(record, name)?.into_owned());
    }
    let vocabulary = seen
        .into_iter()
        .enumerate()
        .map(|(i, value)| (value, UNKNOWN_CATEGORY_ID + 1 + i as u32))
        .collect();
    Ok(ColumnEncoding::Categorical {
        name: name.to_string(),
        vocabulary,
    })
}

fn fit_numeric<S: FeatureSource>(name: &str, records: &[S]) -> Result<ColumnEncoding, CodecError> {
    let values = records
        .iter()
        .map(|r| read_number(r, name))
        .collect::<Result<Vec<f64>, CodecError>>()?;
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    Ok(ColumnEncoding::Numeric {
        name: name.to_string(),
        mean,
        // constant columns encode to zero
        std_dev: if std_dev > f64::EPSILON { std_dev } else { 1.0 },
    })
}

fn read_text<'a, S: FeatureSource + ?Sized>(source: &'a S, name: &str) -> Result<Cow<'a, str>, CodecError> {
    match source.field(name) {
        Some(FieldValue::Text(text)) => Ok(text),
        Some(FieldValue::Number(_)) => Err(CodecError::wrong_type(name, "expected text, found a number")),
        None => Err(CodecError::missing(name)),
    }
}

fn read_number<S: FeatureSource + ?Sized>(source: &S, name: &str) -> Result<f64, CodecError> {
    let value = match source.field(name) {
        Some(FieldValue::Number(v)) => v,
        Some(FieldValue::Text(text)) => text
            .parse::<f64>()
            .map_err(|_| CodecError::wrong_type(name, format!("expected a number, found '{}'", text)))?,
        None => return Err(CodecError::missing(name)),
    };
    if !value.is_finite() {
        return Err(CodecError::wrong_type(name, "must be finite"));
    }
    Ok(value)
}
