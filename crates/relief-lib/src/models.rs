//! Core data models for severity assessment and relief allocation

use crate::error::{AllocationError, ParseLabelError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Ordinal disaster impact classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SeverityLabel {
    Low,
    Medium,
    High,
}

impl SeverityLabel {
    /// All labels in ascending order
    pub const ALL: [SeverityLabel; 3] = [SeverityLabel::Low, SeverityLabel::Medium, SeverityLabel::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLabel::Low => "Low",
            SeverityLabel::Medium => "Medium",
            SeverityLabel::High => "High",
        }
    }

    /// Position in [`SeverityLabel::ALL`]
    pub fn index(&self) -> usize {
        match self {
            SeverityLabel::Low => 0,
            SeverityLabel::Medium => 1,
            SeverityLabel::High => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for SeverityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeverityLabel {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(SeverityLabel::Low),
            "medium" => Ok(SeverityLabel::Medium),
            "high" => Ok(SeverityLabel::High),
            _ => Err(ParseLabelError::Severity(s.to_string())),
        }
    }
}

/// One value per severity band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerSeverity<T> {
    pub low: T,
    pub medium: T,
    pub high: T,
}

impl<T: Copy> PerSeverity<T> {
    pub fn new(low: T, medium: T, high: T) -> Self {
        Self { low, medium, high }
    }

    pub fn get(&self, severity: SeverityLabel) -> T {
        match severity {
            SeverityLabel::Low => self.low,
            SeverityLabel::Medium => self.medium,
            SeverityLabel::High => self.high,
        }
    }
}

/// Kind of reported disaster.
///
/// Parsing is an exact, case-insensitive match against the known kinds.
/// Anything else becomes [`DisasterType::Other`] holding the trimmed,
/// lowercased name, so "Volcano" and "volcano" are the same type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DisasterType {
    Flood,
    Earthquake,
    Cyclone,
    Drought,
    Landslide,
    Wildfire,
    Tsunami,
    Other(String),
}

impl DisasterType {
    pub const KNOWN: [DisasterType; 7] = [
        DisasterType::Flood,
        DisasterType::Earthquake,
        DisasterType::Cyclone,
        DisasterType::Drought,
        DisasterType::Landslide,
        DisasterType::Wildfire,
        DisasterType::Tsunami,
    ];

    pub fn parse(value: &str) -> Self {
        let normalized = value.trim().to_lowercase();
        match normalized.as_str() {
            "flood" => DisasterType::Flood,
            "earthquake" => DisasterType::Earthquake,
            "cyclone" => DisasterType::Cyclone,
            "drought" => DisasterType::Drought,
            "landslide" => DisasterType::Landslide,
            "wildfire" => DisasterType::Wildfire,
            "tsunami" => DisasterType::Tsunami,
            _ => DisasterType::Other(normalized),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DisasterType::Flood => "flood",
            DisasterType::Earthquake => "earthquake",
            DisasterType::Cyclone => "cyclone",
            DisasterType::Drought => "drought",
            DisasterType::Landslide => "landslide",
            DisasterType::Wildfire => "wildfire",
            DisasterType::Tsunami => "tsunami",
            DisasterType::Other(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, DisasterType::Other(_))
    }
}

impl From<String> for DisasterType {
    fn from(value: String) -> Self {
        DisasterType::parse(&value)
    }
}

impl From<&str> for DisasterType {
    fn from(value: &str) -> Self {
        DisasterType::parse(value)
    }
}

impl From<DisasterType> for String {
    fn from(value: DisasterType) -> Self {
        match value {
            DisasterType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for DisasterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relief resource categories distributed from the shared pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    FoodKits,
    WaterPacks,
    MedicineKits,
    ShelterUnits,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::FoodKits,
        ResourceKind::WaterPacks,
        ResourceKind::MedicineKits,
        ResourceKind::ShelterUnits,
    ];

    /// Machine-readable key, matches the serde representation
    pub fn key(&self) -> &'static str {
        match self {
            ResourceKind::FoodKits => "food_kits",
            ResourceKind::WaterPacks => "water_packs",
            ResourceKind::MedicineKits => "medicine_kits",
            ResourceKind::ShelterUnits => "shelter_units",
        }
    }

    /// Human-readable name for reports
    pub fn display_name(&self) -> &'static str {
        match self {
            ResourceKind::FoodKits => "Food Kits",
            ResourceKind::WaterPacks => "Water Packs",
            ResourceKind::MedicineKits => "Medicine Kits",
            ResourceKind::ShelterUnits => "Shelter Units",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ResourceKind {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "food_kits" | "food" => Ok(ResourceKind::FoodKits),
            "water_packs" | "water" => Ok(ResourceKind::WaterPacks),
            "medicine_kits" | "medicine" => Ok(ResourceKind::MedicineKits),
            "shelter_units" | "shelter" => Ok(ResourceKind::ShelterUnits),
            _ => Err(ParseLabelError::Resource(s.to_string())),
        }
    }
}

/// Non-negative quantity per resource kind. Missing kinds read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceVector(BTreeMap<ResourceKind, u64>);

/// Per-disaster required quantities
pub type NeedVector = ResourceVector;

impl ResourceVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vector with an explicit zero for every kind
    pub fn zeroed() -> Self {
        Self(ResourceKind::ALL.iter().map(|kind| (*kind, 0)).collect())
    }

    pub fn with(mut self, kind: ResourceKind, quantity: u64) -> Self {
        self.set(kind, quantity);
        self
    }

    pub fn get(&self, kind: ResourceKind) -> u64 {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    pub fn set(&mut self, kind: ResourceKind, quantity: u64) {
        self.0.insert(kind, quantity);
    }

    pub fn add(&mut self, kind: ResourceKind, quantity: u64) {
        let entry = self.0.entry(kind).or_insert(0);
        *entry = entry.saturating_add(quantity);
    }

    pub fn total(&self) -> u64 {
        self.0.values().fold(0u64, |acc, v| acc.saturating_add(*v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, u64)> + '_ {
        self.0.iter().map(|(kind, qty)| (*kind, *qty))
    }
}

impl FromIterator<(ResourceKind, u64)> for ResourceVector {
    fn from_iter<I: IntoIterator<Item = (ResourceKind, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Caller-owned resource inventory.
///
/// Quantities are signed so malformed input can be represented and rejected
/// by [`ResourcePool::validate`] before any allocation math runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourcePool(BTreeMap<ResourceKind, i64>);

impl ResourcePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: ResourceKind, quantity: i64) -> Self {
        self.set(kind, quantity);
        self
    }

    pub fn set(&mut self, kind: ResourceKind, quantity: i64) {
        self.0.insert(kind, quantity);
    }

    pub fn get(&self, kind: ResourceKind) -> i64 {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    /// Check every quantity is non-negative and return the validated stock
    pub fn validate(&self) -> Result<ResourceVector, AllocationError> {
        let mut stock = ResourceVector::zeroed();
        for (kind, quantity) in &self.0 {
            if *quantity < 0 {
                return Err(AllocationError::InvalidPool {
                    kind: *kind,
                    quantity: *quantity,
                });
            }
            stock.set(*kind, *quantity as u64);
        }
        Ok(stock)
    }
}

impl From<&ResourceVector> for ResourcePool {
    fn from(stock: &ResourceVector) -> Self {
        Self(
            stock
                .iter()
                .map(|(kind, qty)| (kind, i64::try_from(qty).unwrap_or(i64::MAX)))
                .collect(),
        )
    }
}

/// Historical or freshly reported disaster event with raw impact numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterRecord {
    pub year: i32,
    pub disaster_type: DisasterType,
    pub region: String,
    pub locality: String,
    pub people_affected: u64,
    pub deaths: u64,
    pub damages: f64,
}

/// A disaster awaiting resources in an allocation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterReport {
    pub location: String,
    pub disaster_type: DisasterType,
    pub severity: SeverityLabel,
    pub people_affected: u64,
}

impl DisasterReport {
    pub fn new(
        severity: SeverityLabel,
        people_affected: u64,
        disaster_type: impl Into<DisasterType>,
    ) -> Self {
        Self {
            location: "Unknown".to_string(),
            disaster_type: disaster_type.into(),
            severity,
            people_affected,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }
}

/// Encoded feature vector for ML inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub values: Vec<f32>,
}

impl FeatureVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}
