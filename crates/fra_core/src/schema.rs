use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};

/// A `[longitude, latitude]` pair, serialized as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Coordinate(pub f64, pub f64);

impl Coordinate {
    pub fn lng(&self) -> f64 {
        self.0
    }

    pub fn lat(&self) -> f64 {
        self.1
    }

    pub fn is_finite(&self) -> bool {
        self.0.is_finite() && self.1.is_finite()
    }
}

/// Rejects values that would not survive a JSON round-trip (non-finite
/// numbers encode as `null`) and negative areas.
pub fn check_location(coordinates: Coordinate, area: Option<f64>) -> Result<()> {
    if !coordinates.is_finite() {
        return Err(anyhow!(
            "coordinates must be finite, got [{}, {}]",
            coordinates.0,
            coordinates.1
        ));
    }
    if let Some(area) = area {
        if !area.is_finite() {
            return Err(anyhow!("area must be finite, got {area}"));
        }
        if area < 0.0 {
            return Err(anyhow!("area must not be negative, got {area}"));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ClaimType {
    /// Individual Forest Rights
    #[serde(rename = "IFR")]
    Ifr,
    /// Community Forest Rights
    #[serde(rename = "CFR")]
    Cfr,
    /// Community Resource Rights
    #[serde(rename = "CR")]
    Cr,
}

impl ClaimType {
    pub const ALL: [ClaimType; 3] = [ClaimType::Ifr, ClaimType::Cfr, ClaimType::Cr];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimType::Ifr => "IFR",
            ClaimType::Cfr => "CFR",
            ClaimType::Cr => "CR",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ClaimType::Ifr => "Individual Forest Rights",
            ClaimType::Cfr => "Community Forest Rights",
            ClaimType::Cr => "Community Resource Rights",
        }
    }
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "IFR" => Ok(ClaimType::Ifr),
            "CFR" => Ok(ClaimType::Cfr),
            "CR" => Ok(ClaimType::Cr),
            _ => Err(anyhow!("Unknown claim type: {value}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Pending,
    Approved,
    Rejected,
    UnderReview,
}

impl ClaimStatus {
    pub const ALL: [ClaimStatus; 4] = [
        ClaimStatus::Pending,
        ClaimStatus::Approved,
        ClaimStatus::Rejected,
        ClaimStatus::UnderReview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Pending => "pending",
            ClaimStatus::Approved => "approved",
            ClaimStatus::Rejected => "rejected",
            ClaimStatus::UnderReview => "under_review",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ClaimStatus::Pending => "Pending",
            ClaimStatus::Approved => "Approved",
            ClaimStatus::Rejected => "Rejected",
            ClaimStatus::UnderReview => "Under Review",
        }
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "pending" => Ok(ClaimStatus::Pending),
            "approved" => Ok(ClaimStatus::Approved),
            "rejected" => Ok(ClaimStatus::Rejected),
            "under_review" => Ok(ClaimStatus::UnderReview),
            _ => Err(anyhow!("Unknown claim status: {value}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub id: String,
    pub name: String,
    pub claim_type: ClaimType,
    pub status: ClaimStatus,
    pub state: String,
    pub district: String,
    pub coordinates: Coordinate,
    pub area: f64,              // hectares
    pub submitted_date: String, // YYYY-MM-DD
    pub last_updated: String,   // YYYY-MM-DD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Input to `add_claim`: everything the store does not assign itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimDraft {
    pub name: String,
    pub claim_type: ClaimType,
    pub status: ClaimStatus,
    pub state: String,
    pub district: String,
    pub coordinates: Coordinate,
    pub area: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ClaimDraft {
    pub fn into_claim(self, id: String, today: String) -> Claim {
        Claim {
            id,
            name: self.name,
            claim_type: self.claim_type,
            status: self.status,
            state: self.state,
            district: self.district,
            coordinates: self.coordinates,
            area: self.area,
            submitted_date: today.clone(),
            last_updated: today,
            documents: self.documents,
            description: self.description,
        }
    }
}

/// Partial update for a claim. `None` keeps the existing value. The id and
/// both dates are owned by the store and cannot be patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimPatch {
    pub name: Option<String>,
    pub claim_type: Option<ClaimType>,
    pub status: Option<ClaimStatus>,
    pub state: Option<String>,
    pub district: Option<String>,
    pub coordinates: Option<Coordinate>,
    pub area: Option<f64>,
    pub documents: Option<Vec<String>>,
    pub description: Option<String>,
}

impl ClaimPatch {
    pub fn apply_to(self, claim: &mut Claim) {
        if let Some(name) = self.name {
            claim.name = name;
        }
        if let Some(claim_type) = self.claim_type {
            claim.claim_type = claim_type;
        }
        if let Some(status) = self.status {
            claim.status = status;
        }
        if let Some(state) = self.state {
            claim.state = state;
        }
        if let Some(district) = self.district {
            claim.district = district;
        }
        if let Some(coordinates) = self.coordinates {
            claim.coordinates = coordinates;
        }
        if let Some(area) = self.area {
            claim.area = area;
        }
        if let Some(documents) = self.documents {
            claim.documents = Some(documents);
        }
        if let Some(description) = self.description {
            claim.description = Some(description);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Village {
    pub id: String,
    pub name: String,
    pub coordinates: Coordinate,
    pub population: u64,
    pub state: String,
    pub district: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    Forest,
    Water,
    Agricultural,
    Settlement,
}

impl FeatureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::Forest => "forest",
            FeatureType::Water => "water",
            FeatureType::Agricultural => "agricultural",
            FeatureType::Settlement => "settlement",
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "forest" => Ok(FeatureType::Forest),
            "water" => Ok(FeatureType::Water),
            "agricultural" => Ok(FeatureType::Agricultural),
            "settlement" => Ok(FeatureType::Settlement),
            _ => Err(anyhow!("Unknown feature type: {value}")),
        }
    }
}

/// Scalar value of a feature property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(value) => write!(f, "{value}"),
            PropertyValue::Number(value) => write!(f, "{value}"),
            PropertyValue::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GeographicalFeature {
    pub id: String,
    #[serde(rename = "type")]
    pub feature_type: FeatureType,
    pub name: String,
    pub coordinates: Vec<Coordinate>, // boundary, in order
    pub area: f64,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

/// What the user was looking at when they clicked the map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UserSelection {
    pub id: String,
    pub coordinates: Coordinate,
    pub timestamp: String, // RFC 3339
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SelectionMetadata>,
}

/// All four collections as read at one moment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Snapshot {
    pub claims: Vec<Claim>,
    pub villages: Vec<Village>,
    pub features: Vec<GeographicalFeature>,
    pub selections: Vec<UserSelection>,
}

/// The export document. Import accepts any subset of the collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<Vec<Claim>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub villages: Option<Vec<Village>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<GeographicalFeature>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selections: Option<Vec<UserSelection>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_date: Option<String>,
}
