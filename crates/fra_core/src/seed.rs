use crate::schema::{
    Claim, ClaimStatus, ClaimType, Coordinate, FeatureType, GeographicalFeature, PropertyValue,
    Village,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Default collections written by `initialize` and returned by readers when
/// nothing is persisted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub claims: Vec<Claim>,
    #[serde(default)]
    pub villages: Vec<Village>,
    #[serde(default)]
    pub features: Vec<GeographicalFeature>,
}

impl Default for Seed {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Seed {
    /// Loads a replacement dataset from YAML. Collections missing from the
    /// file are empty, not built-in.
    pub fn load_yaml(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading seed file {}", path.display()))?;
        let seed: Seed = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing seed file {}", path.display()))?;
        Ok(seed)
    }

    pub fn builtin() -> Self {
        Self {
            claims: builtin_claims(),
            villages: builtin_villages(),
            features: builtin_features(),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn claim(
    id: &str,
    name: &str,
    claim_type: ClaimType,
    status: ClaimStatus,
    state: &str,
    district: &str,
    coordinates: Coordinate,
    area: f64,
    submitted_date: &str,
    last_updated: &str,
    documents: &[&str],
    description: &str,
) -> Claim {
    Claim {
        id: id.to_string(),
        name: name.to_string(),
        claim_type,
        status,
        state: state.to_string(),
        district: district.to_string(),
        coordinates,
        area,
        submitted_date: submitted_date.to_string(),
        last_updated: last_updated.to_string(),
        documents: Some(documents.iter().map(|d| d.to_string()).collect()),
        description: Some(description.to_string()),
    }
}

fn builtin_claims() -> Vec<Claim> {
    vec![
        claim(
            "claim_001",
            "Tribal Community Land Claim - Jharkhand",
            ClaimType::Ifr,
            ClaimStatus::Approved,
            "Jharkhand",
            "Ranchi",
            Coordinate(85.3240, 23.3441),
            150.5,
            "2024-01-15",
            "2024-03-20",
            &["land_survey.pdf", "community_certificate.pdf"],
            "Traditional grazing and farming land used by tribal community for generations.",
        ),
        claim(
            "claim_002",
            "Forest Rights Claim - Odisha",
            ClaimType::Cfr,
            ClaimStatus::Pending,
            "Odisha",
            "Koraput",
            Coordinate(82.7121, 18.8137),
            89.3,
            "2024-02-10",
            "2024-09-15",
            &["forest_map.pdf"],
            "Community forest management rights for sustainable livelihood.",
        ),
        claim(
            "claim_003",
            "Individual Forest Rights - Chhattisgarh",
            ClaimType::Ifr,
            ClaimStatus::UnderReview,
            "Chhattisgarh",
            "Bastar",
            Coordinate(81.9661, 19.0728),
            25.7,
            "2024-03-05",
            "2024-09-10",
            &["individual_claim.pdf", "residence_proof.pdf"],
            "Individual farming rights on ancestral land.",
        ),
        claim(
            "claim_004",
            "Community Resource Rights - Madhya Pradesh",
            ClaimType::Cr,
            ClaimStatus::Rejected,
            "Madhya Pradesh",
            "Mandla",
            Coordinate(80.3700, 22.5977),
            200.1,
            "2024-01-20",
            "2024-08-30",
            &["community_resolution.pdf"],
            "Rights over water bodies and minor forest produce.",
        ),
        claim(
            "claim_005",
            "Tribal Forest Rights - Jharkhand",
            ClaimType::Cfr,
            ClaimStatus::Approved,
            "Jharkhand",
            "Gumla",
            Coordinate(84.5399, 23.0438),
            320.8,
            "2024-02-28",
            "2024-07-15",
            &["tribal_certificate.pdf", "forest_boundary.pdf"],
            "Community forest rights for traditional practices and conservation.",
        ),
    ]
}

fn village(
    id: &str,
    name: &str,
    coordinates: Coordinate,
    population: u64,
    state: &str,
    district: &str,
) -> Village {
    Village {
        id: id.to_string(),
        name: name.to_string(),
        coordinates,
        population,
        state: state.to_string(),
        district: district.to_string(),
    }
}

fn builtin_villages() -> Vec<Village> {
    vec![
        village(
            "village_001",
            "Birsa Nagar",
            Coordinate(85.3240, 23.3441),
            1200,
            "Jharkhand",
            "Ranchi",
        ),
        village(
            "village_002",
            "Koraput Village",
            Coordinate(82.7121, 18.8137),
            850,
            "Odisha",
            "Koraput",
        ),
        village(
            "village_003",
            "Bastar Settlement",
            Coordinate(81.9661, 19.0728),
            650,
            "Chhattisgarh",
            "Bastar",
        ),
    ]
}

fn props(entries: &[(&str, PropertyValue)]) -> BTreeMap<String, PropertyValue> {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

fn text(value: &str) -> PropertyValue {
    PropertyValue::Text(value.to_string())
}

fn builtin_features() -> Vec<GeographicalFeature> {
    vec![
        GeographicalFeature {
            id: "forest_001".to_string(),
            feature_type: FeatureType::Forest,
            name: "Saranda Forest".to_string(),
            coordinates: vec![
                Coordinate(85.2, 23.2),
                Coordinate(85.4, 23.2),
                Coordinate(85.4, 23.4),
                Coordinate(85.2, 23.4),
            ],
            area: 2500.0,
            properties: props(&[
                ("forestType", text("Sal Forest")),
                ("biodiversity", text("High")),
            ]),
        },
        GeographicalFeature {
            id: "water_001".to_string(),
            feature_type: FeatureType::Water,
            name: "Subarnarekha River".to_string(),
            coordinates: vec![Coordinate(85.1, 23.1), Coordinate(85.5, 23.5)],
            area: 150.0,
            properties: props(&[
                ("waterType", text("River")),
                ("seasonal", PropertyValue::Bool(false)),
            ]),
        },
        GeographicalFeature {
            id: "agricultural_001".to_string(),
            feature_type: FeatureType::Agricultural,
            name: "Paddy Fields".to_string(),
            coordinates: vec![
                Coordinate(85.0, 23.0),
                Coordinate(85.2, 23.0),
                Coordinate(85.2, 23.1),
                Coordinate(85.0, 23.1),
            ],
            area: 180.0,
            properties: props(&[
                ("cropType", text("Rice")),
                ("irrigation", text("Rain-fed")),
            ]),
        },
    ]
}
