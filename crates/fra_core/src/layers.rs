//! Map layer toggles and the option lists the claim filters offer.

use crate::query::WILDCARD;
use crate::schema::{Claim, ClaimStatus, ClaimType, FeatureType, GeographicalFeature};
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    FraIfr,
    FraCfr,
    FraCr,
    Villages,
    Forests,
    Agricultural,
    Water,
    Settlements,
    Satellite,
}

impl Layer {
    pub const ALL: [Layer; 9] = [
        Layer::FraIfr,
        Layer::FraCfr,
        Layer::FraCr,
        Layer::Villages,
        Layer::Forests,
        Layer::Agricultural,
        Layer::Water,
        Layer::Settlements,
        Layer::Satellite,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Layer::FraIfr => "fraIFR",
            Layer::FraCfr => "fraCFR",
            Layer::FraCr => "fraCR",
            Layer::Villages => "villages",
            Layer::Forests => "forests",
            Layer::Agricultural => "agricultural",
            Layer::Water => "water",
            Layer::Settlements => "settlements",
            Layer::Satellite => "satellite",
        }
    }

    pub fn for_claim_type(claim_type: ClaimType) -> Layer {
        match claim_type {
            ClaimType::Ifr => Layer::FraIfr,
            ClaimType::Cfr => Layer::FraCfr,
            ClaimType::Cr => Layer::FraCr,
        }
    }

    pub fn for_feature_type(feature_type: FeatureType) -> Layer {
        match feature_type {
            FeatureType::Forest => Layer::Forests,
            FeatureType::Water => Layer::Water,
            FeatureType::Agricultural => Layer::Agricultural,
            FeatureType::Settlement => Layer::Settlements,
        }
    }
}

impl FromStr for Layer {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        Layer::ALL
            .into_iter()
            .find(|layer| layer.id() == value)
            .ok_or_else(|| anyhow!("Unknown layer: {value}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSet {
    #[serde(rename = "fraIFR")]
    pub fra_ifr: bool,
    #[serde(rename = "fraCFR")]
    pub fra_cfr: bool,
    #[serde(rename = "fraCR")]
    pub fra_cr: bool,
    pub villages: bool,
    pub forests: bool,
    pub agricultural: bool,
    pub water: bool,
    pub settlements: bool,
    pub satellite: bool,
}

impl Default for LayerSet {
    fn default() -> Self {
        Self {
            fra_ifr: true,
            fra_cfr: true,
            fra_cr: false,
            villages: true,
            forests: true,
            agricultural: false,
            water: true,
            settlements: false,
            satellite: true,
        }
    }
}

impl LayerSet {
    pub fn is_on(&self, layer: Layer) -> bool {
        match layer {
            Layer::FraIfr => self.fra_ifr,
            Layer::FraCfr => self.fra_cfr,
            Layer::FraCr => self.fra_cr,
            Layer::Villages => self.villages,
            Layer::Forests => self.forests,
            Layer::Agricultural => self.agricultural,
            Layer::Water => self.water,
            Layer::Settlements => self.settlements,
            Layer::Satellite => self.satellite,
        }
    }

    pub fn set(&mut self, layer: Layer, on: bool) {
        let slot = match layer {
            Layer::FraIfr => &mut self.fra_ifr,
            Layer::FraCfr => &mut self.fra_cfr,
            Layer::FraCr => &mut self.fra_cr,
            Layer::Villages => &mut self.villages,
            Layer::Forests => &mut self.forests,
            Layer::Agricultural => &mut self.agricultural,
            Layer::Water => &mut self.water,
            Layer::Settlements => &mut self.settlements,
            Layer::Satellite => &mut self.satellite,
        };
        *slot = on;
    }

    pub fn visible_count(&self) -> usize {
        Layer::ALL.iter().filter(|layer| self.is_on(**layer)).count()
    }
}

pub fn visible_claims(claims: &[Claim], layers: &LayerSet) -> Vec<Claim> {
    claims
        .iter()
        .filter(|claim| layers.is_on(Layer::for_claim_type(claim.claim_type)))
        .cloned()
        .collect()
}

pub fn visible_features(
    features: &[GeographicalFeature],
    layers: &LayerSet,
) -> Vec<GeographicalFeature> {
    features
        .iter()
        .filter(|feature| layers.is_on(Layer::for_feature_type(feature.feature_type)))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

fn options(all_label: &str, entries: &[(&str, &str)]) -> Vec<FilterOption> {
    std::iter::once((WILDCARD, all_label))
        .chain(entries.iter().copied())
        .map(|(value, label)| FilterOption {
            value: value.to_string(),
            label: label.to_string(),
        })
        .collect()
}

pub fn state_options() -> Vec<FilterOption> {
    options(
        "All States",
        &[
            ("jharkhand", "Jharkhand"),
            ("odisha", "Odisha"),
            ("chhattisgarh", "Chhattisgarh"),
            ("madhya_pradesh", "Madhya Pradesh"),
        ],
    )
}

pub fn district_options() -> Vec<FilterOption> {
    options(
        "All Districts",
        &[
            ("ranchi", "Ranchi"),
            ("gumla", "Gumla"),
            ("koraput", "Koraput"),
            ("bastar", "Bastar"),
            ("mandla", "Mandla"),
        ],
    )
}

pub fn claim_type_options() -> Vec<FilterOption> {
    let entries: Vec<_> = ClaimType::ALL.iter().map(|t| (t.as_str(), t.label())).collect();
    options("All Types", &entries)
}

pub fn status_options() -> Vec<FilterOption> {
    let entries: Vec<_> = ClaimStatus::ALL
        .iter()
        .map(|s| (s.as_str(), s.label()))
        .collect();
    options("All Status", &entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{ClaimFilter, filter_claims};
    use crate::seed::Seed;

    #[test]
    fn default_layers() {
        let layers = LayerSet::default();
        assert_eq!(layers.visible_count(), 6);
        assert!(!layers.is_on(Layer::FraCr));
        assert!(layers.is_on(Layer::Satellite));
    }

    #[test]
    fn toggling_changes_visible_claims() {
        let claims = Seed::builtin().claims;
        let mut layers = LayerSet::default();
        // the single CR claim is hidden by default
        assert_eq!(visible_claims(&claims, &layers).len(), 4);
        layers.set("fraCR".parse().unwrap(), true);
        assert_eq!(visible_claims(&claims, &layers).len(), 5);
        layers.set(Layer::FraIfr, false);
        assert_eq!(visible_claims(&claims, &layers).len(), 3);
    }

    #[test]
    fn feature_visibility_follows_type_layers() {
        let features = Seed::builtin().features;
        let ids: Vec<_> = visible_features(&features, &LayerSet::default())
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(ids, ["forest_001", "water_001"]);
    }

    #[test]
    fn layer_ids_round_trip_and_reject_unknown() {
        for layer in Layer::ALL {
            assert_eq!(layer.id().parse::<Layer>().unwrap(), layer);
        }
        assert!("terrain".parse::<Layer>().is_err());
    }

    #[test]
    fn every_state_option_selects_a_seed_claim() {
        let claims = Seed::builtin().claims;
        for option in state_options().into_iter().skip(1) {
            let filter = ClaimFilter {
                state: option.value.as_str().into(),
                ..ClaimFilter::all()
            };
            assert!(!filter_claims(&claims, &filter).is_empty(), "{}", option.value);
        }
    }

    #[test]
    fn option_lists_start_with_wildcard() {
        for list in [
            state_options(),
            district_options(),
            claim_type_options(),
            status_options(),
        ] {
            assert_eq!(list[0].value, WILDCARD);
        }
        assert_eq!(status_options()[4].value, "under_review");
        assert_eq!(claim_type_options()[1].label, "Individual Forest Rights");
    }
}
