//! Read-only views over a snapshot of the record store: filtering, search
//! and claim statistics. Nothing here mutates its input.

use crate::schema::{Claim, ClaimStatus, ClaimType, FeatureType, GeographicalFeature, Village};
use serde::{Serialize, Serializer};
use std::str::FromStr;

/// Sentinel the filter UI sends for "no constraint".
pub const WILDCARD: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector<T> {
    Any,
    Exactly(T),
}

impl<T> Default for Selector<T> {
    fn default() -> Self {
        Selector::Any
    }
}

impl<T> Selector<T> {
    pub fn is_any(&self) -> bool {
        matches!(self, Selector::Any)
    }

    fn admits(&self, matches: impl FnOnce(&T) -> bool) -> bool {
        match self {
            Selector::Any => true,
            Selector::Exactly(value) => matches(value),
        }
    }
}

impl<T: FromStr> FromStr for Selector<T> {
    type Err = T::Err;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == WILDCARD {
            Ok(Selector::Any)
        } else {
            value.parse().map(Selector::Exactly)
        }
    }
}

impl From<&str> for Selector<String> {
    fn from(value: &str) -> Self {
        if value == WILDCARD {
            Selector::Any
        } else {
            Selector::Exactly(value.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClaimFilter {
    pub state: Selector<String>,
    pub district: Selector<String>,
    pub claim_type: Selector<ClaimType>,
    pub status: Selector<ClaimStatus>,
}

impl ClaimFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches(&self, claim: &Claim) -> bool {
        self.state.admits(|state| region_key(&claim.state) == *state)
            && self
                .district
                .admits(|district| region_key(&claim.district) == *district)
            && self.claim_type.admits(|t| claim.claim_type == *t)
            && self.status.admits(|s| claim.status == *s)
    }
}

/// Key a stored state or district name is compared under.
///
/// Lower-cases and replaces only the FIRST space with `_`, so
/// "Madhya Pradesh" becomes "madhya_pradesh" but a three-word name keeps
/// its second space and will not match a fully underscored filter value.
/// This is very likely an unintended partial normalization; it is kept
/// as-is until the filter values are settled.
pub fn region_key(name: &str) -> String {
    name.to_lowercase().replacen(' ', "_", 1)
}

pub fn filter_claims(claims: &[Claim], filter: &ClaimFilter) -> Vec<Claim> {
    claims
        .iter()
        .filter(|claim| filter.matches(claim))
        .cloned()
        .collect()
}

/// Case-insensitive substring match on name, description, state and district.
pub fn search_claims(claims: &[Claim], query: &str) -> Vec<Claim> {
    let lowered = query.to_lowercase();
    claims
        .iter()
        .filter(|claim| {
            claim.name.to_lowercase().contains(&lowered)
                || claim
                    .description
                    .as_ref()
                    .is_some_and(|d| d.to_lowercase().contains(&lowered))
                || claim.state.to_lowercase().contains(&lowered)
                || claim.district.to_lowercase().contains(&lowered)
        })
        .cloned()
        .collect()
}

/// Claims table behavior: a non-empty query searches, otherwise filter.
pub fn browse_claims(claims: &[Claim], query: &str, filter: &ClaimFilter) -> Vec<Claim> {
    if query.is_empty() {
        filter_claims(claims, filter)
    } else {
        search_claims(claims, query)
    }
}

pub fn villages_by_state(villages: &[Village], state: &Selector<String>) -> Vec<Village> {
    villages
        .iter()
        .filter(|village| state.admits(|s| region_key(&village.state) == *s))
        .cloned()
        .collect()
}

pub fn features_by_type(
    features: &[GeographicalFeature],
    feature_type: FeatureType,
) -> Vec<GeographicalFeature> {
    features
        .iter()
        .filter(|feature| feature.feature_type == feature_type)
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub under_review: usize,
}

impl StatusCounts {
    pub fn get(&self, status: ClaimStatus) -> usize {
        match status {
            ClaimStatus::Pending => self.pending,
            ClaimStatus::Approved => self.approved,
            ClaimStatus::Rejected => self.rejected,
            ClaimStatus::UnderReview => self.under_review,
        }
    }

    fn bump(&mut self, status: ClaimStatus) {
        match status {
            ClaimStatus::Pending => self.pending += 1,
            ClaimStatus::Approved => self.approved += 1,
            ClaimStatus::Rejected => self.rejected += 1,
            ClaimStatus::UnderReview => self.under_review += 1,
        }
    }

    pub fn sum(&self) -> usize {
        self.pending + self.approved + self.rejected + self.under_review
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeCounts {
    #[serde(rename = "IFR")]
    pub ifr: usize,
    #[serde(rename = "CFR")]
    pub cfr: usize,
    #[serde(rename = "CR")]
    pub cr: usize,
}

impl TypeCounts {
    pub fn get(&self, claim_type: ClaimType) -> usize {
        match claim_type {
            ClaimType::Ifr => self.ifr,
            ClaimType::Cfr => self.cfr,
            ClaimType::Cr => self.cr,
        }
    }

    fn bump(&mut self, claim_type: ClaimType) {
        match claim_type {
            ClaimType::Ifr => self.ifr += 1,
            ClaimType::Cfr => self.cfr += 1,
            ClaimType::Cr => self.cr += 1,
        }
    }

    pub fn sum(&self) -> usize {
        self.ifr + self.cfr + self.cr
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateCount {
    pub state: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimStatistics {
    pub total: usize,
    pub by_status: StatusCounts,
    pub by_type: TypeCounts,
    /// In order of first appearance. Serialized as a `state -> count` map
    /// that keeps this order.
    #[serde(serialize_with = "serialize_state_counts")]
    pub by_state: Vec<StateCount>,
    pub total_area: f64,
    pub avg_area: f64,
}

fn serialize_state_counts<S: Serializer>(
    entries: &[StateCount],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(entries.iter().map(|entry| (&entry.state, entry.count)))
}

impl ClaimStatistics {
    pub fn state_count(&self, state: &str) -> usize {
        self.by_state
            .iter()
            .find(|entry| entry.state == state)
            .map_or(0, |entry| entry.count)
    }

    /// Share of claims with `status`, in percent; 0 when there are none.
    pub fn status_percentage(&self, status: ClaimStatus) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.by_status.get(status) as f64 / self.total as f64 * 100.0
    }
}

pub fn claim_statistics(claims: &[Claim]) -> ClaimStatistics {
    let mut stats = ClaimStatistics::default();
    for claim in claims {
        stats.total += 1;
        stats.by_status.bump(claim.status);
        stats.by_type.bump(claim.claim_type);
        stats.total_area += claim.area;
        match stats.by_state.iter_mut().find(|e| e.state == claim.state) {
            Some(entry) => entry.count += 1,
            None => stats.by_state.push(StateCount {
                state: claim.state.clone(),
                count: 1,
            }),
        }
    }
    stats.avg_area = if stats.total > 0 {
        stats.total_area / stats.total as f64
    } else {
        0.0
    };
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::Seed;

    fn ids(claims: &[Claim]) -> Vec<&str> {
        claims.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn wildcard_filter_returns_everything_in_order() {
        let claims = Seed::builtin().claims;
        let filter = ClaimFilter {
            state: "all".into(),
            district: "all".into(),
            claim_type: "all".parse().unwrap(),
            status: "all".parse().unwrap(),
        };
        assert_eq!(filter_claims(&claims, &filter), claims);
    }

    #[test]
    fn filter_combines_fields() {
        let claims = Seed::builtin().claims;
        let filter = ClaimFilter {
            state: "jharkhand".into(),
            status: Selector::Exactly(ClaimStatus::Approved),
            ..ClaimFilter::all()
        };
        assert_eq!(ids(&filter_claims(&claims, &filter)), ["claim_001", "claim_005"]);

        let filter = ClaimFilter {
            claim_type: Selector::Exactly(ClaimType::Cfr),
            district: "gumla".into(),
            ..ClaimFilter::all()
        };
        assert_eq!(ids(&filter_claims(&claims, &filter)), ["claim_005"]);
    }

    #[test]
    fn state_filter_expects_normalized_value() {
        let claims = Seed::builtin().claims;
        let normalized = ClaimFilter {
            state: "madhya_pradesh".into(),
            ..ClaimFilter::all()
        };
        assert_eq!(ids(&filter_claims(&claims, &normalized)), ["claim_004"]);

        // raw display names do not match
        let raw = ClaimFilter {
            state: "Madhya Pradesh".into(),
            ..ClaimFilter::all()
        };
        assert!(filter_claims(&claims, &raw).is_empty());
    }

    #[test]
    fn region_key_replaces_only_first_space() {
        assert_eq!(region_key("Madhya Pradesh"), "madhya_pradesh");
        assert_eq!(region_key("Dadra Nagar Haveli"), "dadra_nagar haveli");
        assert_eq!(region_key("ODISHA"), "odisha");
    }

    #[test]
    fn search_is_case_insensitive_over_all_text_fields() {
        let claims = Seed::builtin().claims;
        assert_eq!(ids(&search_claims(&claims, "koraput")), ["claim_002"]);
        assert_eq!(ids(&search_claims(&claims, "KORAPUT")), ["claim_002"]);
        // description only
        assert_eq!(ids(&search_claims(&claims, "ancestral")), ["claim_003"]);
        // name and state
        assert_eq!(ids(&search_claims(&claims, "jharkhand")), ["claim_001", "claim_005"]);
        assert!(search_claims(&claims, "nowhere").is_empty());
    }

    #[test]
    fn browse_prefers_search_when_query_given() {
        let claims = Seed::builtin().claims;
        let filter = ClaimFilter {
            status: Selector::Exactly(ClaimStatus::Rejected),
            ..ClaimFilter::all()
        };
        assert_eq!(ids(&browse_claims(&claims, "", &filter)), ["claim_004"]);
        assert_eq!(ids(&browse_claims(&claims, "bastar", &filter)), ["claim_003"]);
    }

    #[test]
    fn statistics_for_default_dataset() {
        let stats = claim_statistics(&Seed::builtin().claims);
        assert_eq!(stats.total, 5);
        assert_eq!(
            stats.by_status,
            StatusCounts {
                pending: 1,
                approved: 2,
                rejected: 1,
                under_review: 1,
            }
        );
        assert_eq!(stats.by_type, TypeCounts { ifr: 2, cfr: 2, cr: 1 });
        let states: Vec<_> = stats.by_state.iter().map(|e| e.state.as_str()).collect();
        assert_eq!(states, ["Jharkhand", "Odisha", "Chhattisgarh", "Madhya Pradesh"]);
        assert_eq!(stats.state_count("Jharkhand"), 2);
        assert!((stats.total_area - 786.4).abs() < 1e-9);
        assert!((stats.avg_area - 786.4 / 5.0).abs() < 1e-9);
        assert!((stats.status_percentage(ClaimStatus::Approved) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn statistics_for_empty_collection() {
        let stats = claim_statistics(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.avg_area, 0.0);
        assert_eq!(stats.status_percentage(ClaimStatus::Pending), 0.0);
        assert!(stats.by_state.is_empty());
    }

    #[test]
    fn statistics_serialize_with_dashboard_keys() {
        let value = serde_json::to_value(claim_statistics(&Seed::builtin().claims)).unwrap();
        assert_eq!(value["byStatus"]["under_review"], 1);
        assert_eq!(value["byType"]["IFR"], 2);
        assert!(value.get("avgArea").is_some());
        assert_eq!(value["byState"]["Jharkhand"], 2);
        assert_eq!(value["byState"]["Madhya Pradesh"], 1);
    }

    #[test]
    fn by_state_map_keeps_first_appearance_order() {
        let json = serde_json::to_string(&claim_statistics(&Seed::builtin().claims)).unwrap();
        let by_state = &json[json.find("\"byState\"").unwrap()..];
        let positions: Vec<usize> = ["Jharkhand", "Odisha", "Chhattisgarh", "Madhya Pradesh"]
            .iter()
            .map(|state| by_state.find(&format!("\"{state}\":")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]), "{by_state}");
    }

    #[test]
    fn villages_and_features_filters() {
        let seed = Seed::builtin();
        assert_eq!(villages_by_state(&seed.villages, &Selector::Any).len(), 3);
        let odisha = villages_by_state(&seed.villages, &"odisha".into());
        assert_eq!(odisha.len(), 1);
        assert_eq!(odisha[0].id, "village_002");

        let water = features_by_type(&seed.features, FeatureType::Water);
        assert_eq!(water.len(), 1);
        assert_eq!(water[0].id, "water_001");
        assert!(features_by_type(&seed.features, FeatureType::Settlement).is_empty());
    }
}
