//! The record store: the four persisted collections behind a
//! [`KeyValueBackend`], read and written whole on every call.

use crate::clock::{Clock, SystemClock, format_date, format_timestamp, unix_millis};
use crate::db::{
    ALL_KEYS, CLAIMS_KEY, FEATURES_KEY, KeyValueBackend, USER_SELECTIONS_KEY, VILLAGES_KEY,
};
use crate::query::{self, ClaimFilter, ClaimStatistics, Selector};
use crate::schema::{
    Claim, ClaimDraft, ClaimPatch, Coordinate, ExportDocument, FeatureType, GeographicalFeature,
    SelectionMetadata, Snapshot, UserSelection, Village, check_location,
};
use crate::seed::Seed;
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

pub const MAX_USER_SELECTIONS: usize = 50;

pub struct RecordStore<B, C = SystemClock> {
    backend: B,
    clock: C,
    seed: Seed,
}

impl<B: KeyValueBackend> RecordStore<B, SystemClock> {
    pub fn new(backend: B) -> Self {
        Self::with_parts(backend, SystemClock, Seed::builtin())
    }
}

impl<B: KeyValueBackend, C: Clock> RecordStore<B, C> {
    pub fn with_parts(backend: B, clock: C, seed: Seed) -> Self {
        Self {
            backend,
            clock,
            seed,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Writes the seed collections under any key that has nothing stored.
    pub fn initialize(&mut self) -> Result<()> {
        if self.backend.get(CLAIMS_KEY)?.is_none() {
            info!(count = self.seed.claims.len(), "seeding claims");
            let claims = self.seed.claims.clone();
            self.write(CLAIMS_KEY, &claims)?;
        }
        if self.backend.get(VILLAGES_KEY)?.is_none() {
            info!(count = self.seed.villages.len(), "seeding villages");
            let villages = self.seed.villages.clone();
            self.write(VILLAGES_KEY, &villages)?;
        }
        if self.backend.get(FEATURES_KEY)?.is_none() {
            info!(count = self.seed.features.len(), "seeding features");
            let features = self.seed.features.clone();
            self.write(FEATURES_KEY, &features)?;
        }
        Ok(())
    }

    pub fn get_claims(&self) -> Result<Vec<Claim>> {
        Ok(self
            .read(CLAIMS_KEY)?
            .unwrap_or_else(|| self.seed.claims.clone()))
    }

    pub fn get_villages(&self) -> Result<Vec<Village>> {
        Ok(self
            .read(VILLAGES_KEY)?
            .unwrap_or_else(|| self.seed.villages.clone()))
    }

    pub fn get_features(&self) -> Result<Vec<GeographicalFeature>> {
        Ok(self
            .read(FEATURES_KEY)?
            .unwrap_or_else(|| self.seed.features.clone()))
    }

    pub fn get_user_selections(&self) -> Result<Vec<UserSelection>> {
        Ok(self.read(USER_SELECTIONS_KEY)?.unwrap_or_default())
    }

    pub fn get_claim(&self, id: &str) -> Result<Option<Claim>> {
        Ok(self.get_claims()?.into_iter().find(|claim| claim.id == id))
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            claims: self.get_claims()?,
            villages: self.get_villages()?,
            features: self.get_features()?,
            selections: self.get_user_selections()?,
        })
    }

    /// Fails without writing when the area is negative or any number is not
    /// finite.
    pub fn add_claim(&mut self, draft: ClaimDraft) -> Result<Claim> {
        check_location(draft.coordinates, Some(draft.area))?;
        let mut claims = self.get_claims()?;
        let now = self.clock.now();
        let id = unique_id("claim", unix_millis(now), |candidate| {
            claims.iter().any(|claim| claim.id == candidate)
        });
        let claim = draft.into_claim(id, format_date(now.date())?);
        claims.push(claim.clone());
        self.write(CLAIMS_KEY, &claims)?;
        debug!(id = %claim.id, "claim added");
        Ok(claim)
    }

    /// Returns `None` without writing when no claim has `id`. A patch whose
    /// result fails the `add_claim` checks is an error and writes nothing.
    pub fn update_claim(&mut self, id: &str, patch: ClaimPatch) -> Result<Option<Claim>> {
        let mut claims = self.get_claims()?;
        let Some(claim) = claims.iter_mut().find(|claim| claim.id == id) else {
            debug!(id, "update skipped, claim not found");
            return Ok(None);
        };
        let mut updated = claim.clone();
        patch.apply_to(&mut updated);
        check_location(updated.coordinates, Some(updated.area))?;
        updated.last_updated = format_date(self.clock.today())?;
        *claim = updated.clone();
        self.write(CLAIMS_KEY, &claims)?;
        debug!(id, "claim updated");
        Ok(Some(updated))
    }

    /// Returns whether a claim was removed; nothing is written otherwise.
    pub fn delete_claim(&mut self, id: &str) -> Result<bool> {
        let claims = self.get_claims()?;
        let before = claims.len();
        let remaining: Vec<Claim> = claims.into_iter().filter(|claim| claim.id != id).collect();
        if remaining.len() == before {
            debug!(id, "delete skipped, claim not found");
            return Ok(false);
        }
        self.write(CLAIMS_KEY, &remaining)?;
        debug!(id, "claim deleted");
        Ok(true)
    }

    /// Appends a selection and drops the oldest beyond the most recent 50.
    pub fn save_user_selection(
        &mut self,
        coordinates: Coordinate,
        metadata: Option<SelectionMetadata>,
    ) -> Result<UserSelection> {
        check_location(coordinates, None)?;
        let mut selections = self.get_user_selections()?;
        let now = self.clock.now();
        let id = unique_id("selection", unix_millis(now), |candidate| {
            selections.iter().any(|selection| selection.id == candidate)
        });
        let selection = UserSelection {
            id,
            coordinates,
            timestamp: format_timestamp(now)?,
            metadata,
        };
        selections.push(selection.clone());
        if selections.len() > MAX_USER_SELECTIONS {
            let excess = selections.len() - MAX_USER_SELECTIONS;
            selections.drain(..excess);
        }
        self.write(USER_SELECTIONS_KEY, &selections)?;
        Ok(selection)
    }

    pub fn clear_user_selections(&mut self) -> Result<()> {
        self.backend.remove(USER_SELECTIONS_KEY)
    }

    pub fn export_data(&self) -> Result<String> {
        let snapshot = self.snapshot()?;
        let document = ExportDocument {
            claims: Some(snapshot.claims),
            villages: Some(snapshot.villages),
            features: Some(snapshot.features),
            selections: Some(snapshot.selections),
            export_date: Some(format_timestamp(self.clock.now())?),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Overwrites each collection present in `raw`. Returns `Ok(false)` and
    /// writes nothing when `raw` does not parse as an export document or
    /// carries a claim with a negative area.
    ///
    /// The per-collection writes are not atomic as a group: a backend fault
    /// part way through leaves earlier collections already replaced.
    pub fn import_data(&mut self, raw: &str) -> Result<bool> {
        let document: ExportDocument = match serde_json::from_str(raw) {
            Ok(document) => document,
            Err(err) => {
                warn!(error = %err, "failed to import data");
                return Ok(false);
            }
        };
        let rejected = document.claims.iter().flatten().find_map(|claim| {
            check_location(claim.coordinates, Some(claim.area))
                .err()
                .map(|err| (claim.id.as_str(), err))
        });
        if let Some((id, err)) = rejected {
            warn!(id, error = %err, "failed to import data");
            return Ok(false);
        }
        if let Some(claims) = &document.claims {
            self.write(CLAIMS_KEY, claims)?;
        }
        if let Some(villages) = &document.villages {
            self.write(VILLAGES_KEY, villages)?;
        }
        if let Some(features) = &document.features {
            self.write(FEATURES_KEY, features)?;
        }
        if let Some(selections) = &document.selections {
            self.write(USER_SELECTIONS_KEY, selections)?;
        }
        info!(
            claims = document.claims.as_ref().map(Vec::len),
            villages = document.villages.as_ref().map(Vec::len),
            features = document.features.as_ref().map(Vec::len),
            selections = document.selections.as_ref().map(Vec::len),
            "data imported"
        );
        Ok(true)
    }

    pub fn clear_all_data(&mut self) -> Result<()> {
        for key in ALL_KEYS {
            self.backend.remove(key)?;
        }
        info!("all data cleared");
        Ok(())
    }

    pub fn get_filtered_claims(&self, filter: &ClaimFilter) -> Result<Vec<Claim>> {
        Ok(query::filter_claims(&self.get_claims()?, filter))
    }

    pub fn search_claims(&self, query: &str) -> Result<Vec<Claim>> {
        Ok(query::search_claims(&self.get_claims()?, query))
    }

    pub fn browse_claims(&self, query: &str, filter: &ClaimFilter) -> Result<Vec<Claim>> {
        Ok(query::browse_claims(&self.get_claims()?, query, filter))
    }

    pub fn get_claim_statistics(&self) -> Result<ClaimStatistics> {
        Ok(query::claim_statistics(&self.get_claims()?))
    }

    pub fn get_villages_by_state(&self, state: &Selector<String>) -> Result<Vec<Village>> {
        Ok(query::villages_by_state(&self.get_villages()?, state))
    }

    pub fn get_features_by_type(&self, feature_type: FeatureType) -> Result<Vec<GeographicalFeature>> {
        Ok(query::features_by_type(&self.get_features()?, feature_type))
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<Vec<T>>> {
        let Some(raw) = self.backend.get(key)? else {
            return Ok(None);
        };
        let items: Vec<T> =
            serde_json::from_str(&raw).with_context(|| format!("decoding stored {key}"))?;
        debug!(key, count = items.len(), "read collection");
        Ok(Some(items))
    }

    fn write<T: Serialize>(&mut self, key: &str, items: &[T]) -> Result<()> {
        let raw = serde_json::to_string(items)?;
        self.backend.set(key, &raw)?;
        debug!(key, count = items.len(), "wrote collection");
        Ok(())
    }
}

/// `<prefix>_<millis>`, suffixed with a counter while `taken` says the
/// candidate is already in use.
fn unique_id(prefix: &str, millis: i128, taken: impl Fn(&str) -> bool) -> String {
    let base = format!("{prefix}_{millis}");
    if !taken(&base) {
        return base;
    }
    (1..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::db::MemoryBackend;
    use crate::schema::{ClaimStatus, ClaimType};
    use time::macros::datetime;

    fn store() -> RecordStore<MemoryBackend, FixedClock> {
        RecordStore::with_parts(
            MemoryBackend::new(),
            FixedClock(datetime!(2024-10-01 09:00:00 UTC)),
            Seed::builtin(),
        )
    }

    fn draft(name: &str) -> ClaimDraft {
        ClaimDraft {
            name: name.to_string(),
            claim_type: ClaimType::Ifr,
            status: ClaimStatus::Pending,
            state: "Odisha".to_string(),
            district: "Rayagada".to_string(),
            coordinates: Coordinate(83.4, 19.2),
            area: 12.0,
            documents: None,
            description: None,
        }
    }

    #[test]
    fn unique_id_suffixes_on_collision() {
        let taken = ["claim_7".to_string(), "claim_7_1".to_string()];
        let id = unique_id("claim", 7, |c| taken.iter().any(|t| t == c));
        assert_eq!(id, "claim_7_2");
        assert_eq!(unique_id("claim", 8, |_| false), "claim_8");
    }

    #[test]
    fn initialize_is_idempotent_and_keeps_existing_data() {
        let mut store = store();
        store.initialize().unwrap();
        assert_eq!(store.backend().len(), 3);
        store.delete_claim("claim_001").unwrap();
        store.initialize().unwrap();
        assert_eq!(store.get_claims().unwrap().len(), 4);
    }

    #[test]
    fn readers_fall_back_to_seed_without_writing() {
        let store = store();
        assert_eq!(store.get_claims().unwrap().len(), 5);
        assert_eq!(store.get_villages().unwrap().len(), 3);
        assert_eq!(store.get_features().unwrap().len(), 3);
        assert!(store.get_user_selections().unwrap().is_empty());
        assert!(store.backend().is_empty());
    }

    #[test]
    fn add_claim_stamps_id_and_dates() {
        let mut store = store();
        store.initialize().unwrap();
        let claim = store.add_claim(draft("New claim")).unwrap();
        assert_eq!(claim.id, "claim_1727773200000");
        assert_eq!(claim.submitted_date, "2024-10-01");
        assert_eq!(claim.last_updated, "2024-10-01");
        let claims = store.get_claims().unwrap();
        assert_eq!(claims.len(), 6);
        assert_eq!(claims.last(), Some(&claim));
    }

    #[test]
    fn update_unknown_claim_writes_nothing() {
        let mut store = store();
        let patch = ClaimPatch {
            name: Some("x".to_string()),
            ..ClaimPatch::default()
        };
        assert_eq!(store.update_claim("missing", patch).unwrap(), None);
        assert!(store.backend().is_empty());
    }

    #[test]
    fn update_forces_last_updated() {
        let mut store = store();
        store.initialize().unwrap();
        let updated = store
            .update_claim(
                "claim_002",
                ClaimPatch {
                    status: Some(ClaimStatus::Approved),
                    ..ClaimPatch::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, "claim_002");
        assert_eq!(updated.status, ClaimStatus::Approved);
        assert_eq!(updated.last_updated, "2024-10-01");
        assert_eq!(updated.submitted_date, "2024-02-10");
        assert_eq!(store.get_claim("claim_002").unwrap(), Some(updated));
    }

    #[test]
    fn selections_are_capped() {
        let mut store = store();
        for i in 0..55 {
            store
                .save_user_selection(Coordinate(f64::from(i), 0.0), None)
                .unwrap();
        }
        let selections = store.get_user_selections().unwrap();
        assert_eq!(selections.len(), MAX_USER_SELECTIONS);
        assert_eq!(selections[0].coordinates, Coordinate(5.0, 0.0));
        assert_eq!(selections[49].coordinates, Coordinate(54.0, 0.0));
        store.clear_user_selections().unwrap();
        assert!(store.get_user_selections().unwrap().is_empty());
    }

    #[test]
    fn add_claim_rejects_unstorable_numbers() {
        let mut store = store();
        store.initialize().unwrap();
        let before = store.backend().clone();
        let cases = [
            (Coordinate(83.4, 19.2), f64::NAN),
            (Coordinate(83.4, 19.2), f64::INFINITY),
            (Coordinate(83.4, 19.2), -5.0),
            (Coordinate(f64::NAN, 19.2), 1.0),
            (Coordinate(83.4, f64::NEG_INFINITY), 1.0),
        ];
        for (coordinates, area) in cases {
            let bad = ClaimDraft {
                coordinates,
                area,
                ..draft("Bad")
            };
            assert!(store.add_claim(bad).is_err(), "{coordinates:?} {area}");
        }
        assert_eq!(
            store.backend().get(CLAIMS_KEY).unwrap(),
            before.get(CLAIMS_KEY).unwrap()
        );
        assert_eq!(store.get_claims().unwrap().len(), 5);
    }

    #[test]
    fn add_claim_accepts_zero_area() {
        let mut store = store();
        let claim = store
            .add_claim(ClaimDraft {
                area: 0.0,
                ..draft("Empty plot")
            })
            .unwrap();
        assert_eq!(claim.area, 0.0);
    }

    #[test]
    fn update_claim_rejects_unstorable_numbers() {
        let mut store = store();
        store.initialize().unwrap();
        let before = store.backend().clone();
        let patches = [
            ClaimPatch {
                area: Some(-1.0),
                ..ClaimPatch::default()
            },
            ClaimPatch {
                area: Some(f64::NAN),
                ..ClaimPatch::default()
            },
            ClaimPatch {
                coordinates: Some(Coordinate(f64::INFINITY, 0.0)),
                ..ClaimPatch::default()
            },
        ];
        for patch in patches {
            assert!(store.update_claim("claim_001", patch).is_err());
        }
        assert_eq!(
            store.backend().get(CLAIMS_KEY).unwrap(),
            before.get(CLAIMS_KEY).unwrap()
        );
        let claims = store.get_claims().unwrap();
        assert!(claims.iter().all(|claim| claim.area >= 0.0));
    }

    #[test]
    fn selection_rejects_non_finite_coordinates() {
        let mut store = store();
        assert!(
            store
                .save_user_selection(Coordinate(f64::NAN, 10.0), None)
                .is_err()
        );
        assert!(store.backend().is_empty());
        assert!(store.get_user_selections().unwrap().is_empty());
    }

    #[test]
    fn malformed_import_writes_nothing() {
        let mut store = store();
        store.initialize().unwrap();
        let before = store.backend().clone();
        assert!(!store.import_data("{ not json").unwrap());
        assert!(!store.import_data(r#"{"claims": [{"id": 1}]}"#).unwrap());
        assert_eq!(
            store.backend().get(CLAIMS_KEY).unwrap(),
            before.get(CLAIMS_KEY).unwrap()
        );
    }

    #[test]
    fn clear_all_data_removes_every_key() {
        let mut store = store();
        store.initialize().unwrap();
        store.save_user_selection(Coordinate(1.0, 2.0), None).unwrap();
        store.clear_all_data().unwrap();
        assert!(store.backend().is_empty());
    }
}
