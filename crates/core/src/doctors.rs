//! Doctor profiles.
//!
//! The directory only knows what the booking engine needs about a doctor: that the profile
//! exists and which specialization it advertises. Names, contact details and verification live
//! with the account system upstream.

use crate::locks;
use careslot_ids::DoctorId;
use careslot_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DoctorProfile {
    pub id: DoctorId,
    pub specialization: NonEmptyText,
}

#[derive(Debug, Default)]
pub struct DoctorDirectory {
    profiles: RwLock<HashMap<DoctorId, DoctorProfile>>,
}

impl DoctorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the doctor's specialization, creating the profile on first use.
    ///
    /// Returns the stored profile and whether it was newly created.
    pub fn set_specialization(
        &self,
        id: DoctorId,
        specialization: NonEmptyText,
    ) -> (DoctorProfile, bool) {
        let mut profiles = locks::write(&self.profiles);
        match profiles.get_mut(&id) {
            Some(profile) => {
                profile.specialization = specialization;
                (profile.clone(), false)
            }
            None => {
                let profile = DoctorProfile { id, specialization };
                profiles.insert(id, profile.clone());
                (profile, true)
            }
        }
    }

    pub fn exists(&self, id: &DoctorId) -> bool {
        locks::read(&self.profiles).contains_key(id)
    }

    pub fn get(&self, id: &DoctorId) -> Option<DoctorProfile> {
        locks::read(&self.profiles).get(id).cloned()
    }

    /// Distinct specializations across all doctors, sorted.
    pub fn specialties(&self) -> Vec<String> {
        locks::read(&self.profiles)
            .values()
            .map(|p| p.specialization.as_str().to_owned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Doctors advertising exactly `specialty`, ordered by id.
    pub fn by_specialty(&self, specialty: &str) -> Vec<DoctorProfile> {
        let specialty = specialty.trim();
        let mut matches: Vec<DoctorProfile> = locks::read(&self.profiles)
            .values()
            .filter(|p| p.specialization.as_str() == specialty)
            .cloned()
            .collect();
        matches.sort_by_key(|p| p.id);
        matches
    }

    pub(crate) fn all(&self) -> Vec<DoctorProfile> {
        let mut all: Vec<DoctorProfile> = locks::read(&self.profiles).values().cloned().collect();
        all.sort_by_key(|p| p.id);
        all
    }

    /// Puts a profile back to `previous`, removing it when there was none.
    pub(crate) fn restore_profile(&self, id: DoctorId, previous: Option<DoctorProfile>) {
        let mut profiles = locks::write(&self.profiles);
        match previous {
            Some(profile) => {
                profiles.insert(id, profile);
            }
            None => {
                profiles.remove(&id);
            }
        }
    }

    pub(crate) fn replace_all(&self, profiles: Vec<DoctorProfile>) {
        let mut guard = locks::write(&self.profiles);
        guard.clear();
        guard.extend(profiles.into_iter().map(|p| (p.id, p)));
    }
}
