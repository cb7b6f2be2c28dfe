//! YAML snapshot of the booking state.
//!
//! The snapshot is the on-disk form of the three stores. It is strict: unknown keys and wrongly
//! typed fields are rejected with the path of the offending field, and semantic checks
//! (capacity bounds, duplicate keys) run when the snapshot is applied to the stores.
//!
//! Writes go to a sibling temporary file that is then renamed over the target, so a crash never
//! leaves a half-written snapshot behind.

use crate::constants::SNAPSHOT_VERSION;
use crate::slots::SlotKey;
use crate::doctors::DoctorProfile;
use crate::ledger::Appointment;
use crate::slots::Slot;
use crate::{BookingError, BookingResult};
use careslot_ids::DoctorId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    pub version: u32,
    #[serde(default)]
    pub doctors: Vec<DoctorProfile>,
    #[serde(default)]
    pub slots: Vec<DoctorSlots>,
    #[serde(default)]
    pub appointments: Vec<Appointment>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DoctorSlots {
    pub doctor_id: DoctorId,
    pub slots: Vec<Slot>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            doctors: Vec::new(),
            slots: Vec::new(),
            appointments: Vec::new(),
        }
    }
}

impl Snapshot {
    /// Parse a snapshot from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::SnapshotSchema`] naming the failing field path when the YAML does
    /// not match the schema, or when the version is not supported.
    pub fn parse(yaml_text: &str) -> BookingResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

        let snapshot = match serde_path_to_error::deserialize::<_, Snapshot>(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() || path == "." {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(BookingError::SnapshotSchema(format!(
                    "snapshot mismatch at {path}: {source}"
                )));
            }
        };

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(BookingError::SnapshotSchema(format!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }

        Ok(snapshot)
    }

    /// Checks that every slot's `booked_count` equals the number of live appointments holding a
    /// place in it.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::SnapshotSchema`] naming the first slot whose count disagrees.
    pub fn check_booked_counts(&self) -> BookingResult<()> {
        let mut live: HashMap<(SlotKey, u64), u32> = HashMap::new();
        for appointment in self.appointments.iter().filter(|a| a.status.is_live()) {
            *live
                .entry((appointment.slot_key(), appointment.slot_generation))
                .or_default() += 1;
        }

        for doctor in &self.slots {
            for slot in &doctor.slots {
                let key = SlotKey::new(doctor.doctor_id, slot.date, slot.time);
                let holders = live.get(&(key, slot.generation)).copied().unwrap_or(0);
                if holders != slot.booked_count {
                    return Err(BookingError::SnapshotSchema(format!(
                        "slot {} {} for doctor {} has booked_count {} but {} live appointments",
                        slot.date, slot.time, doctor.doctor_id, slot.booked_count, holders
                    )));
                }
            }
        }
        Ok(())
    }

    /// Highest slot generation any appointment refers to.
    pub(crate) fn highest_appointment_generation(&self) -> u64 {
        self.appointments
            .iter()
            .map(|a| a.slot_generation)
            .max()
            .unwrap_or(0)
    }

    /// Render the snapshot as YAML text.
    pub fn render(&self) -> BookingResult<String> {
        serde_yaml::to_string(self).map_err(BookingError::SnapshotSerialization)
    }

    /// Reads a snapshot file. A missing file yields `Ok(None)`.
    pub fn read(path: &Path) -> BookingResult<Option<Self>> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text).map(Some),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(BookingError::FileRead(err)),
        }
    }

    /// Writes the snapshot via a temporary file and an atomic rename.
    pub fn write(&self, path: &Path) -> BookingResult<()> {
        let yaml = self.render()?;
        let tmp = path.with_extension("yaml.tmp");
        fs::write(&tmp, yaml).map_err(BookingError::FileWrite)?;
        fs::rename(&tmp, path).map_err(BookingError::FileWrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"version: 1
doctors:
  - id: 7f4c2e9d4b0a4f3a9a2c0e9a6b5d1c88
    specialization: Cardiology
slots:
  - doctor_id: 7f4c2e9d4b0a4f3a9a2c0e9a6b5d1c88
    slots:
      - date: "2025-06-01"
        time: "10:00"
        generation: 1
        booked_count: 1
appointments:
  - id: a4f91c6d3b2e4c5f9d7a1e8b6c0a9f12
    doctor_id: 7f4c2e9d4b0a4f3a9a2c0e9a6b5d1c88
    patient_id: 550e8400e29b41d4a716446655440000
    date: "2025-06-01"
    time: "10:00"
    slot_generation: 1
    status: booked
    created_at: "2025-05-20T09:00:00Z"
    updated_at: "2025-05-20T09:00:00Z"
"#;

    #[test]
    fn parses_and_re_renders_sample() {
        let snapshot = Snapshot::parse(SAMPLE).expect("parse sample");
        assert_eq!(snapshot.doctors.len(), 1);
        assert_eq!(snapshot.slots[0].slots[0].booked_count, 1);
        assert_eq!(snapshot.appointments[0].time.to_string(), "10:00");

        let rendered = snapshot.render().expect("render");
        assert_eq!(Snapshot::parse(&rendered).expect("reparse"), snapshot);
    }

    #[test]
    fn rejects_unknown_keys_with_path() {
        let input = SAMPLE.replace("    specialization: Cardiology\n", "    specialization: Cardiology\n    ward: 3\n");
        match Snapshot::parse(&input) {
            Err(BookingError::SnapshotSchema(msg)) => {
                assert!(msg.contains("doctors[0]"), "{msg}");
                assert!(msg.contains("ward"), "{msg}");
            }
            other => panic!("expected SnapshotSchema, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_values_with_path() {
        let input = SAMPLE.replace("time: \"10:00\"\n        generation", "time: \"10am\"\n        generation");
        match Snapshot::parse(&input) {
            Err(BookingError::SnapshotSchema(msg)) => {
                assert!(msg.contains("slots[0].slots[0].time"), "{msg}");
            }
            other => panic!("expected SnapshotSchema, got {other:?}"),
        }
    }

    #[test]
    fn booked_counts_must_match_live_appointments() {
        let snapshot = Snapshot::parse(SAMPLE).unwrap();
        snapshot.check_booked_counts().expect("sample is consistent");

        let overcounted = Snapshot::parse(&SAMPLE.replace("booked_count: 1", "booked_count: 2")).unwrap();
        assert!(matches!(
            overcounted.check_booked_counts(),
            Err(BookingError::SnapshotSchema(msg)) if msg.contains("1 live appointments")
        ));

        let cancelled = Snapshot::parse(&SAMPLE.replace("status: booked", "status: cancelled")).unwrap();
        assert!(cancelled.check_booked_counts().is_err());

        // An appointment from an earlier slot at the same time holds no place in this one.
        let stale = Snapshot::parse(&SAMPLE.replace("slot_generation: 1", "slot_generation: 0")).unwrap();
        assert!(stale.check_booked_counts().is_err());
        assert_eq!(snapshot.highest_appointment_generation(), 1);
    }

    #[test]
    fn rejects_unknown_version() {
        let input = SAMPLE.replace("version: 1", "version: 9");
        assert!(matches!(
            Snapshot::parse(&input),
            Err(BookingError::SnapshotSchema(msg)) if msg.contains("version 9")
        ));
    }

    #[test]
    fn write_then_read_round_trips_and_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.yaml");
        assert!(Snapshot::read(&path).unwrap().is_none());

        let snapshot = Snapshot::parse(SAMPLE).unwrap();
        snapshot.write(&path).expect("write");
        assert!(!path.with_extension("yaml.tmp").exists());
        assert_eq!(Snapshot::read(&path).unwrap(), Some(snapshot));
    }
}
