//! Inhaler technique matrix normalisation.
//!
//! Staff record inhaler technique as a grid: for each step of inhaler use (prepare, inhale,
//! rinse, empty) and each device the patient uses, the step was done correctly, incorrectly, or
//! was not assessed. The form submits the whole grid on every save, including cells that were
//! never touched and cells the browser mangled.
//!
//! [`normalize`] turns whatever arrived into the canonical [`TechniqueMatrix`]:
//!
//! - all four step keys are always present, in step order;
//! - only `correct` and `incorrect` cells survive; `none`, unknown statuses and non-object
//!   cells are dropped;
//! - a missing or falsy note becomes an empty string.
//!
//! The derived device list is the set of devices with at least one surviving cell, in
//! first-seen order (step order, then device name within a step).
//!
//! Malformed input never produces an error. The worst case is an empty matrix.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Steps of inhaler use, in assessment order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    Prepare,
    Inhale,
    Rinse,
    Empty,
}

impl Step {
    pub const ALL: [Step; 4] = [Step::Prepare, Step::Inhale, Step::Rinse, Step::Empty];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Inhale => "inhale",
            Self::Rinse => "rinse",
            Self::Empty => "empty",
        }
    }
}

/// Assessed outcome of a single step on a single device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TechniqueStatus {
    Correct,
    Incorrect,
}

impl TechniqueStatus {
    /// Exact, case-sensitive match on the wire value. Anything else means "not assessed".
    fn from_wire(s: &str) -> Option<Self> {
        match s {
            "correct" => Some(Self::Correct),
            "incorrect" => Some(Self::Incorrect),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Correct => "correct",
            Self::Incorrect => "incorrect",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TechniqueEntry {
    pub status: TechniqueStatus,
    #[serde(default)]
    pub note: String,
}

/// Canonical technique grid: step, then device, then entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TechniqueMatrix {
    #[serde(default)]
    pub prepare: BTreeMap<String, TechniqueEntry>,
    #[serde(default)]
    pub inhale: BTreeMap<String, TechniqueEntry>,
    #[serde(default)]
    pub rinse: BTreeMap<String, TechniqueEntry>,
    #[serde(default)]
    pub empty: BTreeMap<String, TechniqueEntry>,
}

impl TechniqueMatrix {
    pub fn step(&self, step: Step) -> &BTreeMap<String, TechniqueEntry> {
        match step {
            Step::Prepare => &self.prepare,
            Step::Inhale => &self.inhale,
            Step::Rinse => &self.rinse,
            Step::Empty => &self.empty,
        }
    }

    fn step_mut(&mut self, step: Step) -> &mut BTreeMap<String, TechniqueEntry> {
        match step {
            Step::Prepare => &mut self.prepare,
            Step::Inhale => &mut self.inhale,
            Step::Rinse => &mut self.rinse,
            Step::Empty => &mut self.empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        Step::ALL.iter().all(|step| self.step(*step).is_empty())
    }

    /// Devices with at least one entry, deduplicated in first-seen order.
    pub fn devices(&self) -> Vec<String> {
        let mut devices: Vec<String> = Vec::new();
        for step in Step::ALL {
            for device in self.step(step).keys() {
                if !devices.iter().any(|d| d == device) {
                    devices.push(device.clone());
                }
            }
        }
        devices
    }
}

/// One raw cell. `None` fields were absent or not strings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct RawEntry {
    status: Option<String>,
    note: Option<String>,
}

impl RawEntry {
    /// Non-object cells carry no information and become `None`.
    fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut fields) = value else {
            return None;
        };
        let status = match fields.remove("status") {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };
        let note = match fields.remove("note") {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };
        Some(Self { status, note })
    }
}

/// Technique grid as submitted, after a single tolerant schema pass.
///
/// Deserialises from any JSON value and never fails: unknown step keys are ignored and a step
/// that is not an object counts as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Value")]
pub struct RawTechniqueInput {
    steps: BTreeMap<Step, BTreeMap<String, Option<RawEntry>>>,
}

impl From<Value> for RawTechniqueInput {
    fn from(value: Value) -> Self {
        let Value::Object(mut root) = value else {
            return Self::default();
        };

        let mut steps = BTreeMap::new();
        for step in Step::ALL {
            let Some(Value::Object(devices)) = root.remove(step.as_str()) else {
                continue;
            };
            let cells = devices
                .into_iter()
                .map(|(device, cell)| (device, RawEntry::from_value(cell)))
                .collect();
            steps.insert(step, cells);
        }
        Self { steps }
    }
}

impl From<&TechniqueMatrix> for RawTechniqueInput {
    fn from(matrix: &TechniqueMatrix) -> Self {
        let steps = Step::ALL
            .iter()
            .map(|step| {
                let cells = matrix
                    .step(*step)
                    .iter()
                    .map(|(device, entry)| {
                        let raw = RawEntry {
                            status: Some(entry.status.as_str().to_string()),
                            note: Some(entry.note.clone()),
                        };
                        (device.clone(), Some(raw))
                    })
                    .collect();
                (*step, cells)
            })
            .collect();
        Self { steps }
    }
}

/// Output of [`normalize`]: the canonical grid and the devices it mentions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTechnique {
    #[serde(rename = "techniqueSteps")]
    pub matrix: TechniqueMatrix,
    #[serde(rename = "inhalerDevices")]
    pub devices: Vec<String>,
}

/// Canonicalise a submitted technique grid.
///
/// `None` (no grid submitted) yields four empty steps and no devices.
pub fn normalize(raw: Option<&RawTechniqueInput>) -> NormalizedTechnique {
    let mut matrix = TechniqueMatrix::default();

    if let Some(raw) = raw {
        for step in Step::ALL {
            let Some(cells) = raw.steps.get(&step) else {
                continue;
            };
            let target = matrix.step_mut(step);
            for (device, cell) in cells {
                let Some(cell) = cell else {
                    continue;
                };
                let Some(status) = cell.status.as_deref().and_then(TechniqueStatus::from_wire)
                else {
                    continue;
                };
                target.insert(
                    device.clone(),
                    TechniqueEntry {
                        status,
                        note: cell.note.clone().unwrap_or_default(),
                    },
                );
            }
        }
    }

    let devices = matrix.devices();
    NormalizedTechnique { matrix, devices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Map};
    use std::collections::BTreeSet;

    fn raw(value: Value) -> RawTechniqueInput {
        serde_json::from_value(value).expect("raw technique input never fails to deserialise")
    }

    fn device_set(devices: &[String]) -> BTreeSet<&str> {
        devices.iter().map(String::as_str).collect()
    }

    #[test]
    fn absent_input_yields_four_empty_steps() {
        let out = normalize(None);
        assert!(out.matrix.is_empty());
        assert!(out.devices.is_empty());

        let json = serde_json::to_value(&out.matrix).unwrap();
        assert_eq!(
            json,
            json!({ "prepare": {}, "inhale": {}, "rinse": {}, "empty": {} })
        );
    }

    #[test]
    fn keeps_only_assessed_entries() {
        let input = raw(json!({
            "prepare": {
                "MDI": { "status": "correct", "note": "" },
                "TURBO": { "status": "none" }
            },
            "inhale": {
                "MDI": { "status": "incorrect", "note": "too fast" }
            }
        }));

        let out = normalize(Some(&input));

        assert_eq!(
            serde_json::to_value(&out.matrix).unwrap(),
            json!({
                "prepare": { "MDI": { "status": "correct", "note": "" } },
                "inhale": { "MDI": { "status": "incorrect", "note": "too fast" } },
                "rinse": {},
                "empty": {}
            })
        );
        assert_eq!(out.devices, vec!["MDI".to_string()]);
    }

    #[test]
    fn null_entry_is_dropped_without_error() {
        let input = raw(json!({ "rinse": { "ACCU": null } }));
        let out = normalize(Some(&input));
        assert!(out.matrix.is_empty());
        assert!(out.devices.is_empty());
    }

    #[test]
    fn conflicting_statuses_across_steps_list_device_once() {
        let input = raw(json!({
            "prepare": { "ELLIPTA": { "status": "correct" } },
            "empty": { "ELLIPTA": { "status": "incorrect" } }
        }));
        let out = normalize(Some(&input));

        assert_eq!(out.devices, vec!["ELLIPTA".to_string()]);
        assert_eq!(out.matrix.prepare["ELLIPTA"].status, TechniqueStatus::Correct);
        assert_eq!(out.matrix.empty["ELLIPTA"].status, TechniqueStatus::Incorrect);
        assert_eq!(out.matrix.prepare["ELLIPTA"].note, "");
    }

    #[test]
    fn status_match_is_case_sensitive() {
        let input = raw(json!({ "inhale": { "NS": { "status": "Correct" } } }));
        assert!(normalize(Some(&input)).matrix.is_empty());
    }

    #[test]
    fn non_string_note_and_status_degrade_quietly() {
        let input = raw(json!({
            "prepare": {
                "HAND": { "status": "correct", "note": 42 },
                "MDI": { "status": 1, "note": "ignored" },
                "NS": "correct",
                "TURBO": [1, 2]
            }
        }));
        let out = normalize(Some(&input));

        assert_eq!(out.matrix.prepare.len(), 1);
        assert_eq!(out.matrix.prepare["HAND"].note, "");
        assert_eq!(out.devices, vec!["HAND".to_string()]);
    }

    #[test]
    fn non_object_root_and_steps_are_treated_as_absent() {
        for value in [json!(null), json!([1, 2, 3]), json!("grid"), json!(7)] {
            let out = normalize(Some(&raw(value)));
            assert!(out.matrix.is_empty());
        }

        let input = raw(json!({ "prepare": [ { "status": "correct" } ], "bogus": {} }));
        assert!(normalize(Some(&input)).matrix.is_empty());
    }

    #[test]
    fn unknown_devices_are_accepted_as_keys() {
        let input = raw(json!({ "rinse": { "Custom device 9": { "status": "incorrect" } } }));
        let out = normalize(Some(&input));
        assert_eq!(out.devices, vec!["Custom device 9".to_string()]);
    }

    #[test]
    fn devices_follow_step_order_then_name() {
        let input = raw(json!({
            "empty": { "ACCU": { "status": "correct" } },
            "prepare": { "TURBO": { "status": "correct" }, "MDI": { "status": "incorrect" } }
        }));
        let out = normalize(Some(&input));
        assert_eq!(out.devices, vec!["MDI", "TURBO", "ACCU"]);
    }

    #[test]
    fn stored_matrix_deserialises_with_missing_steps() {
        let matrix: TechniqueMatrix =
            serde_json::from_value(json!({ "inhale": { "MDI": { "status": "correct" } } }))
                .unwrap();
        assert_eq!(matrix.inhale["MDI"].note, "");
        assert!(matrix.prepare.is_empty());
    }

    fn device_key() -> impl Strategy<Value = String> {
        prop_oneof![
            prop::sample::select(vec!["MDI", "TURBO", "ACCU", "NS", "HAND", "ELLIPTA", "SPIOLTO"])
                .prop_map(String::from),
            "[A-Za-z0-9 ]{1,6}",
        ]
    }

    fn status_value() -> impl Strategy<Value = Option<Value>> {
        prop_oneof![
            Just(None),
            Just(Some(json!("correct"))),
            Just(Some(json!("incorrect"))),
            Just(Some(json!("none"))),
            Just(Some(json!(null))),
            Just(Some(json!(true))),
            "[a-z]{1,8}".prop_map(|s| Some(Value::from(s))),
        ]
    }

    fn note_value() -> impl Strategy<Value = Option<Value>> {
        prop_oneof![
            Just(None),
            Just(Some(json!(""))),
            Just(Some(json!(null))),
            any::<i32>().prop_map(|n| Some(Value::from(n))),
            "[a-z ]{0,10}".prop_map(|s| Some(Value::from(s))),
        ]
    }

    fn cell() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<i64>().prop_map(Value::from),
            "[a-z]{0,6}".prop_map(Value::from),
            (status_value(), note_value()).prop_map(|(status, note)| {
                let mut fields = Map::new();
                if let Some(status) = status {
                    fields.insert("status".into(), status);
                }
                if let Some(note) = note {
                    fields.insert("note".into(), note);
                }
                Value::Object(fields)
            }),
        ]
    }

    fn step_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            prop::collection::btree_map(device_key(), cell(), 0..6)
                .prop_map(|cells| Value::Object(cells.into_iter().collect())),
            Just(Value::Null),
            Just(json!([])),
        ]
    }

    fn raw_grid() -> impl Strategy<Value = Value> {
        let step_key = prop::sample::select(vec!["prepare", "inhale", "rinse", "empty", "extra"])
            .prop_map(String::from);
        prop_oneof![
            8 => prop::collection::btree_map(step_key, step_value(), 0..5)
                .prop_map(|steps| Value::Object(steps.into_iter().collect())),
            1 => Just(Value::Null),
            1 => Just(json!(["prepare"])),
        ]
    }

    proptest! {
        #[test]
        fn normalising_canonical_output_is_identity(grid in raw_grid()) {
            let first = normalize(Some(&raw(grid)));

            let from_matrix = normalize(Some(&RawTechniqueInput::from(&first.matrix)));
            prop_assert_eq!(&from_matrix, &first);

            let as_json = serde_json::to_value(&first.matrix).unwrap();
            let from_json = normalize(Some(&raw(as_json)));
            prop_assert_eq!(&from_json, &first);
        }

        #[test]
        fn only_assessed_statuses_survive(grid in raw_grid()) {
            let out = normalize(Some(&raw(grid.clone())));
            for step in Step::ALL {
                for (device, entry) in out.matrix.step(step) {
                    let submitted = grid
                        .get(step.as_str())
                        .and_then(|cells| cells.get(device))
                        .and_then(|cell| cell.get("status"))
                        .and_then(Value::as_str);
                    prop_assert_eq!(submitted, Some(entry.status.as_str()));
                }
            }
        }

        #[test]
        fn output_always_has_exactly_four_steps(grid in raw_grid()) {
            let out = normalize(Some(&raw(grid)));
            let json = serde_json::to_value(&out.matrix).unwrap();
            let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
            prop_assert_eq!(keys.len(), 4);
            for step in Step::ALL {
                prop_assert!(json.get(step.as_str()).is_some_and(Value::is_object));
            }
        }

        #[test]
        fn device_list_matches_surviving_entries(grid in raw_grid()) {
            let out = normalize(Some(&raw(grid)));

            let mut expected = BTreeSet::new();
            for step in Step::ALL {
                expected.extend(out.matrix.step(step).keys().map(String::as_str));
            }
            prop_assert_eq!(device_set(&out.devices), expected);
            prop_assert_eq!(device_set(&out.devices).len(), out.devices.len());
        }

        #[test]
        fn normalising_is_deterministic(grid in raw_grid()) {
            let input = raw(grid);
            prop_assert_eq!(normalize(Some(&input)), normalize(Some(&input)));
        }
    }
}
