// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Duplicate detection: one gesture set per name, newest wins

use serde::Serialize;

use super::GestureSet;

/// Sets sharing one name, split into the survivor and the extras
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    pub name: String,
    pub keep: GestureSet,
    pub discard: Vec<GestureSet>,
}

/// Group by name in first-seen order. Inside a group the most recently
/// modified set is kept; sets without a timestamp rank oldest and ties keep
/// listing order.
pub fn plan(sets: Vec<GestureSet>) -> Vec<DuplicateGroup> {
    let mut groups: Vec<(String, Vec<GestureSet>)> = Vec::new();

    for set in sets {
        match groups.iter_mut().find(|(name, _)| *name == set.name) {
            Some((_, members)) => members.push(set),
            None => groups.push((set.name.clone(), vec![set])),
        }
    }

    groups
        .into_iter()
        .map(|(name, mut members)| {
            members.sort_by(|a, b| b.modified_time.cmp(&a.modified_time));
            let keep = members.remove(0);
            DuplicateGroup {
                name,
                keep,
                discard: members,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn set(id: &str, name: &str, day: Option<u32>) -> GestureSet {
        GestureSet {
            id: id.to_string(),
            name: name.to_string(),
            modified_time: day.map(|d| Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap()),
            gesture_count: 0,
            drive_folder: format!("/GestureSets/{}/", name),
        }
    }

    #[test]
    fn test_keeps_newest_per_name() {
        let groups = plan(vec![
            set("a1", "Alpha", Some(1)),
            set("a2", "Alpha", Some(5)),
            set("b1", "Beta", Some(2)),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "Alpha");
        assert_eq!(groups[0].keep.id, "a2");
        assert_eq!(groups[0].discard.len(), 1);
        assert_eq!(groups[0].discard[0].id, "a1");
        assert_eq!(groups[1].keep.id, "b1");
        assert!(groups[1].discard.is_empty());
    }

    #[test]
    fn test_missing_timestamp_ranks_oldest() {
        let groups = plan(vec![set("x", "Gamma", None), set("y", "Gamma", Some(3))]);
        assert_eq!(groups[0].keep.id, "y");
    }

    #[test]
    fn test_ties_keep_first_listed() {
        let groups = plan(vec![set("first", "Delta", Some(4)), set("second", "Delta", Some(4))]);
        assert_eq!(groups[0].keep.id, "first");
    }

    #[test]
    fn test_empty_input() {
        assert!(plan(Vec::new()).is_empty());
    }
}
