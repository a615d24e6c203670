// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Phase timeline resolution
//!
//! Elements exist over a half-open interval of phases
//! `[created, demolished)`. Room containment only matches a target against
//! rooms valid in a phase where the target exists, and the latest such phase
//! wins, so the timeline order is correctness input: a misordered timeline
//! produces wrong matches without failing.

use crate::model::{ElementId, Phase};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::ops::Range;

/// Phases in chronological order
#[derive(Debug, Clone, Default)]
pub struct PhaseTimeline {
    phases: Vec<Phase>,
    index: FxHashMap<ElementId, usize>,
}

impl PhaseTimeline {
    /// Order phases by their sequence field when every phase has one,
    /// otherwise keep declaration order
    pub fn ordered(phases: &[Phase]) -> Self {
        let mut phases = phases.to_vec();
        if phases.iter().all(|p| p.sequence.is_some()) {
            // Stable: equal sequences keep declaration order
            phases.sort_by_key(|p| p.sequence);
        }
        let index = phases.iter().enumerate().map(|(i, p)| (p.id, i)).collect();
        Self { phases, index }
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn index_of(&self, phase: ElementId) -> Option<usize> {
        self.index.get(&phase).copied()
    }

    /// Phase indices in which an element exists
    ///
    /// Unknown or missing created phases start at the first phase; unknown or
    /// missing demolished phases run to the end of the timeline.
    pub fn valid_phase_range(&self, created: Option<ElementId>, demolished: Option<ElementId>) -> Range<usize> {
        let start = created.and_then(|p| self.index_of(p)).unwrap_or(0);
        let end = demolished
            .and_then(|p| self.index_of(p))
            .unwrap_or(self.phases.len());
        start..end.max(start)
    }

    /// True when the element exists in `phase`; an element does not exist in
    /// the phase in which it is demolished
    pub fn exists_in_phase(&self, created: Option<ElementId>, demolished: Option<ElementId>, phase: ElementId) -> bool {
        self.index_of(phase)
            .is_some_and(|i| self.valid_phase_range(created, demolished).contains(&i))
    }

    /// Map each of this timeline's phase indices onto `other` by phase name
    ///
    /// `None` unless the names correspond one to one.
    pub fn map_by_name(&self, other: &PhaseTimeline) -> Option<Vec<usize>> {
        if self.len() != other.len() {
            return None;
        }
        let by_name: FxHashMap<&str, usize> = other
            .phases
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.as_str(), i))
            .collect();
        if by_name.len() != other.len() {
            return None;
        }

        let mut mapping = Vec::with_capacity(self.len());
        let mut used = vec![false; other.len()];
        for phase in &self.phases {
            let i = *by_name.get(phase.name.as_str())?;
            if std::mem::replace(&mut used[i], true) {
                return None;
            }
            mapping.push(i);
        }
        Some(mapping)
    }
}

/// Primary-timeline phase indices in which a zone is valid, ascending
///
/// A linked zone's contiguous local interval can land on scattered primary
/// indices when the two timelines order the same phases differently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseSet(SmallVec<[usize; 8]>);

impl PhaseSet {
    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        let mut set: SmallVec<[usize; 8]> = indices.into_iter().collect();
        set.sort_unstable();
        set.dedup();
        Self(set)
    }

    pub fn contains(&self, phase: usize) -> bool {
        self.0.binary_search(&phase).is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Latest phase of the set that also lies in `range`
    pub fn latest_in(&self, range: &Range<usize>) -> Option<usize> {
        self.0.iter().rev().copied().find(|i| range.contains(i))
    }
}

impl From<Range<usize>> for PhaseSet {
    fn from(range: Range<usize>) -> Self {
        Self(range.collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase(id: i64, name: &str, sequence: Option<i64>) -> Phase {
        Phase {
            id: ElementId(id),
            name: name.to_string(),
            sequence,
        }
    }

    fn timeline() -> PhaseTimeline {
        PhaseTimeline::ordered(&[
            phase(100, "Existing", Some(1)),
            phase(101, "Demolition", Some(2)),
            phase(102, "New Construction", Some(3)),
        ])
    }

    #[test]
    fn test_sequence_ordering() {
        let t = PhaseTimeline::ordered(&[
            phase(3, "C", Some(30)),
            phase(1, "A", Some(10)),
            phase(2, "B", Some(20)),
        ]);
        let names: Vec<&str> = t.phases().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_declaration_order_without_sequence() {
        let t = PhaseTimeline::ordered(&[phase(3, "C", Some(30)), phase(1, "A", None)]);
        assert_eq!(t.index_of(ElementId(3)), Some(0));
        assert_eq!(t.index_of(ElementId(1)), Some(1));
    }

    #[test]
    fn test_valid_phase_range() {
        let t = timeline();
        assert_eq!(t.valid_phase_range(Some(ElementId(101)), None), 1..3);
        assert_eq!(t.valid_phase_range(Some(ElementId(100)), Some(ElementId(101))), 0..1);
        assert_eq!(t.valid_phase_range(None, None), 0..3);
        // Unknown phases
        assert_eq!(t.valid_phase_range(Some(ElementId(9)), Some(ElementId(8))), 0..3);
    }

    #[test]
    fn test_not_in_demolition_phase() {
        let t = timeline();
        let created = Some(ElementId(100));
        let demolished = Some(ElementId(101));
        assert!(t.exists_in_phase(created, demolished, ElementId(100)));
        assert!(!t.exists_in_phase(created, demolished, ElementId(101)));
        assert!(!t.exists_in_phase(created, demolished, ElementId(102)));
    }

    #[test]
    fn test_map_by_name() {
        let host = timeline();
        let link = PhaseTimeline::ordered(&[
            phase(7, "Existing", None),
            phase(8, "Demolition", None),
            phase(9, "New Construction", None),
        ]);
        assert_eq!(link.map_by_name(&host), Some(vec![0, 1, 2]));

        let renamed = PhaseTimeline::ordered(&[
            phase(7, "Existing", None),
            phase(8, "Phase 2", None),
            phase(9, "New Construction", None),
        ]);
        assert_eq!(renamed.map_by_name(&host), None);
    }

    #[test]
    fn test_reordered_link_maps_to_scattered_phases() {
        let host = PhaseTimeline::ordered(&[phase(1, "A", Some(1)), phase(2, "B", Some(2)), phase(3, "C", Some(3))]);
        let link = PhaseTimeline::ordered(&[phase(7, "C", Some(1)), phase(8, "A", Some(2)), phase(9, "B", Some(3))]);
        let mapping = link.map_by_name(&host).unwrap();
        assert_eq!(mapping, vec![2, 0, 1]);

        // Valid in link phases C and A, demolished in B
        let local = link.valid_phase_range(Some(ElementId(7)), Some(ElementId(9)));
        let set = PhaseSet::from_indices(local.map(|i| mapping[i]));
        assert_eq!(set.as_slice(), &[0, 2]);
        assert!(!set.contains(1));

        assert_eq!(set.latest_in(&(1..2)), None);
        assert_eq!(set.latest_in(&(0..2)), Some(0));
        assert_eq!(set.latest_in(&(0..3)), Some(2));
    }

    #[test]
    fn test_phase_set_from_range() {
        let set = PhaseSet::from(1..4);
        assert_eq!(set.as_slice(), &[1, 2, 3]);
        assert_eq!(set.latest_in(&(0..3)), Some(2));
        assert_eq!(set.latest_in(&(4..6)), None);
        assert!(PhaseSet::from(2..2).is_empty());
    }
}
