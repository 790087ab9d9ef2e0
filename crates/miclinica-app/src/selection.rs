// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use crate::{Patient, PatientId};

/// Bulk-selection set for the patient list. Ids are retained when the
/// filtered set changes; callers intersect with the live rows before acting
/// on the selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionState {
    selected: BTreeSet<PatientId>,
}

impl SelectionState {
    pub fn toggle(&mut self, id: PatientId) -> bool {
        if self.selected.remove(&id) {
            false
        } else {
            self.selected.insert(id);
            true
        }
    }

    /// Selects exactly the rows of the current page slice, leaving any
    /// previously selected off-page ids in place.
    pub fn select_page(&mut self, page: &[Patient]) {
        self.selected.extend(page.iter().map(|patient| patient.id));
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn contains(&self, id: PatientId) -> bool {
        self.selected.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = PatientId> + '_ {
        self.selected.iter().copied()
    }

    /// The ids the next bulk action would actually touch.
    pub fn intersect<'a>(&self, visible: impl IntoIterator<Item = &'a Patient>) -> Vec<PatientId> {
        visible
            .into_iter()
            .map(|patient| patient.id)
            .filter(|id| self.selected.contains(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::SelectionState;
    use crate::{FinancialStatus, Patient, PatientId, PatientStatus};
    use time::{Date, Month, OffsetDateTime};

    fn patient(id: i64) -> Patient {
        let instant = OffsetDateTime::from_unix_timestamp(1_750_000_000)
            .expect("valid fixture timestamp");
        Patient {
            id: PatientId::new(id),
            name: format!("Patient {id}"),
            email: String::new(),
            phone: String::new(),
            tax_id: String::new(),
            status: PatientStatus::Active,
            financial_status: FinancialStatus::Ok,
            birth_date: Date::from_calendar_date(1980, Month::March, 10)
                .expect("valid birth date"),
            last_visit: None,
            address_line: String::new(),
            city: String::new(),
            state: String::new(),
            postal_code: String::new(),
            notes: String::new(),
            created_at: instant,
            updated_at: instant,
            deleted_at: None,
        }
    }

    #[test]
    fn toggle_adds_then_removes() {
        let mut selection = SelectionState::default();
        assert!(selection.toggle(PatientId::new(1)));
        assert!(selection.contains(PatientId::new(1)));
        assert!(!selection.toggle(PatientId::new(1)));
        assert!(selection.is_empty());
    }

    #[test]
    fn select_page_only_adds_current_page_rows() {
        let mut selection = SelectionState::default();
        selection.toggle(PatientId::new(99));

        let page = vec![patient(1), patient(2)];
        selection.select_page(&page);

        assert_eq!(selection.len(), 3);
        assert!(selection.contains(PatientId::new(99)));
        assert!(selection.contains(PatientId::new(1)));
        assert!(selection.contains(PatientId::new(2)));
    }

    #[test]
    fn stale_ids_survive_but_do_not_intersect() {
        let mut selection = SelectionState::default();
        selection.toggle(PatientId::new(1));
        selection.toggle(PatientId::new(2));

        // Only patient 2 is still in the filtered set.
        let visible = vec![patient(2), patient(3)];
        let actionable = selection.intersect(&visible);

        assert_eq!(actionable, vec![PatientId::new(2)]);
        assert_eq!(selection.len(), 2);
    }

    #[test]
    fn clear_empties_the_selection() {
        let mut selection = SelectionState::default();
        selection.select_page(&[patient(1), patient(2)]);
        selection.clear();
        assert!(selection.is_empty());
    }
}
