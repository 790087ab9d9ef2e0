// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use time::Date;

use crate::{FinancialStatus, Patient, PatientSortKey, PatientStatus, SortDirection};

pub const DEFAULT_PAGE_SIZE: usize = 15;

/// Inclusive age bucket; `AtLeast` is the open-ended "N and above" bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeFilter {
    Between { min: i32, max: i32 },
    AtLeast(i32),
}

impl AgeFilter {
    pub const fn matches(self, age: i32) -> bool {
        match self {
            Self::Between { min, max } => age >= min && age <= max,
            Self::AtLeast(min) => age >= min,
        }
    }
}

/// `Never` matches only patients without a recorded visit; the two variants
/// are mutually exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LastVisitFilter {
    Never,
    WithinMonths(i32),
}

impl LastVisitFilter {
    pub fn matches(self, last_visit: Option<Date>, today: Date) -> bool {
        match (self, last_visit) {
            (Self::Never, None) => true,
            (Self::Never, Some(_)) => false,
            (Self::WithinMonths(_), None) => false,
            (Self::WithinMonths(window), Some(visited)) => {
                month_distance(visited, today) <= window
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientSort {
    pub key: PatientSortKey,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientQuery {
    pub search_text: String,
    pub status: Option<PatientStatus>,
    pub financial_status: Option<FinancialStatus>,
    pub age: Option<AgeFilter>,
    pub last_visit: Option<LastVisitFilter>,
    pub sort: Option<PatientSort>,
    pub page_size: usize,
    pub page_index: usize,
}

impl Default for PatientQuery {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            status: None,
            financial_status: None,
            age: None,
            last_visit: None,
            sort: None,
            page_size: DEFAULT_PAGE_SIZE,
            page_index: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientPage {
    pub items: Vec<Patient>,
    pub total_count: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryCommand {
    SetSearch(String),
    SetStatusFilter(Option<PatientStatus>),
    SetFinancialFilter(Option<FinancialStatus>),
    SetAgeFilter(Option<AgeFilter>),
    SetLastVisitFilter(Option<LastVisitFilter>),
    CycleSort(PatientSortKey),
    ClearSort,
    SetPageSize(usize),
    NextPage,
    PrevPage,
    FirstPage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryEvent {
    SearchChanged(String),
    FiltersChanged,
    SortChanged(Option<PatientSort>),
    PageSizeChanged(usize),
    PageChanged(usize),
}

impl PatientQuery {
    /// Changing the search text, any filter, or the page size lands back on
    /// page 1 so a narrowed result set never leaves the cursor on an empty
    /// out-of-range page.
    pub fn dispatch(&mut self, command: QueryCommand) -> Vec<QueryEvent> {
        match command {
            QueryCommand::SetSearch(text) => {
                self.search_text = text.clone();
                vec![QueryEvent::SearchChanged(text), self.reset_page()]
            }
            QueryCommand::SetStatusFilter(status) => {
                self.status = status;
                vec![QueryEvent::FiltersChanged, self.reset_page()]
            }
            QueryCommand::SetFinancialFilter(status) => {
                self.financial_status = status;
                vec![QueryEvent::FiltersChanged, self.reset_page()]
            }
            QueryCommand::SetAgeFilter(age) => {
                self.age = age;
                vec![QueryEvent::FiltersChanged, self.reset_page()]
            }
            QueryCommand::SetLastVisitFilter(last_visit) => {
                self.last_visit = last_visit;
                vec![QueryEvent::FiltersChanged, self.reset_page()]
            }
            QueryCommand::CycleSort(key) => {
                self.sort = match self.sort {
                    Some(PatientSort {
                        key: current,
                        direction: SortDirection::Asc,
                    }) if current == key => Some(PatientSort {
                        key,
                        direction: SortDirection::Desc,
                    }),
                    Some(PatientSort { key: current, .. }) if current == key => None,
                    _ => Some(PatientSort {
                        key,
                        direction: SortDirection::Asc,
                    }),
                };
                vec![QueryEvent::SortChanged(self.sort)]
            }
            QueryCommand::ClearSort => {
                self.sort = None;
                vec![QueryEvent::SortChanged(None)]
            }
            QueryCommand::SetPageSize(size) => {
                self.page_size = size.max(1);
                vec![
                    QueryEvent::PageSizeChanged(self.page_size),
                    self.reset_page(),
                ]
            }
            QueryCommand::NextPage => {
                self.page_index += 1;
                vec![QueryEvent::PageChanged(self.page_index)]
            }
            QueryCommand::PrevPage => {
                self.page_index = self.page_index.saturating_sub(1).max(1);
                vec![QueryEvent::PageChanged(self.page_index)]
            }
            QueryCommand::FirstPage => {
                vec![self.reset_page()]
            }
        }
    }

    /// View-layer clamp after a recompute; `paginate` itself treats an
    /// out-of-range page as an empty slice rather than an error.
    pub fn clamp_page(&mut self, total_pages: usize) {
        self.page_index = self.page_index.clamp(1, total_pages.max(1));
    }

    pub fn has_active_filters(&self) -> bool {
        !self.search_text.is_empty()
            || self.status.is_some()
            || self.financial_status.is_some()
            || self.age.is_some()
            || self.last_visit.is_some()
    }

    fn reset_page(&mut self) -> QueryEvent {
        self.page_index = 1;
        QueryEvent::PageChanged(1)
    }
}

/// Whole years at `today`, decremented when the birthday has not yet come
/// around this year. Never negative.
pub fn age_on(birth_date: Date, today: Date) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month() as u8, today.day()) < (birth_date.month() as u8, birth_date.day()) {
        age -= 1;
    }
    age.max(0)
}

/// Calendar-month distance, floored at zero for dates after `today`.
pub fn month_distance(from: Date, today: Date) -> i32 {
    let months = (today.year() - from.year()) * 12 + (today.month() as i32 - from.month() as i32);
    months.max(0)
}

/// The patient list pipeline: search, filter, sort, slice. Pure with respect
/// to its inputs; the source slice is never reordered or mutated.
pub fn paginate(records: &[Patient], query: &PatientQuery, today: Date) -> PatientPage {
    let page_size = query.page_size.max(1);
    let page_index = query.page_index.max(1);

    let needle = query.search_text.trim().to_lowercase();
    let mut filtered: Vec<&Patient> = records
        .iter()
        .filter(|patient| matches_search(patient, &needle))
        .filter(|patient| matches_filters(patient, query, today))
        .collect();

    if let Some(sort) = query.sort {
        // sort_by is stable, so equal keys keep their input order.
        filtered.sort_by(|left, right| {
            let order = compare_by_key(left, right, sort.key, today);
            match sort.direction {
                SortDirection::Asc => order,
                SortDirection::Desc => order.reverse(),
            }
        });
    }

    let total_count = filtered.len();
    let total_pages = total_count.div_ceil(page_size).max(1);

    let start = (page_index - 1).saturating_mul(page_size);
    let items = if start >= total_count {
        Vec::new()
    } else {
        filtered[start..(start + page_size).min(total_count)]
            .iter()
            .map(|patient| (*patient).clone())
            .collect()
    };

    PatientPage {
        items,
        total_count,
        total_pages,
    }
}

fn matches_search(patient: &Patient, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    [
        &patient.name,
        &patient.email,
        &patient.phone,
        &patient.tax_id,
    ]
    .into_iter()
    .any(|field| field.to_lowercase().contains(needle))
}

fn matches_filters(patient: &Patient, query: &PatientQuery, today: Date) -> bool {
    if let Some(status) = query.status
        && patient.status != status
    {
        return false;
    }
    if let Some(financial) = query.financial_status
        && patient.financial_status != financial
    {
        return false;
    }
    if let Some(age) = query.age
        && !age.matches(age_on(patient.birth_date, today))
    {
        return false;
    }
    if let Some(last_visit) = query.last_visit
        && !last_visit.matches(patient.last_visit, today)
    {
        return false;
    }
    true
}

fn compare_by_key(left: &Patient, right: &Patient, key: PatientSortKey, today: Date) -> Ordering {
    match key {
        PatientSortKey::Name => left
            .name
            .to_lowercase()
            .cmp(&right.name.to_lowercase()),
        PatientSortKey::Email => left
            .email
            .to_lowercase()
            .cmp(&right.email.to_lowercase()),
        PatientSortKey::Age => age_on(left.birth_date, today).cmp(&age_on(right.birth_date, today)),
        PatientSortKey::Status => left.status.as_str().cmp(right.status.as_str()),
        PatientSortKey::FinancialStatus => left
            .financial_status
            .as_str()
            .cmp(right.financial_status.as_str()),
        // Option<Date> orders None first, which is the "missing sorts as
        // earliest" rule for date-valued keys.
        PatientSortKey::LastVisit => left.last_visit.cmp(&right.last_visit),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AgeFilter, LastVisitFilter, PatientPage, PatientQuery, PatientSort, QueryCommand,
        QueryEvent, age_on, month_distance, paginate,
    };
    use crate::{
        FinancialStatus, Patient, PatientId, PatientSortKey, PatientStatus, SortDirection,
    };
    use time::{Date, Month, OffsetDateTime};

    fn fixture_instant() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_750_000_000).expect("valid fixture timestamp")
    }

    fn date(year: i32, month: Month, day: u8) -> Date {
        Date::from_calendar_date(year, month, day).expect("valid calendar date")
    }

    fn today() -> Date {
        date(2026, Month::June, 15)
    }

    fn patient(id: i64, name: &str) -> Patient {
        Patient {
            id: PatientId::new(id),
            name: name.to_owned(),
            email: format!(
                "{}@clinic-demo.org",
                name.to_lowercase().replace(' ', ".")
            ),
            phone: format!("(555) 010-{id:04}"),
            tax_id: format!("{:03}-55-{:04}", id % 1000, 1000 + id),
            status: PatientStatus::Active,
            financial_status: FinancialStatus::Ok,
            birth_date: date(1980, Month::March, 10),
            last_visit: Some(date(2026, Month::April, 2)),
            address_line: String::new(),
            city: String::new(),
            state: String::new(),
            postal_code: String::new(),
            notes: String::new(),
            created_at: fixture_instant(),
            updated_at: fixture_instant(),
            deleted_at: None,
        }
    }

    fn roster(count: i64) -> Vec<Patient> {
        (1..=count)
            .map(|id| patient(id, &format!("Patient {id:03}")))
            .collect()
    }

    fn all_pages(records: &[Patient], query: &PatientQuery) -> Vec<PatientPage> {
        let first = paginate(records, query, today());
        (1..=first.total_pages)
            .map(|page_index| {
                let paged = PatientQuery {
                    page_index,
                    ..query.clone()
                };
                paginate(records, &paged, today())
            })
            .collect()
    }

    #[test]
    fn empty_collection_boundary() {
        let page = paginate(&[], &PatientQuery::default(), today());
        assert_eq!(page.total_count, 0);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
    }

    #[test]
    fn fifty_records_paginate_into_four_pages() {
        let records = roster(50);
        let query = PatientQuery::default();

        let pages = all_pages(&records, &query);
        assert_eq!(pages.len(), 4);
        assert_eq!(pages[0].items.len(), 15);
        assert_eq!(pages[3].items.len(), 5);

        let total: usize = pages.iter().map(|page| page.items.len()).sum();
        assert_eq!(total, pages[0].total_count);
        assert_eq!(total, 50);
    }

    #[test]
    fn paginate_is_idempotent() {
        let records = roster(20);
        let query = PatientQuery {
            search_text: "patient 01".to_owned(),
            page_size: 5,
            ..PatientQuery::default()
        };

        assert_eq!(
            paginate(&records, &query, today()),
            paginate(&records, &query, today())
        );
    }

    #[test]
    fn search_matches_all_four_target_fields_case_insensitively() {
        let mut records = roster(3);
        records[0].name = "Beatriz Carvalho".to_owned();
        records[0].email = "bia.carvalho@clinic-demo.org".to_owned();
        records[0].phone = "(555) 987-6543".to_owned();
        records[0].tax_id = "321-55-8877".to_owned();

        for needle in ["BEATRIZ", "bia.carvalho", "987-65", "321-55"] {
            let query = PatientQuery {
                search_text: needle.to_owned(),
                ..PatientQuery::default()
            };
            let page = paginate(&records, &query, today());
            assert_eq!(page.total_count, 1, "needle {needle}");
            assert_eq!(page.items[0].id, records[0].id, "needle {needle}");
        }
    }

    #[test]
    fn name_substring_always_survives_search_stage() {
        let records = roster(30);
        let query = PatientQuery {
            search_text: "ENT 02".to_owned(),
            page_size: 100,
            ..PatientQuery::default()
        };

        let page = paginate(&records, &query, today());
        for record in &records {
            if record.name.to_lowercase().contains("ent 02") {
                assert!(page.items.iter().any(|item| item.id == record.id));
            }
        }
    }

    #[test]
    fn conjunction_of_status_filters() {
        let mut records = roster(5);
        records[0].status = PatientStatus::Active;
        records[0].financial_status = FinancialStatus::Overdue;
        records[1].status = PatientStatus::Inactive;
        records[1].financial_status = FinancialStatus::Overdue;
        records[2].status = PatientStatus::Active;
        records[2].financial_status = FinancialStatus::Ok;
        records[3].status = PatientStatus::Pending;
        records[3].financial_status = FinancialStatus::Pending;
        records[4].status = PatientStatus::Inactive;
        records[4].financial_status = FinancialStatus::Ok;

        let query = PatientQuery {
            status: Some(PatientStatus::Active),
            financial_status: Some(FinancialStatus::Overdue),
            ..PatientQuery::default()
        };

        let page = paginate(&records, &query, today());
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].id, records[0].id);
    }

    #[test]
    fn adding_a_filter_never_increases_the_count() {
        let mut records = roster(40);
        for (index, record) in records.iter_mut().enumerate() {
            record.status = PatientStatus::ALL[index % 3];
            record.financial_status = FinancialStatus::ALL[index % 3];
            if index % 4 == 0 {
                record.last_visit = None;
            }
        }

        let base = PatientQuery::default();
        let baseline = paginate(&records, &base, today()).total_count;

        let narrowed = [
            PatientQuery {
                status: Some(PatientStatus::Active),
                ..base.clone()
            },
            PatientQuery {
                financial_status: Some(FinancialStatus::Overdue),
                ..base.clone()
            },
            PatientQuery {
                age: Some(AgeFilter::AtLeast(40)),
                ..base.clone()
            },
            PatientQuery {
                last_visit: Some(LastVisitFilter::Never),
                ..base.clone()
            },
        ];
        for query in narrowed {
            assert!(paginate(&records, &query, today()).total_count <= baseline);
        }
    }

    #[test]
    fn never_bucket_excludes_every_visited_patient() {
        let mut records = roster(6);
        records[1].last_visit = None;
        records[4].last_visit = None;

        let query = PatientQuery {
            last_visit: Some(LastVisitFilter::Never),
            ..PatientQuery::default()
        };

        let page = paginate(&records, &query, today());
        assert_eq!(page.total_count, 2);
        assert!(page.items.iter().all(|item| item.last_visit.is_none()));
    }

    #[test]
    fn month_window_boundary_is_inclusive() {
        let mut records = roster(3);
        records[0].last_visit = Some(date(2026, Month::March, 1));
        records[1].last_visit = Some(date(2025, Month::December, 30));
        records[2].last_visit = None;

        let query = PatientQuery {
            last_visit: Some(LastVisitFilter::WithinMonths(3)),
            ..PatientQuery::default()
        };

        let page = paginate(&records, &query, today());
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].id, records[0].id);
    }

    #[test]
    fn age_bounds_are_inclusive() {
        let mut records = roster(4);
        records[0].birth_date = date(1996, Month::January, 1); // 30
        records[1].birth_date = date(1986, Month::January, 1); // 40
        records[2].birth_date = date(1985, Month::January, 1); // 41
        records[3].birth_date = date(1997, Month::January, 1); // 29

        let query = PatientQuery {
            age: Some(AgeFilter::Between { min: 30, max: 40 }),
            ..PatientQuery::default()
        };
        let page = paginate(&records, &query, today());
        assert_eq!(page.total_count, 2);

        let open_ended = PatientQuery {
            age: Some(AgeFilter::AtLeast(41)),
            ..PatientQuery::default()
        };
        let page = paginate(&records, &open_ended, today());
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].id, records[2].id);
    }

    #[test]
    fn age_decrements_before_the_birthday() {
        let birth = date(1990, Month::September, 1);
        assert_eq!(age_on(birth, date(2026, Month::June, 15)), 35);
        assert_eq!(age_on(birth, date(2026, Month::September, 1)), 36);
        assert_eq!(age_on(birth, date(1989, Month::June, 15)), 0);
    }

    #[test]
    fn month_distance_floors_future_dates() {
        assert_eq!(
            month_distance(date(2026, Month::March, 20), today()),
            3
        );
        assert_eq!(month_distance(date(2026, Month::June, 1), today()), 0);
        assert_eq!(month_distance(date(2026, Month::August, 1), today()), 0);
    }

    #[test]
    fn equal_sort_keys_preserve_input_order() {
        let mut records = roster(4);
        records[0].name = "Same Name".to_owned();
        records[2].name = "Same Name".to_owned();
        // Scramble the ids so input order is the only stable signal.
        records[0].id = PatientId::new(9);
        records[2].id = PatientId::new(2);

        let query = PatientQuery {
            sort: Some(PatientSort {
                key: PatientSortKey::Name,
                direction: SortDirection::Asc,
            }),
            ..PatientQuery::default()
        };

        let page = paginate(&records, &query, today());
        let tied: Vec<_> = page
            .items
            .iter()
            .filter(|item| item.name == "Same Name")
            .map(|item| item.id)
            .collect();
        assert_eq!(tied, vec![PatientId::new(9), PatientId::new(2)]);
    }

    #[test]
    fn missing_visit_dates_sort_as_earliest() {
        let mut records = roster(3);
        records[0].last_visit = Some(date(2026, Month::January, 5));
        records[1].last_visit = None;
        records[2].last_visit = Some(date(2025, Month::May, 20));

        let query = PatientQuery {
            sort: Some(PatientSort {
                key: PatientSortKey::LastVisit,
                direction: SortDirection::Asc,
            }),
            ..PatientQuery::default()
        };

        let page = paginate(&records, &query, today());
        assert_eq!(page.items[0].id, records[1].id);
        assert_eq!(page.items[1].id, records[2].id);
        assert_eq!(page.items[2].id, records[0].id);
    }

    #[test]
    fn descending_sort_reverses_ascending_order() {
        let records = roster(10);
        let asc = PatientQuery {
            sort: Some(PatientSort {
                key: PatientSortKey::Name,
                direction: SortDirection::Asc,
            }),
            page_size: 100,
            ..PatientQuery::default()
        };
        let desc = PatientQuery {
            sort: Some(PatientSort {
                key: PatientSortKey::Name,
                direction: SortDirection::Desc,
            }),
            ..asc.clone()
        };

        let mut reversed = paginate(&records, &asc, today()).items;
        reversed.reverse();
        assert_eq!(paginate(&records, &desc, today()).items, reversed);
    }

    #[test]
    fn out_of_range_page_is_an_empty_slice() {
        let records = roster(10);
        let query = PatientQuery {
            page_size: 15,
            page_index: 3,
            ..PatientQuery::default()
        };

        let page = paginate(&records, &query, today());
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 10);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn zero_page_size_clamps_to_one() {
        let records = roster(3);
        let query = PatientQuery {
            page_size: 0,
            ..PatientQuery::default()
        };

        let page = paginate(&records, &query, today());
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn filter_and_page_size_changes_reset_the_page() {
        let mut query = PatientQuery {
            page_index: 4,
            ..PatientQuery::default()
        };

        let events = query.dispatch(QueryCommand::SetStatusFilter(Some(PatientStatus::Active)));
        assert_eq!(query.page_index, 1);
        assert!(events.contains(&QueryEvent::PageChanged(1)));

        query.page_index = 4;
        query.dispatch(QueryCommand::SetSearch("ana".to_owned()));
        assert_eq!(query.page_index, 1);

        query.page_index = 4;
        query.dispatch(QueryCommand::SetPageSize(30));
        assert_eq!(query.page_index, 1);
        assert_eq!(query.page_size, 30);

        query.page_index = 4;
        query.dispatch(QueryCommand::SetPageSize(0));
        assert_eq!(query.page_size, 1);
    }

    #[test]
    fn sort_cycles_asc_desc_unsorted() {
        let mut query = PatientQuery::default();

        query.dispatch(QueryCommand::CycleSort(PatientSortKey::Name));
        assert_eq!(
            query.sort,
            Some(PatientSort {
                key: PatientSortKey::Name,
                direction: SortDirection::Asc,
            })
        );

        query.dispatch(QueryCommand::CycleSort(PatientSortKey::Name));
        assert_eq!(
            query.sort,
            Some(PatientSort {
                key: PatientSortKey::Name,
                direction: SortDirection::Desc,
            })
        );

        query.dispatch(QueryCommand::CycleSort(PatientSortKey::Name));
        assert_eq!(query.sort, None);
    }

    #[test]
    fn switching_sort_key_starts_ascending() {
        let mut query = PatientQuery::default();
        query.dispatch(QueryCommand::CycleSort(PatientSortKey::Name));
        query.dispatch(QueryCommand::CycleSort(PatientSortKey::Name));

        query.dispatch(QueryCommand::CycleSort(PatientSortKey::Age));
        assert_eq!(
            query.sort,
            Some(PatientSort {
                key: PatientSortKey::Age,
                direction: SortDirection::Asc,
            })
        );
    }

    #[test]
    fn page_navigation_saturates_and_clamps() {
        let mut query = PatientQuery::default();

        query.dispatch(QueryCommand::PrevPage);
        assert_eq!(query.page_index, 1);

        query.dispatch(QueryCommand::NextPage);
        query.dispatch(QueryCommand::NextPage);
        assert_eq!(query.page_index, 3);

        query.clamp_page(2);
        assert_eq!(query.page_index, 2);

        query.clamp_page(0);
        assert_eq!(query.page_index, 1);

        query.dispatch(QueryCommand::FirstPage);
        assert_eq!(query.page_index, 1);
    }
}
