// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use miclinica_app::{
    AppointmentStatus, FinancialStatus, InvoiceStatus, MessageDirection, NotificationKind,
    PatientStatus, PaymentMethod,
};
use time::{Date, Duration, Month, OffsetDateTime, Time};

const REFERENCE_YEAR: i32 = 2026;

const SPECIALTIES: [&str; 8] = [
    "Cardiology",
    "Dermatology",
    "General Practice",
    "Gynecology",
    "Nutrition",
    "Orthopedics",
    "Pediatrics",
    "Psychiatry",
];

const INVENTORY_CATEGORIES: [&str; 6] = [
    "Consumables",
    "Equipment",
    "Instruments",
    "Medication",
    "Office",
    "PPE",
];

const FIRST_NAMES: [&str; 16] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Elliot", "Robin", "Cameron", "Hayden", "Rowan",
];
const LAST_NAMES: [&str; 18] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Campbell", "Turner", "Flores", "Bennett", "Price", "Morris", "Foster", "Brooks",
];

const CITIES: [&str; 12] = [
    "Austin",
    "Seattle",
    "Denver",
    "Madison",
    "Raleigh",
    "Pittsburgh",
    "Portland",
    "Boise",
    "Phoenix",
    "Nashville",
    "Columbus",
    "Minneapolis",
];
const STATES: [&str; 12] = [
    "TX", "WA", "CO", "WI", "NC", "PA", "OR", "ID", "AZ", "TN", "OH", "MN",
];
const STREET_NAMES: [&str; 12] = [
    "Cedar", "Maple", "Oak", "Pine", "Willow", "Elm", "Birch", "Juniper", "Sunset", "Ridge",
    "Valley", "Lakeview",
];

const EMAIL_DOMAINS: [&str; 5] = [
    "example-mail.com",
    "inbox.local",
    "postbox.net",
    "mailfolk.io",
    "letterbox.org",
];

const ROOMS: [&str; 6] = ["101", "102", "103", "201", "202", "Lab"];

const SUPPLIERS: [&str; 8] = [
    "MedSource Supply",
    "Caredirect Wholesale",
    "Apex Medical",
    "Summit Labs",
    "Heritage Health Goods",
    "Brightline Equipment",
    "Quality Clinical Supply",
    "Central Pharma Direct",
];

const INVOICE_DESCRIPTIONS: [&str; 8] = [
    "Consultation",
    "Follow-up visit",
    "Lab panel",
    "Vaccination",
    "Annual checkup",
    "Dermatology procedure",
    "Nutrition plan",
    "Physical therapy session",
];

const MESSAGE_SUBJECTS: [&str; 8] = [
    "Appointment confirmation",
    "Reschedule request",
    "Exam results available",
    "Prescription renewal",
    "Billing question",
    "Insurance paperwork",
    "Pre-visit instructions",
    "Follow-up reminder",
];

const PATIENT_STATUSES: [PatientStatus; 3] = [
    PatientStatus::Active,
    PatientStatus::Inactive,
    PatientStatus::Pending,
];
const APPOINTMENT_STATUSES: [AppointmentStatus; 5] = [
    AppointmentStatus::Scheduled,
    AppointmentStatus::Confirmed,
    AppointmentStatus::Completed,
    AppointmentStatus::Canceled,
    AppointmentStatus::NoShow,
];
const PAYMENT_METHODS: [PaymentMethod; 4] = [
    PaymentMethod::Cash,
    PaymentMethod::Card,
    PaymentMethod::Transfer,
    PaymentMethod::Insurance,
];
const NOTIFICATION_KINDS: [NotificationKind; 4] = [
    NotificationKind::Appointment,
    NotificationKind::Billing,
    NotificationKind::Inventory,
    NotificationKind::System,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakePatient {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub tax_id: String,
    pub status: PatientStatus,
    pub financial_status: FinancialStatus,
    pub birth_date: Date,
    pub last_visit: Option<Date>,
    pub address_line: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeProfessional {
    pub name: String,
    pub specialty_name: String,
    pub registration: String,
    pub email: String,
    pub phone: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeAppointment {
    pub scheduled_at: OffsetDateTime,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub room: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeInvoice {
    pub description: String,
    pub amount_cents: i64,
    pub status: InvoiceStatus,
    pub method: PaymentMethod,
    pub issued_on: Date,
    pub due_on: Date,
    pub paid_on: Option<Date>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeInventoryItem {
    pub name: String,
    pub category_name: String,
    pub quantity: i32,
    pub reorder_level: i32,
    pub unit_cost_cents: Option<i64>,
    pub expires_on: Option<Date>,
    pub supplier: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeMessage {
    pub direction: MessageDirection,
    pub subject: String,
    pub body: String,
    pub sent_at: OffsetDateTime,
    pub read: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeNotification {
    pub kind: NotificationKind,
    pub body: String,
    pub created_at: OffsetDateTime,
    pub read: bool,
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Deterministic clinic-data generator. Identical seed and reference instant
/// reproduce identical records.
#[derive(Debug, Clone)]
pub struct ClinicFaker {
    rng: DeterministicRng,
    reference: OffsetDateTime,
}

impl ClinicFaker {
    pub fn new(seed: u64) -> Self {
        Self::with_reference(seed, reference_now())
    }

    /// Seeding for a live session passes the real "now" so relative data
    /// (today's appointments, recent visits) lands where the dashboard
    /// expects it.
    pub fn with_reference(seed: u64, reference: OffsetDateTime) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            reference,
        }
    }

    pub fn reference(&self) -> OffsetDateTime {
        self.reference
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn patient(&mut self) -> FakePatient {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        let domain = self.pick(&EMAIL_DOMAINS);
        let street = self.pick(&STREET_NAMES);
        let birth_date = self
            .random_datetime_between(
                self.reference - Duration::days(88 * 365),
                self.reference - Duration::days(365),
            )
            .date();

        let roll = self.int_range_i32(1, 10);
        let status = if roll <= 6 {
            PatientStatus::Active
        } else if roll <= 8 {
            PatientStatus::Inactive
        } else {
            PatientStatus::Pending
        };

        let roll = self.int_range_i32(1, 10);
        let financial_status = if roll <= 6 {
            FinancialStatus::Ok
        } else if roll <= 8 {
            FinancialStatus::Pending
        } else {
            FinancialStatus::Overdue
        };

        let last_visit = if self.int_range_i32(1, 10) <= 7 {
            Some(
                self.random_datetime_between(
                    self.reference - Duration::days(730),
                    self.reference,
                )
                .date(),
            )
        } else {
            None
        };

        FakePatient {
            name: format!("{first} {last}"),
            email: format!(
                "{}.{}@{domain}",
                first.to_ascii_lowercase(),
                last.to_ascii_lowercase()
            ),
            phone: format!(
                "({:03}) {:03}-{:04}",
                self.int_range_i32(200, 999),
                self.int_range_i32(200, 999),
                self.int_range_i32(0, 9_999),
            ),
            tax_id: format!(
                "{:03}-{:02}-{:04}",
                self.int_range_i32(100, 899),
                self.int_range_i32(10, 99),
                self.int_range_i32(0, 9_999),
            ),
            status,
            financial_status,
            birth_date,
            last_visit,
            address_line: format!("{} {} St", self.int_range_i32(100, 9999), street),
            city: self.pick(&CITIES).to_owned(),
            state: self.pick(&STATES).to_owned(),
            postal_code: format!("{:05}", self.int_range_i32(10_000, 99_999)),
            notes: String::new(),
        }
    }

    pub fn professional(&mut self) -> FakeProfessional {
        let specialty = self.pick(&SPECIALTIES);
        self.professional_for_specialty(specialty)
    }

    pub fn professional_for_specialty(&mut self, specialty: &str) -> FakeProfessional {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        FakeProfessional {
            name: format!("Dr. {first} {last}"),
            specialty_name: specialty.to_owned(),
            registration: format!(
                "MD-{:02}-{:06}",
                self.int_range_i32(1, 99),
                self.int_range_i32(0, 999_999),
            ),
            email: format!(
                "{}.{}@clinic-staff.example",
                first.to_ascii_lowercase(),
                last.to_ascii_lowercase()
            ),
            phone: format!(
                "({:03}) {:03}-{:04}",
                self.int_range_i32(200, 999),
                self.int_range_i32(200, 999),
                self.int_range_i32(0, 9_999),
            ),
            notes: String::new(),
        }
    }

    /// Roughly one appointment in five lands on the reference day so the
    /// dashboard has something to show.
    pub fn appointment(&mut self) -> FakeAppointment {
        let scheduled_at = if self.int_range_i32(1, 10) <= 2 {
            self.time_on_reference_day()
        } else {
            self.random_datetime_between(
                self.reference - Duration::days(60),
                self.reference + Duration::days(30),
            )
        };

        let status = if scheduled_at < self.reference {
            // Past slots resolve: mostly completed, some canceled or missed.
            let roll = self.int_range_i32(1, 10);
            if roll <= 7 {
                AppointmentStatus::Completed
            } else if roll <= 9 {
                AppointmentStatus::Canceled
            } else {
                AppointmentStatus::NoShow
            }
        } else if self.rng.bool() {
            AppointmentStatus::Confirmed
        } else {
            AppointmentStatus::Scheduled
        };

        FakeAppointment {
            scheduled_at,
            duration_minutes: *[15, 30, 45, 60]
                .get(self.rng.int_n(4))
                .unwrap_or(&30),
            status,
            room: self.pick(&ROOMS).to_owned(),
            notes: String::new(),
        }
    }

    pub fn invoice(&mut self) -> FakeInvoice {
        let issued_on = self
            .random_datetime_between(self.reference - Duration::days(180), self.reference)
            .date();
        let due_on = issued_on + Duration::days(i64::from(self.int_range_i32(15, 45)));

        let roll = self.int_range_i32(1, 10);
        let (status, paid_on) = if roll <= 5 {
            let paid = self
                .random_datetime_between(
                    date_at_midnight(issued_on),
                    self.reference.min(date_at_midnight(due_on)),
                )
                .date();
            (InvoiceStatus::Paid, Some(paid.max(issued_on)))
        } else if roll <= 8 || due_on >= self.reference.date() {
            (InvoiceStatus::Pending, None)
        } else {
            (InvoiceStatus::Overdue, None)
        };

        FakeInvoice {
            description: self.pick(&INVOICE_DESCRIPTIONS).to_owned(),
            amount_cents: self.int_range_i64(5_000, 250_000),
            status,
            method: PAYMENT_METHODS[self.rng.int_n(PAYMENT_METHODS.len())],
            issued_on,
            due_on,
            paid_on,
            notes: String::new(),
        }
    }

    pub fn inventory_item(&mut self, category_name: &str) -> FakeInventoryItem {
        let options = inventory_options(category_name);
        let name = if options.is_empty() {
            format!("{category_name} stock item")
        } else {
            options[self.rng.int_n(options.len())].to_owned()
        };

        let reorder_level = self.int_range_i32(5, 30);
        // Some items start below the reorder line to exercise low-stock alerts.
        let quantity = if self.int_range_i32(1, 10) <= 3 {
            self.int_range_i32(0, reorder_level)
        } else {
            self.int_range_i32(reorder_level + 1, reorder_level + 120)
        };

        let expires_on = if category_name == "Medication" || category_name == "Consumables" {
            Some(
                self.random_datetime_between(
                    self.reference + Duration::days(30),
                    self.reference + Duration::days(720),
                )
                .date(),
            )
        } else {
            None
        };

        FakeInventoryItem {
            name,
            category_name: category_name.to_owned(),
            quantity,
            reorder_level,
            unit_cost_cents: Some(self.int_range_i64(200, 90_000)),
            expires_on,
            supplier: self.pick(&SUPPLIERS).to_owned(),
            notes: String::new(),
        }
    }

    pub fn message(&mut self) -> FakeMessage {
        let direction = if self.rng.bool() {
            MessageDirection::Inbound
        } else {
            MessageDirection::Outbound
        };
        let subject = self.pick(&MESSAGE_SUBJECTS).to_owned();
        let sent_at =
            self.random_datetime_between(self.reference - Duration::days(21), self.reference);
        FakeMessage {
            direction,
            body: format!("{subject}. {}", self.sentence(6, 14)),
            subject,
            sent_at,
            read: direction == MessageDirection::Outbound || self.int_range_i32(1, 10) <= 6,
        }
    }

    pub fn notification(&mut self) -> FakeNotification {
        let kind = NOTIFICATION_KINDS[self.rng.int_n(NOTIFICATION_KINDS.len())];
        let body = match kind {
            NotificationKind::Appointment => "Upcoming appointment needs confirmation".to_owned(),
            NotificationKind::Billing => "An invoice moved to overdue".to_owned(),
            NotificationKind::Inventory => "An item dropped below its reorder level".to_owned(),
            NotificationKind::System => "Session data regenerated at startup".to_owned(),
        };
        FakeNotification {
            kind,
            body,
            created_at: self
                .random_datetime_between(self.reference - Duration::days(14), self.reference),
            read: self.int_range_i32(1, 10) <= 4,
        }
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range_i32(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = i64::from(max) - i64::from(min) + 1;
        let offset = (self.rng.next_u64() % (span as u64)) as i64;
        (i64::from(min) + offset) as i32
    }

    fn int_range_i64(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }

    fn random_datetime_between(
        &mut self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> OffsetDateTime {
        let start_ts = start.unix_timestamp();
        let end_ts = end.unix_timestamp();
        if end_ts <= start_ts {
            return start;
        }
        let span = (end_ts - start_ts) as u64;
        let offset = self.rng.next_u64() % (span + 1);
        OffsetDateTime::from_unix_timestamp(start_ts + offset as i64).expect("valid unix timestamp")
    }

    fn time_on_reference_day(&mut self) -> OffsetDateTime {
        let hour = self.int_range_i32(8, 17) as u8;
        let minute = *[0, 15, 30, 45].get(self.rng.int_n(4)).unwrap_or(&0);
        let slot = Time::from_hms(hour, minute, 0).expect("valid slot time");
        self.reference.date().with_time(slot).assume_utc()
    }

    fn sentence(&mut self, min_words: usize, max_words: usize) -> String {
        const WORDS: [&str; 24] = [
            "please",
            "confirm",
            "schedule",
            "reschedule",
            "results",
            "available",
            "portal",
            "insurance",
            "coverage",
            "prescription",
            "renewal",
            "dosage",
            "visit",
            "follow",
            "billing",
            "statement",
            "balance",
            "payment",
            "reminder",
            "arrival",
            "fasting",
            "instructions",
            "records",
            "update",
        ];

        let count = self.int_range_i32(min_words as i32, max_words as i32) as usize;
        let mut parts = Vec::with_capacity(count);
        for _ in 0..count {
            parts.push(self.pick(&WORDS).to_owned());
        }
        let mut sentence = parts.join(" ");
        if let Some(first) = sentence.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        sentence.push('.');
        sentence
    }
}

pub fn specialties() -> &'static [&'static str] {
    &SPECIALTIES
}

pub fn inventory_categories() -> &'static [&'static str] {
    &INVENTORY_CATEGORIES
}

pub fn fixture_datetime() -> &'static str {
    "2026-02-19T12:34:56Z"
}

fn reference_now() -> OffsetDateTime {
    midnight_utc(REFERENCE_YEAR, Month::June, 1)
}

fn midnight_utc(year: i32, month: Month, day: u8) -> OffsetDateTime {
    let date = Date::from_calendar_date(year, month, day).expect("valid calendar date");
    let midnight = Time::from_hms(0, 0, 0).expect("valid midnight");
    date.with_time(midnight).assume_utc()
}

fn date_at_midnight(date: Date) -> OffsetDateTime {
    let midnight = Time::from_hms(0, 0, 0).expect("valid midnight");
    date.with_time(midnight).assume_utc()
}

fn inventory_options(category_name: &str) -> &'static [&'static str] {
    match category_name {
        "Consumables" => &[
            "Gauze pads",
            "Alcohol swabs",
            "Syringes 5ml",
            "Cotton rolls",
        ],
        "Equipment" => &[
            "Blood pressure monitor",
            "Pulse oximeter",
            "Examination lamp",
        ],
        "Instruments" => &["Stethoscope", "Otoscope", "Surgical scissors"],
        "Medication" => &[
            "Amoxicillin 500mg",
            "Ibuprofen 400mg",
            "Saline solution",
            "Lidocaine 2%",
        ],
        "Office" => &["Printer paper", "Appointment cards", "File folders"],
        "PPE" => &["Nitrile gloves", "Surgical masks", "Face shields"],
        _ => &[],
    }
}
