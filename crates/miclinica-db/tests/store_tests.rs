// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use miclinica_app::{
    AppointmentStatus, FinancialStatus, InvoiceStatus, MessageDirection, NotificationKind,
    PatientStatus, PaymentMethod, SettingKey, SettingValue,
};
use miclinica_db::{
    NewAppointment, NewInvoice, NewMessage, NewNotification, NewPatient, NewProfessional,
    SeedProfile, Store,
};
use time::{Date, Duration, Month, OffsetDateTime, Time};

fn new_patient(name: &str) -> NewPatient {
    NewPatient {
        name: name.to_owned(),
        email: format!("{}@example-mail.com", name.to_lowercase().replace(' ', ".")),
        phone: "(555) 010-2233".to_owned(),
        tax_id: "120-55-3344".to_owned(),
        status: PatientStatus::Active,
        financial_status: FinancialStatus::Ok,
        birth_date: Date::from_calendar_date(1984, Month::May, 2).expect("valid birth date"),
        last_visit: None,
        address_line: "100 Cedar St".to_owned(),
        city: "Madison".to_owned(),
        state: "WI".to_owned(),
        postal_code: "53703".to_owned(),
        notes: String::new(),
    }
}

fn new_professional(store: &Store, name: &str) -> Result<NewProfessional> {
    let specialty_id = store.list_specialties()?[0].id;
    Ok(NewProfessional {
        name: name.to_owned(),
        specialty_id,
        registration: "MD-01-000123".to_owned(),
        email: String::new(),
        phone: String::new(),
        notes: String::new(),
    })
}

fn appointment_at(
    patient: miclinica_app::PatientId,
    professional: miclinica_app::ProfessionalId,
    scheduled_at: OffsetDateTime,
) -> NewAppointment {
    NewAppointment {
        patient_id: patient,
        professional_id: professional,
        scheduled_at,
        duration_minutes: 30,
        status: AppointmentStatus::Scheduled,
        room: "101".to_owned(),
        notes: String::new(),
    }
}

fn midday(date: Date) -> OffsetDateTime {
    date.with_time(Time::from_hms(12, 0, 0).expect("valid time"))
        .assume_utc()
}

#[test]
fn bootstrap_creates_schema_and_seed_defaults() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    let specialties = store.list_specialties()?;
    let categories = store.list_inventory_categories()?;

    assert!(!specialties.is_empty());
    assert!(!categories.is_empty());
    assert!(
        specialties.iter().any(|s| s.name == "Pediatrics"),
        "expected default specialty"
    );
    assert!(
        categories.iter().any(|c| c.name == "Medication"),
        "expected default inventory category"
    );
    Ok(())
}

#[test]
fn specialty_lookup_round_trip() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    let listed = store.list_specialties()?;
    let loaded = store.get_specialty(listed[0].id)?;
    assert_eq!(loaded.name, listed[0].name);

    let categories = store.list_inventory_categories()?;
    let category = store.get_inventory_category(categories[0].id)?;
    assert_eq!(category.name, categories[0].name);
    Ok(())
}

#[test]
fn patient_round_trip_and_insertion_order() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    let first = store.create_patient(&new_patient("Avery Walker"))?;
    let second = store.create_patient(&new_patient("Jordan Hill"))?;

    let loaded = store.get_patient(first)?;
    assert_eq!(loaded.name, "Avery Walker");
    assert_eq!(loaded.status, PatientStatus::Active);
    assert!(loaded.deleted_at.is_none());

    let mut update = new_patient("Avery Walker");
    update.status = PatientStatus::Inactive;
    update.last_visit =
        Some(Date::from_calendar_date(2026, Month::February, 11).expect("valid visit date"));
    store.update_patient(first, &update)?;

    let updated = store.get_patient(first)?;
    assert_eq!(updated.status, PatientStatus::Inactive);
    assert!(updated.last_visit.is_some());

    // The unsorted pipeline baseline is load order, so listing is id-ascending.
    let patients = store.list_patients(false)?;
    assert_eq!(patients.len(), 2);
    assert_eq!(patients[0].id, first);
    assert_eq!(patients[1].id, second);
    Ok(())
}

#[test]
fn update_refuses_missing_or_deleted_patient() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    let error = store
        .update_patient(miclinica_app::PatientId::new(99), &new_patient("Ghost"))
        .expect_err("update of missing patient should fail");
    assert!(error.to_string().contains("not found or deleted"));
    Ok(())
}

#[test]
fn soft_delete_is_guarded_by_linked_records() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    let patient_id = store.create_patient(&new_patient("Casey Reed"))?;
    let professional_id = store.create_professional(&new_professional(&store, "Dr. Gray")?)?;
    let appointment_id = store.create_appointment(&appointment_at(
        patient_id,
        professional_id,
        midday(Date::from_calendar_date(2026, Month::July, 3).expect("valid date")),
    ))?;

    let error = store
        .soft_delete_patient(patient_id)
        .expect_err("delete with linked appointment should fail");
    assert!(error.to_string().contains("linked appointments"));

    store.soft_delete_appointment(appointment_id)?;
    store.soft_delete_patient(patient_id)?;

    assert!(store.list_patients(false)?.is_empty());
    assert_eq!(store.list_patients(true)?.len(), 1);

    store.restore_patient(patient_id)?;
    assert_eq!(store.list_patients(false)?.len(), 1);

    let records = store.list_deletion_records()?;
    assert_eq!(records.len(), 2);
    let patient_record = records
        .iter()
        .find(|record| record.entity == miclinica_app::DeletionEntity::Patient)
        .expect("patient deletion recorded");
    assert_eq!(patient_record.target_id, patient_id.get());
    assert!(patient_record.restored_at.is_some());
    Ok(())
}

#[test]
fn professional_delete_guard_counts_appointments() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    let patient_id = store.create_patient(&new_patient("Robin Price"))?;
    let professional_id = store.create_professional(&new_professional(&store, "Dr. Diaz")?)?;
    store.create_appointment(&appointment_at(
        patient_id,
        professional_id,
        midday(Date::from_calendar_date(2026, Month::July, 3).expect("valid date")),
    ))?;

    assert!(store.soft_delete_professional(professional_id).is_err());
    Ok(())
}

#[test]
fn dashboard_counts_reflect_seeded_rows() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    let today = Date::from_calendar_date(2026, Month::June, 1).expect("valid date");
    let patient_id = store.create_patient(&new_patient("Elliot Brooks"))?;
    let professional_id = store.create_professional(&new_professional(&store, "Dr. Ward")?)?;

    store.create_appointment(&appointment_at(
        patient_id,
        professional_id,
        midday(today),
    ))?;
    let mut canceled = appointment_at(patient_id, professional_id, midday(today));
    canceled.status = AppointmentStatus::Canceled;
    store.create_appointment(&canceled)?;
    store.create_appointment(&appointment_at(
        patient_id,
        professional_id,
        midday(today + Duration::days(1)),
    ))?;

    store.create_invoice(&NewInvoice {
        patient_id,
        description: "Consultation".to_owned(),
        amount_cents: 15_000,
        status: InvoiceStatus::Overdue,
        method: PaymentMethod::Card,
        issued_on: today - Duration::days(60),
        due_on: today - Duration::days(30),
        paid_on: None,
        notes: String::new(),
    })?;

    let category_id = store.list_inventory_categories()?[0].id;
    store.create_inventory_item(&miclinica_db::NewInventoryItem {
        name: "Nitrile gloves".to_owned(),
        category_id,
        quantity: 2,
        reorder_level: 10,
        unit_cost_cents: Some(1_200),
        expires_on: None,
        supplier: "MedSource Supply".to_owned(),
        notes: String::new(),
    })?;

    store.insert_message(&NewMessage {
        patient_id,
        direction: MessageDirection::Inbound,
        subject: "Billing question".to_owned(),
        body: "Question about my last statement.".to_owned(),
        sent_at: midday(today),
        read: false,
    })?;
    store.insert_message(&NewMessage {
        patient_id,
        direction: MessageDirection::Outbound,
        subject: "Reply".to_owned(),
        body: "Answered.".to_owned(),
        sent_at: midday(today),
        read: false,
    })?;

    let counts = store.dashboard_counts(today)?;
    assert_eq!(counts.appointments_today, 1);
    assert_eq!(counts.invoices_overdue, 1);
    assert_eq!(counts.inventory_low, 1);
    assert_eq!(counts.messages_unread, 1);
    Ok(())
}

#[test]
fn day_schedule_joins_names_and_filters_by_date() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    let today = Date::from_calendar_date(2026, Month::June, 1).expect("valid date");
    let patient_id = store.create_patient(&new_patient("Morgan Flores"))?;
    let professional_id = store.create_professional(&new_professional(&store, "Dr. Young")?)?;

    store.create_appointment(&appointment_at(
        patient_id,
        professional_id,
        midday(today),
    ))?;
    store.create_appointment(&appointment_at(
        patient_id,
        professional_id,
        midday(today + Duration::days(3)),
    ))?;

    let rows = store.list_appointments_on(today)?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].patient_name, "Morgan Flores");
    assert_eq!(rows[0].professional_name, "Dr. Young");
    assert_eq!(rows[0].status, AppointmentStatus::Scheduled);
    Ok(())
}

#[test]
fn overdue_and_payment_listings() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    let today = Date::from_calendar_date(2026, Month::June, 1).expect("valid date");
    let patient_id = store.create_patient(&new_patient("Hayden Bennett"))?;

    store.create_invoice(&NewInvoice {
        patient_id,
        description: "Lab panel".to_owned(),
        amount_cents: 22_000,
        status: InvoiceStatus::Overdue,
        method: PaymentMethod::Insurance,
        issued_on: today - Duration::days(90),
        due_on: today - Duration::days(45),
        paid_on: None,
        notes: String::new(),
    })?;
    store.create_invoice(&NewInvoice {
        patient_id,
        description: "Vaccination".to_owned(),
        amount_cents: 9_000,
        status: InvoiceStatus::Paid,
        method: PaymentMethod::Cash,
        issued_on: today - Duration::days(20),
        due_on: today - Duration::days(5),
        paid_on: Some(today - Duration::days(10)),
        notes: String::new(),
    })?;

    let overdue = store.list_overdue_invoice_rows()?;
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].amount_cents, 22_000);
    assert_eq!(overdue[0].patient_name, "Hayden Bennett");

    let payments = store.list_recent_payments(5)?;
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].paid_on, today - Duration::days(10));
    Ok(())
}

#[test]
fn message_and_notification_read_flags() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    let patient_id = store.create_patient(&new_patient("Kai Turner"))?;
    let message_id = store.insert_message(&NewMessage {
        patient_id,
        direction: MessageDirection::Inbound,
        subject: "Reschedule request".to_owned(),
        body: "Can we move my visit?".to_owned(),
        sent_at: OffsetDateTime::from_unix_timestamp(1_750_000_000).expect("valid timestamp"),
        read: false,
    })?;
    let notification_id = store.insert_notification(&NewNotification {
        kind: NotificationKind::Inventory,
        body: "An item dropped below its reorder level".to_owned(),
        created_at: OffsetDateTime::from_unix_timestamp(1_750_000_000).expect("valid timestamp"),
        read: false,
    })?;

    store.mark_message_read(message_id, true)?;
    store.mark_notification_read(notification_id, true)?;

    assert!(store.list_messages()?[0].read);
    assert!(store.list_notifications()?[0].read);
    Ok(())
}

#[test]
fn settings_round_trip_with_defaults() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    assert!(store.get_show_dashboard()?);
    assert_eq!(store.get_page_size()?, miclinica_app::DEFAULT_PAGE_SIZE);

    store.put_show_dashboard(false)?;
    store.put_page_size(25)?;

    assert!(!store.get_show_dashboard()?);
    assert_eq!(store.get_page_size()?, 25);

    let settings = store.list_settings()?;
    assert!(settings.contains(&miclinica_app::AppSetting {
        key: SettingKey::UiShowDashboard,
        value: SettingValue::Bool(false),
    }));
    assert!(store.put_page_size(0).is_err());
    Ok(())
}

#[test]
fn seed_demo_data_populates_every_table() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    let profile = SeedProfile {
        seed: 7,
        patients: 12,
        professionals: 4,
        appointments: 20,
        invoices: 15,
        inventory_items: 9,
        messages: 6,
        notifications: 3,
    };
    store.seed_demo_data(&profile)?;

    assert_eq!(store.list_patients(false)?.len(), 12);
    assert_eq!(store.list_professionals(false)?.len(), 4);
    assert_eq!(store.list_appointments(false)?.len(), 20);
    assert_eq!(store.list_invoices(false)?.len(), 15);
    assert_eq!(store.list_inventory_items(false)?.len(), 9);
    assert_eq!(store.list_messages()?.len(), 6);
    assert_eq!(store.list_notifications()?.len(), 3);

    let patients = store.list_patients(false)?;
    assert!(patients.iter().all(|patient| !patient.name.is_empty()));
    Ok(())
}

#[test]
fn seeding_an_empty_profile_is_a_no_op() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    let profile = SeedProfile {
        seed: 1,
        patients: 0,
        professionals: 0,
        appointments: 10,
        invoices: 10,
        inventory_items: 0,
        messages: 10,
        notifications: 0,
    };
    store.seed_demo_data(&profile)?;

    assert!(store.list_patients(false)?.is_empty());
    assert!(store.list_appointments(false)?.is_empty());
    assert!(store.list_invoices(false)?.is_empty());
    assert!(store.list_messages()?.is_empty());
    Ok(())
}
