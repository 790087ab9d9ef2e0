// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use miclinica_app::{
    Appointment, AppointmentId, AppointmentStatus, AppSetting, DashboardCounts, DeletionEntity,
    DeletionRecord, DeletionRecordId, FinancialStatus, InventoryCategory, InventoryCategoryId,
    InventoryItem, InventoryItemId, Invoice, InvoiceId, InvoiceStatus, Message, MessageDirection,
    MessageId, Notification, NotificationId, NotificationKind, Patient, PatientId, PatientStatus,
    PaymentMethod, Professional, ProfessionalId, SettingKey, SettingValue, Specialty, SpecialtyId,
};
use miclinica_testkit::ClinicFaker;
use rusqlite::{Connection, OptionalExtension, Row, params};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

pub mod validation;

pub const APP_NAME: &str = "miclinica";

const DEFAULT_SPECIALTIES: [&str; 8] = [
    "Cardiology",
    "Dermatology",
    "General Practice",
    "Gynecology",
    "Nutrition",
    "Orthopedics",
    "Pediatrics",
    "Psychiatry",
];

const DEFAULT_INVENTORY_CATEGORIES: [&str; 6] = [
    "Consumables",
    "Equipment",
    "Instruments",
    "Medication",
    "Office",
    "PPE",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupValue<Id> {
    pub id: Id,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPatient {
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

pub type UpdatePatient = NewPatient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfessional {
    pub name: String,
    pub specialty_id: SpecialtyId,
    pub registration: String,
    pub email: String,
    pub phone: String,
    pub notes: String,
}

pub type UpdateProfessional = NewProfessional;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub patient_id: PatientId,
    pub professional_id: ProfessionalId,
    pub scheduled_at: OffsetDateTime,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub room: String,
    pub notes: String,
}

pub type UpdateAppointment = NewAppointment;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub patient_id: PatientId,
    pub description: String,
    pub amount_cents: i64,
    pub status: InvoiceStatus,
    pub method: PaymentMethod,
    pub issued_on: Date,
    pub due_on: Date,
    pub paid_on: Option<Date>,
    pub notes: String,
}

pub type UpdateInvoice = NewInvoice;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInventoryItem {
    pub name: String,
    pub category_id: InventoryCategoryId,
    pub quantity: i32,
    pub reorder_level: i32,
    pub unit_cost_cents: Option<i64>,
    pub expires_on: Option<Date>,
    pub supplier: String,
    pub notes: String,
}

pub type UpdateInventoryItem = NewInventoryItem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub patient_id: PatientId,
    pub direction: MessageDirection,
    pub subject: String,
    pub body: String,
    pub sent_at: OffsetDateTime,
    pub read: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub body: String,
    pub created_at: OffsetDateTime,
    pub read: bool,
}

/// How much demo data a session starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedProfile {
    pub seed: u64,
    pub patients: usize,
    pub professionals: usize,
    pub appointments: usize,
    pub invoices: usize,
    pub inventory_items: usize,
    pub messages: usize,
    pub notifications: usize,
}

impl Default for SeedProfile {
    fn default() -> Self {
        Self {
            seed: 1,
            patients: 60,
            professionals: 8,
            appointments: 120,
            invoices: 90,
            inventory_items: 36,
            messages: 24,
            notifications: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEntityRef {
    Patient(PatientId),
    Professional(ProfessionalId),
    Appointment(AppointmentId),
    Invoice(InvoiceId),
    InventoryItem(InventoryItemId),
}

impl LifecycleEntityRef {
    const fn kind(self) -> DeletionEntity {
        match self {
            Self::Patient(_) => DeletionEntity::Patient,
            Self::Professional(_) => DeletionEntity::Professional,
            Self::Appointment(_) => DeletionEntity::Appointment,
            Self::Invoice(_) => DeletionEntity::Invoice,
            Self::InventoryItem(_) => DeletionEntity::InventoryItem,
        }
    }

    const fn id(self) -> i64 {
        match self {
            Self::Patient(id) => id.get(),
            Self::Professional(id) => id.get(),
            Self::Appointment(id) => id.get(),
            Self::Invoice(id) => id.get(),
            Self::InventoryItem(id) => id.get(),
        }
    }

    const fn table(self) -> &'static str {
        match self {
            Self::Patient(_) => "patients",
            Self::Professional(_) => "professionals",
            Self::Appointment(_) => "appointments",
            Self::Invoice(_) => "invoices",
            Self::InventoryItem(_) => "inventory_items",
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Patient(_) => "patient",
            Self::Professional(_) => "professional",
            Self::Appointment(_) => "appointment",
            Self::Invoice(_) => "invoice",
            Self::InventoryItem(_) => "inventory item",
        }
    }
}

/// One row of the dashboard appointment list, names resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentDayRow {
    pub appointment_id: AppointmentId,
    pub patient_name: String,
    pub professional_name: String,
    pub scheduled_at: OffsetDateTime,
    pub status: AppointmentStatus,
    pub room: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverdueInvoiceRow {
    pub invoice_id: InvoiceId,
    pub patient_name: String,
    pub amount_cents: i64,
    pub due_on: Date,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentPaymentRow {
    pub invoice_id: InvoiceId,
    pub patient_name: String,
    pub amount_cents: i64,
    pub paid_on: Date,
}

/// Session store over an in-memory SQLite database. The collection lives for
/// exactly one run of the application; there is no on-disk mode.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        self.conn
            .execute_batch(include_str!("sql/schema.sql"))
            .context("create schema")?;
        self.seed_defaults()?;
        Ok(())
    }

    pub fn seed_defaults(&self) -> Result<()> {
        for specialty in DEFAULT_SPECIALTIES {
            self.conn
                .execute(
                    "INSERT OR IGNORE INTO specialties (name) VALUES (?)",
                    params![specialty],
                )
                .with_context(|| format!("insert default specialty {specialty}"))?;
        }

        for category in DEFAULT_INVENTORY_CATEGORIES {
            self.conn
                .execute(
                    "INSERT OR IGNORE INTO inventory_categories (name) VALUES (?)",
                    params![category],
                )
                .with_context(|| format!("insert default inventory category {category}"))?;
        }
        Ok(())
    }

    pub fn list_specialties(&self) -> Result<Vec<LookupValue<SpecialtyId>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM specialties ORDER BY name ASC")
            .context("prepare specialties query")?;
        let rows = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let name: String = row.get(1)?;
                Ok(LookupValue {
                    id: SpecialtyId::new(id),
                    name,
                })
            })
            .context("query specialties")?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect specialties")
    }

    pub fn list_inventory_categories(&self) -> Result<Vec<LookupValue<InventoryCategoryId>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM inventory_categories ORDER BY name ASC")
            .context("prepare inventory categories query")?;
        let rows = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let name: String = row.get(1)?;
                Ok(LookupValue {
                    id: InventoryCategoryId::new(id),
                    name,
                })
            })
            .context("query inventory categories")?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect inventory categories")
    }

    pub fn get_specialty(&self, specialty_id: SpecialtyId) -> Result<Specialty> {
        self.conn
            .query_row(
                "SELECT id, name, created_at, updated_at FROM specialties WHERE id = ?",
                params![specialty_id.get()],
                |row| {
                    let created_at_raw: String = row.get(2)?;
                    let updated_at_raw: String = row.get(3)?;
                    Ok(Specialty {
                        id: SpecialtyId::new(row.get(0)?),
                        name: row.get(1)?,
                        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
                        updated_at: parse_datetime(&updated_at_raw).map_err(to_sql_error)?,
                    })
                },
            )
            .with_context(|| format!("load specialty {}", specialty_id.get()))
    }

    pub fn get_inventory_category(
        &self,
        category_id: InventoryCategoryId,
    ) -> Result<InventoryCategory> {
        self.conn
            .query_row(
                "SELECT id, name, created_at, updated_at FROM inventory_categories WHERE id = ?",
                params![category_id.get()],
                |row| {
                    let created_at_raw: String = row.get(2)?;
                    let updated_at_raw: String = row.get(3)?;
                    Ok(InventoryCategory {
                        id: InventoryCategoryId::new(row.get(0)?),
                        name: row.get(1)?,
                        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
                        updated_at: parse_datetime(&updated_at_raw).map_err(to_sql_error)?,
                    })
                },
            )
            .with_context(|| format!("load inventory category {}", category_id.get()))
    }

    pub fn list_deletion_records(&self) -> Result<Vec<DeletionRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT id, entity, target_id, deleted_at, restored_at
                FROM deletion_records
                ORDER BY id ASC
                ",
            )
            .context("prepare deletion records query")?;
        let rows = stmt
            .query_map([], |row| {
                let entity_raw: String = row.get(1)?;
                let entity = DeletionEntity::parse(&entity_raw)
                    .ok_or_else(|| enum_column_error(1, "deletion entity", &entity_raw))?;
                let deleted_at_raw: String = row.get(3)?;
                let restored_at_raw: Option<String> = row.get(4)?;
                Ok(DeletionRecord {
                    id: DeletionRecordId::new(row.get(0)?),
                    entity,
                    target_id: row.get(2)?,
                    deleted_at: parse_datetime(&deleted_at_raw).map_err(to_sql_error)?,
                    restored_at: parse_opt_datetime(restored_at_raw).map_err(to_sql_error)?,
                })
            })
            .context("query deletion records")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect deletion records")
    }

    pub fn create_patient(&self, new_patient: &NewPatient) -> Result<PatientId> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO patients (
                  name, email, phone, tax_id, status, financial_status,
                  birth_date, last_visit, address_line, city, state, postal_code,
                  notes, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
                params![
                    new_patient.name,
                    new_patient.email,
                    new_patient.phone,
                    new_patient.tax_id,
                    new_patient.status.as_str(),
                    new_patient.financial_status.as_str(),
                    format_date(new_patient.birth_date),
                    new_patient.last_visit.map(format_date),
                    new_patient.address_line,
                    new_patient.city,
                    new_patient.state,
                    new_patient.postal_code,
                    new_patient.notes,
                    now,
                    now,
                ],
            )
            .context("insert patient")?;

        Ok(PatientId::new(self.conn.last_insert_rowid()))
    }

    pub fn update_patient(&self, patient_id: PatientId, update: &UpdatePatient) -> Result<()> {
        let now = now_rfc3339()?;
        let rows_affected = self
            .conn
            .execute(
                "
                UPDATE patients
                SET
                  name = ?,
                  email = ?,
                  phone = ?,
                  tax_id = ?,
                  status = ?,
                  financial_status = ?,
                  birth_date = ?,
                  last_visit = ?,
                  address_line = ?,
                  city = ?,
                  state = ?,
                  postal_code = ?,
                  notes = ?,
                  updated_at = ?
                WHERE id = ? AND deleted_at IS NULL
                ",
                params![
                    update.name,
                    update.email,
                    update.phone,
                    update.tax_id,
                    update.status.as_str(),
                    update.financial_status.as_str(),
                    format_date(update.birth_date),
                    update.last_visit.map(format_date),
                    update.address_line,
                    update.city,
                    update.state,
                    update.postal_code,
                    update.notes,
                    now,
                    patient_id.get(),
                ],
            )
            .context("update patient")?;
        if rows_affected == 0 {
            bail!(
                "patient {} not found or deleted -- choose an existing patient and retry",
                patient_id.get()
            );
        }
        Ok(())
    }

    pub fn get_patient(&self, patient_id: PatientId) -> Result<Patient> {
        self.conn
            .query_row(
                &format!("{PATIENT_SELECT} WHERE id = ?"),
                params![patient_id.get()],
                patient_from_row,
            )
            .with_context(|| format!("load patient {}", patient_id.get()))
    }

    /// Insertion order (id ascending) so the query pipeline's "no sort" case
    /// sees the load-time ordering.
    pub fn list_patients(&self, include_deleted: bool) -> Result<Vec<Patient>> {
        let mut sql = PATIENT_SELECT.to_owned();
        if !include_deleted {
            sql.push_str(" WHERE deleted_at IS NULL");
        }
        sql.push_str(" ORDER BY id ASC");

        let mut stmt = self.conn.prepare(&sql).context("prepare patients query")?;
        let rows = stmt
            .query_map([], patient_from_row)
            .context("query patients")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect patients")
    }

    pub fn soft_delete_patient(&self, patient_id: PatientId) -> Result<()> {
        self.soft_delete(LifecycleEntityRef::Patient(patient_id))
    }

    pub fn restore_patient(&self, patient_id: PatientId) -> Result<()> {
        self.restore(LifecycleEntityRef::Patient(patient_id))
    }

    pub fn create_professional(&self, new_professional: &NewProfessional) -> Result<ProfessionalId> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO professionals (
                  name, specialty_id, registration, email, phone, notes,
                  created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ",
                params![
                    new_professional.name,
                    new_professional.specialty_id.get(),
                    new_professional.registration,
                    new_professional.email,
                    new_professional.phone,
                    new_professional.notes,
                    now,
                    now,
                ],
            )
            .context("insert professional")?;

        Ok(ProfessionalId::new(self.conn.last_insert_rowid()))
    }

    pub fn update_professional(
        &self,
        professional_id: ProfessionalId,
        update: &UpdateProfessional,
    ) -> Result<()> {
        let now = now_rfc3339()?;
        let rows_affected = self
            .conn
            .execute(
                "
                UPDATE professionals
                SET
                  name = ?,
                  specialty_id = ?,
                  registration = ?,
                  email = ?,
                  phone = ?,
                  notes = ?,
                  updated_at = ?
                WHERE id = ? AND deleted_at IS NULL
                ",
                params![
                    update.name,
                    update.specialty_id.get(),
                    update.registration,
                    update.email,
                    update.phone,
                    update.notes,
                    now,
                    professional_id.get(),
                ],
            )
            .context("update professional")?;
        if rows_affected == 0 {
            bail!(
                "professional {} not found or deleted -- choose an existing professional and retry",
                professional_id.get()
            );
        }
        Ok(())
    }

    pub fn get_professional(&self, professional_id: ProfessionalId) -> Result<Professional> {
        self.conn
            .query_row(
                &format!("{PROFESSIONAL_SELECT} WHERE id = ?"),
                params![professional_id.get()],
                professional_from_row,
            )
            .with_context(|| format!("load professional {}", professional_id.get()))
    }

    pub fn list_professionals(&self, include_deleted: bool) -> Result<Vec<Professional>> {
        let mut sql = PROFESSIONAL_SELECT.to_owned();
        if !include_deleted {
            sql.push_str(" WHERE deleted_at IS NULL");
        }
        sql.push_str(" ORDER BY name ASC, id ASC");

        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("prepare professionals query")?;
        let rows = stmt
            .query_map([], professional_from_row)
            .context("query professionals")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect professionals")
    }

    pub fn soft_delete_professional(&self, professional_id: ProfessionalId) -> Result<()> {
        self.soft_delete(LifecycleEntityRef::Professional(professional_id))
    }

    pub fn restore_professional(&self, professional_id: ProfessionalId) -> Result<()> {
        self.restore(LifecycleEntityRef::Professional(professional_id))
    }

    pub fn create_appointment(&self, new_appointment: &NewAppointment) -> Result<AppointmentId> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO appointments (
                  patient_id, professional_id, scheduled_at, duration_minutes,
                  status, room, notes, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
                params![
                    new_appointment.patient_id.get(),
                    new_appointment.professional_id.get(),
                    format_datetime(new_appointment.scheduled_at)?,
                    new_appointment.duration_minutes,
                    new_appointment.status.as_str(),
                    new_appointment.room,
                    new_appointment.notes,
                    now,
                    now,
                ],
            )
            .context("insert appointment")?;

        Ok(AppointmentId::new(self.conn.last_insert_rowid()))
    }

    pub fn update_appointment(
        &self,
        appointment_id: AppointmentId,
        update: &UpdateAppointment,
    ) -> Result<()> {
        let now = now_rfc3339()?;
        let rows_affected = self
            .conn
            .execute(
                "
                UPDATE appointments
                SET
                  patient_id = ?,
                  professional_id = ?,
                  scheduled_at = ?,
                  duration_minutes = ?,
                  status = ?,
                  room = ?,
                  notes = ?,
                  updated_at = ?
                WHERE id = ? AND deleted_at IS NULL
                ",
                params![
                    update.patient_id.get(),
                    update.professional_id.get(),
                    format_datetime(update.scheduled_at)?,
                    update.duration_minutes,
                    update.status.as_str(),
                    update.room,
                    update.notes,
                    now,
                    appointment_id.get(),
                ],
            )
            .context("update appointment")?;
        if rows_affected == 0 {
            bail!(
                "appointment {} not found or deleted -- choose an existing appointment and retry",
                appointment_id.get()
            );
        }
        Ok(())
    }

    pub fn get_appointment(&self, appointment_id: AppointmentId) -> Result<Appointment> {
        self.conn
            .query_row(
                &format!("{APPOINTMENT_SELECT} WHERE id = ?"),
                params![appointment_id.get()],
                appointment_from_row,
            )
            .with_context(|| format!("load appointment {}", appointment_id.get()))
    }

    pub fn list_appointments(&self, include_deleted: bool) -> Result<Vec<Appointment>> {
        let mut sql = APPOINTMENT_SELECT.to_owned();
        if !include_deleted {
            sql.push_str(" WHERE deleted_at IS NULL");
        }
        sql.push_str(" ORDER BY scheduled_at DESC, id DESC");

        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("prepare appointments query")?;
        let rows = stmt
            .query_map([], appointment_from_row)
            .context("query appointments")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect appointments")
    }

    pub fn soft_delete_appointment(&self, appointment_id: AppointmentId) -> Result<()> {
        self.soft_delete(LifecycleEntityRef::Appointment(appointment_id))
    }

    pub fn restore_appointment(&self, appointment_id: AppointmentId) -> Result<()> {
        self.restore(LifecycleEntityRef::Appointment(appointment_id))
    }

    pub fn create_invoice(&self, new_invoice: &NewInvoice) -> Result<InvoiceId> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO invoices (
                  patient_id, description, amount_cents, status, method,
                  issued_on, due_on, paid_on, notes, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
                params![
                    new_invoice.patient_id.get(),
                    new_invoice.description,
                    new_invoice.amount_cents,
                    new_invoice.status.as_str(),
                    new_invoice.method.as_str(),
                    format_date(new_invoice.issued_on),
                    format_date(new_invoice.due_on),
                    new_invoice.paid_on.map(format_date),
                    new_invoice.notes,
                    now,
                    now,
                ],
            )
            .context("insert invoice")?;

        Ok(InvoiceId::new(self.conn.last_insert_rowid()))
    }

    pub fn update_invoice(&self, invoice_id: InvoiceId, update: &UpdateInvoice) -> Result<()> {
        let now = now_rfc3339()?;
        let rows_affected = self
            .conn
            .execute(
                "
                UPDATE invoices
                SET
                  patient_id = ?,
                  description = ?,
                  amount_cents = ?,
                  status = ?,
                  method = ?,
                  issued_on = ?,
                  due_on = ?,
                  paid_on = ?,
                  notes = ?,
                  updated_at = ?
                WHERE id = ? AND deleted_at IS NULL
                ",
                params![
                    update.patient_id.get(),
                    update.description,
                    update.amount_cents,
                    update.status.as_str(),
                    update.method.as_str(),
                    format_date(update.issued_on),
                    format_date(update.due_on),
                    update.paid_on.map(format_date),
                    update.notes,
                    now,
                    invoice_id.get(),
                ],
            )
            .context("update invoice")?;
        if rows_affected == 0 {
            bail!(
                "invoice {} not found or deleted -- choose an existing invoice and retry",
                invoice_id.get()
            );
        }
        Ok(())
    }

    pub fn get_invoice(&self, invoice_id: InvoiceId) -> Result<Invoice> {
        self.conn
            .query_row(
                &format!("{INVOICE_SELECT} WHERE id = ?"),
                params![invoice_id.get()],
                invoice_from_row,
            )
            .with_context(|| format!("load invoice {}", invoice_id.get()))
    }

    pub fn list_invoices(&self, include_deleted: bool) -> Result<Vec<Invoice>> {
        let mut sql = INVOICE_SELECT.to_owned();
        if !include_deleted {
            sql.push_str(" WHERE deleted_at IS NULL");
        }
        sql.push_str(" ORDER BY issued_on DESC, id DESC");

        let mut stmt = self.conn.prepare(&sql).context("prepare invoices query")?;
        let rows = stmt
            .query_map([], invoice_from_row)
            .context("query invoices")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect invoices")
    }

    pub fn soft_delete_invoice(&self, invoice_id: InvoiceId) -> Result<()> {
        self.soft_delete(LifecycleEntityRef::Invoice(invoice_id))
    }

    pub fn restore_invoice(&self, invoice_id: InvoiceId) -> Result<()> {
        self.restore(LifecycleEntityRef::Invoice(invoice_id))
    }

    pub fn create_inventory_item(&self, new_item: &NewInventoryItem) -> Result<InventoryItemId> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO inventory_items (
                  name, category_id, quantity, reorder_level, unit_cost_cents,
                  expires_on, supplier, notes, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
                params![
                    new_item.name,
                    new_item.category_id.get(),
                    new_item.quantity,
                    new_item.reorder_level,
                    new_item.unit_cost_cents,
                    new_item.expires_on.map(format_date),
                    new_item.supplier,
                    new_item.notes,
                    now,
                    now,
                ],
            )
            .context("insert inventory item")?;

        Ok(InventoryItemId::new(self.conn.last_insert_rowid()))
    }

    pub fn update_inventory_item(
        &self,
        item_id: InventoryItemId,
        update: &UpdateInventoryItem,
    ) -> Result<()> {
        let now = now_rfc3339()?;
        let rows_affected = self
            .conn
            .execute(
                "
                UPDATE inventory_items
                SET
                  name = ?,
                  category_id = ?,
                  quantity = ?,
                  reorder_level = ?,
                  unit_cost_cents = ?,
                  expires_on = ?,
                  supplier = ?,
                  notes = ?,
                  updated_at = ?
                WHERE id = ? AND deleted_at IS NULL
                ",
                params![
                    update.name,
                    update.category_id.get(),
                    update.quantity,
                    update.reorder_level,
                    update.unit_cost_cents,
                    update.expires_on.map(format_date),
                    update.supplier,
                    update.notes,
                    now,
                    item_id.get(),
                ],
            )
            .context("update inventory item")?;
        if rows_affected == 0 {
            bail!(
                "inventory item {} not found or deleted -- choose an existing item and retry",
                item_id.get()
            );
        }
        Ok(())
    }

    pub fn get_inventory_item(&self, item_id: InventoryItemId) -> Result<InventoryItem> {
        self.conn
            .query_row(
                &format!("{INVENTORY_SELECT} WHERE id = ?"),
                params![item_id.get()],
                inventory_item_from_row,
            )
            .with_context(|| format!("load inventory item {}", item_id.get()))
    }

    pub fn list_inventory_items(&self, include_deleted: bool) -> Result<Vec<InventoryItem>> {
        let mut sql = INVENTORY_SELECT.to_owned();
        if !include_deleted {
            sql.push_str(" WHERE deleted_at IS NULL");
        }
        sql.push_str(" ORDER BY name ASC, id ASC");

        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("prepare inventory items query")?;
        let rows = stmt
            .query_map([], inventory_item_from_row)
            .context("query inventory items")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect inventory items")
    }

    pub fn soft_delete_inventory_item(&self, item_id: InventoryItemId) -> Result<()> {
        self.soft_delete(LifecycleEntityRef::InventoryItem(item_id))
    }

    pub fn restore_inventory_item(&self, item_id: InventoryItemId) -> Result<()> {
        self.restore(LifecycleEntityRef::InventoryItem(item_id))
    }

    pub fn insert_message(&self, new_message: &NewMessage) -> Result<MessageId> {
        self.conn
            .execute(
                "
                INSERT INTO messages (patient_id, direction, subject, body, sent_at, read)
                VALUES (?, ?, ?, ?, ?, ?)
                ",
                params![
                    new_message.patient_id.get(),
                    new_message.direction.as_str(),
                    new_message.subject,
                    new_message.body,
                    format_datetime(new_message.sent_at)?,
                    new_message.read as i64,
                ],
            )
            .context("insert message")?;
        Ok(MessageId::new(self.conn.last_insert_rowid()))
    }

    pub fn list_messages(&self) -> Result<Vec<Message>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MESSAGE_SELECT} ORDER BY sent_at DESC, id DESC"))
            .context("prepare messages query")?;
        let rows = stmt
            .query_map([], message_from_row)
            .context("query messages")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect messages")
    }

    pub fn mark_message_read(&self, message_id: MessageId, read: bool) -> Result<()> {
        let rows_affected = self
            .conn
            .execute(
                "UPDATE messages SET read = ? WHERE id = ?",
                params![read as i64, message_id.get()],
            )
            .context("mark message read")?;
        if rows_affected == 0 {
            bail!("message {} not found", message_id.get());
        }
        Ok(())
    }

    pub fn insert_notification(&self, new_notification: &NewNotification) -> Result<NotificationId> {
        self.conn
            .execute(
                "
                INSERT INTO notifications (kind, body, created_at, read)
                VALUES (?, ?, ?, ?)
                ",
                params![
                    new_notification.kind.as_str(),
                    new_notification.body,
                    format_datetime(new_notification.created_at)?,
                    new_notification.read as i64,
                ],
            )
            .context("insert notification")?;
        Ok(NotificationId::new(self.conn.last_insert_rowid()))
    }

    pub fn list_notifications(&self) -> Result<Vec<Notification>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "{NOTIFICATION_SELECT} ORDER BY created_at DESC, id DESC"
            ))
            .context("prepare notifications query")?;
        let rows = stmt
            .query_map([], notification_from_row)
            .context("query notifications")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect notifications")
    }

    pub fn mark_notification_read(&self, notification_id: NotificationId, read: bool) -> Result<()> {
        let rows_affected = self
            .conn
            .execute(
                "UPDATE notifications SET read = ? WHERE id = ?",
                params![read as i64, notification_id.get()],
            )
            .context("mark notification read")?;
        if rows_affected == 0 {
            bail!("notification {} not found", notification_id.get());
        }
        Ok(())
    }

    pub fn soft_delete(&self, target: LifecycleEntityRef) -> Result<()> {
        self.ensure_can_soft_delete(target)?;
        let now = now_rfc3339()?;

        let rows_affected = self
            .conn
            .execute(
                &format!(
                    "UPDATE {} SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
                    target.table()
                ),
                params![now, now, target.id()],
            )
            .with_context(|| format!("soft delete {}", target.label()))?;
        if rows_affected == 0 {
            bail!(
                "{} {} not found or already deleted",
                target.label(),
                target.id()
            );
        }

        self.conn
            .execute(
                "INSERT INTO deletion_records (entity, target_id, deleted_at) VALUES (?, ?, ?)",
                params![target.kind().as_str(), target.id(), now],
            )
            .context("record deletion")?;
        Ok(())
    }

    pub fn restore(&self, target: LifecycleEntityRef) -> Result<()> {
        let now = now_rfc3339()?;
        let rows_affected = self
            .conn
            .execute(
                &format!(
                    "UPDATE {} SET deleted_at = NULL, updated_at = ? WHERE id = ? AND deleted_at IS NOT NULL",
                    target.table()
                ),
                params![now, target.id()],
            )
            .with_context(|| format!("restore {}", target.label()))?;
        if rows_affected == 0 {
            bail!("{} {} is not deleted", target.label(), target.id());
        }

        self.conn
            .execute(
                "
                UPDATE deletion_records
                SET restored_at = ?
                WHERE entity = ? AND target_id = ? AND restored_at IS NULL
                ",
                params![now, target.kind().as_str(), target.id()],
            )
            .context("record restore")?;
        Ok(())
    }

    fn ensure_can_soft_delete(&self, target: LifecycleEntityRef) -> Result<()> {
        let (dependents, dependent_label) = match target {
            LifecycleEntityRef::Patient(_) => {
                let count: i64 = self
                    .conn
                    .query_row(
                        "
                        SELECT
                          (SELECT COUNT(*) FROM appointments
                           WHERE patient_id = ? AND deleted_at IS NULL)
                          +
                          (SELECT COUNT(*) FROM invoices
                           WHERE patient_id = ? AND deleted_at IS NULL)
                        ",
                        params![target.id(), target.id()],
                        |row| row.get(0),
                    )
                    .context("count patient dependents")?;
                (count, "appointments or invoices")
            }
            LifecycleEntityRef::Professional(_) => {
                let count: i64 = self
                    .conn
                    .query_row(
                        "
                        SELECT COUNT(*) FROM appointments
                        WHERE professional_id = ? AND deleted_at IS NULL
                        ",
                        params![target.id()],
                        |row| row.get(0),
                    )
                    .context("count professional dependents")?;
                (count, "appointments")
            }
            _ => return Ok(()),
        };

        if dependents > 0 {
            bail!(
                "{} {} still has {dependents} linked {dependent_label} -- delete or reassign those first",
                target.label(),
                target.id()
            );
        }
        Ok(())
    }

    pub fn dashboard_counts(&self, today: Date) -> Result<DashboardCounts> {
        let today = format_date(today);

        let appointments_today: i64 = self
            .conn
            .query_row(
                "
                SELECT COUNT(*)
                FROM appointments
                WHERE deleted_at IS NULL
                  AND substr(scheduled_at, 1, 10) = ?
                  AND status IN ('scheduled', 'confirmed', 'completed')
                ",
                params![today],
                |row| row.get(0),
            )
            .context("count appointments today")?;

        let invoices_overdue: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM invoices WHERE deleted_at IS NULL AND status = 'overdue'",
                [],
                |row| row.get(0),
            )
            .context("count overdue invoices")?;

        let inventory_low: i64 = self
            .conn
            .query_row(
                "
                SELECT COUNT(*)
                FROM inventory_items
                WHERE deleted_at IS NULL AND quantity <= reorder_level
                ",
                [],
                |row| row.get(0),
            )
            .context("count low-stock items")?;

        let messages_unread: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM messages WHERE read = 0 AND direction = 'inbound'",
                [],
                |row| row.get(0),
            )
            .context("count unread messages")?;

        Ok(DashboardCounts {
            appointments_today: appointments_today.max(0) as usize,
            invoices_overdue: invoices_overdue.max(0) as usize,
            inventory_low: inventory_low.max(0) as usize,
            messages_unread: messages_unread.max(0) as usize,
        })
    }

    pub fn list_appointments_on(&self, day: Date) -> Result<Vec<AppointmentDayRow>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT a.id, p.name, pr.name, a.scheduled_at, a.status, a.room
                FROM appointments a
                JOIN patients p ON p.id = a.patient_id
                JOIN professionals pr ON pr.id = a.professional_id
                WHERE a.deleted_at IS NULL
                  AND substr(a.scheduled_at, 1, 10) = ?
                ORDER BY a.scheduled_at ASC, a.id ASC
                ",
            )
            .context("prepare day appointments query")?;
        let rows = stmt
            .query_map(params![format_date(day)], |row| {
                let scheduled_at_raw: String = row.get(3)?;
                let status_raw: String = row.get(4)?;
                Ok(AppointmentDayRow {
                    appointment_id: AppointmentId::new(row.get(0)?),
                    patient_name: row.get(1)?,
                    professional_name: row.get(2)?,
                    scheduled_at: parse_datetime(&scheduled_at_raw).map_err(to_sql_error)?,
                    status: parse_appointment_status(4, &status_raw)?,
                    room: row.get(5)?,
                })
            })
            .context("query day appointments")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect day appointments")
    }

    pub fn list_overdue_invoice_rows(&self) -> Result<Vec<OverdueInvoiceRow>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT i.id, p.name, i.amount_cents, i.due_on
                FROM invoices i
                JOIN patients p ON p.id = i.patient_id
                WHERE i.deleted_at IS NULL AND i.status = 'overdue'
                ORDER BY i.due_on ASC, i.id ASC
                ",
            )
            .context("prepare overdue invoices query")?;
        let rows = stmt
            .query_map([], |row| {
                let due_on_raw: String = row.get(3)?;
                Ok(OverdueInvoiceRow {
                    invoice_id: InvoiceId::new(row.get(0)?),
                    patient_name: row.get(1)?,
                    amount_cents: row.get(2)?,
                    due_on: parse_date(&due_on_raw).map_err(to_sql_error)?,
                })
            })
            .context("query overdue invoices")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect overdue invoices")
    }

    pub fn list_low_stock_items(&self) -> Result<Vec<InventoryItem>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "
                {INVENTORY_SELECT}
                WHERE deleted_at IS NULL AND quantity <= reorder_level
                ORDER BY quantity ASC, id ASC
                "
            ))
            .context("prepare low-stock query")?;
        let rows = stmt
            .query_map([], inventory_item_from_row)
            .context("query low-stock items")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect low-stock items")
    }

    pub fn list_recent_payments(&self, limit: usize) -> Result<Vec<RecentPaymentRow>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT i.id, p.name, i.amount_cents, i.paid_on
                FROM invoices i
                JOIN patients p ON p.id = i.patient_id
                WHERE i.deleted_at IS NULL
                  AND i.status = 'paid'
                  AND i.paid_on IS NOT NULL
                ORDER BY i.paid_on DESC, i.id DESC
                LIMIT ?
                ",
            )
            .context("prepare recent payments query")?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                let paid_on_raw: String = row.get(3)?;
                Ok(RecentPaymentRow {
                    invoice_id: InvoiceId::new(row.get(0)?),
                    patient_name: row.get(1)?,
                    amount_cents: row.get(2)?,
                    paid_on: parse_date(&paid_on_raw).map_err(to_sql_error)?,
                })
            })
            .context("query recent payments")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect recent payments")
    }

    pub fn get_setting(&self, key: SettingKey) -> Result<Option<SettingValue>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("load setting {}", key.as_str()))?;

        Ok(raw.and_then(|value| SettingValue::parse_for_key(key, &value)))
    }

    pub fn put_setting(&self, key: SettingKey, value: SettingValue) -> Result<()> {
        let Some(storage) = value.to_storage(key) else {
            bail!(
                "setting {} expects a {:?} value",
                key.as_str(),
                key.expected_value_kind()
            );
        };
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO settings (key, value, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                ",
                params![key.as_str(), storage, now],
            )
            .with_context(|| format!("store setting {}", key.as_str()))?;
        Ok(())
    }

    pub fn list_settings(&self) -> Result<Vec<AppSetting>> {
        SettingKey::ALL
            .into_iter()
            .map(|key| {
                let value = self
                    .get_setting(key)?
                    .unwrap_or_else(|| default_setting_value(key));
                Ok(AppSetting { key, value })
            })
            .collect()
    }

    pub fn get_show_dashboard(&self) -> Result<bool> {
        match self.get_setting(SettingKey::UiShowDashboard)? {
            Some(SettingValue::Bool(value)) => Ok(value),
            _ => Ok(true),
        }
    }

    pub fn put_show_dashboard(&self, show: bool) -> Result<()> {
        self.put_setting(SettingKey::UiShowDashboard, SettingValue::Bool(show))
    }

    pub fn get_page_size(&self) -> Result<usize> {
        match self.get_setting(SettingKey::UiPageSize)? {
            Some(SettingValue::Int(value)) if value > 0 => Ok(value as usize),
            _ => Ok(miclinica_app::DEFAULT_PAGE_SIZE),
        }
    }

    pub fn put_page_size(&self, page_size: usize) -> Result<()> {
        if page_size == 0 {
            bail!("page size must be positive");
        }
        self.put_setting(SettingKey::UiPageSize, SettingValue::Int(page_size as i64))
    }

    /// Fills every table from the deterministic faker. The reference instant
    /// is the real "now" so relative records (today's appointments, recent
    /// visits) land where the dashboard looks for them.
    pub fn seed_demo_data(&self, profile: &SeedProfile) -> Result<()> {
        let mut faker = ClinicFaker::with_reference(profile.seed, OffsetDateTime::now_utc());

        let specialties = self.list_specialties()?;
        for index in 0..profile.professionals {
            let specialty = &specialties[index % specialties.len()];
            let fake = faker.professional_for_specialty(&specialty.name);
            self.create_professional(&NewProfessional {
                name: fake.name,
                specialty_id: specialty.id,
                registration: fake.registration,
                email: fake.email,
                phone: fake.phone,
                notes: fake.notes,
            })?;
        }

        let mut patient_ids = Vec::with_capacity(profile.patients);
        for _ in 0..profile.patients {
            let fake = faker.patient();
            patient_ids.push(self.create_patient(&NewPatient {
                name: fake.name,
                email: fake.email,
                phone: fake.phone,
                tax_id: fake.tax_id,
                status: fake.status,
                financial_status: fake.financial_status,
                birth_date: fake.birth_date,
                last_visit: fake.last_visit,
                address_line: fake.address_line,
                city: fake.city,
                state: fake.state,
                postal_code: fake.postal_code,
                notes: fake.notes,
            })?);
        }

        let professional_ids: Vec<ProfessionalId> = self
            .list_professionals(false)?
            .into_iter()
            .map(|professional| professional.id)
            .collect();

        if !patient_ids.is_empty() && !professional_ids.is_empty() {
            for _ in 0..profile.appointments {
                let fake = faker.appointment();
                self.create_appointment(&NewAppointment {
                    patient_id: patient_ids[faker.int_n(patient_ids.len())],
                    professional_id: professional_ids[faker.int_n(professional_ids.len())],
                    scheduled_at: fake.scheduled_at,
                    duration_minutes: fake.duration_minutes,
                    status: fake.status,
                    room: fake.room,
                    notes: fake.notes,
                })?;
            }
        }

        if !patient_ids.is_empty() {
            for _ in 0..profile.invoices {
                let fake = faker.invoice();
                self.create_invoice(&NewInvoice {
                    patient_id: patient_ids[faker.int_n(patient_ids.len())],
                    description: fake.description,
                    amount_cents: fake.amount_cents,
                    status: fake.status,
                    method: fake.method,
                    issued_on: fake.issued_on,
                    due_on: fake.due_on,
                    paid_on: fake.paid_on,
                    notes: fake.notes,
                })?;
            }

            for _ in 0..profile.messages {
                let fake = faker.message();
                self.insert_message(&NewMessage {
                    patient_id: patient_ids[faker.int_n(patient_ids.len())],
                    direction: fake.direction,
                    subject: fake.subject,
                    body: fake.body,
                    sent_at: fake.sent_at,
                    read: fake.read,
                })?;
            }
        }

        let categories = self.list_inventory_categories()?;
        for index in 0..profile.inventory_items {
            let category = &categories[index % categories.len()];
            let fake = faker.inventory_item(&category.name);
            self.create_inventory_item(&NewInventoryItem {
                name: fake.name,
                category_id: category.id,
                quantity: fake.quantity,
                reorder_level: fake.reorder_level,
                unit_cost_cents: fake.unit_cost_cents,
                expires_on: fake.expires_on,
                supplier: fake.supplier,
                notes: fake.notes,
            })?;
        }

        for _ in 0..profile.notifications {
            let fake = faker.notification();
            self.insert_notification(&NewNotification {
                kind: fake.kind,
                body: fake.body,
                created_at: fake.created_at,
                read: fake.read,
            })?;
        }

        Ok(())
    }
}

const PATIENT_SELECT: &str = "
    SELECT
      id, name, email, phone, tax_id, status, financial_status,
      birth_date, last_visit, address_line, city, state, postal_code,
      notes, created_at, updated_at, deleted_at
    FROM patients
";

const PROFESSIONAL_SELECT: &str = "
    SELECT
      id, name, specialty_id, registration, email, phone, notes,
      created_at, updated_at, deleted_at
    FROM professionals
";

const APPOINTMENT_SELECT: &str = "
    SELECT
      id, patient_id, professional_id, scheduled_at, duration_minutes,
      status, room, notes, created_at, updated_at, deleted_at
    FROM appointments
";

const INVOICE_SELECT: &str = "
    SELECT
      id, patient_id, description, amount_cents, status, method,
      issued_on, due_on, paid_on, notes, created_at, updated_at, deleted_at
    FROM invoices
";

const INVENTORY_SELECT: &str = "
    SELECT
      id, name, category_id, quantity, reorder_level, unit_cost_cents,
      expires_on, supplier, notes, created_at, updated_at, deleted_at
    FROM inventory_items
";

const MESSAGE_SELECT: &str = "
    SELECT id, patient_id, direction, subject, body, sent_at, read
    FROM messages
";

const NOTIFICATION_SELECT: &str = "
    SELECT id, kind, body, created_at, read
    FROM notifications
";

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    let status_raw: String = row.get(5)?;
    let status = PatientStatus::parse(&status_raw)
        .ok_or_else(|| enum_column_error(5, "patient status", &status_raw))?;
    let financial_raw: String = row.get(6)?;
    let financial_status = FinancialStatus::parse(&financial_raw)
        .ok_or_else(|| enum_column_error(6, "financial status", &financial_raw))?;

    let birth_date_raw: String = row.get(7)?;
    let last_visit_raw: Option<String> = row.get(8)?;
    let created_at_raw: String = row.get(14)?;
    let updated_at_raw: String = row.get(15)?;
    let deleted_at_raw: Option<String> = row.get(16)?;

    Ok(Patient {
        id: PatientId::new(row.get(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        tax_id: row.get(4)?,
        status,
        financial_status,
        birth_date: parse_date(&birth_date_raw).map_err(to_sql_error)?,
        last_visit: parse_opt_date(last_visit_raw).map_err(to_sql_error)?,
        address_line: row.get(9)?,
        city: row.get(10)?,
        state: row.get(11)?,
        postal_code: row.get(12)?,
        notes: row.get(13)?,
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
        updated_at: parse_datetime(&updated_at_raw).map_err(to_sql_error)?,
        deleted_at: parse_opt_datetime(deleted_at_raw).map_err(to_sql_error)?,
    })
}

fn professional_from_row(row: &Row<'_>) -> rusqlite::Result<Professional> {
    let created_at_raw: String = row.get(7)?;
    let updated_at_raw: String = row.get(8)?;
    let deleted_at_raw: Option<String> = row.get(9)?;

    Ok(Professional {
        id: ProfessionalId::new(row.get(0)?),
        name: row.get(1)?,
        specialty_id: SpecialtyId::new(row.get(2)?),
        registration: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        notes: row.get(6)?,
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
        updated_at: parse_datetime(&updated_at_raw).map_err(to_sql_error)?,
        deleted_at: parse_opt_datetime(deleted_at_raw).map_err(to_sql_error)?,
    })
}

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    let scheduled_at_raw: String = row.get(3)?;
    let status_raw: String = row.get(5)?;
    let status = parse_appointment_status(5, &status_raw)?;
    let created_at_raw: String = row.get(8)?;
    let updated_at_raw: String = row.get(9)?;
    let deleted_at_raw: Option<String> = row.get(10)?;

    Ok(Appointment {
        id: AppointmentId::new(row.get(0)?),
        patient_id: PatientId::new(row.get(1)?),
        professional_id: ProfessionalId::new(row.get(2)?),
        scheduled_at: parse_datetime(&scheduled_at_raw).map_err(to_sql_error)?,
        duration_minutes: row.get(4)?,
        status,
        room: row.get(6)?,
        notes: row.get(7)?,
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
        updated_at: parse_datetime(&updated_at_raw).map_err(to_sql_error)?,
        deleted_at: parse_opt_datetime(deleted_at_raw).map_err(to_sql_error)?,
    })
}

fn invoice_from_row(row: &Row<'_>) -> rusqlite::Result<Invoice> {
    let status_raw: String = row.get(4)?;
    let status = InvoiceStatus::parse(&status_raw)
        .ok_or_else(|| enum_column_error(4, "invoice status", &status_raw))?;
    let method_raw: String = row.get(5)?;
    let method = PaymentMethod::parse(&method_raw)
        .ok_or_else(|| enum_column_error(5, "payment method", &method_raw))?;

    let issued_on_raw: String = row.get(6)?;
    let due_on_raw: String = row.get(7)?;
    let paid_on_raw: Option<String> = row.get(8)?;
    let created_at_raw: String = row.get(10)?;
    let updated_at_raw: String = row.get(11)?;
    let deleted_at_raw: Option<String> = row.get(12)?;

    Ok(Invoice {
        id: InvoiceId::new(row.get(0)?),
        patient_id: PatientId::new(row.get(1)?),
        description: row.get(2)?,
        amount_cents: row.get(3)?,
        status,
        method,
        issued_on: parse_date(&issued_on_raw).map_err(to_sql_error)?,
        due_on: parse_date(&due_on_raw).map_err(to_sql_error)?,
        paid_on: parse_opt_date(paid_on_raw).map_err(to_sql_error)?,
        notes: row.get(9)?,
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
        updated_at: parse_datetime(&updated_at_raw).map_err(to_sql_error)?,
        deleted_at: parse_opt_datetime(deleted_at_raw).map_err(to_sql_error)?,
    })
}

fn inventory_item_from_row(row: &Row<'_>) -> rusqlite::Result<InventoryItem> {
    let expires_on_raw: Option<String> = row.get(6)?;
    let created_at_raw: String = row.get(9)?;
    let updated_at_raw: String = row.get(10)?;
    let deleted_at_raw: Option<String> = row.get(11)?;

    Ok(InventoryItem {
        id: InventoryItemId::new(row.get(0)?),
        name: row.get(1)?,
        category_id: InventoryCategoryId::new(row.get(2)?),
        quantity: row.get(3)?,
        reorder_level: row.get(4)?,
        unit_cost_cents: row.get(5)?,
        expires_on: parse_opt_date(expires_on_raw).map_err(to_sql_error)?,
        supplier: row.get(7)?,
        notes: row.get(8)?,
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
        updated_at: parse_datetime(&updated_at_raw).map_err(to_sql_error)?,
        deleted_at: parse_opt_datetime(deleted_at_raw).map_err(to_sql_error)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    let direction_raw: String = row.get(2)?;
    let direction = MessageDirection::parse(&direction_raw)
        .ok_or_else(|| enum_column_error(2, "message direction", &direction_raw))?;
    let sent_at_raw: String = row.get(5)?;
    let read: i64 = row.get(6)?;

    Ok(Message {
        id: MessageId::new(row.get(0)?),
        patient_id: PatientId::new(row.get(1)?),
        direction,
        subject: row.get(3)?,
        body: row.get(4)?,
        sent_at: parse_datetime(&sent_at_raw).map_err(to_sql_error)?,
        read: read != 0,
    })
}

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    let kind_raw: String = row.get(1)?;
    let kind = NotificationKind::parse(&kind_raw)
        .ok_or_else(|| enum_column_error(1, "notification kind", &kind_raw))?;
    let created_at_raw: String = row.get(3)?;
    let read: i64 = row.get(4)?;

    Ok(Notification {
        id: NotificationId::new(row.get(0)?),
        kind,
        body: row.get(2)?,
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
        read: read != 0,
    })
}

fn parse_appointment_status(index: usize, raw: &str) -> rusqlite::Result<AppointmentStatus> {
    AppointmentStatus::parse(raw)
        .ok_or_else(|| enum_column_error(index, "appointment status", raw))
}

fn enum_column_error(index: usize, what: &str, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("unknown {what} {raw}"),
        )),
    )
}

fn default_setting_value(key: SettingKey) -> SettingValue {
    match key {
        SettingKey::UiShowDashboard => SettingValue::Bool(true),
        SettingKey::UiPageSize => SettingValue::Int(miclinica_app::DEFAULT_PAGE_SIZE as i64),
    }
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}

fn format_datetime(value: OffsetDateTime) -> Result<String> {
    value.format(&Rfc3339).context("format timestamp")
}

fn parse_datetime(raw: &str) -> Result<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(value);
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    bail!("unsupported datetime format {raw:?}")
}

fn parse_date(raw: &str) -> Result<Date> {
    if let Ok(value) = Date::parse(raw, &format_description!("[year]-[month]-[day]")) {
        return Ok(value);
    }

    // Date columns may carry full timestamps; normalize to the date part.
    let date_time = parse_datetime(raw)?;
    Ok(date_time.date())
}

fn parse_opt_datetime(raw: Option<String>) -> Result<Option<OffsetDateTime>> {
    raw.as_deref().map(parse_datetime).transpose()
}

fn parse_opt_date(raw: Option<String>) -> Result<Option<Date>> {
    raw.as_deref().map(parse_date).transpose()
}

fn to_sql_error(error: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            error.to_string(),
        )),
    )
}

fn format_date(value: Date) -> String {
    value
        .format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| "1970-01-01".to_owned())
}
