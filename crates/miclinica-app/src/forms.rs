// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use time::{Date, OffsetDateTime};

use crate::{
    AppointmentStatus, FinancialStatus, FormKind, InventoryCategoryId, InvoiceStatus,
    PatientId, PatientStatus, PaymentMethod, ProfessionalId, SpecialtyId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientFormInput {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub tax_id: String,
    pub status: PatientStatus,
    pub financial_status: FinancialStatus,
    pub birth_date: Option<Date>,
    pub last_visit: Option<Date>,
    pub address_line: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfessionalFormInput {
    pub name: String,
    pub specialty_id: SpecialtyId,
    pub registration: String,
    pub email: String,
    pub phone: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentFormInput {
    pub patient_id: PatientId,
    pub professional_id: ProfessionalId,
    pub scheduled_at: Option<OffsetDateTime>,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub room: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceFormInput {
    pub patient_id: PatientId,
    pub description: String,
    pub amount_cents: i64,
    pub status: InvoiceStatus,
    pub method: PaymentMethod,
    pub issued_on: Option<Date>,
    pub due_on: Option<Date>,
    pub paid_on: Option<Date>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItemFormInput {
    pub name: String,
    pub category_id: InventoryCategoryId,
    pub quantity: i32,
    pub reorder_level: i32,
    pub unit_cost_cents: Option<i64>,
    pub expires_on: Option<Date>,
    pub supplier: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPayload {
    Patient(PatientFormInput),
    Professional(ProfessionalFormInput),
    Appointment(AppointmentFormInput),
    Invoice(InvoiceFormInput),
    InventoryItem(InventoryItemFormInput),
}

impl FormPayload {
    pub fn kind(&self) -> FormKind {
        match self {
            Self::Patient(_) => FormKind::Patient,
            Self::Professional(_) => FormKind::Professional,
            Self::Appointment(_) => FormKind::Appointment,
            Self::Invoice(_) => FormKind::Invoice,
            Self::InventoryItem(_) => FormKind::InventoryItem,
        }
    }

    pub fn blank_for(kind: FormKind) -> Self {
        match kind {
            FormKind::Patient => Self::Patient(PatientFormInput {
                name: String::new(),
                email: String::new(),
                phone: String::new(),
                tax_id: String::new(),
                status: PatientStatus::Pending,
                financial_status: FinancialStatus::Ok,
                birth_date: None,
                last_visit: None,
                address_line: String::new(),
                city: String::new(),
                state: String::new(),
                postal_code: String::new(),
                notes: String::new(),
            }),
            FormKind::Professional => Self::Professional(ProfessionalFormInput {
                name: String::new(),
                specialty_id: SpecialtyId::new(0),
                registration: String::new(),
                email: String::new(),
                phone: String::new(),
                notes: String::new(),
            }),
            FormKind::Appointment => Self::Appointment(AppointmentFormInput {
                patient_id: PatientId::new(0),
                professional_id: ProfessionalId::new(0),
                scheduled_at: None,
                duration_minutes: 30,
                status: AppointmentStatus::Scheduled,
                room: String::new(),
                notes: String::new(),
            }),
            FormKind::Invoice => Self::Invoice(InvoiceFormInput {
                patient_id: PatientId::new(0),
                description: String::new(),
                amount_cents: 0,
                status: InvoiceStatus::Pending,
                method: PaymentMethod::Card,
                issued_on: None,
                due_on: None,
                paid_on: None,
                notes: String::new(),
            }),
            FormKind::InventoryItem => Self::InventoryItem(InventoryItemFormInput {
                name: String::new(),
                category_id: InventoryCategoryId::new(0),
                quantity: 0,
                reorder_level: 0,
                unit_cost_cents: None,
                expires_on: None,
                supplier: String::new(),
                notes: String::new(),
            }),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Patient(patient) => patient.validate(),
            Self::Professional(professional) => professional.validate(),
            Self::Appointment(appointment) => appointment.validate(),
            Self::Invoice(invoice) => invoice.validate(),
            Self::InventoryItem(item) => item.validate(),
        }
    }
}

impl PatientFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("patient name is required -- enter a name and retry");
        }
        let Some(birth_date) = self.birth_date else {
            bail!("patient birth date is required -- enter a YYYY-MM-DD date and retry");
        };
        if let Some(last_visit) = self.last_visit
            && last_visit < birth_date
        {
            bail!("patient last visit cannot predate the birth date");
        }
        Ok(())
    }
}

impl ProfessionalFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("professional name is required -- enter a name and retry");
        }
        if self.specialty_id.get() <= 0 {
            bail!("professional specialty is required -- choose a specialty and retry");
        }
        if self.registration.trim().is_empty() {
            bail!("professional registration number is required");
        }
        Ok(())
    }
}

impl AppointmentFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.patient_id.get() <= 0 {
            bail!("appointment patient is required -- choose a patient and retry");
        }
        if self.professional_id.get() <= 0 {
            bail!("appointment professional is required -- choose a professional and retry");
        }
        if self.scheduled_at.is_none() {
            bail!("appointment time is required -- enter a time and retry");
        }
        if self.duration_minutes <= 0 {
            bail!("appointment duration must be at least 1 minute");
        }
        Ok(())
    }
}

impl InvoiceFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.patient_id.get() <= 0 {
            bail!("invoice patient is required -- choose a patient and retry");
        }
        if self.amount_cents <= 0 {
            bail!("invoice amount must be positive");
        }
        let Some(issued_on) = self.issued_on else {
            bail!("invoice issue date is required -- enter a YYYY-MM-DD date and retry");
        };
        if let Some(due_on) = self.due_on
            && due_on < issued_on
        {
            bail!("invoice due date must be on/after the issue date");
        }
        if let Some(paid_on) = self.paid_on
            && paid_on < issued_on
        {
            bail!("invoice paid date must be on/after the issue date");
        }
        if self.status == InvoiceStatus::Paid && self.paid_on.is_none() {
            bail!("paid invoices need a paid date -- enter the payment date and retry");
        }
        Ok(())
    }
}

impl InventoryItemFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("inventory item name is required -- enter a name and retry");
        }
        if self.category_id.get() <= 0 {
            bail!("inventory category is required -- choose a category and retry");
        }
        if self.quantity < 0 {
            bail!("inventory quantity cannot be negative");
        }
        if self.reorder_level < 0 {
            bail!("inventory reorder level cannot be negative");
        }
        if let Some(cost) = self.unit_cost_cents
            && cost < 0
        {
            bail!("inventory unit cost cannot be negative");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AppointmentFormInput, FormPayload, InventoryItemFormInput, InvoiceFormInput,
        PatientFormInput,
    };
    use crate::{
        AppointmentStatus, FinancialStatus, FormKind, InventoryCategoryId, InvoiceStatus,
        PatientId, PatientStatus, PaymentMethod, ProfessionalId,
    };
    use time::{Date, Month, OffsetDateTime};

    fn valid_patient() -> PatientFormInput {
        PatientFormInput {
            name: "Ana Souza".to_owned(),
            email: "ana@clinic-demo.org".to_owned(),
            phone: "(555) 010-2233".to_owned(),
            tax_id: "120-55-3344".to_owned(),
            status: PatientStatus::Active,
            financial_status: FinancialStatus::Ok,
            birth_date: Some(
                Date::from_calendar_date(1984, Month::May, 2).expect("valid birth date"),
            ),
            last_visit: None,
            address_line: String::new(),
            city: String::new(),
            state: String::new(),
            postal_code: String::new(),
            notes: String::new(),
        }
    }

    #[test]
    fn blank_payload_matches_form_kind() {
        for kind in [
            FormKind::Patient,
            FormKind::Professional,
            FormKind::Appointment,
            FormKind::Invoice,
            FormKind::InventoryItem,
        ] {
            assert_eq!(FormPayload::blank_for(kind).kind(), kind);
        }
    }

    #[test]
    fn patient_validation_rejects_empty_name_and_missing_birth_date() {
        let mut patient = valid_patient();
        patient.name = "  ".to_owned();
        assert!(FormPayload::Patient(patient).validate().is_err());

        let mut patient = valid_patient();
        patient.birth_date = None;
        assert!(FormPayload::Patient(patient).validate().is_err());
    }

    #[test]
    fn patient_validation_rejects_visit_before_birth() {
        let mut patient = valid_patient();
        patient.last_visit =
            Some(Date::from_calendar_date(1980, Month::May, 2).expect("valid visit date"));
        assert!(FormPayload::Patient(patient).validate().is_err());
    }

    #[test]
    fn patient_validation_accepts_valid_input() {
        assert!(FormPayload::Patient(valid_patient()).validate().is_ok());
    }

    #[test]
    fn appointment_validation_rejects_non_positive_duration() {
        let payload = FormPayload::Appointment(AppointmentFormInput {
            patient_id: PatientId::new(1),
            professional_id: ProfessionalId::new(1),
            scheduled_at: Some(
                OffsetDateTime::from_unix_timestamp(1_750_000_000).expect("valid timestamp"),
            ),
            duration_minutes: 0,
            status: AppointmentStatus::Scheduled,
            room: String::new(),
            notes: String::new(),
        });
        assert!(payload.validate().is_err());
    }

    #[test]
    fn invoice_validation_rejects_bad_date_range_and_unpaid_paid_status() {
        let issued = Date::from_calendar_date(2026, Month::March, 10).expect("valid issue date");
        let base = InvoiceFormInput {
            patient_id: PatientId::new(1),
            description: "Consultation".to_owned(),
            amount_cents: 15_000,
            status: InvoiceStatus::Pending,
            method: PaymentMethod::Card,
            issued_on: Some(issued),
            due_on: Some(issued),
            paid_on: None,
            notes: String::new(),
        };

        let mut early_due = base.clone();
        early_due.due_on =
            Some(Date::from_calendar_date(2026, Month::March, 9).expect("valid due date"));
        assert!(FormPayload::Invoice(early_due).validate().is_err());

        let mut paid_without_date = base.clone();
        paid_without_date.status = InvoiceStatus::Paid;
        assert!(FormPayload::Invoice(paid_without_date).validate().is_err());

        assert!(FormPayload::Invoice(base).validate().is_ok());
    }

    #[test]
    fn inventory_validation_rejects_negative_counts() {
        let payload = FormPayload::InventoryItem(InventoryItemFormInput {
            name: "Nitrile gloves".to_owned(),
            category_id: InventoryCategoryId::new(1),
            quantity: -1,
            reorder_level: 0,
            unit_cost_cents: None,
            expires_on: None,
            supplier: String::new(),
            notes: String::new(),
        });
        assert!(payload.validate().is_err());
    }
}
