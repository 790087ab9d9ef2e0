// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::ids::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatientStatus {
    Active,
    Inactive,
    Pending,
}

impl PatientStatus {
    pub const ALL: [Self; 3] = [Self::Active, Self::Inactive, Self::Pending];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Pending => "pending",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "pending" => Some(Self::Pending),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinancialStatus {
    Ok,
    Pending,
    Overdue,
}

impl FinancialStatus {
    pub const ALL: [Self; 3] = [Self::Ok, Self::Pending, Self::Overdue];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Pending => "pending",
            Self::Overdue => "overdue",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ok" => Some(Self::Ok),
            "pending" => Some(Self::Pending),
            "overdue" => Some(Self::Overdue),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Canceled,
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [Self; 5] = [
        Self::Scheduled,
        Self::Confirmed,
        Self::Completed,
        Self::Canceled,
        Self::NoShow,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
            Self::NoShow => "no_show",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(Self::Scheduled),
            "confirmed" => Some(Self::Confirmed),
            "completed" => Some(Self::Completed),
            "canceled" => Some(Self::Canceled),
            "no_show" => Some(Self::NoShow),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Paid,
    Pending,
    Overdue,
}

impl InvoiceStatus {
    pub const ALL: [Self; 3] = [Self::Paid, Self::Pending, Self::Overdue];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Pending => "pending",
            Self::Overdue => "overdue",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "paid" => Some(Self::Paid),
            "pending" => Some(Self::Pending),
            "overdue" => Some(Self::Overdue),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Insurance,
}

impl PaymentMethod {
    pub const ALL: [Self; 4] = [Self::Cash, Self::Card, Self::Transfer, Self::Insurance];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::Transfer => "transfer",
            Self::Insurance => "insurance",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cash" => Some(Self::Cash),
            "card" => Some(Self::Card),
            "transfer" => Some(Self::Transfer),
            "insurance" => Some(Self::Insurance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

impl MessageDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "inbound" => Some(Self::Inbound),
            "outbound" => Some(Self::Outbound),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Appointment,
    Billing,
    Inventory,
    System,
}

impl NotificationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Appointment => "appointment",
            Self::Billing => "billing",
            Self::Inventory => "inventory",
            Self::System => "system",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "appointment" => Some(Self::Appointment),
            "billing" => Some(Self::Billing),
            "inventory" => Some(Self::Inventory),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionEntity {
    Patient,
    Professional,
    Appointment,
    Invoice,
    InventoryItem,
}

impl DeletionEntity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Professional => "professional",
            Self::Appointment => "appointment",
            Self::Invoice => "invoice",
            Self::InventoryItem => "inventory_item",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "patient" => Some(Self::Patient),
            "professional" => Some(Self::Professional),
            "appointment" => Some(Self::Appointment),
            "invoice" => Some(Self::Invoice),
            "inventory_item" => Some(Self::InventoryItem),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabKind {
    Dashboard,
    Patients,
    Appointments,
    Billing,
    Inventory,
    Professionals,
    Messages,
    Notifications,
    Settings,
}

impl TabKind {
    pub const ALL: [Self; 9] = [
        Self::Dashboard,
        Self::Patients,
        Self::Appointments,
        Self::Billing,
        Self::Inventory,
        Self::Professionals,
        Self::Messages,
        Self::Notifications,
        Self::Settings,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Patients => "patients",
            Self::Appointments => "appts",
            Self::Billing => "billing",
            Self::Inventory => "inventory",
            Self::Professionals => "staff",
            Self::Messages => "messages",
            Self::Notifications => "alerts",
            Self::Settings => "settings",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingKey {
    UiShowDashboard,
    UiPageSize,
}

impl SettingKey {
    pub const ALL: [Self; 2] = [Self::UiShowDashboard, Self::UiPageSize];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UiShowDashboard => "ui.show_dashboard",
            Self::UiPageSize => "ui.page_size",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ui.show_dashboard" => Some(Self::UiShowDashboard),
            "ui.page_size" => Some(Self::UiPageSize),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::UiShowDashboard => "dashboard startup",
            Self::UiPageSize => "patient page size",
        }
    }

    pub const fn expected_value_kind(self) -> SettingValueKind {
        match self {
            Self::UiShowDashboard => SettingValueKind::Bool,
            Self::UiPageSize => SettingValueKind::Int,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingValueKind {
    Bool,
    Int,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
}

impl SettingValue {
    pub fn parse_for_key(key: SettingKey, raw: &str) -> Option<Self> {
        match key.expected_value_kind() {
            SettingValueKind::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => Some(Self::Bool(true)),
                "0" | "false" | "off" | "no" => Some(Self::Bool(false)),
                _ => None,
            },
            SettingValueKind::Int => {
                let value = raw.trim().parse::<i64>().ok()?;
                if value <= 0 {
                    return None;
                }
                Some(Self::Int(value))
            }
        }
    }

    pub fn to_storage(&self, key: SettingKey) -> Option<String> {
        match (key.expected_value_kind(), self) {
            (SettingValueKind::Bool, Self::Bool(value)) => {
                Some(if *value { "true" } else { "false" }.to_owned())
            }
            (SettingValueKind::Int, Self::Int(value)) => Some(value.to_string()),
            _ => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Self::Bool(true) => "on".to_owned(),
            Self::Bool(false) => "off".to_owned(),
            Self::Int(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSetting {
    pub key: SettingKey,
    pub value: SettingValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormKind {
    Patient,
    Professional,
    Appointment,
    Invoice,
    InventoryItem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    Nav,
    Search,
    Form(FormKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatientSortKey {
    Name,
    Email,
    Age,
    Status,
    FinancialStatus,
    LastVisit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
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
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specialty {
    pub id: SpecialtyId,
    pub name: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Professional {
    pub id: ProfessionalId,
    pub name: String,
    pub specialty_id: SpecialtyId,
    pub registration: String,
    pub email: String,
    pub phone: String,
    pub notes: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_id: PatientId,
    pub professional_id: ProfessionalId,
    pub scheduled_at: OffsetDateTime,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub room: String,
    pub notes: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub patient_id: PatientId,
    pub description: String,
    pub amount_cents: i64,
    pub status: InvoiceStatus,
    pub method: PaymentMethod,
    pub issued_on: Date,
    pub due_on: Date,
    pub paid_on: Option<Date>,
    pub notes: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCategory {
    pub id: InventoryCategoryId,
    pub name: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: InventoryItemId,
    pub name: String,
    pub category_id: InventoryCategoryId,
    pub quantity: i32,
    pub reorder_level: i32,
    pub unit_cost_cents: Option<i64>,
    pub expires_on: Option<Date>,
    pub supplier: String,
    pub notes: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

impl InventoryItem {
    pub const fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub patient_id: PatientId,
    pub direction: MessageDirection,
    pub subject: String,
    pub body: String,
    pub sent_at: OffsetDateTime,
    pub read: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub body: String,
    pub created_at: OffsetDateTime,
    pub read: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRecord {
    pub id: DeletionRecordId,
    pub entity: DeletionEntity,
    pub target_id: i64,
    pub deleted_at: OffsetDateTime,
    pub restored_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DashboardCounts {
    pub appointments_today: usize,
    pub invoices_overdue: usize,
    pub inventory_low: usize,
    pub messages_unread: usize,
}

#[cfg(test)]
mod tests {
    use super::{SettingKey, SettingValue};

    #[test]
    fn bool_setting_parse_and_storage_round_trip() {
        let parsed = SettingValue::parse_for_key(SettingKey::UiShowDashboard, "true")
            .expect("parse true bool setting");
        assert_eq!(parsed, SettingValue::Bool(true));
        assert_eq!(
            parsed.to_storage(SettingKey::UiShowDashboard),
            Some("true".to_owned())
        );
    }

    #[test]
    fn int_setting_parse_and_storage_round_trip() {
        let parsed = SettingValue::parse_for_key(SettingKey::UiPageSize, "25")
            .expect("parse page size setting");
        assert_eq!(parsed, SettingValue::Int(25));
        assert_eq!(
            parsed.to_storage(SettingKey::UiPageSize),
            Some("25".to_owned())
        );
    }

    #[test]
    fn non_positive_page_size_rejected() {
        assert!(SettingValue::parse_for_key(SettingKey::UiPageSize, "0").is_none());
        assert!(SettingValue::parse_for_key(SettingKey::UiPageSize, "-3").is_none());
        assert!(SettingValue::parse_for_key(SettingKey::UiPageSize, "lots").is_none());
    }

    #[test]
    fn mismatched_setting_value_type_rejected() {
        let size = SettingValue::Int(10);
        assert!(size.to_storage(SettingKey::UiShowDashboard).is_none());
    }

    #[test]
    fn status_strings_round_trip() {
        for status in super::PatientStatus::ALL {
            assert_eq!(super::PatientStatus::parse(status.as_str()), Some(status));
        }
        for status in super::FinancialStatus::ALL {
            assert_eq!(super::FinancialStatus::parse(status.as_str()), Some(status));
        }
        for status in super::AppointmentStatus::ALL {
            assert_eq!(
                super::AppointmentStatus::parse(status.as_str()),
                Some(status)
            );
        }
        assert_eq!(super::PatientStatus::parse("archived"), None);
    }
}
