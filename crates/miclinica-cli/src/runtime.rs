// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use miclinica_app::{
    AppointmentId, FormPayload, InventoryItemId, InvoiceId, PatientId, ProfessionalId, TabKind,
};
use miclinica_db::{
    NewAppointment, NewInventoryItem, NewInvoice, NewPatient, NewProfessional, Store,
};
use miclinica_tui::{
    AppRuntime, DashboardAppointment, DashboardInvoice, DashboardPayment, DashboardSnapshot,
    DashboardStockItem, LifecycleAction, TabSnapshot,
};
use time::OffsetDateTime;

const DASHBOARD_SECTION_ROWS: usize = 8;

pub struct StoreRuntime<'a> {
    store: &'a Store,
}

impl<'a> StoreRuntime<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }
}

impl AppRuntime for StoreRuntime<'_> {
    fn load_dashboard_counts(&mut self) -> Result<miclinica_app::DashboardCounts> {
        self.store.dashboard_counts(OffsetDateTime::now_utc().date())
    }

    fn load_dashboard_snapshot(&mut self) -> Result<DashboardSnapshot> {
        let today = OffsetDateTime::now_utc().date();

        let appointments = self
            .store
            .list_appointments_on(today)?
            .into_iter()
            .take(DASHBOARD_SECTION_ROWS)
            .map(|row| DashboardAppointment {
                appointment_id: row.appointment_id,
                patient_name: row.patient_name,
                professional_name: row.professional_name,
                scheduled_at: row.scheduled_at,
                status: row.status,
                room: row.room,
            })
            .collect();

        let overdue = self
            .store
            .list_overdue_invoice_rows()?
            .into_iter()
            .take(DASHBOARD_SECTION_ROWS)
            .map(|row| DashboardInvoice {
                invoice_id: row.invoice_id,
                patient_name: row.patient_name,
                amount_cents: row.amount_cents,
                due_on: row.due_on,
            })
            .collect();

        let low_stock = self
            .store
            .list_low_stock_items()?
            .into_iter()
            .take(DASHBOARD_SECTION_ROWS)
            .map(|item| DashboardStockItem {
                item_id: item.id,
                name: item.name,
                quantity: item.quantity,
                reorder_level: item.reorder_level,
            })
            .collect();

        let recent_payments = self
            .store
            .list_recent_payments(DASHBOARD_SECTION_ROWS)?
            .into_iter()
            .map(|row| DashboardPayment {
                invoice_id: row.invoice_id,
                patient_name: row.patient_name,
                amount_cents: row.amount_cents,
                paid_on: row.paid_on,
            })
            .collect();

        Ok(DashboardSnapshot {
            appointments,
            overdue,
            low_stock,
            recent_payments,
        })
    }

    fn load_tab_snapshot(
        &mut self,
        tab: TabKind,
        include_deleted: bool,
    ) -> Result<Option<TabSnapshot>> {
        let snapshot = match tab {
            TabKind::Dashboard => None,
            TabKind::Patients => Some(TabSnapshot::Patients(
                self.store.list_patients(include_deleted)?,
            )),
            TabKind::Appointments => Some(TabSnapshot::Appointments(
                self.store.list_appointments(include_deleted)?,
            )),
            TabKind::Billing => Some(TabSnapshot::Billing(
                self.store.list_invoices(include_deleted)?,
            )),
            TabKind::Inventory => Some(TabSnapshot::Inventory(
                self.store.list_inventory_items(include_deleted)?,
            )),
            TabKind::Professionals => Some(TabSnapshot::Professionals(
                self.store.list_professionals(include_deleted)?,
            )),
            TabKind::Messages => Some(TabSnapshot::Messages(self.store.list_messages()?)),
            TabKind::Notifications => {
                Some(TabSnapshot::Notifications(self.store.list_notifications()?))
            }
            TabKind::Settings => Some(TabSnapshot::Settings(self.store.list_settings()?)),
        };
        Ok(snapshot)
    }

    fn submit_form(&mut self, payload: &FormPayload) -> Result<()> {
        payload.validate()?;

        match payload {
            FormPayload::Patient(form) => {
                let Some(birth_date) = form.birth_date else {
                    bail!("patient birth date is required");
                };
                self.store.create_patient(&NewPatient {
                    name: form.name.clone(),
                    email: form.email.clone(),
                    phone: form.phone.clone(),
                    tax_id: form.tax_id.clone(),
                    status: form.status,
                    financial_status: form.financial_status,
                    birth_date,
                    last_visit: form.last_visit,
                    address_line: form.address_line.clone(),
                    city: form.city.clone(),
                    state: form.state.clone(),
                    postal_code: form.postal_code.clone(),
                    notes: form.notes.clone(),
                })?;
            }
            FormPayload::Professional(form) => {
                self.store.create_professional(&NewProfessional {
                    name: form.name.clone(),
                    specialty_id: form.specialty_id,
                    registration: form.registration.clone(),
                    email: form.email.clone(),
                    phone: form.phone.clone(),
                    notes: form.notes.clone(),
                })?;
            }
            FormPayload::Appointment(form) => {
                let Some(scheduled_at) = form.scheduled_at else {
                    bail!("appointment time is required");
                };
                self.store.create_appointment(&NewAppointment {
                    patient_id: form.patient_id,
                    professional_id: form.professional_id,
                    scheduled_at,
                    duration_minutes: form.duration_minutes,
                    status: form.status,
                    room: form.room.clone(),
                    notes: form.notes.clone(),
                })?;
            }
            FormPayload::Invoice(form) => {
                let Some(issued_on) = form.issued_on else {
                    bail!("invoice issue date is required");
                };
                self.store.create_invoice(&NewInvoice {
                    patient_id: form.patient_id,
                    description: form.description.clone(),
                    amount_cents: form.amount_cents,
                    status: form.status,
                    method: form.method,
                    issued_on,
                    due_on: form.due_on.unwrap_or(issued_on),
                    paid_on: form.paid_on,
                    notes: form.notes.clone(),
                })?;
            }
            FormPayload::InventoryItem(form) => {
                self.store.create_inventory_item(&NewInventoryItem {
                    name: form.name.clone(),
                    category_id: form.category_id,
                    quantity: form.quantity,
                    reorder_level: form.reorder_level,
                    unit_cost_cents: form.unit_cost_cents,
                    expires_on: form.expires_on,
                    supplier: form.supplier.clone(),
                    notes: form.notes.clone(),
                })?;
            }
        }

        Ok(())
    }

    fn apply_lifecycle(
        &mut self,
        tab: TabKind,
        row_id: i64,
        action: LifecycleAction,
    ) -> Result<()> {
        match (tab, action) {
            (TabKind::Patients, LifecycleAction::Delete) => {
                self.store.soft_delete_patient(PatientId::new(row_id))
            }
            (TabKind::Patients, LifecycleAction::Restore) => {
                self.store.restore_patient(PatientId::new(row_id))
            }
            (TabKind::Appointments, LifecycleAction::Delete) => self
                .store
                .soft_delete_appointment(AppointmentId::new(row_id)),
            (TabKind::Appointments, LifecycleAction::Restore) => {
                self.store.restore_appointment(AppointmentId::new(row_id))
            }
            (TabKind::Billing, LifecycleAction::Delete) => {
                self.store.soft_delete_invoice(InvoiceId::new(row_id))
            }
            (TabKind::Billing, LifecycleAction::Restore) => {
                self.store.restore_invoice(InvoiceId::new(row_id))
            }
            (TabKind::Inventory, LifecycleAction::Delete) => self
                .store
                .soft_delete_inventory_item(InventoryItemId::new(row_id)),
            (TabKind::Inventory, LifecycleAction::Restore) => self
                .store
                .restore_inventory_item(InventoryItemId::new(row_id)),
            (TabKind::Professionals, LifecycleAction::Delete) => self
                .store
                .soft_delete_professional(ProfessionalId::new(row_id)),
            (TabKind::Professionals, LifecycleAction::Restore) => {
                self.store.restore_professional(ProfessionalId::new(row_id))
            }
            _ => bail!("tab {:?} has no delete/restore", tab),
        }
    }

    fn mark_read(&mut self, tab: TabKind, row_id: i64) -> Result<()> {
        match tab {
            TabKind::Messages => self
                .store
                .mark_message_read(miclinica_app::MessageId::new(row_id), true),
            TabKind::Notifications => self
                .store
                .mark_notification_read(miclinica_app::NotificationId::new(row_id), true),
            _ => bail!("tab {:?} has no read flag", tab),
        }
    }

    fn set_show_dashboard_preference(&mut self, show: bool) -> Result<()> {
        self.store.put_show_dashboard(show)
    }

    fn set_page_size_preference(&mut self, page_size: usize) -> Result<()> {
        self.store.put_page_size(page_size)
    }

    fn load_page_size(&mut self) -> Result<usize> {
        self.store.get_page_size()
    }
}
