// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use miclinica_db::SeedProfile;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_VERSION: i64 = 1;
const MAX_SEED_ROWS: usize = 100_000;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub seed: Seed,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            ui: Ui::default(),
            seed: Seed::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub show_dashboard: Option<bool>,
    pub page_size: Option<usize>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            show_dashboard: Some(true),
            page_size: Some(miclinica_app::DEFAULT_PAGE_SIZE),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Seed {
    pub value: Option<u64>,
    pub patients: Option<usize>,
    pub professionals: Option<usize>,
    pub appointments: Option<usize>,
    pub invoices: Option<usize>,
    pub inventory_items: Option<usize>,
    pub messages: Option<usize>,
    pub notifications: Option<usize>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("MICLINICA_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set MICLINICA_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(miclinica_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and place values under [ui] and [seed]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.version != CONFIG_VERSION {
            bail!(
                "config {} has version {}; expected 1",
                path.display(),
                self.version
            );
        }

        if let Some(page_size) = self.ui.page_size
            && page_size == 0
        {
            bail!("ui.page_size in {} must be positive", path.display());
        }

        for (label, value) in [
            ("seed.patients", self.seed.patients),
            ("seed.professionals", self.seed.professionals),
            ("seed.appointments", self.seed.appointments),
            ("seed.invoices", self.seed.invoices),
            ("seed.inventory_items", self.seed.inventory_items),
            ("seed.messages", self.seed.messages),
            ("seed.notifications", self.seed.notifications),
        ] {
            if let Some(count) = value
                && count > MAX_SEED_ROWS
            {
                bail!(
                    "{label} in {} is too large ({count}); keep it at or below {MAX_SEED_ROWS}",
                    path.display()
                );
            }
        }

        Ok(())
    }

    pub fn show_dashboard(&self) -> bool {
        self.ui.show_dashboard.unwrap_or(true)
    }

    pub fn page_size(&self) -> usize {
        self.ui
            .page_size
            .unwrap_or(miclinica_app::DEFAULT_PAGE_SIZE)
            .max(1)
    }

    /// Collapses the optional [seed] entries onto the default profile;
    /// `seed_override` comes from `--seed`.
    pub fn seed_profile(&self, seed_override: Option<u64>) -> SeedProfile {
        let defaults = SeedProfile::default();
        SeedProfile {
            seed: seed_override
                .or(self.seed.value)
                .unwrap_or(defaults.seed),
            patients: self.seed.patients.unwrap_or(defaults.patients),
            professionals: self
                .seed
                .professionals
                .unwrap_or(defaults.professionals),
            appointments: self.seed.appointments.unwrap_or(defaults.appointments),
            invoices: self.seed.invoices.unwrap_or(defaults.invoices),
            inventory_items: self
                .seed
                .inventory_items
                .unwrap_or(defaults.inventory_items),
            messages: self.seed.messages.unwrap_or(defaults.messages),
            notifications: self
                .seed
                .notifications
                .unwrap_or(defaults.notifications),
        }
    }

    pub fn example_config(path: &Path) -> String {
        let defaults = SeedProfile::default();
        format!(
            "# miclinica config\n# Place this file at: {}\n\nversion = 1\n\n[ui]\nshow_dashboard = true\npage_size = {}\n\n[seed]\n# Deterministic session data; change value for a different roster.\nvalue = {}\npatients = {}\nprofessionals = {}\nappointments = {}\ninvoices = {}\ninventory_items = {}\nmessages = {}\nnotifications = {}\n",
            path.display(),
            miclinica_app::DEFAULT_PAGE_SIZE,
            defaults.seed,
            defaults.patients,
            defaults.professionals,
            defaults.appointments,
            defaults.invoices,
            defaults.inventory_items,
            defaults.messages,
            defaults.notifications,
        )
    }
}
