use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{Result, SuiteError};
use crate::events::DEFAULT_EVENT_CAPACITY;
use crate::types::InvoiceType;

/// ten years
pub const MAX_GRACE_DAYS: u32 = 3650;

/// suite configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// currency used when an account is opened without one
    pub default_currency: String,
    pub numbering: NumberingConfig,
    pub overdue: OverdueConfig,
    pub notification: NotificationConfig,
    /// pending events buffered before the oldest are discarded
    pub event_capacity: usize,
}

/// invoice number layout: `{prefix}{sep}{year}{sep}{sequence}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberingConfig {
    pub client_prefix: String,
    pub depense_prefix: String,
    pub separator: String,
    /// zero padding applied to the sequence part
    pub sequence_width: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverdueConfig {
    /// days after the due date before an invoice shows as overdue, at most
    /// [`MAX_GRACE_DAYS`]
    pub grace_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// refuse to send an invoice whose third party has no email
    pub require_contact_email: bool,
    pub sender_address: String,
}

impl SuiteConfig {
    /// defaults for a malagasy small business (MGA, FAC/DEP numbering)
    pub fn madagascar() -> Self {
        Self {
            default_currency: "MGA".to_string(),
            numbering: NumberingConfig::default(),
            overdue: OverdueConfig::default(),
            notification: NotificationConfig::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: SuiteConfig =
            serde_json::from_str(raw).map_err(|e| SuiteError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| SuiteError::InvalidConfiguration {
            message: format!("{}: {}", path.display(), e),
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_currency.trim().is_empty() {
            return Err(SuiteError::InvalidConfiguration {
                message: "default_currency must not be empty".to_string(),
            });
        }
        if self.numbering.client_prefix == self.numbering.depense_prefix {
            return Err(SuiteError::InvalidConfiguration {
                message: "client and depense prefixes must differ".to_string(),
            });
        }
        if self.numbering.sequence_width == 0 || self.numbering.sequence_width > 12 {
            return Err(SuiteError::InvalidConfiguration {
                message: format!(
                    "sequence_width must be within 1..=12, got {}",
                    self.numbering.sequence_width
                ),
            });
        }
        if self.overdue.grace_days > MAX_GRACE_DAYS {
            return Err(SuiteError::InvalidConfiguration {
                message: format!(
                    "grace_days must be at most {}, got {}",
                    MAX_GRACE_DAYS, self.overdue.grace_days
                ),
            });
        }
        if self.event_capacity == 0 {
            return Err(SuiteError::InvalidConfiguration {
                message: "event_capacity must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self::madagascar()
    }
}

impl NumberingConfig {
    pub fn prefix(&self, invoice_type: InvoiceType) -> &str {
        match invoice_type {
            InvoiceType::Client => &self.client_prefix,
            InvoiceType::Depense => &self.depense_prefix,
        }
    }

    pub fn format(&self, invoice_type: InvoiceType, year: i32, sequence: u32) -> String {
        format!(
            "{prefix}{sep}{year}{sep}{seq:0width$}",
            prefix = self.prefix(invoice_type),
            sep = self.separator,
            year = year,
            seq = sequence,
            width = self.sequence_width,
        )
    }
}

impl Default for NumberingConfig {
    fn default() -> Self {
        Self {
            client_prefix: "FAC".to_string(),
            depense_prefix: "DEP".to_string(),
            separator: "-".to_string(),
            sequence_width: 4,
        }
    }
}

impl Default for OverdueConfig {
    fn default() -> Self {
        Self { grace_days: 0 }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            require_contact_email: true,
            sender_address: "factures@localhost".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_numbering() {
        let config = SuiteConfig::default();
        assert_eq!(config.default_currency, "MGA");
        assert_eq!(config.numbering.format(InvoiceType::Client, 2024, 7), "FAC-2024-0007");
        assert_eq!(config.numbering.format(InvoiceType::Depense, 2025, 12345), "DEP-2025-12345");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SuiteConfig::from_json_str(
            r#"{ "default_currency": "EUR", "numbering": { "client_prefix": "INV" } }"#,
        )
        .unwrap();

        assert_eq!(config.default_currency, "EUR");
        assert_eq!(config.numbering.client_prefix, "INV");
        assert_eq!(config.numbering.depense_prefix, "DEP");
        assert_eq!(config.overdue.grace_days, 0);
        assert!(config.notification.require_contact_email);
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(SuiteConfig::from_json_str("{ not json").is_err());
        assert!(SuiteConfig::from_json_str(r#"{ "default_currency": " " }"#).is_err());
        assert!(SuiteConfig::from_json_str(
            r#"{ "numbering": { "client_prefix": "X", "depense_prefix": "X" } }"#
        )
        .is_err());
        assert!(SuiteConfig::from_json_str(r#"{ "numbering": { "sequence_width": 0 } }"#).is_err());
    }

    #[test]
    fn test_grace_days_are_bounded() {
        let err = SuiteConfig::from_json_str(r#"{ "overdue": { "grace_days": 4294967295 } }"#).unwrap_err();
        assert!(err.to_string().contains("grace_days"));

        let config = SuiteConfig::from_json_str(r#"{ "overdue": { "grace_days": 3650 } }"#).unwrap();
        assert_eq!(config.overdue.grace_days, MAX_GRACE_DAYS);
        assert_eq!(config.event_capacity, DEFAULT_EVENT_CAPACITY);
        assert!(SuiteConfig::from_json_str(r#"{ "event_capacity": 0 }"#).is_err());
    }
}
