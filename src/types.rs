use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type AccountId = Uuid;
pub type CategoryId = Uuid;
pub type TransactionId = Uuid;
pub type ThirdPartyId = Uuid;
pub type InvoiceId = Uuid;
pub type PaymentId = Uuid;
pub type DocumentId = Uuid;
pub type OperationId = Uuid;

/// kind of cash account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Bancaire,
    MobileMoney,
    Especes,
    Autre,
}

/// direction of a cash movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowType {
    /// money in, credits the account
    Revenu,
    /// money out, debits the account
    Depense,
}

impl FlowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowType::Revenu => "revenu",
            FlowType::Depense => "depense",
        }
    }
}

/// recurrence of a recurring operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Mensuel,
    Trimestriel,
    Annuel,
}

impl Frequency {
    /// calendar months between two occurrences
    pub fn months(&self) -> u32 {
        match self {
            Frequency::Mensuel => 1,
            Frequency::Trimestriel => 3,
            Frequency::Annuel => 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThirdPartyType {
    Client,
    Fournisseur,
}

impl fmt::Display for ThirdPartyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThirdPartyType::Client => write!(f, "client"),
            ThirdPartyType::Fournisseur => write!(f, "fournisseur"),
        }
    }
}

/// client invoices are issued, depense invoices are received from vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceType {
    Client,
    Depense,
}

impl InvoiceType {
    /// cash direction produced when this kind of invoice is settled
    pub fn flow(&self) -> FlowType {
        match self {
            InvoiceType::Client => FlowType::Revenu,
            InvoiceType::Depense => FlowType::Depense,
        }
    }

    /// role the counterparty must hold
    pub fn counterparty(&self) -> ThirdPartyType {
        match self {
            InvoiceType::Client => ThirdPartyType::Client,
            InvoiceType::Depense => ThirdPartyType::Fournisseur,
        }
    }
}

impl fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceType::Client => write!(f, "client"),
            InvoiceType::Depense => write!(f, "depense"),
        }
    }
}

/// persisted invoice state; overdue is derived, never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoreStatus {
    Brouillon,
    Envoye,
    PartiellementPaye,
    Paye,
    Annule,
}

impl CoreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoreStatus::Brouillon => "brouillon",
            CoreStatus::Envoye => "envoye",
            CoreStatus::PartiellementPaye => "partiellement_paye",
            CoreStatus::Paye => "paye",
            CoreStatus::Annule => "annule",
        }
    }

    /// states in which an invoice can still fall overdue
    pub fn can_be_overdue(&self) -> bool {
        matches!(self, CoreStatus::Envoye | CoreStatus::PartiellementPaye)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CoreStatus::Paye | CoreStatus::Annule)
    }
}

impl fmt::Display for CoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// status as shown to users, with the overdue overlay applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Brouillon,
    Envoye,
    PartiellementPaye,
    Paye,
    EnRetard,
    Annule,
}

impl InvoiceStatus {
    pub fn derive(core: CoreStatus, is_overdue: bool) -> Self {
        if is_overdue {
            return InvoiceStatus::EnRetard;
        }
        match core {
            CoreStatus::Brouillon => InvoiceStatus::Brouillon,
            CoreStatus::Envoye => InvoiceStatus::Envoye,
            CoreStatus::PartiellementPaye => InvoiceStatus::PartiellementPaye,
            CoreStatus::Paye => InvoiceStatus::Paye,
            CoreStatus::Annule => InvoiceStatus::Annule,
        }
    }
}
