use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::books::Books;
use crate::errors::{Result, SuiteError};
use crate::types::{InvoiceType, ThirdPartyId, ThirdPartyType};

/// client or supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThirdParty {
    pub id: ThirdPartyId,
    pub name: String,
    #[serde(rename = "type")]
    pub party_type: ThirdPartyType,
    /// free-form address, tax ids, phone
    pub details: Option<String>,
    pub email: Option<String>,
}

impl ThirdParty {
    /// a client invoice needs a client, a depense invoice a fournisseur
    pub fn check_role(&self, invoice_type: InvoiceType) -> Result<()> {
        if self.party_type != invoice_type.counterparty() {
            return Err(SuiteError::ThirdPartyRoleMismatch {
                id: self.id,
                actual: self.party_type.to_string(),
                invoice_type: invoice_type.to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewThirdParty {
    pub name: String,
    #[serde(rename = "type")]
    pub party_type: ThirdPartyType,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

fn normalize_email(raw: Option<String>) -> Result<Option<String>> {
    let Some(email) = raw.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()) else {
        return Ok(None);
    };
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(Some(email)),
        _ => Err(SuiteError::InvalidEmail { value: email }),
    }
}

pub fn register_third_party(books: &mut Books, new: NewThirdParty) -> Result<ThirdParty> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(SuiteError::MissingField { field: "name" });
    }
    let party = ThirdParty {
        id: Uuid::new_v4(),
        name: name.to_string(),
        party_type: new.party_type,
        details: new.details.filter(|d| !d.trim().is_empty()),
        email: normalize_email(new.email)?,
    };
    books.third_parties.insert(party.id, party.clone());
    Ok(party)
}

/// rejected while any invoice points at the third party
pub fn delete_third_party(books: &mut Books, id: ThirdPartyId) -> Result<()> {
    books.third_party(id)?;
    if books.invoices.values().any(|inv| inv.third_party_id == id) {
        return Err(SuiteError::StillReferenced {
            entity: "third party",
            id,
            referenced_by: "invoice",
        });
    }
    books.third_parties.remove(&id);
    Ok(())
}
