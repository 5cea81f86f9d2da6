use crate::domain::{AuctionId, UserId};
use crate::error::{Result, ValidationReason};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Dni,
    Ruc,
    CarnetExtranjeria,
    Pasaporte,
}

/// Fiscal document data the winner supplies to complete billing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub tipo: DocumentType,
    pub numero: String,
    pub nombre: String,
}

impl DocumentInfo {
    pub fn validate(&self) -> Result<()> {
        if self.numero.trim().is_empty() || self.nombre.trim().is_empty() {
            return Err(ValidationReason::EmptyDocumentField.into());
        }
        Ok(())
    }

    /// Identity used for the duplicate-document check; the holder name is
    /// display data, not identity.
    pub fn key(&self) -> (DocumentType, &str) {
        (self.tipo, self.numero.as_str())
    }
}

/// Billing record for a won auction. Created empty when the auction reaches
/// `ganada`; completing it is the only path that turns held balance into
/// applied balance, and it can happen exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Billing {
    pub auction: AuctionId,
    pub user: UserId,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documento: Option<DocumentInfo>,
}

impl Billing {
    pub fn pending(auction: AuctionId, user: UserId) -> Self {
        Self {
            auction,
            user,
            completed: false,
            documento: None,
        }
    }
}
