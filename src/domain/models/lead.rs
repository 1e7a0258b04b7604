//! Lead, Cliente and Agent domain models.
//!
//! These are owned by the surrounding CRM; the cascade engine only reads them
//! and moves their status fields.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of an inbound lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadStatus {
    New,
    Converted,
    Discarded,
}

impl Default for LeadStatus {
    fn default() -> Self {
        Self::New
    }
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Converted => "Converted",
            Self::Discarded => "Discarded",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "new" => Some(Self::New),
            "converted" => Some(Self::Converted),
            "discarded" => Some(Self::Discarded),
            _ => None,
        }
    }
}

/// An unvalidated inbound contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub cliente_id: Option<Uuid>,
    pub nome: String,
    pub telefone: Option<String>,
    pub email: Option<String>,
    /// Inbound channel, e.g. "site", "whatsapp", "portal".
    pub source: String,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn new(nome: impl Into<String>, source: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            cliente_id: None,
            nome: nome.into(),
            telefone: None,
            email: None,
            source: source.into(),
            status: LeadStatus::New,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_telefone(mut self, telefone: impl Into<String>) -> Self {
        self.telefone = Some(telefone.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Handling status of a cliente as seen by the rest of the CRM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClienteStatus {
    Novo,
    AguardandoAtendimento,
    Atendido,
    SemAtendimento,
    Cancelado,
}

impl Default for ClienteStatus {
    fn default() -> Self {
        Self::Novo
    }
}

impl ClienteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Novo => "Novo",
            Self::AguardandoAtendimento => "Aguardando Atendimento",
            Self::Atendido => "Atendido",
            Self::SemAtendimento => "Sem Atendimento",
            Self::Cancelado => "Cancelado",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace([' ', '_', '-'], "").as_str() {
            "novo" => Some(Self::Novo),
            "aguardandoatendimento" => Some(Self::AguardandoAtendimento),
            "atendido" => Some(Self::Atendido),
            "sematendimento" => Some(Self::SemAtendimento),
            "cancelado" => Some(Self::Cancelado),
            _ => None,
        }
    }
}

impl std::fmt::Display for ClienteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The durable CRM subject once a lead enters active handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cliente {
    pub id: Uuid,
    pub nome: String,
    pub telefone: Option<String>,
    pub email: Option<String>,
    pub status: ClienteStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cliente {
    pub fn new(nome: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            nome: nome.into(),
            telefone: None,
            email: None,
            status: ClienteStatus::Novo,
            created_at: now,
            updated_at: now,
        }
    }

    /// Seed a cliente from the contact fields of a lead.
    pub fn from_lead(lead: &Lead) -> Self {
        Self {
            telefone: lead.telefone.clone(),
            email: lead.email.clone(),
            ..Self::new(lead.nome.clone())
        }
    }
}

/// A broker or consultant in the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Opaque user identifier, shared with the auth system.
    pub id: String,
    pub nome: String,
    pub department: String,
    pub on_duty: bool,
    /// Start of the availability window, UTC hour 0-23.
    pub shift_start_hour: Option<u32>,
    /// End of the availability window (exclusive), UTC hour 0-23.
    pub shift_end_hour: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(id: impl Into<String>, nome: impl Into<String>, department: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nome: nome.into(),
            department: department.into(),
            on_duty: true,
            shift_start_hour: None,
            shift_end_hour: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_shift(mut self, start_hour: u32, end_hour: u32) -> Self {
        self.shift_start_hour = Some(start_hour);
        self.shift_end_hour = Some(end_hour);
        self
    }

    /// Whether the agent can take work at `at`.
    ///
    /// Windows wrap midnight when `start > end`; `start == end` means all day.
    pub fn is_available_at(&self, at: DateTime<Utc>) -> bool {
        if !self.on_duty {
            return false;
        }
        match (self.shift_start_hour, self.shift_end_hour) {
            (Some(start), Some(end)) => {
                let hour = at.hour();
                if start == end {
                    true
                } else if start < end {
                    hour >= start && hour < end
                } else {
                    hour >= start || hour < end
                }
            }
            _ => true,
        }
    }
}
