use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Patient reference as the payment flow sees it
///
/// Selected once per workflow instance and immutable for the life of the
/// flow; demographics CRUD lives elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
}

impl Patient {
    /// Minimal reference when only the id is known
    pub fn with_id(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            contact: None,
            address: None,
            gender: None,
        }
    }
}

/// A single payable charge record
///
/// Bills are fetched and never mutated client-side. Only `Pending` bills
/// are eligible for payment selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: Uuid,
    pub amount: Decimal,
    pub status: BillStatus,
    pub created_at: DateTime<Utc>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub bill_type: Option<String>,
}

impl Bill {
    pub fn is_payable(&self) -> bool {
        self.status == BillStatus::Pending
    }
}

/// Bill status as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BillStatus {
    Pending,
    Paid,
    Cancelled,
    Refunded,
}

/// Payment session status
///
/// `Creating` is client-local (the create request is in flight). `Waiting`
/// begins the moment the backend acknowledges session creation. The
/// terminal states are only ever learned from status polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    Creating,
    Waiting,
    Paid,
    Expired,
    Failed,
}

impl SessionStatus {
    /// No further transitions occur after a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Paid | SessionStatus::Expired | SessionStatus::Failed
        )
    }
}

/// Body of `POST /merged-payment-sessions`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub patient_id: Uuid,
    pub bill_ids: Vec<Uuid>,
    pub total_amount: Decimal,
}

/// Successful response of `POST /merged-payment-sessions`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub qr_code_payload: String,
    pub total_amount: Decimal,
    pub timeout_minutes: Option<u32>,
}

/// Response of `GET /merged-payment-sessions/{id}/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub status: SessionStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub transaction_id: Option<String>,
    pub amount: Option<Decimal>,
}
