use std::sync::Arc;

use billing_client::{
    ClientError, CreateSessionRequest, PaymentsApi, SessionStatus,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{WorkflowError, WorkflowResult};
use crate::poller::{PollerConfig, PollerHandle, StatusPoller, TerminalCallback};

/// A backend-issued payment session over a frozen bill set.
///
/// The bill set and total are fixed at creation; selection changes made
/// afterwards do not affect an existing session. Terminal states are
/// observed through polling, never inferred locally.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSession {
    pub session_id: String,
    pub bill_ids: Vec<Uuid>,
    pub total_amount: Decimal,
    pub qr_code_payload: String,
    pub status: SessionStatus,
    /// Backend's advisory expiry window, for display only; the client-side
    /// polling cap is independent of it
    pub timeout_minutes: Option<u32>,
    pub created_at: DateTime<Utc>,
}

/// Owns the current payment session and the only handle to its poller.
///
/// At most one session is active per controller; creating a new session
/// discards interest in any prior one, stopping its poller first.
pub struct SessionController {
    api: Arc<dyn PaymentsApi>,
    poller_config: PollerConfig,
    current: Option<PaymentSession>,
    poller: Option<PollerHandle>,
}

impl SessionController {
    pub fn new(api: Arc<dyn PaymentsApi>, poller_config: PollerConfig) -> Self {
        Self {
            api,
            poller_config,
            current: None,
            poller: None,
        }
    }

    /// Create a payment session for the selected bills.
    ///
    /// Fails with a validation error before any network call when the bill
    /// set is empty. Success and failure are atomic: a malformed backend
    /// response stores nothing and starts nothing.
    pub async fn create_session(
        &mut self,
        patient_id: Uuid,
        bill_ids: Vec<Uuid>,
        total_amount: Decimal,
    ) -> WorkflowResult<PaymentSession> {
        if bill_ids.is_empty() {
            return Err(WorkflowError::Validation("no bills selected".to_string()));
        }

        // The new intent supersedes whatever was active
        self.cancel_current();

        let request = CreateSessionRequest {
            patient_id,
            bill_ids: bill_ids.clone(),
            total_amount,
        };
        let created = match self.api.create_session(request).await {
            Ok(created) => created,
            Err(ClientError::Decode(message)) => {
                return Err(WorkflowError::SessionCreation(message));
            }
            Err(err) => return Err(err.into()),
        };

        if created.session_id.is_empty() || created.qr_code_payload.is_empty() {
            return Err(WorkflowError::SessionCreation(
                "backend returned a session without an id or QR payload".to_string(),
            ));
        }

        let session = PaymentSession {
            session_id: created.session_id,
            bill_ids,
            total_amount: created.total_amount,
            qr_code_payload: created.qr_code_payload,
            status: SessionStatus::Waiting,
            timeout_minutes: created.timeout_minutes,
            created_at: Utc::now(),
        };
        info!(
            session_id = %session.session_id,
            total = %session.total_amount,
            bill_count = session.bill_ids.len(),
            "payment session ready"
        );
        self.current = Some(session.clone());
        Ok(session)
    }

    /// Hand the current session to the poller.
    ///
    /// Starting implies stopping: any previous poller is stopped before
    /// the new one is spawned, so one poller runs at a time.
    pub fn start_polling(&mut self, on_terminal: TerminalCallback) -> WorkflowResult<()> {
        let session_id = match &self.current {
            Some(session) => session.session_id.clone(),
            None => {
                return Err(WorkflowError::Validation(
                    "no active payment session to poll".to_string(),
                ));
            }
        };

        self.stop_polling();
        self.poller = Some(StatusPoller::start(
            Arc::clone(&self.api),
            session_id,
            self.poller_config.clone(),
            on_terminal,
        ));
        Ok(())
    }

    /// Stop any running poller; safe when none is running
    pub fn stop_polling(&mut self) {
        if let Some(handle) = self.poller.take() {
            handle.stop();
        }
    }

    /// Discard the stored session and stop its poller. Idempotent.
    pub fn cancel_current(&mut self) {
        self.stop_polling();
        if let Some(session) = self.current.take() {
            debug!(session_id = %session.session_id, "discarded payment session");
        }
    }

    /// Record a status transition observed for the current session
    pub fn mark_status(&mut self, status: SessionStatus) {
        if let Some(session) = self.current.as_mut() {
            session.status = status;
        }
    }

    pub fn current_session(&self) -> Option<&PaymentSession> {
        self.current.as_ref()
    }

    pub fn has_active_poller(&self) -> bool {
        self.poller
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}
