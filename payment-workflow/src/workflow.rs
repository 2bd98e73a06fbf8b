use std::sync::Arc;

use billing_client::{Patient, PaymentsApi, SessionStatus, SessionStatusResponse};
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{WorkflowError, WorkflowResult};
use crate::poller::{PollerConfig, TerminalStatus};
use crate::selection::BillSelection;
use crate::session::{PaymentSession, SessionController};

/// The four stages of the merged payment flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Waiting for a patient to be chosen
    SelectPatient,
    /// Bills fetched, selection editable, payment can be generated
    ReviewBills,
    /// Session created, QR payload on display, poller running
    AwaitingPayment,
    /// Payment confirmed; receipt data available
    Completed,
}

/// Terminal polling outcome delivered to the adapter
#[derive(Debug)]
pub struct TerminalEvent {
    pub status: TerminalStatus,
    pub payload: Option<SessionStatusResponse>,
}

/// One merged-payment flow instance.
///
/// Constructed per mounted UI; holds all of its mutable state privately,
/// so mounting the module twice gives two fully independent flows. The
/// host renders from the accessors and drives transitions through the
/// methods; no business decisions live in the host.
pub struct PaymentWorkflow {
    api: Arc<dyn PaymentsApi>,
    stage: Stage,
    patient: Option<Patient>,
    selection: BillSelection,
    controller: SessionController,
    outcome_rx: Option<oneshot::Receiver<TerminalEvent>>,
    receipt: Option<SessionStatusResponse>,
}

impl PaymentWorkflow {
    pub fn new(api: Arc<dyn PaymentsApi>) -> Self {
        Self::with_poller_config(api, PollerConfig::default())
    }

    pub fn with_poller_config(api: Arc<dyn PaymentsApi>, poller_config: PollerConfig) -> Self {
        Self {
            api: Arc::clone(&api),
            stage: Stage::SelectPatient,
            patient: None,
            selection: BillSelection::new(),
            controller: SessionController::new(api, poller_config),
            outcome_rx: None,
            receipt: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn patient(&self) -> Option<&Patient> {
        self.patient.as_ref()
    }

    pub fn selection(&self) -> &BillSelection {
        &self.selection
    }

    pub fn current_session(&self) -> Option<&PaymentSession> {
        self.controller.current_session()
    }

    /// QR payload of the session being paid, if one is on display
    pub fn qr_code_payload(&self) -> Option<&str> {
        self.controller
            .current_session()
            .map(|session| session.qr_code_payload.as_str())
    }

    /// Final status payload of a completed payment
    pub fn receipt(&self) -> Option<&SessionStatusResponse> {
        self.receipt.as_ref()
    }

    /// Stage 1: choose the patient and load their outstanding bills.
    ///
    /// Choosing a patient supersedes everything in flight: any active
    /// poller stops and any session is discarded. The fetched list seeds
    /// the selection with every bill selected.
    pub async fn select_patient(&mut self, patient: Patient) -> WorkflowResult<usize> {
        self.abandon_payment();
        let patient_id = patient.id;
        self.patient = Some(patient);

        let bills = self.api.get_unpaid_bills(patient_id).await?;

        // Renders must reflect the most recently chosen patient; a fetch
        // that raced a newer choice is dropped, not applied.
        if self.patient.as_ref().map(|p| p.id) != Some(patient_id) {
            debug!(patient_id = %patient_id, "dropping bill list for superseded patient choice");
            return Ok(0);
        }

        let count = bills.len();
        self.selection.set_bills(bills);
        self.stage = Stage::ReviewBills;
        info!(patient_id = %patient_id, bills = count, "bills loaded for review");
        Ok(count)
    }

    /// Stage 2: adjust which bills go into the payment
    pub fn toggle_bill(&mut self, bill_id: Uuid) -> WorkflowResult<()> {
        self.require_stage(Stage::ReviewBills, "bill selection")?;
        self.selection.toggle(bill_id);
        Ok(())
    }

    pub fn select_all_bills(&mut self) -> WorkflowResult<()> {
        self.require_stage(Stage::ReviewBills, "bill selection")?;
        self.selection.select_all();
        Ok(())
    }

    pub fn deselect_all_bills(&mut self) -> WorkflowResult<()> {
        self.require_stage(Stage::ReviewBills, "bill selection")?;
        self.selection.deselect_all();
        Ok(())
    }

    /// Stage 2 → 3: create the payment session and start polling it.
    ///
    /// Requires at least one selected bill; that check never reaches the
    /// network. On failure the stage and selection stay as they were.
    pub async fn generate_payment(&mut self) -> WorkflowResult<PaymentSession> {
        self.require_stage(Stage::ReviewBills, "payment generation")?;
        let patient_id = match &self.patient {
            Some(patient) => patient.id,
            None => {
                return Err(WorkflowError::Validation(
                    "no patient selected".to_string(),
                ));
            }
        };

        let bill_ids = self.selection.selected_ids();
        if bill_ids.is_empty() {
            return Err(WorkflowError::Validation("no bills selected".to_string()));
        }
        let total = self.selection.selected_total();

        let session = self
            .controller
            .create_session(patient_id, bill_ids, total)
            .await?;

        let (tx, rx) = oneshot::channel();
        self.controller.start_polling(Box::new(move |status, payload| {
            let _ = tx.send(TerminalEvent { status, payload });
        }))?;
        self.outcome_rx = Some(rx);
        self.receipt = None;
        self.stage = Stage::AwaitingPayment;
        Ok(session)
    }

    /// Stage 3 → 4: wait for the terminal polling outcome and apply it.
    ///
    /// PAID completes the flow; EXPIRED, FAILED, and TIMEOUT return to
    /// bill review with the selection exactly as it was before the
    /// session was created.
    pub async fn await_outcome(&mut self) -> WorkflowResult<TerminalEvent> {
        self.require_stage(Stage::AwaitingPayment, "awaiting payment")?;
        let rx = self.outcome_rx.take().ok_or_else(|| {
            WorkflowError::Validation("no payment in progress".to_string())
        })?;

        let event = match rx.await {
            Ok(event) => event,
            Err(_) => {
                // Poller torn down without reporting: treat as abandoned
                self.controller.cancel_current();
                self.stage = Stage::ReviewBills;
                return Err(WorkflowError::Validation(
                    "payment polling stopped before a terminal status".to_string(),
                ));
            }
        };

        match event.status {
            TerminalStatus::Paid => {
                self.controller.mark_status(SessionStatus::Paid);
                self.receipt = event.payload.clone();
                self.stage = Stage::Completed;
            }
            TerminalStatus::Expired => {
                self.controller.mark_status(SessionStatus::Expired);
                self.return_to_review();
            }
            TerminalStatus::Failed => {
                self.controller.mark_status(SessionStatus::Failed);
                self.return_to_review();
            }
            TerminalStatus::Timeout => {
                self.return_to_review();
            }
        }
        Ok(event)
    }

    /// User-initiated cancel while waiting for payment. No-op elsewhere.
    pub fn cancel_payment(&mut self) {
        if self.stage != Stage::AwaitingPayment {
            return;
        }
        self.abandon_payment();
        self.stage = Stage::ReviewBills;
    }

    /// Back to stage 1 for the same or a new patient
    pub fn reset(&mut self) {
        self.abandon_payment();
        self.patient = None;
        self.selection = BillSelection::new();
        self.stage = Stage::SelectPatient;
    }

    fn return_to_review(&mut self) {
        self.controller.cancel_current();
        self.outcome_rx = None;
        self.stage = Stage::ReviewBills;
    }

    fn abandon_payment(&mut self) {
        self.controller.cancel_current();
        self.outcome_rx = None;
        self.receipt = None;
    }

    fn require_stage(&self, stage: Stage, action: &str) -> WorkflowResult<()> {
        if self.stage == stage {
            Ok(())
        } else {
            Err(WorkflowError::Validation(format!(
                "{action} is not available in stage {:?}",
                self.stage
            )))
        }
    }
}
