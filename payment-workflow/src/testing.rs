//! In-process billing API fakes for exercising the workflow in tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use billing_client::{
    Bill, BillStatus, ClientError, ClientResult, CreateSessionRequest, CreateSessionResponse,
    PaymentsApi, SessionStatus, SessionStatusResponse,
};
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

pub(crate) fn pending_bill(id: u128, amount: i64) -> Bill {
    Bill {
        id: Uuid::from_u128(id),
        amount: Decimal::from(amount),
        status: BillStatus::Pending,
        created_at: Utc::now(),
        description: None,
        bill_type: None,
    }
}

pub(crate) fn status_response(status: SessionStatus) -> SessionStatusResponse {
    SessionStatusResponse {
        status,
        paid_at: None,
        transaction_id: None,
        amount: None,
    }
}

pub(crate) fn paid_response(amount: i64, transaction_id: &str) -> SessionStatusResponse {
    SessionStatusResponse {
        status: SessionStatus::Paid,
        paid_at: Some(Utc::now()),
        transaction_id: Some(transaction_id.to_string()),
        amount: Some(Decimal::from(amount)),
    }
}

/// Scripted [`PaymentsApi`] with call counters.
///
/// Status responses pop off a queue; an empty queue keeps answering
/// WAITING, which models a session that never resolves.
#[derive(Default)]
pub(crate) struct FakeApi {
    pub bills: Mutex<Vec<Bill>>,
    pub create_results: Mutex<VecDeque<ClientResult<CreateSessionResponse>>>,
    pub statuses: Mutex<VecDeque<ClientResult<SessionStatusResponse>>>,
    pub bills_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub last_create: Mutex<Option<CreateSessionRequest>>,
    pub polled_sessions: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bills(bills: Vec<Bill>) -> Self {
        let api = Self::default();
        *api.bills.lock().unwrap() = bills;
        api
    }

    pub fn push_status(&self, status: SessionStatus) {
        self.statuses
            .lock()
            .unwrap()
            .push_back(Ok(status_response(status)));
    }

    pub fn push_status_response(&self, response: SessionStatusResponse) {
        self.statuses.lock().unwrap().push_back(Ok(response));
    }

    pub fn push_status_error(&self, error: ClientError) {
        self.statuses.lock().unwrap().push_back(Err(error));
    }

    pub fn push_create_result(&self, result: ClientResult<CreateSessionResponse>) {
        self.create_results.lock().unwrap().push_back(result);
    }

    pub fn status_call_count(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn polls_for(&self, session_id: &str) -> usize {
        self.polled_sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|polled| polled.as_str() == session_id)
            .count()
    }
}

#[async_trait]
impl PaymentsApi for FakeApi {
    async fn get_unpaid_bills(&self, _patient_id: Uuid) -> ClientResult<Vec<Bill>> {
        self.bills_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.bills.lock().unwrap().clone())
    }

    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> ClientResult<CreateSessionResponse> {
        let call = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_create.lock().unwrap() = Some(request.clone());

        if let Some(result) = self.create_results.lock().unwrap().pop_front() {
            return result;
        }
        Ok(CreateSessionResponse {
            session_id: format!("S{call}"),
            qr_code_payload: format!("qr://pay/S{call}"),
            total_amount: request.total_amount,
            timeout_minutes: Some(10),
        })
    }

    async fn session_status(&self, session_id: &str) -> ClientResult<SessionStatusResponse> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.polled_sessions
            .lock()
            .unwrap()
            .push(session_id.to_string());

        match self.statuses.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(status_response(SessionStatus::Waiting)),
        }
    }
}
