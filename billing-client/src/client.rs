use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::envelope::normalize_bill_list;
use crate::error::{ClientError, ClientResult};
use crate::models::{
    Bill, CreateSessionRequest, CreateSessionResponse, SessionStatusResponse,
};

/// Billing API configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server base URL
    pub base_url: String,
    /// Bearer credential supplied by the authentication collaborator
    pub auth_token: Option<String>,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/v1".to_string(),
            auth_token: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Transport seam between the payment workflow and the billing backend.
///
/// The workflow only ever talks to this trait; [`BillingClient`] is the
/// production implementation, tests substitute in-process fakes.
#[async_trait]
pub trait PaymentsApi: Send + Sync {
    /// Outstanding (PENDING) bills for a patient
    async fn get_unpaid_bills(&self, patient_id: Uuid) -> ClientResult<Vec<Bill>>;

    /// Create a merged payment session over a frozen set of bills
    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> ClientResult<CreateSessionResponse>;

    /// Current status of a payment session
    async fn session_status(&self, session_id: &str) -> ClientResult<SessionStatusResponse>;
}

/// HTTP client for the clinic billing endpoints
pub struct BillingClient {
    http: reqwest::Client,
    config: ApiConfig,
}

/// Error body shape the backend uses for failures; both field names occur
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

impl BillingClient {
    /// Create a new billing client
    pub fn new(config: ApiConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| ClientError::Network(err.to_string()))?;

        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Turn a non-2xx response into the typed error taxonomy, surfacing
    /// the backend's own message where one can be parsed out.
    async fn check(&self, response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.message.or(body.error))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });

        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            warn!(status = status.as_u16(), "credential rejected by billing backend");
            return Err(ClientError::Auth(message));
        }

        Err(ClientError::Backend {
            status: status.as_u16(),
            message,
        })
    }

    /// Fetch a patient's outstanding bills.
    ///
    /// Tolerates the backend's assorted list envelopes and filters to
    /// PENDING client-side, since some endpoints return mixed-status
    /// batches.
    pub async fn get_unpaid_bills(&self, patient_id: Uuid) -> ClientResult<Vec<Bill>> {
        let request = self
            .http
            .get(self.url("unpaid-bills"))
            .query(&[("patientId", patient_id.to_string())]);

        let response = self.check(self.authorize(request).send().await?).await?;
        let body: Value = response.json().await?;

        let bills = normalize_bill_list(body)?;
        let unpaid: Vec<Bill> = bills.into_iter().filter(Bill::is_payable).collect();
        debug!(
            patient_id = %patient_id,
            count = unpaid.len(),
            "fetched unpaid bills"
        );
        Ok(unpaid)
    }

    /// Create a merged payment session for the given bill set and total
    pub async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> ClientResult<CreateSessionResponse> {
        let http_request = self
            .http
            .post(self.url("merged-payment-sessions"))
            .json(&request);

        let response = self.check(self.authorize(http_request).send().await?).await?;
        let created: CreateSessionResponse = response.json().await?;
        debug!(
            session_id = %created.session_id,
            bill_count = request.bill_ids.len(),
            "created merged payment session"
        );
        Ok(created)
    }

    /// Query the status of an existing payment session
    pub async fn session_status(
        &self,
        session_id: &str,
    ) -> ClientResult<SessionStatusResponse> {
        let request = self
            .http
            .get(self.url(&format!("merged-payment-sessions/{session_id}/status")));

        let response = self.check(self.authorize(request).send().await?).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl PaymentsApi for BillingClient {
    async fn get_unpaid_bills(&self, patient_id: Uuid) -> ClientResult<Vec<Bill>> {
        BillingClient::get_unpaid_bills(self, patient_id).await
    }

    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> ClientResult<CreateSessionResponse> {
        BillingClient::create_session(self, request).await
    }

    async fn session_status(&self, session_id: &str) -> ClientResult<SessionStatusResponse> {
        BillingClient::session_status(self, session_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn client_for(server: &mockito::ServerGuard) -> BillingClient {
        BillingClient::new(ApiConfig {
            base_url: server.url(),
            auth_token: Some("test-token".to_string()),
            request_timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    fn bill_json(id: u128, amount: i64, status: &str) -> Value {
        json!({
            "id": Uuid::from_u128(id),
            "amount": amount,
            "status": status,
            "createdAt": "2024-03-01T09:30:00Z"
        })
    }

    #[tokio::test]
    async fn unpaid_bills_filters_mixed_statuses() {
        let mut server = mockito::Server::new_async().await;
        let patient_id = Uuid::from_u128(7);

        let mock = server
            .mock("GET", "/unpaid-bills")
            .match_query(Matcher::UrlEncoded(
                "patientId".into(),
                patient_id.to_string(),
            ))
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "bills": [
                        bill_json(1, 100, "PENDING"),
                        bill_json(2, 50, "PAID"),
                        bill_json(3, 25, "PENDING"),
                        bill_json(4, 10, "CANCELLED")
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let bills = client_for(&server)
            .get_unpaid_bills(patient_id)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(bills.len(), 2);
        assert!(bills.iter().all(Bill::is_payable));
    }

    #[tokio::test]
    async fn unpaid_bills_accepts_bare_array() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/unpaid-bills")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!([bill_json(1, 100, "PENDING")]).to_string())
            .create_async()
            .await;

        let bills = client_for(&server)
            .get_unpaid_bills(Uuid::from_u128(7))
            .await
            .unwrap();
        assert_eq!(bills.len(), 1);
    }

    #[tokio::test]
    async fn unpaid_bills_unknown_envelope_is_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/unpaid-bills")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({ "unexpected": true }).to_string())
            .create_async()
            .await;

        let bills = client_for(&server)
            .get_unpaid_bills(Uuid::from_u128(7))
            .await
            .unwrap();
        assert!(bills.is_empty());
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/unpaid-bills")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(json!({ "message": "token expired" }).to_string())
            .create_async()
            .await;

        let err = client_for(&server)
            .get_unpaid_bills(Uuid::from_u128(7))
            .await
            .unwrap_err();

        match err {
            ClientError::Auth(message) => assert_eq!(message, "token expired"),
            other => panic!("expected Auth error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn backend_failure_surfaces_message_verbatim() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/unpaid-bills")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body(json!({ "error": "ledger offline" }).to_string())
            .create_async()
            .await;

        let err = client_for(&server)
            .get_unpaid_bills(Uuid::from_u128(7))
            .await
            .unwrap_err();

        match err {
            ClientError::Backend { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "ledger offline");
            }
            other => panic!("expected Backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_session_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let patient_id = Uuid::from_u128(7);

        // Decimal serializes as a string on the wire
        let mock = server
            .mock("POST", "/merged-payment-sessions")
            .match_body(Matcher::PartialJson(json!({
                "patientId": patient_id,
                "billIds": [Uuid::from_u128(1), Uuid::from_u128(2)],
                "totalAmount": "150"
            })))
            .with_status(200)
            .with_body(
                json!({
                    "sessionId": "S1",
                    "qrCodePayload": "qr://pay/S1",
                    "totalAmount": "150",
                    "timeoutMinutes": 10
                })
                .to_string(),
            )
            .create_async()
            .await;

        let created = client_for(&server)
            .create_session(CreateSessionRequest {
                patient_id,
                bill_ids: vec![Uuid::from_u128(1), Uuid::from_u128(2)],
                total_amount: Decimal::from(150),
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(created.session_id, "S1");
        assert_eq!(created.qr_code_payload, "qr://pay/S1");
        assert_eq!(created.total_amount, Decimal::from(150));
        assert_eq!(created.timeout_minutes, Some(10));
    }

    #[tokio::test]
    async fn create_session_malformed_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/merged-payment-sessions")
            .with_status(200)
            .with_body(json!({ "sessionId": "S1" }).to_string())
            .create_async()
            .await;

        let err = client_for(&server)
            .create_session(CreateSessionRequest {
                patient_id: Uuid::from_u128(7),
                bill_ids: vec![Uuid::from_u128(1)],
                total_amount: Decimal::from(100),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Decode(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn session_status_round_trip() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/merged-payment-sessions/S1/status")
            .with_status(200)
            .with_body(
                json!({
                    "status": "WAITING"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let status = client_for(&server).session_status("S1").await.unwrap();
        assert_eq!(status.status, crate::models::SessionStatus::Waiting);
        assert!(status.paid_at.is_none());
    }
}
