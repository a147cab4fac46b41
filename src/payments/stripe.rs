//! Minimal Stripe REST client covering the PaymentIntent lifecycle.
//!
//! Requests are form-encoded and authenticated with the secret key as a bearer
//! token. Card errors (declines, insufficient funds, ...) surface as
//! [`AppError::Payment`] so the payer sees Stripe's message; every other
//! failure becomes [`AppError::Stripe`].

use std::collections::HashMap;
use std::time::Duration;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntent {
    pub fn succeeded(&self) -> bool {
        self.status == "succeeded"
    }

    /// Terminal failure as seen by a client polling after confirmation
    pub fn failed(&self) -> bool {
        self.status == "canceled"
    }
}

#[derive(Debug, Clone)]
pub struct CreatePaymentIntent<'a> {
    /// Amount in the smallest currency unit
    pub amount: i64,
    pub currency: &'a str,
    /// Confirm immediately with this payment method instead of handing the
    /// client secret back for client-side confirmation
    pub payment_method: Option<&'a str>,
    pub metadata: Vec<(&'a str, String)>,
}

impl CreatePaymentIntent<'_> {
    fn form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("amount".to_string(), self.amount.to_string()),
            ("currency".to_string(), self.currency.to_string()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];

        if let Some(payment_method) = self.payment_method {
            form.push(("payment_method".to_string(), payment_method.to_string()));
            form.push(("confirm".to_string(), "true".to_string()));
            form.push((
                "automatic_payment_methods[allow_redirects]".to_string(),
                "never".to_string(),
            ));
        }

        for (key, value) in &self.metadata {
            form.push((format!("metadata[{}]", key), value.clone()));
        }

        form
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    kind: String,
    message: Option<String>,
}

#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(secret_key: &str, api_base: &str) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            secret_key: secret_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    pub async fn create_payment_intent(
        &self,
        params: &CreatePaymentIntent<'_>,
    ) -> Result<PaymentIntent, AppError> {
        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&params.form())
            .send()
            .await?;

        parse_response(response).await
    }

    pub async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, AppError> {
        let response = self
            .http
            .get(format!("{}/v1/payment_intents/{}", self.api_base, id))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        parse_response(response).await
    }

    pub async fn cancel_payment_intent(&self, id: &str) -> Result<PaymentIntent, AppError> {
        let response = self
            .http
            .post(format!("{}/v1/payment_intents/{}/cancel", self.api_base, id))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        parse_response(response).await
    }

    /// Refund the full captured amount of a PaymentIntent
    pub async fn refund_payment_intent(&self, id: &str) -> Result<Refund, AppError> {
        let response = self
            .http
            .post(format!("{}/v1/refunds", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&[("payment_intent", id)])
            .send()
            .await?;

        parse_response(response).await
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Refund {
    pub id: String,
    pub amount: i64,
    pub payment_intent: Option<String>,
    pub status: Option<String>,
}

async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AppError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(ErrorEnvelope { error }) if error.kind == "card_error" => {
            tracing::warn!("Card error from Stripe: {:?}", error.message);
            Err(AppError::Payment(
                error
                    .message
                    .unwrap_or_else(|| "Your card was declined".to_string()),
            ))
        }
        Ok(ErrorEnvelope { error }) => Err(AppError::Stripe(format!(
            "{} ({}): {}",
            status,
            error.kind,
            error.message.unwrap_or_default()
        ))),
        Err(_) => Err(AppError::Stripe(format!("Unexpected response {}", status))),
    }
}

/// Convert a major-unit amount (e.g. rupees) to the smallest currency unit.
///
/// Anything that rounds to less than one minor unit is rejected.
pub fn to_minor_units(amount: Decimal) -> Result<i64, AppError> {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .filter(|minor| *minor > 0)
        .ok_or_else(|| AppError::Validation("Invalid amount".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const SECRET: &str = "sk_test_123";

    fn intent_json(id: &str, status: &str) -> String {
        serde_json::json!({
            "id": id,
            "object": "payment_intent",
            "amount": 50000,
            "currency": "npr",
            "status": status,
            "client_secret": format!("{}_secret_abc", id),
            "metadata": { "note_id": "3" }
        })
        .to_string()
    }

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units(Decimal::new(500, 0)).unwrap(), 50000);
        assert_eq!(to_minor_units(Decimal::new(1999, 2)).unwrap(), 1999);
        assert!(to_minor_units(Decimal::ZERO).is_err());
        assert!(to_minor_units(Decimal::new(-5, 0)).is_err());
    }

    #[test]
    fn test_sub_minor_unit_amount_rejected() {
        assert!(matches!(
            to_minor_units(Decimal::new(1, 3)),
            Err(AppError::Validation(msg)) if msg == "Invalid amount"
        ));
        assert_eq!(to_minor_units(Decimal::new(6, 3)).unwrap(), 1);
    }

    #[test]
    fn test_form_confirms_when_payment_method_given() {
        let params = CreatePaymentIntent {
            amount: 100,
            currency: "npr",
            payment_method: Some("pm_card_visa"),
            metadata: vec![("note_id", "3".to_string())],
        };
        let form = params.form();

        assert!(form.contains(&("confirm".to_string(), "true".to_string())));
        assert!(form.contains(&("payment_method".to_string(), "pm_card_visa".to_string())));
        assert!(form.contains(&("metadata[note_id]".to_string(), "3".to_string())));
    }

    #[test]
    fn test_form_without_payment_method_is_unconfirmed() {
        let params = CreatePaymentIntent {
            amount: 100,
            currency: "npr",
            payment_method: None,
            metadata: vec![],
        };
        assert!(!params.form().iter().any(|(k, _)| k == "confirm"));
    }

    #[tokio::test]
    async fn test_create_payment_intent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/payment_intents")
            .match_header("authorization", format!("Bearer {}", SECRET).as_str())
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("amount".into(), "50000".into()),
                Matcher::UrlEncoded("currency".into(), "npr".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(intent_json("pi_1", "requires_payment_method"))
            .expect(1)
            .create_async()
            .await;

        let client = StripeClient::new(SECRET, &server.url()).unwrap();
        let intent = client
            .create_payment_intent(&CreatePaymentIntent {
                amount: 50000,
                currency: "npr",
                payment_method: None,
                metadata: vec![],
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(intent.id, "pi_1");
        assert_eq!(intent.client_secret.as_deref(), Some("pi_1_secret_abc"));
        assert_eq!(intent.metadata.get("note_id").map(String::as_str), Some("3"));
    }

    #[tokio::test]
    async fn test_card_error_maps_to_payment_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/payment_intents")
            .with_status(402)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"error":{"type":"card_error","code":"card_declined","message":"Your card was declined."}}"#,
            )
            .create_async()
            .await;

        let client = StripeClient::new(SECRET, &server.url()).unwrap();
        let err = client
            .create_payment_intent(&CreatePaymentIntent {
                amount: 50000,
                currency: "npr",
                payment_method: Some("pm_card_chargeDeclined"),
                metadata: vec![],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Payment(msg) if msg == "Your card was declined."));
    }

    #[tokio::test]
    async fn test_api_error_maps_to_stripe_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/payment_intents/pi_missing")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"error":{"type":"invalid_request_error","message":"No such payment_intent"}}"#,
            )
            .create_async()
            .await;

        let client = StripeClient::new(SECRET, &server.url()).unwrap();
        let err = client.retrieve_payment_intent("pi_missing").await.unwrap_err();

        assert!(matches!(err, AppError::Stripe(_)));
    }

    #[tokio::test]
    async fn test_cancel_payment_intent() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/payment_intents/pi_1/cancel")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(intent_json("pi_1", "canceled"))
            .create_async()
            .await;

        let client = StripeClient::new(SECRET, &server.url()).unwrap();
        let intent = client.cancel_payment_intent("pi_1").await.unwrap();

        assert!(intent.failed());
        assert!(!intent.succeeded());
    }

    #[tokio::test]
    async fn test_refund_payment_intent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/refunds")
            .match_body(Matcher::UrlEncoded("payment_intent".into(), "pi_1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id":"re_1","object":"refund","amount":50000,"payment_intent":"pi_1","status":"succeeded"}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let client = StripeClient::new(SECRET, &server.url()).unwrap();
        let refund = client.refund_payment_intent("pi_1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(refund.payment_intent.as_deref(), Some("pi_1"));
        assert_eq!(refund.amount, 50000);
    }
}
