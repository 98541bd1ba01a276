//! Stripe integration via REST API (no SDK dependency)

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{PaymentError, PaymentGateway, PaymentHandle, to_minor_units};

/// Stripe 支付网关
#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(secret_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key,
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    /// Create a Stripe PaymentIntent scoped to the order's grand total
    async fn create_intent(
        &self,
        amount: f64,
        currency: &str,
        order_id: &str,
        email: Option<&str>,
    ) -> Result<PaymentHandle, PaymentError> {
        let amount_minor = to_minor_units(amount);
        let amount_str = amount_minor.to_string();
        let currency_lower = currency.to_lowercase();

        let mut form: Vec<(&str, &str)> = vec![
            ("amount", &amount_str),
            ("currency", &currency_lower),
            ("metadata[order_id]", order_id),
            ("automatic_payment_methods[enabled]", "true"),
        ];
        if let Some(email) = email {
            form.push(("receipt_email", email));
        }

        let resp: serde_json::Value = self
            .client
            .post("https://api.stripe.com/v1/payment_intents")
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await
            .map_err(|e| PaymentError::Request(e.to_string()))?
            .json()
            .await
            .map_err(|e| PaymentError::Request(e.to_string()))?;

        if let Some(err) = resp.get("error") {
            let message = err["message"].as_str().unwrap_or("unknown error");
            return Err(PaymentError::Rejected(message.to_string()));
        }

        let intent_id = resp["id"]
            .as_str()
            .ok_or_else(|| PaymentError::Rejected(format!("Stripe create intent failed: {resp}")))?
            .to_string();
        let client_secret = resp["client_secret"]
            .as_str()
            .ok_or_else(|| PaymentError::Rejected("Stripe response missing client_secret".into()))?
            .to_string();

        Ok(PaymentHandle {
            intent_id,
            client_secret,
            amount_minor,
            currency: currency_lower,
        })
    }
}

/// Verify Stripe webhook signature (HMAC-SHA256)
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signature = "";
    for part in sig_header.split(',') {
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signature = v;
        }
    }

    if timestamp.is_empty() || signature.is_empty() {
        return Err("Invalid Stripe-Signature header");
    }

    let signed_payload = format!("{timestamp}.{}", std::str::from_utf8(payload).unwrap_or(""));
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(signed_payload.as_bytes());

    // Decode hex signature and use constant-time comparison via hmac::verify_slice
    let sig_bytes = hex::decode(signature).map_err(|_| "Invalid signature hex")?;
    mac.verify_slice(&sig_bytes)
        .map_err(|_| "Webhook signature mismatch")?;

    // Reject events older than 5 minutes to prevent replay attacks
    let ts: i64 = timestamp.parse().map_err(|_| "Invalid timestamp")?;
    let now = chrono::Utc::now().timestamp();
    if (now - ts).abs() > 300 {
        return Err("Webhook timestamp too old");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let signed_payload = format!("{timestamp}.{}", std::str::from_utf8(payload).unwrap());
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed_payload.as_bytes());
        let sig = hex::encode(mac.finalize().into_bytes());
        format!("t={timestamp},v1={sig}")
    }

    #[test]
    fn test_webhook_signature_roundtrip() {
        let payload = br#"{"id":"evt_1","type":"payment_intent.succeeded"}"#;
        let secret = "whsec_test";
        let now = chrono::Utc::now().timestamp();

        let header = sign(payload, secret, now);
        assert!(verify_webhook_signature(payload, &header, secret).is_ok());
    }

    #[test]
    fn test_webhook_signature_mismatch() {
        let payload = br#"{"id":"evt_1"}"#;
        let now = chrono::Utc::now().timestamp();
        let header = sign(payload, "whsec_a", now);
        assert!(verify_webhook_signature(payload, &header, "whsec_b").is_err());
    }

    #[test]
    fn test_webhook_replay_rejected() {
        let payload = br#"{"id":"evt_1"}"#;
        let secret = "whsec_test";
        let old = chrono::Utc::now().timestamp() - 600;
        let header = sign(payload, secret, old);
        assert_eq!(
            verify_webhook_signature(payload, &header, secret),
            Err("Webhook timestamp too old")
        );
    }

    #[test]
    fn test_webhook_malformed_header() {
        assert!(verify_webhook_signature(b"{}", "nonsense", "whsec").is_err());
    }
}
