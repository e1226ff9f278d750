//! Stripe wire types for signed webhook callbacks.
//!
//! Only the fields the billing service reads are modelled; everything else in
//! the payload is ignored by serde.

use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════════
// Signature Parsing
// ════════════════════════════════════════════════════════════════════════════════

/// Error parsing the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureParseError {
    /// Header is empty.
    MissingHeader,
    /// Missing timestamp component (t=...).
    MissingTimestamp,
    /// No v1 signature in the header.
    MissingV1Signature,
    /// Timestamp is not an integer.
    InvalidTimestamp,
    /// Signature is not valid hex.
    InvalidSignatureFormat,
}

impl std::fmt::Display for SignatureParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHeader => write!(f, "Missing Stripe-Signature header"),
            Self::MissingTimestamp => write!(f, "Missing timestamp (t=) in signature"),
            Self::MissingV1Signature => write!(f, "Missing v1 signature in header"),
            Self::InvalidTimestamp => write!(f, "Invalid timestamp format"),
            Self::InvalidSignatureFormat => write!(f, "Invalid signature format (not valid hex)"),
        }
    }
}

impl std::error::Error for SignatureParseError {}

/// Parsed Stripe-Signature header.
///
/// Format: `t=<unix seconds>,v1=<hex>[,v1=<hex>...]`. Stripe sends several
/// `v1` entries while a signing secret is being rolled; any of them may match.
#[derive(Debug, Clone)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, SignatureParseError> {
        if header.trim().is_empty() {
            return Err(SignatureParseError::MissingHeader);
        }

        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            match key.trim() {
                "t" => {
                    timestamp = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|_| SignatureParseError::InvalidTimestamp)?,
                    );
                }
                "v1" => {
                    v1_signatures.push(
                        hex_decode(value).ok_or(SignatureParseError::InvalidSignatureFormat)?,
                    );
                }
                // v0 and unknown schemes are not trusted.
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureParseError::MissingTimestamp)?;
        if v1_signatures.is_empty() {
            return Err(SignatureParseError::MissingV1Signature);
        }
        Ok(Self {
            timestamp,
            v1_signatures,
        })
    }
}

fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// ════════════════════════════════════════════════════════════════════════════════
// Event Payloads
// ════════════════════════════════════════════════════════════════════════════════

/// Stripe event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeWebhookEvent {
    /// Event ID (evt_...).
    pub id: String,

    /// Event type, e.g. `invoice.payment_failed`.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix seconds.
    pub created: i64,

    pub data: StripeEventData,

    #[serde(default)]
    pub livemode: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object the event is about; its shape depends on `event_type`.
    pub object: serde_json::Value,
}

/// Invoice object carried by `invoice.*` events.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeInvoice {
    /// Invoice ID (in_...).
    pub id: String,

    pub customer: Option<String>,

    /// Provider subscription the invoice bills, absent for one-off invoices.
    pub subscription: Option<String>,

    #[serde(default)]
    pub attempt_count: i32,

    pub last_finalization_error: Option<StripeInvoiceError>,

    /// Charge that paid the invoice (ch_...).
    #[serde(default)]
    pub charge: Option<String>,

    #[serde(default)]
    pub payment_intent: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeInvoiceError {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl StripeInvoice {
    /// Reference to refund against: the charge, else the payment intent.
    pub fn charge_ref(&self) -> Option<String> {
        self.charge.clone().or_else(|| self.payment_intent.clone())
    }

    /// Human-readable failure reason, falling back to a generic one.
    pub fn failure_reason(&self) -> String {
        self.last_finalization_error
            .as_ref()
            .and_then(|e| e.message.clone().or_else(|| e.code.clone()))
            .unwrap_or_else(|| "invoice payment failed".to_string())
    }
}
