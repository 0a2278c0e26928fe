//! Remittance Transaction Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Remittance transaction as provided by the data layer
///
/// Read-only to the printing pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub client_email: Option<String>,
    pub amount: f64,
    /// Source currency (ISO 4217)
    pub from_currency: String,
    /// Destination currency (ISO 4217)
    pub to_currency: String,
    pub exchange_rate: f64,
    #[serde(default)]
    pub fee: f64,
    /// "pending" | "completed" | "failed" | ...
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub phone_number: Option<String>,
    /// "send" | "receive" | ...
    #[serde(default)]
    pub transaction_type: String,
    /// Customer-facing reference, e.g. "RJB-2024-000123"
    #[serde(default)]
    pub unique_id: String,
    #[serde(default)]
    pub format_id: String,
}

impl Transaction {
    /// Identifier printed on the receipt and encoded in its barcode
    pub fn receipt_id(&self) -> &str {
        if self.unique_id.is_empty() {
            &self.id
        } else {
            &self.unique_id
        }
    }

    /// Amount credited to the recipient in the destination currency
    pub fn converted_amount(&self) -> f64 {
        self.amount * self.exchange_rate
    }

    /// Amount paid by the client in the source currency
    pub fn total_paid(&self) -> f64 {
        self.amount + self.fee
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        Transaction {
            id: "9f1c2d7e".to_string(),
            client_name: "Ama Mensah".to_string(),
            client_email: None,
            amount: 100.0,
            from_currency: "USD".to_string(),
            to_currency: "GHS".to_string(),
            exchange_rate: 12.5,
            fee: 4.99,
            status: "completed".to_string(),
            created_at: DateTime::from_timestamp(1_705_912_335, 0).unwrap(),
            phone_number: None,
            transaction_type: "send".to_string(),
            unique_id: String::new(),
            format_id: String::new(),
        }
    }

    #[test]
    fn test_receipt_id_falls_back_to_id() {
        let mut tx = sample();
        assert_eq!(tx.receipt_id(), "9f1c2d7e");

        tx.unique_id = "RJB-000123".to_string();
        assert_eq!(tx.receipt_id(), "RJB-000123");
    }

    #[test]
    fn test_amounts() {
        let tx = sample();
        assert_eq!(tx.converted_amount(), 1250.0);
        assert!((tx.total_paid() - 104.99).abs() < 1e-9);
    }

    #[test]
    fn test_deserialize_with_missing_optionals() {
        let json = r#"{
            "id": "t-1",
            "amount": 75,
            "from_currency": "USD",
            "to_currency": "KES",
            "exchange_rate": 129.5,
            "status": "pending",
            "created_at": "2024-01-22T08:32:15Z"
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.client_name, "");
        assert_eq!(tx.fee, 0.0);
        assert_eq!(tx.receipt_id(), "t-1");
    }
}
