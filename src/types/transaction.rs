//! Transfer data structures for risk scoring

use serde::{Deserialize, Serialize};

/// A proposed money transfer between two accounts.
///
/// Only constructed through [`Transaction::new`], which enforces a positive
/// finite amount and non-empty account ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// Originating account id
    pub source_id: String,
    /// Receiving account id
    pub destination_id: String,
    /// Transfer amount, always > 0
    pub amount: f64,
}

/// Reason a transfer was rejected before scoring.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidTransaction {
    #[error("amount must be a finite number greater than zero, got {0}")]
    NonPositiveAmount(f64),
    #[error("amount is missing")]
    MissingAmount,
    #[error("{0} account id is missing")]
    MissingAccountId(&'static str),
}

/// Canonical form of an account id. Every path that looks up account
/// attributes, online or offline, goes through this.
pub fn normalize_account_id(id: &str) -> String {
    id.trim().to_string()
}

impl Transaction {
    /// Validate and build a transaction.
    pub fn new(
        source_id: impl Into<String>,
        destination_id: impl Into<String>,
        amount: f64,
    ) -> Result<Self, InvalidTransaction> {
        let source_id = normalize_account_id(&source_id.into());
        let destination_id = normalize_account_id(&destination_id.into());

        if !amount.is_finite() || amount <= 0.0 {
            return Err(InvalidTransaction::NonPositiveAmount(amount));
        }
        if source_id.is_empty() {
            return Err(InvalidTransaction::MissingAccountId("source"));
        }
        if destination_id.is_empty() {
            return Err(InvalidTransaction::MissingAccountId("destination"));
        }

        Ok(Self {
            source_id,
            destination_id,
            amount,
        })
    }

    /// Build without amount or emptiness checks. Offline ledgers keep every
    /// row as recorded, but ids are normalized exactly like [`Transaction::new`].
    pub(crate) fn unchecked(source_id: &str, destination_id: &str, amount: f64) -> Self {
        Self {
            source_id: normalize_account_id(source_id),
            destination_id: normalize_account_id(destination_id),
            amount,
        }
    }
}

/// A ledger row with its fraud label, used to build training data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledTransaction {
    pub transaction: Transaction,
    pub is_fraud: bool,
}

/// Incoming score request as received over the wire.
///
/// Accepts the ledger column names (`nameOrig`, `nameDest`) as aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRequest {
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(alias = "nameOrig", alias = "source_id", default)]
    pub source_account_id: String,
    #[serde(alias = "nameDest", alias = "destination_id", default)]
    pub destination_account_id: String,
}

impl ScoreRequest {
    pub fn new(
        amount: f64,
        source_account_id: impl Into<String>,
        destination_account_id: impl Into<String>,
    ) -> Self {
        Self {
            amount: Some(amount),
            source_account_id: source_account_id.into(),
            destination_account_id: destination_account_id.into(),
        }
    }

    /// Validate into a [`Transaction`].
    pub fn validate(&self) -> Result<Transaction, InvalidTransaction> {
        let amount = self.amount.ok_or(InvalidTransaction::MissingAmount)?;
        Transaction::new(
            self.source_account_id.as_str(),
            self.destination_account_id.as_str(),
            amount,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transaction() {
        let tx = Transaction::new(" C1 ", "C2", 10.5).unwrap();
        assert_eq!(tx.source_id, "C1");
        assert_eq!(tx.destination_id, "C2");
        assert_eq!(tx.amount, 10.5);
    }

    #[test]
    fn test_rejects_zero_and_negative_amounts() {
        assert_eq!(
            Transaction::new("C1", "C2", 0.0),
            Err(InvalidTransaction::NonPositiveAmount(0.0))
        );
        assert_eq!(
            Transaction::new("C1", "C2", -1.0),
            Err(InvalidTransaction::NonPositiveAmount(-1.0))
        );
        assert!(Transaction::new("C1", "C2", f64::NAN).is_err());
        assert!(Transaction::new("C1", "C2", f64::INFINITY).is_err());
    }

    #[test]
    fn test_rejects_missing_ids() {
        assert_eq!(
            Transaction::new("", "C2", 1.0),
            Err(InvalidTransaction::MissingAccountId("source"))
        );
        assert_eq!(
            Transaction::new("C1", "   ", 1.0),
            Err(InvalidTransaction::MissingAccountId("destination"))
        );
    }

    #[test]
    fn test_request_accepts_ledger_aliases() {
        let json = r#"{"amount": 9.0, "nameOrig": "C1", "nameDest": "C2"}"#;
        let req: ScoreRequest = serde_json::from_str(json).unwrap();
        let tx = req.validate().unwrap();
        assert_eq!(tx.source_id, "C1");
        assert_eq!(tx.destination_id, "C2");
    }

    #[test]
    fn test_request_missing_id_defaults_to_empty_and_fails_validation() {
        let json = r#"{"amount": 9.0, "source_account_id": "C1"}"#;
        let req: ScoreRequest = serde_json::from_str(json).unwrap();
        assert_eq!(
            req.validate(),
            Err(InvalidTransaction::MissingAccountId("destination"))
        );
    }

    #[test]
    fn test_request_missing_amount_fails_validation() {
        let json = r#"{"source_account_id": "C1", "destination_account_id": "C2"}"#;
        let req: ScoreRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.amount, None);
        assert_eq!(req.validate(), Err(InvalidTransaction::MissingAmount));
    }

    #[test]
    fn test_unchecked_normalizes_ids_like_new() {
        let raw = Transaction::unchecked(" C1", "C2 ", -5.0);
        let validated = Transaction::new(" C1", "C2 ", 5.0).unwrap();
        assert_eq!(raw.source_id, validated.source_id);
        assert_eq!(raw.destination_id, validated.destination_id);
        assert_eq!(raw.amount, -5.0);
    }
}
