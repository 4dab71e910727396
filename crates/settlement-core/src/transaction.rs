use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Transaction kind. Unknown kinds are accepted at submission and fail at settlement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionKind {
    Credit,
    Debit,
    Unrecognized(String),
}

impl From<&str> for TransactionKind {
    fn from(value: &str) -> Self {
        match value {
            "credit" => Self::Credit,
            "debit" => Self::Debit,
            other => Self::Unrecognized(other.to_owned()),
        }
    }
}

impl From<String> for TransactionKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "credit" => Self::Credit,
            "debit" => Self::Debit,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<TransactionKind> for String {
    fn from(kind: TransactionKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credit => f.write_str("credit"),
            Self::Debit => f.write_str("debit"),
            Self::Unrecognized(kind) => f.write_str(kind),
        }
    }
}

/// Transaction request as submitted by a caller (or read from CSV)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransactionRequest {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(rename = "user")]
    pub user_id: String,
    pub amount: f64,
    #[serde(default)]
    pub description: String,
}

impl TransactionRequest {
    pub fn new(user_id: impl Into<String>, amount: f64, kind: TransactionKind) -> Self {
        Self {
            kind,
            user_id: user_id.into(),
            amount,
            description: String::new(),
        }
    }

    pub fn credit(user_id: impl Into<String>, amount: f64) -> Self {
        Self::new(user_id, amount, TransactionKind::Credit)
    }

    pub fn debit(user_id: impl Into<String>, amount: f64) -> Self {
        Self::new(user_id, amount, TransactionKind::Debit)
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx_{}", self.0)
    }
}

/// Hands out clock-derived ids that stay strictly increasing under contention
#[derive(Debug, Default)]
pub(crate) struct IdGenerator {
    last: AtomicU64,
}

impl IdGenerator {
    pub(crate) fn next_id(&self, now: DateTime<Utc>) -> TransactionId {
        let nanos = now
            .timestamp_nanos_opt()
            .and_then(|nanos| u64::try_from(nanos).ok())
            .unwrap_or_default();

        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let next = nanos.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return TransactionId(next),
                Err(actual) => last = actual,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Settled,
    Failed,
}

/// Transaction as recorded in the transaction log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: String,
    pub amount: f64,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub submitted_at: DateTime<Utc>,
    pub description: String,
}

impl Transaction {
    pub(crate) fn stamp(
        request: TransactionRequest,
        id: TransactionId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id: request.user_id,
            amount: request.amount,
            kind: request.kind,
            status: TransactionStatus::Pending,
            submitted_at: now,
            description: request.description,
        }
    }

    pub const fn is_pending(&self) -> bool {
        matches!(self.status, TransactionStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_kind_parsing() {
        assert_eq!(TransactionKind::from("credit"), TransactionKind::Credit);
        assert_eq!(TransactionKind::from("debit"), TransactionKind::Debit);
        assert_eq!(
            TransactionKind::from("refund"),
            TransactionKind::Unrecognized("refund".to_string())
        );
        assert_eq!(TransactionKind::from("refund").to_string(), "refund");
    }

    #[test]
    fn test_request_deserialization() {
        let csv = "type, user, amount, description\ndebit, u1, 100.0, groceries\nbonus, u2, 5,";
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(csv.as_bytes());

        let requests: Vec<TransactionRequest> = reader
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(
            requests[0],
            TransactionRequest::debit("u1", 100.0).with_description("groceries")
        );
        assert_eq!(
            requests[1].kind,
            TransactionKind::Unrecognized("bonus".to_string())
        );
        assert!(requests[1].description.is_empty());
    }

    #[test]
    fn test_ids_strictly_increase_with_frozen_clock() {
        let generator = IdGenerator::default();
        let now = Utc::now();

        let first = generator.next_id(now);
        let second = generator.next_id(now);
        let third = generator.next_id(now);

        assert!(first < second && second < third);
        assert_eq!(first.to_string(), format!("tx_{}", first.0));
    }

    #[test]
    fn test_ids_unique_across_threads() {
        let generator = Arc::new(IdGenerator::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = Arc::clone(&generator);
                thread::spawn(move || {
                    (0..500)
                        .map(|_| generator.next_id(Utc::now()))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 2000);
    }
}
