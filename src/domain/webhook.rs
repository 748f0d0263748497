use crate::error::RelayError;
use serde::Serialize;
use serde_json::Value;

const ID_POINTERS: &[&str] = &["/id", "/transaction_id", "/payment_id", "/data/id", "/payment/id"];
const STATUS_POINTERS: &[&str] = &["/status", "/data/status", "/payment/status"];

const APPROVED: &[&str] = &["paid", "approved", "completed", "success", "succeeded"];
const REJECTED: &[&str] = &[
    "failed",
    "refused",
    "rejected",
    "refunded",
    "chargeback",
    "chargedback",
    "canceled",
    "cancelled",
    "expired",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementOutcome {
    Approved,
    Rejected,
    Indeterminate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub transaction_id: String,
    pub status: Option<String>,
}

fn scalar_at(body: &Value, pointer: &str) -> Option<String> {
    match body.pointer(pointer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Pull the transaction id and raw status out of a provider notification.
pub fn parse_notification(body: &Value) -> Result<Notification, RelayError> {
    let transaction_id = ID_POINTERS
        .iter()
        .find_map(|p| scalar_at(body, p))
        .ok_or_else(|| RelayError::validation("notification carries no transaction id"))?;
    let status = STATUS_POINTERS.iter().find_map(|p| scalar_at(body, p));
    Ok(Notification {
        transaction_id,
        status,
    })
}

pub fn normalize_status(status: Option<&str>) -> SettlementOutcome {
    let Some(raw) = status else {
        return SettlementOutcome::Indeterminate;
    };
    let s = raw.trim().to_ascii_lowercase();
    if APPROVED.contains(&s.as_str()) {
        SettlementOutcome::Approved
    } else if REJECTED.contains(&s.as_str()) {
        SettlementOutcome::Rejected
    } else {
        SettlementOutcome::Indeterminate
    }
}

/// New value for `Sale.approved`, or `None` when nothing should be written.
///
/// Approval is sticky: a later failure never reverts it, and a failure only
/// lands on a sale that has not settled yet.
pub fn settle(current: Option<bool>, outcome: SettlementOutcome) -> Option<bool> {
    match outcome {
        SettlementOutcome::Approved if current != Some(true) => Some(true),
        SettlementOutcome::Rejected if current.is_none() => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_id_and_status_from_nested_locations() {
        let n = parse_notification(&json!({"data": {"id": 991, "status": "PAID"}})).unwrap();
        assert_eq!(n.transaction_id, "991");
        assert_eq!(n.status.as_deref(), Some("PAID"));

        let n = parse_notification(&json!({"payment": {"id": "tx_1", "status": "failed"}})).unwrap();
        assert_eq!(n.transaction_id, "tx_1");
        assert_eq!(n.status.as_deref(), Some("failed"));

        let n = parse_notification(&json!({"transaction_id": "tx_2"})).unwrap();
        assert_eq!(n.status, None);
    }

    #[test]
    fn missing_id_is_a_validation_error() {
        assert!(matches!(
            parse_notification(&json!({"status": "paid"})),
            Err(RelayError::Validation(_))
        ));
    }

    #[test]
    fn normalizes_vocabulary() {
        assert_eq!(normalize_status(Some("APPROVED")), SettlementOutcome::Approved);
        assert_eq!(normalize_status(Some(" paid ")), SettlementOutcome::Approved);
        assert_eq!(normalize_status(Some("chargeback")), SettlementOutcome::Rejected);
        assert_eq!(normalize_status(Some("waiting_payment")), SettlementOutcome::Indeterminate);
        assert_eq!(normalize_status(None), SettlementOutcome::Indeterminate);
    }

    #[test]
    fn approval_is_sticky() {
        use SettlementOutcome::*;
        assert_eq!(settle(None, Approved), Some(true));
        assert_eq!(settle(Some(false), Approved), Some(true));
        assert_eq!(settle(Some(true), Approved), None);
        assert_eq!(settle(None, Rejected), Some(false));
        assert_eq!(settle(Some(true), Rejected), None);
        assert_eq!(settle(Some(false), Rejected), None);
        assert_eq!(settle(None, Indeterminate), None);
        assert_eq!(settle(Some(true), Indeterminate), None);
    }
}
