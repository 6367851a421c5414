use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A physical card terminal as listed by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub pos_id: Option<Value>,
    #[serde(default)]
    pub store_id: Option<Value>,
    #[serde(default)]
    pub external_pos_id: Option<String>,
    #[serde(default)]
    pub operating_mode: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentStatus {
    Pending,
    Processing,
    Approved,
    Rejected,
    Cancelled,
    Error,
}

impl IntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::Pending => "pending",
            IntentStatus::Processing => "processing",
            IntentStatus::Approved => "approved",
            IntentStatus::Rejected => "rejected",
            IntentStatus::Cancelled => "cancelled",
            IntentStatus::Error => "error",
        }
    }

    /// Polling can stop once a terminal status is observed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IntentStatus::Approved
                | IntentStatus::Rejected
                | IntentStatus::Cancelled
                | IntentStatus::Error
        )
    }
}

/// Maps Mercado Pago Point's two-level intent state onto [`IntentStatus`].
///
/// `payment_state` is only consulted when `state` is `FINISHED`. Anything
/// not covered falls through to `Pending`, including stale intents the
/// provider no longer reports on.
pub fn map_point_state(state: Option<&str>, payment_state: Option<&str>) -> IntentStatus {
    match state {
        Some("FINISHED") => match payment_state {
            Some("approved") => IntentStatus::Approved,
            Some("rejected") => IntentStatus::Rejected,
            Some("cancelled") => IntentStatus::Cancelled,
            _ => IntentStatus::Pending,
        },
        Some("PROCESSING") | Some("OPEN") => IntentStatus::Processing,
        Some("CANCELLED") => IntentStatus::Cancelled,
        Some("ERROR") => IntentStatus::Error,
        _ => IntentStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn maps_every_listed_state_pair() {
        let table = [
            (Some("FINISHED"), Some("approved"), IntentStatus::Approved),
            (Some("FINISHED"), Some("rejected"), IntentStatus::Rejected),
            (Some("FINISHED"), Some("cancelled"), IntentStatus::Cancelled),
            (Some("FINISHED"), Some("in_process"), IntentStatus::Pending),
            (Some("FINISHED"), None, IntentStatus::Pending),
            (Some("PROCESSING"), None, IntentStatus::Processing),
            (Some("OPEN"), None, IntentStatus::Processing),
            (Some("CANCELLED"), None, IntentStatus::Cancelled),
            (Some("ERROR"), None, IntentStatus::Error),
            (Some("ABANDONED"), None, IntentStatus::Pending),
            (None, None, IntentStatus::Pending),
        ];

        for (state, payment_state, expected) in table {
            assert_eq!(
                map_point_state(state, payment_state),
                expected,
                "state={state:?} payment.state={payment_state:?}"
            );
        }
    }

    #[test]
    fn payment_state_is_ignored_unless_finished() {
        assert_eq!(
            map_point_state(Some("OPEN"), Some("approved")),
            IntentStatus::Processing
        );
        assert_eq!(
            map_point_state(Some("CANCELLED"), Some("approved")),
            IntentStatus::Cancelled
        );
    }

    #[test]
    fn terminal_statuses() {
        assert!(!IntentStatus::Pending.is_terminal());
        assert!(!IntentStatus::Processing.is_terminal());
        assert!(IntentStatus::Approved.is_terminal());
        assert!(IntentStatus::Rejected.is_terminal());
        assert!(IntentStatus::Cancelled.is_terminal());
        assert!(IntentStatus::Error.is_terminal());
        assert_eq!(
            serde_json::to_value(IntentStatus::Processing).unwrap(),
            serde_json::json!("processing")
        );
    }

    proptest! {
        #[test]
        fn unknown_states_default_to_pending(state in "[A-Z_]{1,12}", payment in proptest::option::of("[a-z_]{1,12}")) {
            prop_assume!(!["FINISHED", "PROCESSING", "OPEN", "CANCELLED", "ERROR"].contains(&state.as_str()));
            prop_assert_eq!(map_point_state(Some(&state), payment.as_deref()), IntentStatus::Pending);
        }

        #[test]
        fn finished_with_unknown_payment_state_is_pending(payment in "[a-z_]{1,12}") {
            prop_assume!(!["approved", "rejected", "cancelled"].contains(&payment.as_str()));
            prop_assert_eq!(map_point_state(Some("FINISHED"), Some(&payment)), IntentStatus::Pending);
        }
    }
}
