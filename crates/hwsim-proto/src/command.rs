//! Management operations and their outcomes
//!
//! An [`Operation`] is one thing the tool can ask the kernel to do. The
//! reply side collapses to a single [`Outcome`] per request; callers never
//! see raw frames.

/// Sentinel radio id reported when the kernel acknowledged a creation
/// without naming the new radio.
pub const UNKNOWN_RADIO_ID: i32 = -1;

/// One request against the simulated-radio family
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operation {
    /// Create a new simulated radio.
    CreateRadio {
        /// Optional device name; `None` or empty lets the kernel pick one
        name: Option<String>,
        /// Number of channels, 0 meaning the module default
        channel_count: u32,
        /// Suppress the automatic creation of a network interface
        no_auto_interface: bool,
        /// Opt in to channel-context operation
        use_channel_contexts: bool,
        /// Two-letter regulatory hint, e.g. `"DE"`
        regulatory_alpha2: Option<String>,
        /// Index of a custom regulatory domain, 0 meaning none
        regulatory_domain: u32,
    },
    /// Destroy a radio addressed by its numeric id.
    DeleteById { radio_id: u32 },
    /// Destroy a radio addressed by its device name.
    DeleteByName { radio_name: String },
    /// Set the reported signal strength of a radio.
    SetSignalStrength {
        radio_id: u32,
        /// Signal strength as a positive magnitude; negated on the wire
        rssi_dbm: i32,
    },
}

impl Operation {
    /// The reply-interpretation class this operation belongs to.
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::CreateRadio { .. } => OperationKind::Create,
            Operation::DeleteById { .. } | Operation::DeleteByName { .. } => OperationKind::Delete,
            Operation::SetSignalStrength { .. } => OperationKind::SetSignal,
        }
    }
}

/// How replies to an operation are to be read
///
/// Creation replies smuggle the new radio id through the status code, so
/// the dispatcher must know which kind of request it is settling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperationKind {
    Create,
    Delete,
    SetSignal,
}

/// Terminal result of one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Outcome {
    /// Radio created; [`UNKNOWN_RADIO_ID`] when the kernel sent a plain ack
    Created { radio_id: i32 },
    Deleted,
    SignalSet,
    /// Kernel refused the request with a negative errno
    Failed { kernel_error_code: i32 },
    /// No reply arrived before the deadline; the request's fate is unknown
    TimedOut,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Outcome::Created { .. } | Outcome::Deleted | Outcome::SignalSet
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_delete_forms_share_a_kind() {
        let by_id = Operation::DeleteById { radio_id: 3 };
        let by_name = Operation::DeleteByName {
            radio_name: "radio0".into(),
        };
        assert_eq!(by_id.kind(), OperationKind::Delete);
        assert_eq!(by_name.kind(), OperationKind::Delete);
    }

    #[test]
    fn success_covers_all_positive_outcomes() {
        assert!(Outcome::Created { radio_id: 0 }.is_success());
        assert!(Outcome::Created { radio_id: UNKNOWN_RADIO_ID }.is_success());
        assert!(Outcome::Deleted.is_success());
        assert!(Outcome::SignalSet.is_success());
        assert!(!Outcome::Failed { kernel_error_code: -19 }.is_success());
        assert!(!Outcome::TimedOut.is_success());
    }
}
