//! Unit tests for BridgeError

use bridge_types::BridgeError;

#[cfg(test)]
mod error_message_tests {
    use super::*;

    #[test]
    fn test_setup_error_carries_code() {
        let error = BridgeError::Setup { code: 12 };
        assert_eq!(error.status_code(), Some(12));
        assert!(error.to_string().contains("12"));
    }

    #[test]
    fn test_init_error_carries_code() {
        let error = BridgeError::Init { code: -1 };
        assert_eq!(error.status_code(), Some(-1));
        assert_eq!(error.to_string(), "runtime init failed with status -1");
    }

    #[test]
    fn test_invalid_state_message() {
        let error = BridgeError::InvalidState {
            operation: "run a script",
            state: "created",
        };
        assert_eq!(
            error.to_string(),
            "cannot run a script while the runtime context is created"
        );
    }

    #[test]
    fn test_use_after_dispose_is_fatal() {
        assert!(BridgeError::UseAfterDispose.is_fatal());
        assert!(!BridgeError::Encode("cycle".into()).is_fatal());
    }
}
