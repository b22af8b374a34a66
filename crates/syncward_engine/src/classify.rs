//! Classification of server-signaled protocol errors.

use std::fmt;
use syncward_protocol::{ClientAction, ErrorType, ProtocolError};

/// An explicit directive sent by the server.
///
/// This is [`ClientAction`] minus `UNKNOWN_ACTION`, so an
/// [`ClassifiedOutcome::ActionRequired`] can never carry "no action".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredAction {
    /// Turn sync off on this client.
    DisableSyncOnClient,
    /// The client binary must be upgraded.
    UpgradeClient,
    /// The account was disabled server-side.
    StopSyncForDisabledAccount,
}

impl RequiredAction {
    /// Maps a client action to a required action, if it is explicit.
    pub fn from_client_action(action: ClientAction) -> Option<Self> {
        match action {
            ClientAction::UnknownAction => None,
            ClientAction::DisableSyncOnClient => Some(RequiredAction::DisableSyncOnClient),
            ClientAction::UpgradeClient => Some(RequiredAction::UpgradeClient),
            ClientAction::StopSyncForDisabledAccount => {
                Some(RequiredAction::StopSyncForDisabledAccount)
            }
        }
    }

    /// Returns the protocol action this directive corresponds to.
    pub fn client_action(&self) -> ClientAction {
        match self {
            RequiredAction::DisableSyncOnClient => ClientAction::DisableSyncOnClient,
            RequiredAction::UpgradeClient => ClientAction::UpgradeClient,
            RequiredAction::StopSyncForDisabledAccount => ClientAction::StopSyncForDisabledAccount,
        }
    }

    /// Returns true if the directive turns sync off for the account.
    pub fn disables_sync(&self) -> bool {
        !matches!(self, RequiredAction::UpgradeClient)
    }
}

impl fmt::Display for RequiredAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.client_action(), f)
    }
}

/// The closed set of outcomes a server response can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassifiedOutcome {
    /// The cycle completed without error.
    NoError,
    /// Temporary failure; retry with backoff.
    RetryableTransient,
    /// Data epoch mismatch; the client must reset.
    BirthdayMismatch,
    /// The server sent an explicit directive.
    ActionRequired(RequiredAction),
}

impl ClassifiedOutcome {
    /// Returns true if the outcome ends the current session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClassifiedOutcome::BirthdayMismatch | ClassifiedOutcome::ActionRequired(_)
        )
    }
}

/// Classifies a protocol error.
///
/// An explicit action always wins over the error type. Without one, the
/// error type decides: `NONE` is success, `NOT_MY_BIRTHDAY` is a birthday
/// mismatch and every other type asks the client to back off and retry.
pub fn classify(error: &ProtocolError) -> ClassifiedOutcome {
    if let Some(action) = RequiredAction::from_client_action(error.action) {
        return ClassifiedOutcome::ActionRequired(action);
    }

    match error.error_type {
        ErrorType::None => ClassifiedOutcome::NoError,
        ErrorType::NotMyBirthday => ClassifiedOutcome::BirthdayMismatch,
        ErrorType::TransientError
        | ErrorType::Throttled
        | ErrorType::MigrationDone
        | ErrorType::ClientDataObsolete
        | ErrorType::Unknown => ClassifiedOutcome::RetryableTransient,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn error_type_strategy() -> impl Strategy<Value = ErrorType> {
        prop::sample::select(ErrorType::ALL.to_vec())
    }

    #[test]
    fn zero_value_is_no_error() {
        assert_eq!(classify(&ProtocolError::none()), ClassifiedOutcome::NoError);
    }

    #[test]
    fn transient_without_action() {
        let err = ProtocolError::new(ErrorType::TransientError);
        assert_eq!(classify(&err), ClassifiedOutcome::RetryableTransient);
    }

    #[test]
    fn throttled_is_retryable() {
        let err = ProtocolError::new(ErrorType::Throttled);
        assert_eq!(classify(&err), ClassifiedOutcome::RetryableTransient);
    }

    #[test]
    fn birthday_without_action() {
        let err = ProtocolError::new(ErrorType::NotMyBirthday);
        assert_eq!(classify(&err), ClassifiedOutcome::BirthdayMismatch);
    }

    #[test]
    fn action_beats_birthday() {
        let err = ProtocolError::new(ErrorType::NotMyBirthday)
            .with_action(ClientAction::DisableSyncOnClient);
        assert_eq!(
            classify(&err),
            ClassifiedOutcome::ActionRequired(RequiredAction::DisableSyncOnClient)
        );
    }

    #[test]
    fn upgrade_does_not_disable() {
        assert!(!RequiredAction::UpgradeClient.disables_sync());
        assert!(RequiredAction::DisableSyncOnClient.disables_sync());
        assert!(RequiredAction::StopSyncForDisabledAccount.disables_sync());
    }

    #[test]
    fn terminal_outcomes() {
        assert!(!ClassifiedOutcome::NoError.is_terminal());
        assert!(!ClassifiedOutcome::RetryableTransient.is_terminal());
        assert!(ClassifiedOutcome::BirthdayMismatch.is_terminal());
        assert!(ClassifiedOutcome::ActionRequired(RequiredAction::UpgradeClient).is_terminal());
    }

    proptest! {
        #[test]
        fn explicit_action_is_authoritative(
            error_type in error_type_strategy(),
            action in prop::sample::select(ClientAction::ALL[1..].to_vec()),
        ) {
            let err = ProtocolError::new(error_type).with_action(action);
            match classify(&err) {
                ClassifiedOutcome::ActionRequired(required) => {
                    prop_assert_eq!(required.client_action(), action);
                }
                other => prop_assert!(false, "unexpected outcome {:?}", other),
            }
        }

        #[test]
        fn unknown_action_never_requires_action(error_type in error_type_strategy()) {
            let outcome = classify(&ProtocolError::new(error_type));
            prop_assert!(!matches!(outcome, ClassifiedOutcome::ActionRequired(_)));
        }
    }
}
