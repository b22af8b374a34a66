//! Property-based test generators using proptest.

use proptest::prelude::*;
use syncward_protocol::{ClientAction, DataType, DataTypeSet, ErrorType, ProtocolError};

/// Strategy for any error type.
pub fn error_type_strategy() -> impl Strategy<Value = ErrorType> {
    prop::sample::select(ErrorType::ALL.to_vec())
}

/// Strategy for any client action, including `UNKNOWN_ACTION`.
pub fn client_action_strategy() -> impl Strategy<Value = ClientAction> {
    prop::sample::select(ClientAction::ALL.to_vec())
}

/// Strategy for an action that disables sync for the account.
pub fn disabling_action_strategy() -> impl Strategy<Value = ClientAction> {
    prop::sample::select(vec![
        ClientAction::DisableSyncOnClient,
        ClientAction::StopSyncForDisabledAccount,
    ])
}

fn text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9 .:/]{0,24}").expect("Invalid regex")
}

/// Strategy for a protocol error with the given type and action strategies.
pub fn protocol_error_with(
    error_type: impl Strategy<Value = ErrorType>,
    action: impl Strategy<Value = ClientAction>,
) -> impl Strategy<Value = ProtocolError> {
    (error_type, action, text_strategy(), text_strategy()).prop_map(
        |(error_type, action, description, url)| {
            ProtocolError::new(error_type)
                .with_action(action)
                .with_description(description)
                .with_url(url)
        },
    )
}

/// Strategy for arbitrary protocol errors.
pub fn protocol_error_strategy() -> impl Strategy<Value = ProtocolError> {
    protocol_error_with(error_type_strategy(), client_action_strategy())
}

/// Strategy for errors that end a session: birthday errors and explicit actions.
pub fn terminal_error_strategy() -> impl Strategy<Value = ProtocolError> {
    prop_oneof![
        protocol_error_with(Just(ErrorType::NotMyBirthday), client_action_strategy()),
        protocol_error_with(
            error_type_strategy(),
            prop::sample::select(ClientAction::ALL[1..].to_vec()),
        ),
    ]
}

/// Strategy for data type sets.
pub fn data_type_set_strategy() -> impl Strategy<Value = DataTypeSet> {
    prop::sample::subsequence(DataType::ALL.to_vec(), 0..=DataType::ALL.len())
        .prop_map(|types| types.into_iter().collect())
}
