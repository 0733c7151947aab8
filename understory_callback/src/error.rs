// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.

use crate::id::ListenerId;

/// Errors reported by property descriptors.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    /// A value of the wrong kind was assigned to a property.
    #[error("property `{property}` expects {expected}, got `{found}`")]
    InvalidValueKind {
        /// Name of the property being assigned.
        property: &'static str,
        /// Description of the accepted kind of value.
        expected: &'static str,
        /// Type name of the rejected value.
        found: &'static str,
    },
    /// A listener handle was not registered for this object and property.
    #[error("{listener:?} is not registered on property `{property}`")]
    CallbackNotFound {
        /// Name of the property.
        property: &'static str,
        /// The handle that was not found.
        listener: ListenerId,
    },
}

/// Errors reported by [`CallbackDict`](crate::CallbackDict) operations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DictError {
    /// `pop` was called for a key that is not present and no default was given.
    #[error("key not found")]
    KeyNotFound,
    /// `pop_last` was called on an empty dict.
    #[error("pop_last on an empty CallbackDict")]
    EmptyContainer,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn error_messages() {
        let err = PropertyError::InvalidValueKind {
            property: "items",
            expected: "a mapping",
            found: "i32",
        };
        assert_eq!(
            err.to_string(),
            "property `items` expects a mapping, got `i32`"
        );
        assert_eq!(DictError::KeyNotFound.to_string(), "key not found");
        assert_eq!(
            DictError::EmptyContainer.to_string(),
            "pop_last on an empty CallbackDict"
        );
    }

    #[test]
    fn callback_not_found_names_listener() {
        let err = PropertyError::CallbackNotFound {
            property: "width",
            listener: ListenerId::new(9),
        };
        assert_eq!(
            err.to_string(),
            "ListenerId(9) is not registered on property `width`"
        );
    }
}
