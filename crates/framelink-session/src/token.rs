use std::sync::{Mutex, PoisonError};

use crate::error::{Result, SessionError};

/// Holds the session token. Empty strings count as no token.
#[derive(Debug, Default)]
pub struct TokenSlot {
    token: Mutex<Option<String>>,
}

impl TokenSlot {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            token: Mutex::new(initial.filter(|token| !token.is_empty())),
        }
    }

    pub fn get(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the held token with `provided`, if any, and return the result.
    ///
    /// Fails with [`SessionError::NoSessionToken`] when nothing is held afterwards.
    pub fn resolve(&self, provided: Option<&str>) -> Result<String> {
        let mut token = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(provided) = provided.filter(|provided| !provided.is_empty()) {
            *token = Some(provided.to_string());
        }
        token.clone().ok_or(SessionError::NoSessionToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provided_token_replaces_held_one() {
        let slot = TokenSlot::new(Some("first".to_string()));
        assert_eq!(slot.resolve(None).unwrap(), "first");
        assert_eq!(slot.resolve(Some("second")).unwrap(), "second");
        assert_eq!(slot.get().as_deref(), Some("second"));
    }

    #[test]
    fn missing_token_is_an_error() {
        let slot = TokenSlot::new(Some(String::new()));
        assert!(matches!(slot.resolve(None), Err(SessionError::NoSessionToken)));
        assert!(matches!(slot.resolve(Some("")), Err(SessionError::NoSessionToken)));
    }
}
