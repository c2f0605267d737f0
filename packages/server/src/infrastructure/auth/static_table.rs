//! Lookup-table AuthGate.

use std::collections::HashMap;

use crate::domain::{AuthError, AuthGate, Identity};

/// Accepts exactly the tokens it was configured with.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenAuthGate {
    tokens: HashMap<String, Identity>,
}

impl StaticTokenAuthGate {
    pub fn new(tokens: HashMap<String, Identity>) -> Self {
        Self { tokens }
    }

    pub fn with_token(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.tokens.insert(token.into(), identity);
        self
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl AuthGate for StaticTokenAuthGate {
    fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(AuthError::UnknownToken)
    }
}
