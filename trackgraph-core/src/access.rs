//! Owner gate for privileged mutations

use tracing::warn;

use crate::error::{GraphError, Result};
use crate::types::Principal;

/// Single designated owner, fixed when the graph is created
#[derive(Debug, Clone)]
pub struct AccessController {
    owner: Principal,
}

impl AccessController {
    pub fn new(owner: Principal) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> &Principal {
        &self.owner
    }

    pub fn is_owner(&self, identity: &Principal) -> bool {
        &self.owner == identity
    }

    /// Fails with `Unauthorized` unless `identity` is the owner
    pub fn authorize(&self, identity: &Principal) -> Result<()> {
        if self.is_owner(identity) {
            Ok(())
        } else {
            warn!("Rejected privileged operation from {}", identity);
            Err(GraphError::Unauthorized(identity.clone()))
        }
    }
}
