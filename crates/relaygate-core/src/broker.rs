//! Broker contract: the shared, reference-counted message bus modules
//! attach to.
//!
//! Attachment and lifetime are tracked separately. `add_module` and
//! `remove_module` make a module reachable on the bus; `inc_ref` and
//! `dec_ref` account for every owner that keeps the broker alive. The
//! creation reference is dropped with [`Broker::destroy`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::BrokerError;
use crate::types::ModuleId;

/// Shared handle to a broker.
pub type BrokerHandle = Arc<dyn Broker>;

/// What the broker knows about an attached module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BrokerModule {
    pub id: ModuleId,
    pub name: String,
}

pub trait Broker: Send + Sync {
    fn add_module(&self, module: &BrokerModule) -> Result<(), BrokerError>;

    fn remove_module(&self, module: &BrokerModule) -> Result<(), BrokerError>;

    fn inc_ref(&self);

    /// Drop one reference. Reaching zero releases the broker.
    fn dec_ref(&self);

    /// Drop the creation reference.
    fn destroy(&self) {
        self.dec_ref();
    }
}

pub trait BrokerFactory: Send + Sync {
    /// Create a broker holding one (creation) reference.
    fn create(&self) -> Result<BrokerHandle, BrokerError>;
}
