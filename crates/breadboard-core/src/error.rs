//! Error types for breadboard-core.

use thiserror::Error;

use crate::element::ComponentId;
use crate::node::NodeId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("component {0} not found")]
    ComponentNotFound(ComponentId),

    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("invalid terminal {terminal} for component {component} ({count} terminals)")]
    InvalidTerminal {
        component: ComponentId,
        terminal: usize,
        count: usize,
    },

    #[error("terminal {terminal} of component {component} cannot connect to itself")]
    SelfConnection {
        component: ComponentId,
        terminal: usize,
    },

    #[error("terminal {terminal} of component {component} is not connected")]
    NotConnected {
        component: ComponentId,
        terminal: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
