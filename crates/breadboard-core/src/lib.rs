//! Core circuit representation for Breadboard.
//!
//! This crate provides the circuit graph that the solver works on:
//! - Nodes (equipotential points) and the components bound to them
//! - The [`Electrical`] capability trait every circuit element implements
//! - Connectivity operations including node merging
//! - Typed simulation events and the [`EventBus`] that carries them

pub mod circuit;
pub mod element;
pub mod error;
pub mod events;
pub mod node;

pub use circuit::{Circuit, ConnectionIssue, GROUND_ALIASES, Ownership};
pub use element::{ComponentId, Electrical, MIN_RESISTANCE, SourceBehavior, StateUpdate};
pub use error::{Error, Result};
pub use events::{Event, EventBus, SUBSCRIBER_CAPACITY, Subscription};
pub use node::{Connection, Node, NodeId};
