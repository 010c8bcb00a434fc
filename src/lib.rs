//! pubmesh: routing and dispatch core of a topic pub/sub overlay.
//!
//! Peers advertise topic-prefix filters; messages published at any peer are
//! delivered to exactly the set of peers whose filter matches the message's
//! topic, along shortest known paths through a mesh of long-lived
//! connections. This crate implements the per-peer routing engine: filter
//! flooding with loop prevention, distance-vector path selection with a
//! deterministic tie-break, source-routed multipaths, and the streaming
//! dispatch of inbound batches to local workers, local stores, and onward
//! peer paths.
//!
//! Connection establishment, framing, and reconnect timers belong to the
//! embedding transport; it drives a [`Node`] through its [`Event`] queue and
//! receives outbound traffic through per-neighbor [`PeerHandle`]s.

pub mod config;
pub mod dispatch;
pub mod filter;
pub mod identity;
pub mod message;
pub mod multipath;
pub mod node;
pub mod record;
pub mod routing;
pub mod topic;
pub mod transport;

// Re-export identity types
pub use identity::PeerId;

// Re-export config types
pub use config::{Config, ConfigError, NodeConfig};

// Re-export topic and filter types
pub use filter::Filter;
pub use topic::{Topic, CLONE_SUFFIX, INTERNAL_PREFIX, MASTER_SUFFIX};

// Re-export message types
pub use message::{
    CommandMessage, DataMessage, InternalCommand, MessageContent, NodeMessage, WireError,
};

// Re-export multipath types
pub use multipath::Multipath;

// Re-export routing types
pub use routing::{RouteEntry, RoutingTable};

// Re-export transport seam types
pub use transport::{
    peer_channel, PeerEvent, PeerHandle, ReconnectDescriptor, StatusEvent, TransportError,
};

// Re-export dispatch types
pub use dispatch::{DistributionTree, LocalPaths, PeerPaths};

// Re-export recorder types
pub use record::{RecordError, Recorder};

// Re-export node types
pub use node::{Event, MixedItem, Node, NodeError};
