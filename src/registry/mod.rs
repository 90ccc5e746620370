//! Socket registry for live viewer fan-out
//!
//! The registry maps bin names to the viewers currently watching them and is
//! the only place where "one broker subscription per bin" meets "N viewers
//! per bin".
//!
//! # Architecture
//!
//! ```text
//!                          Arc<SocketRegistry>
//!                     ┌─────────────────────────┐
//!                     │ bins: HashMap<String,   │
//!                     │   BinEntry {            │
//!                     │     viewers: {id →      │
//!                     │       queue, writer },  │
//!                     │   }                     │
//!                     │ >                       │
//!                     └───────────┬─────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!   [Distributor]            [Writer task]           [Writer task]
//!   broker.receive()         queue.recv()            queue.recv()
//!         │                       │                       │
//!         └──► registry.broadcast()──► conn.write() ──► viewer
//! ```
//!
//! # Subscription counting
//!
//! The broker subscription for a bin is taken when its first viewer
//! registers and released when its last viewer leaves. Viewers coming and
//! going in between never touch the broker, except to retry a subscription
//! the broker refused earlier.
//!
//! Each bin has its own gate serializing these transitions. The broker call
//! runs under that gate only, never under the map lock, so broadcasting to
//! other bins carries on while one bin waits on the broker.
//!
//! # Slow viewers
//!
//! Broadcasting only enqueues onto each viewer's bounded queue. A viewer
//! whose queue is full, or whose write fails or times out, is closed and
//! unregistered without affecting anyone else.

pub mod config;
pub mod connection;
pub mod entry;
pub mod store;

pub use config::RegistryConfig;
pub use connection::{ChannelConnection, ConnectionError, ConnectionId, ViewerConnection};
pub use entry::{BinEntry, BinStats};
pub use store::SocketRegistry;
