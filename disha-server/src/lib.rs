//! DishaServer - radio map distribution over TCP
//!
//! Serves the artifacts produced by `disha-mapper` to positioning
//! clients and collects RSS logs they upload:
//!
//! ```text
//! ┌────────┐  GET radiomap   ┌──────────────┐   radiomap-mean.txt
//! │ client │────────────────►│ disha-server │◄── radiomap-parameters.txt
//! │        │◄────────────────│              │
//! │        │  UPLOAD rsslog  │              │
//! │        │────────────────►│              │──► rsslogs/rsslog<N>.txt
//! └────────┘                 └──────────────┘
//! ```
//!
//! The protocol is line oriented and stateful; see [`protocol`] for the
//! exact exchange. Each connection runs on its own thread and is
//! tracked in a shared [`registry::ConnectionRegistry`].

pub mod config;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;

pub use config::{AppConfig, ServerConfig};
pub use error::{Error, Result};
pub use protocol::{ProtocolSession, SessionState};
pub use registry::{ConnectionRegistry, ConnectionStatus};
pub use server::{ConnectionServer, ShutdownHandle};
