#![allow(dead_code)]

//! # knx-tunnel
//!
//! A KNXnet/IP Tunnelling client: frame codec, gateway discovery, and a
//! session that manages a tunnel connection's lifecycle (connect, heartbeat,
//! group read/write/toggle, listener dispatch) over a UDP socket.
//!
//! ## Features
//!
//! - KNXnet/IP Tunnelling connect/disconnect/heartbeat state machine
//! - cEMI `L_Data` frame codec with the short-APDU packing optimization
//! - Common Datapoint Types (DPT 1, 3, 5, 7, 9, 10, 11, 13, 19)
//! - Individual and Group addressing, including the `ga!` macro
//! - Gateway discovery via `SEARCH_REQUEST` multicast
//! - Per-address value cache and listener registry
//!
//! ## Example
//!
//! ```rust,no_run
//! use knx_tunnel::{GatewayConfig, GroupAddress, TunnelSession};
//! use std::net::Ipv4Addr;
//!
//! let config = GatewayConfig::new(Ipv4Addr::new(192, 168, 1, 10));
//! let session = TunnelSession::new(config);
//! session.connect()?;
//!
//! let addr = GroupAddress::new(1, 2, 3)?;
//! session.group_write(addr, &[0x01])?;
//! # Ok::<(), knx_tunnel::error::KnxError>(())
//! ```

pub mod addressing;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod dpt;
pub mod error;
pub mod listener;
pub mod protocol;
pub mod session;

#[macro_use]
pub mod macros;

pub use addressing::{GroupAddress, IndividualAddress};
pub use cache::ValueCache;
pub use config::GatewayConfig;
pub use discovery::{discover_gateway, GatewayInfo};
pub use dpt::{Dpt1, Dpt3, Dpt5, Dpt7, Dpt9, Dpt10, Dpt11, Dpt13, Dpt19, DptDecode, DptEncode};
pub use error::{KnxError, Result};
pub use listener::{ListenerFn, ListenerId, ListenerRegistry};
pub use session::{NotifyFn, TunnelSession};
