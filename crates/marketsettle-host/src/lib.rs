//! # marketsettle-host
//!
//! The boundary between the settlement core and its execution host.
//!
//! - [`Host`]: clock, sequence counter, key-value storage, asset transfers,
//!   caller authentication, event sink, and invocation commit/rollback.
//! - [`MemoryHost`]: an in-memory host with all-or-nothing invocations,
//!   ed25519 caller authentication and a supply-conservation check.

pub mod auth;
pub mod host;
pub mod memory;
pub mod supply;

pub use auth::{AuthMode, Authenticator};
pub use host::Host;
pub use memory::MemoryHost;
pub use supply::SupplyLedger;
