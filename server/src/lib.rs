//! # Room Server Library
//!
//! Authoritative server for a shared world in which every connected client
//! owns one entity and may ask to move it. The server holds the only
//! writable copy of entity state; clients mirror it from a stream of
//! add/change/remove events.
//!
//! ## Module Organization
//!
//! ### Room Module (`room`)
//! Canonical mapping from identity to entity state. Positions are clamped
//! into the world bounds on every write, and each committed mutation is
//! recorded in a change feed.
//!
//! ### Publisher Module (`publisher`)
//! Per-recipient FIFO outboxes and audience selection (everyone, everyone
//! but one, a single recipient).
//!
//! ### Session Module (`session`)
//! The room controller. Handles join, move intent and leave for one room,
//! drains the room's change feed after every operation and decides who
//! hears about it. A joining client receives its own entity first, then a
//! snapshot of everyone already present, before any live update.
//!
//! ### Network Module (`network`)
//! TCP transport: accepts connections, allocates identities, runs one
//! reader and one writer task per connection and one task per room.
//!
//! ## Concurrency
//!
//! Each room is a single task that handles its messages one at a time, so
//! every mutation plus the snapshot it may trigger forms one uninterrupted
//! critical section with no I/O inside it. Rooms never share state and run
//! in parallel. Outbound delivery happens on the writer tasks.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let server = Server::bind(ServerConfig::default()).await?;
//!     server.run().await
//! }
//! ```

pub mod config;
pub mod network;
pub mod publisher;
pub mod room;
pub mod session;
