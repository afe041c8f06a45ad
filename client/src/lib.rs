//! # Room Client Library
//!
//! Client side of the shared-world protocol. The client never owns any
//! entity state: it mirrors what the server publishes and smooths it for
//! display.
//!
//! ## Module Organization
//!
//! ### Shadow Module (`shadow`)
//! Local mirror of every entity the server has announced, built only from
//! `EntityAdded` / `EntityChanged` / `EntityRemoved` events. Each entity
//! has a rendered `current` position and an authoritative `target`.
//!
//! ### Interpolation Module (`interpolation`)
//! Runs once per frame and moves every `current` a fixed fraction of the
//! way to its `target`. Frame cadence and message arrival are independent.
//!
//! ### Network Module (`network`)
//! One TCP session: joins a room, applies inbound events to the shadow
//! state and forwards queued move intents. The local entity may be
//! retargeted optimistically; the server's echo always wins.
//!
//! ### Input and Rendering Modules (`input`, `rendering`)
//! Top-down presentation with `macroquad` and pointer picking on the
//! ground plane. Neither takes part in synchronisation.
//!
//! ## Threading
//!
//! The network session runs on a tokio runtime, the frame loop on the
//! window thread. They share nothing except `SharedShadow`, and every event
//! application or interpolation tick happens under a single lock, so
//! neither side ever sees a half-updated entity.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::interpolation::Interpolator;
//! use client::network::{run_session, Client};
//! use client::shadow::{self, ShadowState};
//! use shared::{Position, WorldBounds};
//!
//! # async fn example() -> Result<(), client::network::ClientError> {
//! let shadow = ShadowState::shared();
//! let (client, outbox) = Client::new(shadow.clone(), WorldBounds::default());
//! let session = tokio::spawn(run_session(
//!     "127.0.0.1:3001".to_string(),
//!     "my_room".to_string(),
//!     shadow.clone(),
//!     outbox,
//! ));
//!
//! client.request_move(Position::new(100.0, -1.0, 50.0));
//! Interpolator::default().tick(&mut shadow::lock(&shadow));
//! # session.await.ok();
//! # Ok(())
//! # }
//! ```

pub mod input;
pub mod interpolation;
pub mod network;
pub mod rendering;
pub mod shadow;
