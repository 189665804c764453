//! Portal core: the bidirectional, stateful translator between a room-side
//! chat service and a remote messaging network (spec §1, §2). This crate is
//! the core only — concrete Matrix/network clients, the login cache, the
//! ghost provider, and the disappearing-message sweeper are collaborators
//! implemented outside it and wired together through [`bridge::Bridge::new`].

pub mod apis;
pub mod bridge;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod ids;
pub mod intent;
pub mod login_resolver;
pub mod metadata_sync;
pub mod model;
pub mod network_handler;
pub mod portal;
pub mod queue;
pub mod registry;
pub mod remote_event;
pub mod room_event;
pub mod room_handler;
pub mod storage;
pub mod typing;

pub use bridge::Bridge;
