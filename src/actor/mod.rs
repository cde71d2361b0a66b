//! Actor System for Watch Mode
//!
//! Message-passing concurrency for `brisk dev`:
//!
//! ```text
//! FsActor --> BuildActor --> WsActor
//! (watch)     (stages)      (broadcast)
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Message types for inter-actor communication
//! - `fs` - File system watcher with debouncing and watch rules
//! - `build` - Runs stages one batch at a time, coalescing new work
//! - `ws` - WebSocket broadcast
//! - `coordinator` - Wires up and runs actors

pub mod build;
pub mod coordinator;
pub mod fs;
pub mod messages;
pub mod ws;

pub use coordinator::Coordinator;
