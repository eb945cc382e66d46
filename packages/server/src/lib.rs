//! Chanoma chat coordinator library.
//!
//! Real-time chat session and message-delivery coordination: presence
//! arbitration across duplicate logins, room membership tracking,
//! paginated history loading under retry/timeout discipline, room
//! broadcast fan-out, and streaming AI reply orchestration.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// configuration
pub mod config;
