//! Infrastructure layer: concrete implementations of the domain
//! traits (repositories, pusher, generator).

pub mod ai;
pub mod message_pusher;
pub mod repository;
