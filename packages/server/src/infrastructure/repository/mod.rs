pub mod inmemory;
pub mod redis;
