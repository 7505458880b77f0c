//! Wormo game server library.

pub mod collision;
pub mod config;
pub mod entity;
pub mod server;
pub mod spatial;
pub mod world;

pub use config::Config;
pub use server::{GameState, run, serve};
pub use world::{World, WorldError};
