//! Note sharing with per-note access policies.
//!
//! Notes are private, public, or restricted to groups. Sharing a private
//! note into a group escalates it to a group policy; editing a shared note
//! back to private never hides it from those groups. The policy logic lives
//! in [`policy`], [`transition`] and [`admission`], on top of any
//! [`store::DocumentStore`].

pub mod admission;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod membership;
pub mod models;
pub mod policy;
pub mod services;
pub mod store;
pub mod transition;

pub use error::{Error, Result};
