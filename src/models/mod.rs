//! Domain models for notedeck.
//!
//! # Core Concepts
//!
//! - [`Note`]: a user-authored document under a [`Subject`], carrying an
//!   [`AccessPolicy`](crate::policy::AccessPolicy), ratings, comments and a
//!   view counter.
//! - [`Group`]: a fixed set of members plus an append-only log of
//!   [`SharedNote`] entries.
//! - [`Category`]: a catalog entry that note tags are chosen from.
//! - [`UserProfile`]: profile data and [`Favorite`]s for an auth-provider user.
//!
//! Every model carries its document id in `id`; the id is not part of the
//! stored body.

mod category;
mod group;
mod note;
mod subject;
mod user;

pub use category::*;
pub use group::*;
pub use note::*;
pub use subject::*;
pub use user::*;
