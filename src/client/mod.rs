//! PostgREST API client and authentication.
//!
//! This module provides the [`PostgrestClient`] used as the production
//! [`Store`](crate::store::Store), along with authentication types
//! ([`Auth`], [`AuthType`]).

mod auth;
mod postgrest;

pub use auth::{Auth, AuthType};
pub use postgrest::PostgrestClient;
