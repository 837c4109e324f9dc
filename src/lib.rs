//! Request forwarding and pagination helpers for the Microsoft To Do
//! endpoints of the Microsoft Graph API.
//!
//! [`GraphClient`] builds and forwards single authenticated requests through
//! an injected [`OAuth2Transport`] and offers two ways of draining a paged
//! collection: following the server's `@odata.nextLink` cursor, or advancing
//! a `$skip` offset until an empty page comes back.

pub mod auth;
pub mod client;
pub mod error;
pub mod http;
pub mod request;
pub mod todo;
pub mod transport;

pub use client::GraphClient;
pub use error::GraphError;
pub use request::{GraphRequest, Query, RequestOverrides};
pub use transport::OAuth2Transport;
