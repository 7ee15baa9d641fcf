#![deny(missing_docs)]

//! # brokerlink models
//!
//! Plain data types shared by the brokerlink SDK and tooling.
//!
//! ## Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`auth`] | `AuthenticationScheme` |
//! | [`credentials`] | Discovered service `Credentials` and `Endpoints` |
//! | [`properties`] | `LocalProperties`, `ConnectionProperties`, `JndiProperties` |
//! | [`event`] | Session lifecycle events |
//! | [`error`] | `ModelError` |

pub mod auth;
pub mod credentials;
pub mod error;
pub mod event;
pub mod properties;

// Re-export all public types at crate root for convenience.
pub use auth::*;
pub use credentials::*;
pub use error::*;
pub use event::*;
pub use properties::*;
