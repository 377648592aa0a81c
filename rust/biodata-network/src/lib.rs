//! Outbound request pipeline for the console.
//!
//! Every call to the backend goes through an [`ApiClient`], which runs an
//! ordered [`Pipeline`] of [`Interceptor`]s around a [`Transport`]:
//!
//! ```text
//! OutboundRequest ─▸ RequestLog ─▸ IdentityInjector ─▸ AuthFailureHandler ─┐
//!                                                                          ▼
//!                                                                    Transport (await)
//!                                                                          │
//! Result<InboundResponse, ApiError> ◂─ RequestLog ◂─ IdentityInjector ◂─ AuthFailureHandler
//! ```
//!
//! Request transforms run synchronously before the transport is awaited, so
//! the identity injected into a request is the session as of dispatch.
//! Response hooks observe the outcome and may update the session (an
//! unauthenticated-class failure clears it), but the outcome itself is
//! always handed back to the caller unchanged.
//!
//! [`DatabaseApi`] and [`PermissionApi`] wrap the client with typed
//! endpoint helpers.

mod error;
pub use error::*;

mod settings;
pub use settings::*;

mod request;
pub use request::*;

mod interceptor;
pub use interceptor::*;

mod transport;
pub use transport::*;

mod client;
pub use client::*;

mod api;
pub use api::*;

#[cfg(any(test, feature = "helpers"))]
mod helpers;
#[cfg(any(test, feature = "helpers"))]
pub use helpers::*;
