//! Request-interception worker for offcache.
//!
//! This crate provides:
//! - Strategy selection and the cache-first, network-first and
//!   stale-while-revalidate handlers
//! - The install / activate lifecycle and the registration that tracks
//!   which worker version is serving
//! - Offline fallback responses
//! - The periodic janitor for the dynamic generation
//! - An explicit event dispatcher for install, activate, fetch, message,
//!   sync, push and notification-click events

pub mod clients;
pub mod events;
pub mod fallback;
pub mod handlers;
pub mod janitor;
pub mod lifecycle;
pub mod messages;
pub mod strategy;
pub mod worker;

#[cfg(test)]
pub(crate) mod testutil;

pub use clients::{ClientId, Clients, OutboundMessage};
pub use events::{Event, FetchReport, Outcome};
pub use handlers::{HandlerContext, Served, Source};
pub use janitor::{Janitor, SweepReport};
pub use lifecycle::{ActivateReport, LifecycleState, RegisterReport, Registration};
pub use messages::{ControlMessage, NotificationAction, NotificationSpec, PushPayload};
pub use strategy::{RouteRules, Strategy};
pub use worker::{Worker, WorkerSettings, build_request};
