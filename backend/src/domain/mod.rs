//! Business-rule layer: every operation validates its input, re-derives the
//! caller's capabilities from the store, performs a single logical write (or
//! a re-runnable bulk sweep), and publishes a change event on success.

pub mod access;
pub mod admin_service;
pub mod auth_service;
pub mod calendar;
pub mod change_feed;
pub mod commands;
pub mod entry_service;
pub mod errors;
pub mod profile_service;

pub use admin_service::AdminService;
pub use auth_service::{AuthService, AuthenticatedUser};
pub use calendar::CalendarService;
pub use change_feed::ChangeFeed;
pub use entry_service::EntryService;
pub use errors::{DomainError, DomainResult};
pub use profile_service::ProfileService;
