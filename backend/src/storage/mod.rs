//! Persistence layer: a SQLite-backed document store accessed through
//! `DbConnection`. One row per document; writes are single statements so
//! each mutation is atomic per document.

pub mod db;

pub use db::{DbConnection, StoredUser};
