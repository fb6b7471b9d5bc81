//! Interface layer: the REST API and the WebSocket change feed. A pure
//! translation layer; all business rules live in the domain services.

pub mod rest;
