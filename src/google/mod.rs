//! Google API integration
//!
//! Credential lifecycle, the service client factory, and one module per
//! external service surface.

pub mod auth;
pub mod calendar;
pub mod drive;
pub mod mail;
pub mod search;
pub mod services;
