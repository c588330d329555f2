//! # Local Roster Store
//!
//! Durable enrollment and role-assignment state for the rollcall sync
//! engine, plus the administrator-created bindings between external
//! directory groups and local courses.
//!
//! The sync core consumes the [`RosterStore`] trait; [`PgRosterStore`] is
//! the Postgres implementation. Every action list is applied inside one
//! scoped transaction per binding, so a storage failure rolls the whole
//! binding back and the roster is never left with an enrollment missing
//! its expected role state.
//!
//! ## Crate Organization
//!
//! - [`types`] — `GroupBinding`, `Enrollment`, `RemovalPolicy`, `Action`
//! - [`store`] — the `RosterStore` trait and applied-action accounting
//! - [`pg`] — the `sqlx`/Postgres implementation
//! - [`error`] — error types

pub mod error;
pub mod pg;
pub mod store;
pub mod types;

pub use error::{RosterError, RosterResult};
pub use pg::PgRosterStore;
pub use store::{AppliedActions, RosterStore};
pub use types::{Action, Enrollment, EnrollmentStatus, GroupBinding, RemovalPolicy};
