//! Core data models for the content adapter.
//!
//! Configuration comes in as [`options::AdapterOptions`], is resolved once into
//! a [`policy::PathPolicy`], and every operation works on a short-lived
//! [`file_ref::FileRef`] borrowing that policy.

pub mod file_ref;
pub mod options;
pub mod policy;
