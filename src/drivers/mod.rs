//! Device drivers
//!
//! All drivers follow these principles:
//! - Register access goes through a [`Bus`](crate::hw::Bus), never raw pointers
//! - Input validation on all public interfaces
//! - No panics on invalid input (return errors)

pub mod sci;
