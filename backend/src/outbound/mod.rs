//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! This module follows the hexagonal architecture pattern, providing concrete
//! implementations of domain port traits for various infrastructure concerns:
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel ORM
//! - **memory**: in-process repositories for local runs and tests
//! - **cache**: Redis-backed and in-process cache stores
//! - **media**: filesystem-backed poster and video storage
//! - **password_hasher**: salted SHA-256 credential hashing
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod cache;
pub mod media;
pub mod memory;
pub mod password_hasher;
pub mod persistence;
