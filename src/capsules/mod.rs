//! Capsule persistence and progress tracking
//!
//! This module provides:
//! - Capsule, index and progress models (with legacy-shape normalization)
//! - The capsule store: CRUD over an injected key-value backend
//! - Id and clock collaborators
//! - Import/export serialization

pub mod ids;
pub mod models;
pub mod store;
pub mod transfer;

pub use ids::{Clock, IdGenerator, SystemClock, TimeRandomIdGenerator};
pub use models::*;
pub use store::{CapsuleError, CapsuleStore, ExportedCapsule, StoreEvent};
pub use transfer::{deserialize_capsule, export_file_name, serialize_capsule, slugify, ValidationError};
