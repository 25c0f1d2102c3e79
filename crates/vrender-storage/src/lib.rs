//! Supabase Storage client.
//!
//! This crate provides:
//! - The [`ArtifactPublisher`] seam used by the render pipeline
//! - [`SupabaseStorage`], an upload client for Supabase's S3-compatible API
//! - Public URL construction for uploaded objects

pub mod client;
pub mod error;
pub mod publisher;

pub use client::{StorageConfig, SupabaseStorage};
pub use error::{StorageError, StorageResult};
pub use publisher::ArtifactPublisher;
