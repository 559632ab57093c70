//! Domain layer containing business entities and contracts.
//!
//! This module defines entities, repository interfaces and the background job
//! model, independent of infrastructure concerns.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`jobs`] - Background job model and queue
//!
//! # Design Principles
//!
//! - Domain layer has no dependencies on infrastructure or presentation layers
//! - Repository traits define contracts implemented by infrastructure layer
//! - Business logic is encapsulated in services (see [`crate::application::services`])
//!
//! # Job Flow
//!
//! 1. A handler finishes its work (e.g. a successful login)
//! 2. A [`jobs::BackgroundJob`] is pushed to the [`jobs::JobQueue`] (non-blocking)
//! 3. [`crate::application::job_worker::run_job_worker`] executes it with retries

pub mod entities;
pub mod jobs;
pub mod repositories;
