//! fleetkey Library
//!
//! Declarative SSH access generation: one YAML inventory of people, groups,
//! and servers in; an SSH client config, per-server `authorized_keys` files,
//! and a CI summary line out.
//!
//! # Pipeline
//!
//! - **Access resolution** ([`access`]): group expansion with literal
//!   fallback, per-server authorization
//! - **Key normalization** ([`keys`]): literal vs path references, scalar or
//!   list, resolved to trimmed key material
//! - **Rendering** ([`render`]): pure text generation for both artifacts
//! - **Output** ([`output`]): render-everything-first, then atomic
//!   temp-file-and-rename writes
//! - **Summary** ([`summary`]): `servers=<json>` records for the deployment
//!   matrix
//!
//! The whole run is a deterministic function of one immutable configuration
//! snapshot; there is no runtime service and no incremental mode.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod access;
pub mod cli;
pub mod config;
pub mod error;
pub mod keys;
pub mod output;
pub mod render;
pub mod summary;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
