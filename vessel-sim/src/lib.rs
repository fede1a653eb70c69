//! Discrete rigid-body harness for the fly-by-wire cascade.
//!
//! Applies the cascade's actuation to a single rigid body each tick, with
//! parts that can be detached or docked mid-run. Rotational dynamics only;
//! gyroscopic coupling and translation are not modelled.

pub mod parts;
pub mod rigid_body;
pub mod scenario;
pub mod shared_args;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("inertia tensor is singular")]
    SingularInertia,

    #[error("inertia must be finite and positive, got {0}")]
    InvalidInertia(f64),

    #[error("no part with id {0}")]
    UnknownPart(fbw::PartId),

    #[error("control config error: {0}")]
    Config(#[from] fbw::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SimResult<T> = Result<T, SimError>;
