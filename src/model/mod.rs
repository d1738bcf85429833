//! The CNN + DistMult model.
//!
//! [`ModelConfig`] describes the architecture as pure data; [`CnnDistMult`]
//! binds it to a device, owning its parameters in a [`ParamStore`].

pub mod config;
pub mod encoder;
pub mod params;

pub use config::ModelConfig;
pub use encoder::{CnnDistMult, TripleScores};
pub use params::ParamStore;
