//! crystal-entropy - A crystal that shatters into chaos and reassembles.
//!
//! Particles sit on a body-centred cubic lattice until a click blends their
//! physics toward noise-driven chaos. The result is rendered as a glowing
//! volume (GPU) or as additive sprites with bloom (CPU fallback), and the
//! Shannon entropy of particle speeds is measured every frame.

pub mod camera;
pub mod config;
pub mod density;
pub mod driver;
pub mod easing;
pub mod entropy;
pub mod error;
pub mod glow;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod histogram;
pub mod integrator;
pub mod lattice;
pub mod math;
pub mod palette;
pub mod particle;
pub mod renderer;
pub mod rng;
pub mod state_machine;
pub mod volume;
