//! Render pipelines ("effects") and the fixed sampler set.
//!
//! - `basic` is the unlit vertex-colour effect plus the shared pipeline builder
//! - `normal_map` is the lit, normal-mapped textured effect
//! - `sprite` draws screen-space textured quads
//! - `states` holds the common samplers

pub mod basic;
pub mod normal_map;
pub mod sprite;
pub mod states;
