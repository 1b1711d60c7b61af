// =============================================================================
// Proto-Object Tracker Module
// =============================================================================
//
// Frame pipeline for the cellular field toy:
// - Toroidal grid simulator (kernel diffusion + bounded noise)
// - Field metrics: per-cell trap strength, change, persistence, coherence
// - Reaction-point detection and density clustering
// - Centroid-matched proto-objects with birth/survive/death lifecycle
//
// The whole pipeline is strictly frame-sequential: each frame's matching
// depends on the prior frame's registry, so nothing here is ever parallelized.

pub mod cluster;
pub mod field;
pub mod grid;
pub mod objects;
pub mod sim;

pub use cluster::Cluster;
pub use objects::{FrameEvent, LifecycleEvent, ProtoObject, ProtoTracker};
pub use sim::{FrameSummary, TrackerSim};
