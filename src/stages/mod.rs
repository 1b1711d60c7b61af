// =============================================================================
// Desk Stages
// =============================================================================
//
// The desk pipeline: intake -> triage -> room allocation -> coupling
// detection. Every stage is a pure function over snapshots of the session
// store and returns deltas; the caller applies them through the store's
// append operations.

pub mod classify;
pub mod coupling;
pub mod intake;
pub mod rooms;
