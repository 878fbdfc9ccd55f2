//! influence-playback - Timed, camera-aware playback of influence-propagation
//! simulations on a 3D force-directed graph.
//!
//! Simulation results (seed selection stages and cascade activations) are
//! produced elsewhere; this crate replays them as an animation synchronized
//! with an asynchronous layout engine.

pub mod camera;
pub mod catalog;
pub mod config;
pub mod error;
pub mod graph_state;
pub mod headless;
pub mod host;
pub mod layout;
pub mod live;
pub mod model;
pub mod palette;
pub mod replay;
pub mod sequencer;
pub mod session;
pub mod timing;
