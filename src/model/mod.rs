//! Net model primitives: places, transitions, arcs, and the net that owns them.

mod arc;
mod net;
mod place;
mod transition;

pub use arc::{Arc, ArcDirection, ArcKind, Geometry};
pub use net::{ArcIdx, LoadWarning, Net, PlaceIdx, TransIdx};
pub use place::Place;
pub use transition::{
    ContinuousParams, FiringPolicy, StochasticParams, TimedParams, Transition, TransitionKind,
    TransitionParams,
};
