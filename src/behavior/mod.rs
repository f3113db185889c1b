//! Behaviours that act on entities between the partition rebuild and the
//! physics step.

pub mod repulse;
