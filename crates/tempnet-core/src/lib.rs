//! Sampler, network state, evolution step, and run driver for the tempnet
//! temporal network generator.
//!
//! This crate owns the activity-driven growth model: each step activates
//! nodes by their propensity, lets active nodes explore new ties or
//! reinforce existing ones, optionally grows the network by one node, and
//! renews the propensities of the nodes that fired.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `tempnet-config.yaml` and
//!   validation into [`ModelParams`].
//! - [`sampler`] -- Power-law propensity draws and preferential selection.
//! - [`network`] -- The aggregate network: ties, degrees, propensities.
//! - [`evolution`] -- The 7-phase evolution step.
//! - [`runner`] -- The run driver, [`ActivitySink`] trait, and stop control.
//!
//! [`ModelParams`]: config::ModelParams
//! [`ActivitySink`]: runner::ActivitySink

pub mod config;
pub mod evolution;
pub mod network;
pub mod runner;
pub mod sampler;
