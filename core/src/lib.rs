pub mod config;
pub mod cost_curve;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod event;
pub mod optimizer;
pub mod product;
pub mod rng;
pub mod simulator;
pub mod stats;
pub mod types;
pub mod variates;
