//! City Traffic Simulation Library
//!
//! A discrete-step traffic simulation on a fixed city grid: cars spawn at
//! entry cells, route to destinations, wait at traffic lights and change
//! lanes when the road ahead fills up.

pub mod simulation;
