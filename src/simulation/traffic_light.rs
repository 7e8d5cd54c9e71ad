//! Traffic light timing for the traffic simulation
//!
//! A light flips between pass and stop whenever the simulation-wide step
//! counter is a multiple of its period.

use anyhow::{bail, Result};

use super::types::{Position, TrafficLightId};

/// A traffic light occupying one grid cell
#[derive(Debug, Clone)]
pub struct SimTrafficLight {
    pub id: TrafficLightId,
    pub position: Position,
    /// `true` lets cars enter the cell, `false` stops them
    pub state: bool,
    /// Number of steps between two toggles
    period: u32,
}

impl SimTrafficLight {
    pub fn new(id: TrafficLightId, position: Position, state: bool, period: u32) -> Result<Self> {
        if period == 0 {
            bail!("Traffic light at {} has a zero period", position);
        }
        Ok(Self {
            id,
            position,
            state,
            period,
        })
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn is_pass(&self) -> bool {
        self.state
    }

    /// Advance the light for the given global step.
    /// Returns true if the light toggled.
    pub fn update(&mut self, step: u64) -> bool {
        if step % u64::from(self.period) == 0 {
            self.state = !self.state;
            true
        } else {
            false
        }
    }
}
