//! Simulated instrument assembled from a [`MachineConfig`].

use crate::config::MachineConfig;
use crate::error::MotionResult;
use crate::topology::Topology;
use lhk_hal::{AxisBank, SimOutputPort};
use std::sync::Arc;
use tracing::info;

/// Axis bank, fluidics port and topology of one instrument.
#[derive(Debug)]
pub struct Machine {
    bank: AxisBank,
    outputs: Arc<SimOutputPort>,
    topology: Topology,
}

impl Machine {
    /// Build the axes, the output port and the topology, then inject the
    /// teachpoint table into every stage.
    pub fn from_config(config: &MachineConfig) -> MotionResult<Self> {
        let bank = AxisBank::from_configs(&config.axes)?;
        let outputs = Arc::new(SimOutputPort::new(config.io.output_count));
        let topology = Topology::build(
            &config.topology,
            &bank.axes(),
            outputs.clone(),
            config.homing.x_concurrency,
        )?;
        topology.set_teachpoints(Arc::new(config.teachpoints.clone()));
        info!("Machine '{}' assembled", config.shared.service_name);
        Ok(Self {
            bank,
            outputs,
            topology,
        })
    }

    /// Simulated axes.
    pub fn bank(&self) -> &AxisBank {
        &self.bank
    }

    /// Fluidics output port.
    pub fn outputs(&self) -> &Arc<SimOutputPort> {
        &self.outputs
    }

    /// Arms and stages.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }
}
