//! Shared machine description for the integration tests.

use lhk_common::config::ConfigLoader;
use lhk_motion::config::MachineConfig;
use lhk_motion::Machine;

/// Two arms, one Y/R stage (id 1) and one wash station (id 2).
pub const MACHINE_TOML: &str = r#"
[shared]
service_name = "integration"

[homing]
timeout_s = 5
x_concurrency = 2

[io]
output_count = 8

[[axes]]
id = 1
name = "x1"
settings = { velocity = 800.0, acceleration = 4000.0, min_limit = 0.0, max_limit = 600.0 }

[[axes]]
id = 2
name = "z1"
settings = { velocity = 100.0, acceleration = 1000.0, min_limit = -10.0, max_limit = 120.0 }

[[axes]]
id = 3
name = "w1"
settings = { velocity = 50.0, acceleration = 500.0, min_limit = -5.0, max_limit = 80.0, ul_per_mm = 4.0 }

[[axes]]
id = 4
name = "x2"
settings = { velocity = 800.0, acceleration = 4000.0, min_limit = 0.0, max_limit = 600.0 }

[[axes]]
id = 5
name = "z2"
settings = { velocity = 100.0, acceleration = 1000.0, min_limit = -10.0, max_limit = 120.0 }

[[axes]]
id = 6
name = "w2"
settings = { velocity = 50.0, acceleration = 500.0, min_limit = -5.0, max_limit = 80.0, ul_per_mm = 4.0 }

[[axes]]
id = 21
name = "y1"
settings = { velocity = 300.0, acceleration = 2000.0, min_limit = 0.0, max_limit = 400.0 }

[[axes]]
id = 22
name = "y2"
settings = { velocity = 300.0, acceleration = 2000.0, min_limit = 0.0, max_limit = 400.0 }
initial_position = 200.0

[[axes]]
id = 23
name = "r1"
settings = { velocity = 100.0, acceleration = 1000.0, min_limit = -90.0, max_limit = 90.0 }

[[axes]]
id = 26
name = "a2"
settings = { velocity = 50.0, acceleration = 400.0, min_limit = 0.0, max_limit = 40.0 }
initial_position = 30.0

[[axes]]
id = 27
name = "b2"
settings = { velocity = 50.0, acceleration = 400.0, min_limit = 0.0, max_limit = 40.0 }

[[topology.arms]]
x = 1
z = 2
w = 3

[[topology.arms]]
x = 4
z = 5
w = 6
w_shuck_offset_mm = 0.5

[[topology.stages]]
kind = "stage"
y = 21
r = 23

[[topology.stages]]
kind = "wash_station"
y = 22
a = 26
b = 27
fluidics = { bath_water = 0, plenum_water = 1, overflow_exhaust = 2, vacuum = 3, air = 4 }

[[teachpoints.stage]]
arm = 1
stage = 1
upper_left = { x = 100.0, y = 40.0, z = 55.0 }
lower_right = { x = 160.0, y = 120.0, z = 55.0 }

[[teachpoints.stage]]
arm = 2
stage = 1
upper_left = { x = 100.0, y = 13.0, z = 55.0 }
lower_right = { x = 160.0, y = 93.0, z = 55.0 }

[[teachpoints.stage]]
arm = 1
stage = 2
upper_left = { x = 300.0, y = 60.0, z = 40.0 }
lower_right = { x = 340.0, y = 200.0, z = 40.0 }

[[teachpoints.robot]]
stage = 1
y = 210.0
r = 12.0

[[teachpoints.robot]]
stage = 2
y = 120.0

[[teachpoints.washer]]
stage = 2
plenum = { retracted = 30.0, wash = 10.0, dry = 18.0 }
bath = { retracted = 0.0, wash = 22.0, dry = 12.0 }
"#;

/// Parsed and validated [`MACHINE_TOML`].
pub fn machine_config() -> MachineConfig {
    let config = MachineConfig::from_toml(MACHINE_TOML).unwrap();
    config.validate().unwrap();
    config
}

/// Machine built from [`MACHINE_TOML`].
pub fn machine() -> Machine {
    Machine::from_config(&machine_config()).unwrap()
}
