mod common;
mod homing;
mod machine_file;
mod press_retry;
mod tip_reservation;
mod wash_interlocks;
