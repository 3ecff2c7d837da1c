//! Switch platform support: fan/thermal policy and chassis accessors.
//!
//! [`thermal`] turns temperature, fan and PSU snapshots into fan duty.
//! [`chassis`] owns the transceiver ports and watches them for insertion
//! and removal, and exposes identity, reboot cause and firmware components.

pub mod chassis;
pub mod config;
pub mod error;
pub mod led;
pub mod sysfs;
pub mod thermal;
pub mod tracing;
