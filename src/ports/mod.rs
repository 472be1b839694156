//! Port traits connecting the domain to its inputs and outputs.

pub mod config_port;
pub mod data_port;
pub mod report_port;
