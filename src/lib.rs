//! macross: moving-average crossover backtester for a single instrument.
//!
//! Hexagonal layout: the simulation and statistics live in [`domain`], port
//! traits in [`ports`], file-backed implementations in [`adapters`], and the
//! command line front end in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
