//! `ledgerd`: a concurrent, in-process time-series server for sales
//! events. A framed TCP protocol carries requests from many clients to a
//! fixed-size worker pool, which drives a coarse-locked storage engine and
//! a broadcast notification coordinator.

pub mod bootstrap;
pub mod client;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod net;
pub mod notify;
pub mod protocol;
pub mod sale;
pub mod server;
pub mod storage;

pub use client::Client;
pub use error::{Error, Result};
pub use sale::Sale;
