//! Control session: attach, scan, track, freeze, persist, automate
//!
//! [`Controller`] is what a front end talks to. It owns the configuration,
//! the tracked list, saved scripts and at most one attached [`Session`].

mod controller;
mod observer;
mod stats;

pub use controller::{Controller, ScanProgress, Session};
pub use observer::{LogObserver, SessionObserver};
pub use stats::SessionStats;
