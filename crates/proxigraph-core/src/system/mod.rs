//! # System Module
//!
//! Metrics sampling for the running engine.
//!
//! A [`MetricsRecorder`] turns the current graph statistics into timestamped
//! [`MetricsSnapshot`]s, keeps a bounded in-memory history of them and, when
//! configured, forwards each one to an external [`MetricsSink`].

mod recorder;

pub use recorder::*;
