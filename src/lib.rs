//! # rectmon_lib
//!
//! Decoder for the fixed 256-byte telemetry frame emitted by a power
//! rectifier / charging device, plus the pieces around it: CRC-16
//! integrity checking, projection of a decoded frame into a compact
//! display summary, and the bounded channel that carries summaries from
//! a producer loop to a consumer loop.
//!
//! Transport is out of scope: callers hand [`protocol::TelemetryFrame::decode`]
//! exactly 256 raw bytes per invocation, however they obtained them.
//!
//! ## Features
//!
//! - `serde`: enables serialization of the protocol and summary types.
//! - `default`: enables `bin-dependencies`, which pulls in everything the
//!   `rectmon` command-line tool needs.

/// Contains error types for the library.
mod error;
/// Wire format of the telemetry frame: checksum, validation, field layout.
pub mod protocol;
/// Reduction of decoded frames to display summaries.
pub mod telemetry;
/// Producer/consumer conduit for summaries.
pub mod channel;

pub use error::Error;
