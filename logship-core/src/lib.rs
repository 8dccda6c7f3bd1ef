//! Logship Core - Record Model, Encoding and Flush Control
//!
//! This crate provides the foundational types and traits for Logship, a log
//! shipper that turns batches of semi-structured records into newline-delimited
//! JSON objects in object storage.
//!
//! # Key Components
//!
//! - **Records**: [`record`] defines the tagged [`Value`](record::Value) model and event timestamps
//! - **Encoding**: [`encoder`] converts one record into one JSON line
//! - **Sources**: [`source`] is the seam to the host that decodes incoming batches
//! - **Outputs**: [`output`] defines the [`Output`](output::Output) trait and its error taxonomy
//! - **Flush**: [`flush`] drains a source, encodes, delegates to an output and classifies the result
//!
//! # Example
//!
//! ```rust
//! use logship_core::encoder::encode_record;
//! use logship_core::record::{Record, Value};
//!
//! let record = Record::new()
//!     .with_field("message", Value::Bytes(b"user logged in".to_vec()))
//!     .with_field("level", "info");
//!
//! let line = encode_record(&record).unwrap();
//! assert_eq!(line, r#"{"message":"user logged in","level":"info"}"#);
//! ```

pub mod encoder;
pub mod flush;
pub mod metrics;
pub mod output;
pub mod record;
pub mod source;
