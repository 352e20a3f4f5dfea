//! An async implementation of the [Modbus](http://modbus.org/) TCP client protocol
//! using [Tokio](https://docs.rs/tokio) and Rust's `async/await` syntax.
//!
//! # Features
//!
//! * Panic-free parsing
//! * Every request is checked against the per-function address and quantity limits
//!   before anything is written to the stream
//! * Responses are validated against the transaction id, protocol id and function code
//!   of the request that produced them
//! * Configurable logging of the PDU, MBAP header and raw bytes via [`DecodeLevel`]
//!
//! # Supported Functions
//!
//! * Read Coils
//! * Read Discrete Inputs
//! * Read Holding Registers
//! * Read Input Registers
//! * Write Single Coil
//! * Write Single Register
//! * Write Multiple Coils
//! * Write Multiple Registers
//! * Mask Write Register
//!
//! # Example
//!
//! A client that polls some holding registers every second
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use mbtcp::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new("127.0.0.1:502".parse()?)
//!         .response_timeout(Duration::from_secs(1));
//!
//!     let (channel, mut events) = spawn_client_task(config, 16);
//!
//!     tokio::spawn(async move {
//!         while let Some(event) = events.recv().await {
//!             println!("{event}");
//!         }
//!     });
//!
//!     loop {
//!         if let Err(err) = channel.read_holding_registers(0, 10).await {
//!             println!("error: {err}");
//!         }
//!         tokio::time::sleep(Duration::from_secs(1)).await;
//!     }
//! }
//! ```

/// prelude that can be used to include all of the API types
pub mod prelude;

/// client API
pub mod client;
/// configuration of a client connection
pub mod config;
/// error types associated with making requests
pub mod error;

mod common;
mod constants;
mod decode;
mod exception;
mod types;

pub use crate::client::channel::Channel;
pub use crate::client::event::{ClientEvent, EventReceiver};
pub use crate::client::request::Request;
pub use crate::client::session::Session;
pub use crate::client::{create_handle_and_task, spawn_client_task};
pub use crate::config::ClientConfig;
pub use crate::constants::limits;
pub use crate::decode::*;
pub use crate::error::RequestError;
pub use crate::exception::ExceptionCode;
pub use crate::types::*;
