pub use crate::client::channel::Channel;
pub use crate::client::event::{ClientEvent, EventReceiver};
pub use crate::client::request::Request;
pub use crate::client::session::Session;
pub use crate::client::spawn_client_task;
pub use crate::config::ClientConfig;
pub use crate::decode::*;
pub use crate::error::*;
pub use crate::exception::ExceptionCode;
pub use crate::types::*;
