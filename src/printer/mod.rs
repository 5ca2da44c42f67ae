pub mod commands;
pub mod connection;
pub mod discovery;
pub mod image_proc;
pub mod job;
#[cfg(test)]
pub(crate) mod mock;
pub mod models;
pub mod raster;
pub mod status;
pub mod usb;

pub use connection::{close_session, open_session, Session};
pub use status::{DeviceStatus, StatusReport, StatusWarning};
