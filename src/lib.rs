//! Brother P-touch label printing over raw USB.
//!
//! Open a [`Session`], initialize the printer, query its status to learn the
//! loaded tape, send raster lines and finally cut and eject:
//!
//! ```no_run
//! use ptouch::config::PrinterConfig;
//! use ptouch::printer::image_proc::Bitmap;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PrinterConfig::default();
//! let mut session = ptouch::open_session(&config)?;
//! session.init()?;
//! session.query_status()?;
//! session.print_bitmap(&Bitmap::new(32, 16))?;
//! session.print_cutmark()?;
//! session.finish()?;
//! session.close();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod platform;
pub mod printer;

pub use printer::{close_session, open_session, Session};
