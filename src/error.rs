use thiserror::Error;

use crate::printer::commands::Command;

/// Failure reported by the USB backend for a single bulk transfer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("device disconnected")]
    Disconnected,

    #[error("endpoint stalled")]
    Stall,

    #[error("USB error: {0}")]
    Usb(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OpenError {
    #[error(
        "No P-touch printer found on USB (remember to put the mode switch to position E)"
    )]
    NoDeviceFound,

    #[error("Failed to claim {device}: {reason}")]
    ClaimFailed { device: String, reason: String },

    #[error("USB enumeration failed: {0}")]
    Enumeration(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IoError {
    #[error("write error: could send only {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("write error: {0}")]
    Transport(#[from] TransportError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatusError {
    #[error("status request could not be sent: {0}")]
    Query(IoError),

    #[error("timeout while waiting for status response ({attempts} attempts)")]
    Timeout { attempts: u32 },

    #[error(
        "strange status frame (header {:02x} {:02x}), flushed {drained} junk bytes",
        .header[0],
        .header[1]
    )]
    Malformed { header: [u8; 2], drained: usize },

    #[error("got only 16 status bytes: {}", hex_dump(.raw))]
    ShortFrame { raw: [u8; 16] },

    #[error("read error: got {got} instead of 32 status bytes")]
    UnexpectedLength { got: usize },

    #[error("read error: {0}")]
    Transport(TransportError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("image is too large: {extent}px, maximum printing width is {max}px")]
    TooWide { extent: u32, max: u32 },
}

/// Errors raised while running a print job. Every variant names the step
/// that failed; the job must not continue after any of them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrintError {
    #[error("{command} failed: {source}")]
    Command {
        command: Command,
        #[source]
        source: IoError,
    },

    #[error("raster line failed: {0}")]
    RasterLine(#[source] IoError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("unknown tape width of {mm}mm, maximum printing width unavailable")]
    UnknownTapeWidth { mm: u8 },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Invalid {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Space separated hex bytes, 16 per line.
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .chunks(16)
        .map(|chunk| {
            chunk
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
