use bitflags::bitflags;
use serde::Serialize;

use crate::error::{hex_dump, StatusError};
use crate::printer::commands::Command;
use crate::printer::connection::Session;
use crate::printer::models::Catalog;
use crate::printer::usb::Transport;

pub const STATUS_FRAME_LEN: usize = 32;
pub const STATUS_HEADER: [u8; 2] = [0x80, 0x20];

const OFFSET_ERROR_1: usize = 8;
const OFFSET_ERROR_2: usize = 9;
const OFFSET_TAPE_WIDTH: usize = 10;
const OFFSET_MEDIA_TYPE: usize = 11;
const OFFSET_STATUS_TYPE: usize = 18;

bitflags! {
    /// Error information 1 (status byte 8).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ErrorInfo1: u8 {
        const NO_MEDIA = 0x01;
        const END_OF_MEDIA = 0x02;
        const CUTTER_JAM = 0x04;
        const WEAK_BATTERIES = 0x08;
        const PRINTER_IN_USE = 0x10;
        const HIGH_VOLTAGE_ADAPTER = 0x40;
    }

    /// Error information 2 (status byte 9).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ErrorInfo2: u8 {
        const REPLACE_MEDIA = 0x01;
        const EXPANSION_BUFFER_FULL = 0x02;
        const COMMUNICATION_ERROR = 0x04;
        const BUFFER_FULL = 0x08;
        const COVER_OPEN = 0x10;
        const OVERHEATING = 0x20;
        const BLACK_MARKING_NOT_DETECTED = 0x40;
        const SYSTEM_ERROR = 0x80;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MediaType {
    NoMedia,
    Laminated,
    NonLaminated,
    HeatShrinkTube,
    Incompatible,
    Unknown(u8),
}

impl MediaType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => MediaType::NoMedia,
            0x01 => MediaType::Laminated,
            0x03 => MediaType::NonLaminated,
            0x11 => MediaType::HeatShrinkTube,
            0xff => MediaType::Incompatible,
            other => MediaType::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusType {
    Reply,
    PrintingCompleted,
    ErrorOccurred,
    Notification,
    PhaseChange,
    Unknown(u8),
}

impl StatusType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => StatusType::Reply,
            0x01 => StatusType::PrintingCompleted,
            0x02 => StatusType::ErrorOccurred,
            0x05 => StatusType::Notification,
            0x06 => StatusType::PhaseChange,
            other => StatusType::Unknown(other),
        }
    }
}

/// Last known printer state. Replaced as a whole by every successful
/// status exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    pub tape_width_mm: u8,
    /// Printable width for the loaded tape; 0 when the tape is not in the
    /// catalog.
    pub tape_width_px: u32,
    pub media_type: u8,
    pub status: u8,
    pub errors: [u8; 2],
    #[serde(skip)]
    pub raw: [u8; STATUS_FRAME_LEN],
}

impl Default for DeviceStatus {
    fn default() -> Self {
        Self {
            tape_width_mm: 0,
            tape_width_px: 0,
            media_type: 0,
            status: 0,
            errors: [0; 2],
            raw: [0; STATUS_FRAME_LEN],
        }
    }
}

impl DeviceStatus {
    /// Printable width of the loaded tape, `None` while unknown.
    pub fn max_width(&self) -> Option<u32> {
        (self.tape_width_px > 0).then_some(self.tape_width_px)
    }

    pub fn media(&self) -> MediaType {
        MediaType::from_code(self.media_type)
    }

    pub fn status_type(&self) -> StatusType {
        StatusType::from_code(self.status)
    }

    pub fn error_info_1(&self) -> ErrorInfo1 {
        ErrorInfo1::from_bits_retain(self.errors[0])
    }

    pub fn error_info_2(&self) -> ErrorInfo2 {
        ErrorInfo2::from_bits_retain(self.errors[1])
    }

    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(|&e| e != 0)
    }
}

/// Soft conditions found in an otherwise valid status frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusWarning {
    /// `index` is 1 or 2, matching the printer's error information bytes.
    DeviceError { index: u8, code: u8 },
    UnknownTapeWidth { mm: u8 },
}

impl std::fmt::Display for StatusWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusWarning::DeviceError { index, code } => write!(f, "Error {index} = {code:02x}"),
            StatusWarning::UnknownTapeWidth { mm } => {
                write!(f, "unknown tape width of {mm}mm, please report this")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub status: DeviceStatus,
    pub warnings: Vec<StatusWarning>,
}

/// Interpret one status read. Only a full frame with the expected header
/// decodes; everything else maps to the matching [`StatusError`].
pub fn classify_frame(bytes: &[u8], catalog: &Catalog) -> Result<StatusReport, StatusError> {
    match bytes.len() {
        STATUS_FRAME_LEN => {
            let mut raw = [0u8; STATUS_FRAME_LEN];
            raw.copy_from_slice(bytes);
            if raw[..2] != STATUS_HEADER {
                return Err(StatusError::Malformed {
                    header: [raw[0], raw[1]],
                    drained: 0,
                });
            }
            Ok(decode_frame(raw, catalog))
        }
        16 => {
            let mut raw = [0u8; 16];
            raw.copy_from_slice(bytes);
            Err(StatusError::ShortFrame { raw })
        }
        got => Err(StatusError::UnexpectedLength { got }),
    }
}

fn decode_frame(raw: [u8; STATUS_FRAME_LEN], catalog: &Catalog) -> StatusReport {
    let mut warnings = Vec::new();
    let errors = [raw[OFFSET_ERROR_1], raw[OFFSET_ERROR_2]];
    for (index, &code) in (1u8..).zip(errors.iter()) {
        if code != 0 {
            warnings.push(StatusWarning::DeviceError { index, code });
        }
    }

    let tape_width_mm = raw[OFFSET_TAPE_WIDTH];
    let tape_width_px = match catalog.tape_width_px(tape_width_mm) {
        Some(px) => px,
        None => {
            warnings.push(StatusWarning::UnknownTapeWidth { mm: tape_width_mm });
            0
        }
    };

    StatusReport {
        status: DeviceStatus {
            tape_width_mm,
            tape_width_px,
            media_type: raw[OFFSET_MEDIA_TYPE],
            status: raw[OFFSET_STATUS_TYPE],
            errors,
            raw,
        },
        warnings,
    }
}

impl<T: Transport> Session<T> {
    /// Ask the printer for its status and wait for the reply.
    ///
    /// The reply arrives asynchronously, so the IN endpoint is polled after a
    /// short sleep up to `status_max_attempts` times. On success the session's
    /// [`DeviceStatus`] is replaced; on any failure it is left untouched.
    pub fn query_status(&mut self) -> Result<StatusReport, StatusError> {
        self.send(Command::StatusRequest.bytes())
            .map_err(StatusError::Query)?;

        let max_attempts = self.config.status_max_attempts;
        let mut reply = Vec::new();
        for attempt in 1..=max_attempts {
            std::thread::sleep(self.config.status_poll_interval);
            reply = self
                .transport
                .read_bulk(STATUS_FRAME_LEN)
                .map_err(StatusError::Transport)?;
            if !reply.is_empty() {
                tracing::debug!("Status reply of {} bytes after {attempt} attempt(s)", reply.len());
                break;
            }
        }
        if reply.is_empty() {
            return Err(StatusError::Timeout {
                attempts: max_attempts,
            });
        }

        match classify_frame(&reply, &self.catalog) {
            Ok(report) => {
                for warning in &report.warnings {
                    tracing::warn!("{warning}");
                }
                self.status = report.status.clone();
                Ok(report)
            }
            Err(StatusError::Malformed { header, .. }) => {
                tracing::warn!("strange status:\n{}", hex_dump(&reply));
                let drained = self.drain_stale_frames()?;
                Err(StatusError::Malformed { header, drained })
            }
            Err(e @ StatusError::ShortFrame { .. }) => {
                tracing::warn!("got only 16 bytes:\n{}", hex_dump(&reply));
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// The printer sometimes echoes a stale frame that has to be read off
    /// the endpoint before the next query can succeed.
    fn drain_stale_frames(&mut self) -> Result<usize, StatusError> {
        let mut drained = 0;
        for _ in 0..self.config.status_drain_attempts {
            let junk = self
                .transport
                .read_bulk(STATUS_FRAME_LEN)
                .map_err(StatusError::Transport)?;
            if junk.is_empty() {
                break;
            }
            drained += junk.len();
        }
        tracing::debug!("flushed {drained} junk bytes, status can be retried");
        Ok(drained)
    }
}
