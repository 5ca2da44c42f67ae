//! Fixed command sequences understood by P-touch printers in raster mode.
//!
//! Every command is a constant byte string written with a single bulk
//! transfer. Raster lines are the only parameterized command and live in
//! [`crate::printer::raster`].

use std::fmt;

/// ESC @ - reset protocol state.
pub const INITIALIZE: &[u8] = &[0x1b, 0x40];

/// ESC i S - ask for a 32-byte status frame.
pub const STATUS_REQUEST: &[u8] = &[0x1b, 0x69, 0x53];

/// ESC i R 01 - switch to raster graphics mode.
pub const RASTER_START: &[u8] = &[0x1b, 0x69, 0x52, 0x01];

/// Z - print an empty raster line.
pub const LINE_FEED: &[u8] = &[0x5a];

/// FF - print and advance the tape without cutting.
pub const FORM_FEED: &[u8] = &[0x0c];

/// SUB - print, cut and eject.
pub const CUT_AND_EJECT: &[u8] = &[0x1a];

/// Raster line opcode (`G`), followed by a little-endian length and payload.
pub const RASTER_LINE: u8 = 0x47;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Initialize,
    StatusRequest,
    RasterStart,
    LineFeed,
    FormFeed,
    CutAndEject,
}

impl Command {
    pub fn bytes(self) -> &'static [u8] {
        match self {
            Command::Initialize => INITIALIZE,
            Command::StatusRequest => STATUS_REQUEST,
            Command::RasterStart => RASTER_START,
            Command::LineFeed => LINE_FEED,
            Command::FormFeed => FORM_FEED,
            Command::CutAndEject => CUT_AND_EJECT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::Initialize => "init",
            Command::StatusRequest => "status request",
            Command::RasterStart => "raster start",
            Command::LineFeed => "line feed",
            Command::FormFeed => "form feed",
            Command::CutAndEject => "cut and eject",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_bytes_match_protocol_table() {
        assert_eq!(Command::Initialize.bytes(), &[0x1b, 0x40]);
        assert_eq!(Command::StatusRequest.bytes(), &[0x1b, 0x69, 0x53]);
        assert_eq!(Command::RasterStart.bytes(), &[0x1b, 0x69, 0x52, 0x01]);
        assert_eq!(Command::LineFeed.bytes(), &[0x5a]);
        assert_eq!(Command::FormFeed.bytes(), &[0x0c]);
        assert_eq!(Command::CutAndEject.bytes(), &[0x1a]);
    }

    #[test]
    fn display_uses_readable_name() {
        assert_eq!(Command::RasterStart.to_string(), "raster start");
    }
}
