//! Raster line packing.
//!
//! The print head addresses 128 pixels. A line is 16 bytes, stored with the
//! highest pixels first: pixel `p` lives in byte `15 - p / 8`, bit `p % 8`.
//! On the wire a line is framed as `47 10 00` followed by the payload.

use crate::error::{EncodeError, PrintError};
use crate::printer::commands::{Command, RASTER_LINE};
use crate::printer::connection::Session;
use crate::printer::usb::Transport;

pub const RASTER_PIXELS: u32 = 128;
pub const RASTER_BYTES: usize = 16;
pub const RASTER_FRAME_LEN: usize = RASTER_BYTES + 3;

/// Pixels set and cleared per dash of a cut mark.
const CUTMARK_DASH: u32 = 4;

#[inline]
fn byte_and_mask(pixel: u32) -> (usize, u8) {
    (RASTER_BYTES - 1 - (pixel / 8) as usize, 1 << (pixel % 8))
}

/// Set a single pixel. Pixels outside the print head are ignored.
pub fn set_pixel(line: &mut [u8; RASTER_BYTES], pixel: u32) {
    if pixel >= RASTER_PIXELS {
        tracing::trace!("Ignoring pixel {pixel} outside the print head");
        return;
    }
    let (byte, mask) = byte_and_mask(pixel);
    line[byte] |= mask;
}

pub fn encode_raster_line<I>(pixels: I) -> [u8; RASTER_BYTES]
where
    I: IntoIterator<Item = u32>,
{
    let mut line = [0u8; RASTER_BYTES];
    for pixel in pixels {
        set_pixel(&mut line, pixel);
    }
    line
}

/// Set pixel indices in ascending order.
pub fn decode_raster_line(line: &[u8; RASTER_BYTES]) -> Vec<u32> {
    (0..RASTER_PIXELS)
        .filter(|&p| {
            let (byte, mask) = byte_and_mask(p);
            line[byte] & mask != 0
        })
        .collect()
}

/// A packed line plus the logical width the caller laid it out for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterLine {
    pub payload: [u8; RASTER_BYTES],
    pub extent: u32,
}

impl RasterLine {
    pub fn new(payload: [u8; RASTER_BYTES], extent: u32) -> Self {
        Self { payload, extent }
    }

    pub fn from_pixels<I>(pixels: I, extent: u32) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        Self::new(encode_raster_line(pixels), extent)
    }

    pub fn frame(&self) -> [u8; RASTER_FRAME_LEN] {
        let mut frame = [0u8; RASTER_FRAME_LEN];
        frame[0] = RASTER_LINE;
        frame[1] = RASTER_BYTES as u8;
        frame[2] = 0;
        frame[3..].copy_from_slice(&self.payload);
        frame
    }
}

/// Left edge that centers `width` pixels on the print head.
pub fn center_offset(width: u32) -> u32 {
    (RASTER_PIXELS / 2).saturating_sub(width / 2)
}

/// Dashed guide line across `width` pixels: four pixels on, four off,
/// centered on the print head.
pub fn cutmark_line(width: u32) -> [u8; RASTER_BYTES] {
    let offset = center_offset(width);
    encode_raster_line(
        (0..width)
            .filter(|i| i % (2 * CUTMARK_DASH) < CUTMARK_DASH)
            .map(|i| offset + i),
    )
}

impl<T: Transport> Session<T> {
    /// Send one raster line. Lines laid out wider than the device can print
    /// are rejected before anything reaches the USB bus.
    pub fn send_raster_line(&mut self, line: &RasterLine) -> Result<(), PrintError> {
        let max = self.device.max_px;
        if line.extent > max {
            return Err(EncodeError::TooWide {
                extent: line.extent,
                max,
            }
            .into());
        }
        tracing::trace!("Raster line {:02x?}", line.payload);
        self.send(&line.frame()).map_err(PrintError::RasterLine)
    }

    /// Print a dashed "cut here" line framed by blank feeds.
    pub fn print_cutmark(&mut self) -> Result<(), PrintError> {
        let width = self.printable_width()?;
        let spacing = self.config.cutmark_spacing;

        for _ in 0..spacing {
            self.send_command(Command::LineFeed)?;
        }
        self.send_command(Command::RasterStart)?;
        self.send_raster_line(&RasterLine::new(cutmark_line(width), width))?;
        for _ in 0..spacing {
            self.send_command(Command::LineFeed)?;
        }
        Ok(())
    }
}
