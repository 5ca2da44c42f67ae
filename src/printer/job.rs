use crate::error::{EncodeError, PrintError};
use crate::printer::commands::Command;
use crate::printer::connection::Session;
use crate::printer::image_proc::Bitmap;
use crate::printer::raster::{center_offset, encode_raster_line, RasterLine};
use crate::printer::usb::Transport;

impl<T: Transport> Session<T> {
    /// Usable width of the loaded tape in pixels, never more than the device
    /// can print.
    ///
    /// An unknown tape is an error unless the config allows falling back to
    /// the device's full print head.
    pub fn printable_width(&self) -> Result<u32, PrintError> {
        if let Some(px) = self.status.max_width() {
            if px > self.device.max_px {
                tracing::debug!(
                    "{}px tape is wider than {} prints, using {}px",
                    px,
                    self.device.name,
                    self.device.max_px
                );
            }
            return Ok(px.min(self.device.max_px));
        }
        if self.config.allow_unknown_tape {
            tracing::warn!(
                "Tape width of {}mm unknown, using {}px for {}",
                self.status.tape_width_mm,
                self.device.max_px,
                self.device.name
            );
            return Ok(self.device.max_px);
        }
        Err(PrintError::UnknownTapeWidth {
            mm: self.status.tape_width_mm,
        })
    }

    /// Print a bitmap centered across the tape, one raster line per column.
    /// Stops at the first failed transfer.
    pub fn print_bitmap(&mut self, bitmap: &Bitmap) -> Result<(), PrintError> {
        let tape_width = self.printable_width()?;
        let height = bitmap.height();
        if height > tape_width {
            return Err(EncodeError::TooWide {
                extent: height,
                max: tape_width,
            }
            .into());
        }

        let offset = center_offset(height);
        self.send_command(Command::RasterStart)?;
        for x in 0..bitmap.width() {
            let payload = encode_raster_line(
                (0..height)
                    .filter(|&i| bitmap.get(x, height - 1 - i))
                    .map(|i| offset + i),
            );
            self.send_raster_line(&RasterLine::new(payload, height))?;
        }

        tracing::debug!(
            "Sent {} raster lines ({}px across)",
            bitmap.width(),
            height
        );
        Ok(())
    }

    /// Print what is buffered, cut the tape and eject the label.
    pub fn finish(&mut self) -> Result<(), PrintError> {
        self.send_command(Command::CutAndEject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PrinterConfig;
    use crate::error::{IoError, TransportError};
    use crate::printer::mock::{status_frame, MockTransport};
    use crate::printer::models::{Catalog, KNOWN_MODELS};
    use crate::printer::raster::decode_raster_line;
    use std::time::Duration;

    fn ready_session(transport: MockTransport, config: PrinterConfig) -> Session<MockTransport> {
        let config = PrinterConfig {
            status_poll_interval: Duration::ZERO,
            ..config
        };
        let mut session = Session::new(transport, &KNOWN_MODELS[0], Catalog::builtin(), config);
        session.query_status().unwrap();
        session
    }

    fn payload(write: &[u8]) -> [u8; 16] {
        let mut line = [0u8; 16];
        line.copy_from_slice(&write[3..]);
        line
    }

    #[test]
    fn bitmap_columns_become_centered_raster_lines() {
        let transport = MockTransport::new().reply(&status_frame(24));
        let log = transport.log();
        let mut session = ready_session(transport, PrinterConfig::default());

        // 2 columns, 4 rows; bottom row of column 0 and top row of column 1
        let mut bitmap = Bitmap::new(2, 4);
        bitmap.set(0, 3, true);
        bitmap.set(1, 0, true);
        session.print_bitmap(&bitmap).unwrap();

        let writes = log.writes();
        assert_eq!(writes.len(), 1 + 1 + 2);
        assert_eq!(writes[1], vec![0x1b, 0x69, 0x52, 0x01]);
        // offset = 64 - 4/2 = 62; row 3 is i = 0, row 0 is i = 3
        assert_eq!(decode_raster_line(&payload(&writes[2])), vec![62]);
        assert_eq!(decode_raster_line(&payload(&writes[3])), vec![65]);
    }

    #[test]
    fn bitmap_taller_than_tape_is_rejected() {
        let transport = MockTransport::new().reply(&status_frame(9));
        let log = transport.log();
        let mut session = ready_session(transport, PrinterConfig::default());

        let err = session.print_bitmap(&Bitmap::new(10, 53)).unwrap_err();
        assert_eq!(err, PrintError::Encode(EncodeError::TooWide { extent: 53, max: 52 }));
        // only the status request went out
        assert_eq!(log.write_count(), 1);
    }

    #[test]
    fn unknown_tape_fails_by_default() {
        let transport = MockTransport::new().reply(&status_frame(99));
        let mut session = ready_session(transport, PrinterConfig::default());
        let err = session.print_bitmap(&Bitmap::new(1, 8)).unwrap_err();
        assert_eq!(err, PrintError::UnknownTapeWidth { mm: 99 });
    }

    #[test]
    fn unknown_tape_falls_back_when_allowed() {
        let transport = MockTransport::new().reply(&status_frame(99));
        let config = PrinterConfig {
            allow_unknown_tape: true,
            ..PrinterConfig::default()
        };
        let mut session = ready_session(transport, config);
        assert_eq!(session.printable_width().unwrap(), 128);
        session.print_bitmap(&Bitmap::new(1, 100)).unwrap();
    }

    #[test]
    fn failed_line_aborts_the_job() {
        let transport = MockTransport {
            // status request, raster start, line 1 ok, line 2 fails
            fail_write: Some((4, TransportError::Disconnected)),
            ..MockTransport::new().reply(&status_frame(24))
        };
        let log = transport.log();
        let mut session = ready_session(transport, PrinterConfig::default());

        let err = session.print_bitmap(&Bitmap::new(5, 8)).unwrap_err();
        assert_eq!(
            err,
            PrintError::RasterLine(IoError::Transport(TransportError::Disconnected))
        );
        assert_eq!(log.write_count(), 4);
    }

    #[test]
    fn wide_tape_is_capped_at_the_print_head() {
        // 18mm tape is 120px, the PT-1230PC prints at most 76px
        let transport = MockTransport::new().reply(&status_frame(18));
        let log = transport.log();
        let config = PrinterConfig {
            status_poll_interval: Duration::ZERO,
            ..PrinterConfig::default()
        };
        let mut session = Session::new(transport, &KNOWN_MODELS[1], Catalog::builtin(), config);
        session.query_status().unwrap();
        assert_eq!(session.printable_width().unwrap(), 76);

        let err = session.print_bitmap(&Bitmap::new(3, 120)).unwrap_err();
        assert_eq!(err, PrintError::Encode(EncodeError::TooWide { extent: 120, max: 76 }));
        assert_eq!(log.write_count(), 1);

        session.print_cutmark().unwrap();
        let writes = log.writes();
        let line = payload(&writes[7]);
        // 76px centered from 64 - 38 = 26
        let pixels = decode_raster_line(&line);
        assert_eq!(pixels.first(), Some(&26));
        assert!(pixels.iter().all(|&p| p < 26 + 76));
    }

    #[test]
    fn finish_cuts_and_ejects() {
        let transport = MockTransport::new().reply(&status_frame(24));
        let log = transport.log();
        let mut session = ready_session(transport, PrinterConfig::default());
        session.finish().unwrap();
        assert_eq!(log.writes().last(), Some(&vec![0x1a]));
    }
}
