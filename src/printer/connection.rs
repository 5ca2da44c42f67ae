use crate::config::PrinterConfig;
use crate::error::{IoError, OpenError, PrintError};
use crate::printer::commands::Command;
use crate::printer::discovery::find_printer;
use crate::printer::models::{Catalog, DeviceDescriptor};
use crate::printer::status::DeviceStatus;
use crate::printer::usb::{NusbBus, Transport, UsbBus, UsbCandidate, UsbTransport};

/// An exclusively claimed printer.
///
/// Every operation takes `&mut self`, so commands are issued strictly in
/// program order. The interface stays claimed until [`Session::close`].
pub struct Session<T: Transport = UsbTransport> {
    pub(crate) transport: T,
    pub(crate) device: &'static DeviceDescriptor,
    pub(crate) catalog: Catalog,
    pub(crate) config: PrinterConfig,
    pub(crate) status: DeviceStatus,
}

/// Open the first attached printer from the built-in catalog.
pub fn open_session(config: &PrinterConfig) -> Result<Session, OpenError> {
    Session::open_with(&NusbBus::new(config.usb_timeout), Catalog::builtin(), config)
}

pub fn close_session<T: Transport>(session: Session<T>) {
    session.close();
}

impl<T: Transport> Session<T> {
    pub fn new(
        transport: T,
        device: &'static DeviceDescriptor,
        catalog: Catalog,
        config: PrinterConfig,
    ) -> Self {
        Self {
            transport,
            device,
            catalog,
            config,
            status: DeviceStatus::default(),
        }
    }

    /// Find the first enabled catalog device on `bus` and claim it. A failed
    /// claim is final; the printer is assumed to be in use elsewhere.
    pub fn open_with<B>(bus: &B, catalog: Catalog, config: &PrinterConfig) -> Result<Self, OpenError>
    where
        B: UsbBus<Transport = T>,
    {
        let (candidate, device) = find_printer(bus, &catalog)?;
        let location = candidate.location();
        tracing::info!("{} found on {}", device.name, location);

        let transport = bus.claim(candidate).map_err(|e| OpenError::ClaimFailed {
            device: format!("{} ({location})", device.name),
            reason: e.to_string(),
        })?;

        Ok(Self::new(transport, device, catalog, config.clone()))
    }

    pub fn device(&self) -> &'static DeviceDescriptor {
        self.device
    }

    pub fn status(&self) -> &DeviceStatus {
        &self.status
    }

    pub fn config(&self) -> &PrinterConfig {
        &self.config
    }

    /// Write `bytes` in a single bulk transfer. Partial writes are not
    /// resumed.
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), IoError> {
        let written = self.transport.write_bulk(bytes)?;
        if written != bytes.len() {
            return Err(IoError::ShortWrite {
                written,
                expected: bytes.len(),
            });
        }
        Ok(())
    }

    pub fn send_command(&mut self, command: Command) -> Result<(), PrintError> {
        tracing::debug!("Sending {command}");
        self.send(command.bytes())
            .map_err(|source| PrintError::Command { command, source })
    }

    pub fn init(&mut self) -> Result<(), PrintError> {
        self.send_command(Command::Initialize)
    }

    pub fn raster_start(&mut self) -> Result<(), PrintError> {
        self.send_command(Command::RasterStart)
    }

    pub fn line_feed(&mut self) -> Result<(), PrintError> {
        self.send_command(Command::LineFeed)
    }

    pub fn form_feed(&mut self) -> Result<(), PrintError> {
        self.send_command(Command::FormFeed)
    }

    pub fn eject(&mut self) -> Result<(), PrintError> {
        self.send_command(Command::CutAndEject)
    }

    /// Release the interface and close the handle.
    pub fn close(self) {
        tracing::debug!("Closing session on {}", self.device.name);
        self.transport.close();
    }
}
