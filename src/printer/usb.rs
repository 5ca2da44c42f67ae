//! Raw USB plumbing for P-touch printers.
//!
//! The protocol code only sees two traits: [`UsbBus`] to enumerate and claim
//! devices, and [`Transport`] for blocking bulk transfers on a claimed
//! interface. [`NusbBus`] / [`UsbTransport`] implement them with `nusb`.

use std::time::Duration;

use nusb::transfer::{Buffer, Bulk, In, Out, TransferError};
use nusb::{Endpoint, MaybeFuture};

use crate::error::TransportError;

/// Bulk OUT endpoint carrying commands and raster data.
pub const WRITE_EP: u8 = 0x02;
/// Bulk IN endpoint carrying status frames.
pub const READ_EP: u8 = 0x81;
/// The printer exposes a single interface.
pub const INTERFACE: u8 = 0;

/// A claimed printer interface.
pub trait Transport {
    /// Write `data` in one bulk transfer, returning how many bytes went out.
    fn write_bulk(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Read one bulk transfer of at most `max_len` bytes. A read that times
    /// out with nothing pending yields an empty vector.
    fn read_bulk(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError>;

    /// Release the interface, then close the device handle.
    fn close(self);
}

/// Identity of an attached device as seen during enumeration.
pub trait UsbCandidate {
    fn vendor_id(&self) -> u16;
    fn product_id(&self) -> u16;
    /// Human readable bus location for log and error messages.
    fn location(&self) -> String;
    fn serial(&self) -> Option<String> {
        None
    }
}

pub trait UsbBus {
    type Device: UsbCandidate;
    type Transport: Transport;

    fn enumerate(&self) -> Result<Vec<Self::Device>, TransportError>;

    /// Open the device, detach any kernel driver bound to the printer
    /// interface and claim it exclusively.
    fn claim(&self, device: Self::Device) -> Result<Self::Transport, TransportError>;
}

/// Host USB stack via `nusb`.
#[derive(Debug, Clone)]
pub struct NusbBus {
    pub timeout: Duration,
}

impl NusbBus {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl UsbCandidate for nusb::DeviceInfo {
    fn vendor_id(&self) -> u16 {
        nusb::DeviceInfo::vendor_id(self)
    }

    fn product_id(&self) -> u16 {
        nusb::DeviceInfo::product_id(self)
    }

    fn location(&self) -> String {
        format!("USB bus {}, device {}", self.bus_id(), self.device_address())
    }

    fn serial(&self) -> Option<String> {
        self.serial_number().map(|s| s.to_string())
    }
}

impl UsbBus for NusbBus {
    type Device = nusb::DeviceInfo;
    type Transport = UsbTransport;

    fn enumerate(&self) -> Result<Vec<nusb::DeviceInfo>, TransportError> {
        let devices = nusb::list_devices()
            .wait()
            .map_err(|e| TransportError::Usb(e.to_string()))?;
        Ok(devices.collect())
    }

    fn claim(&self, device: nusb::DeviceInfo) -> Result<UsbTransport, TransportError> {
        let handle = device
            .open()
            .wait()
            .map_err(|e| TransportError::Usb(format!("open failed: {e}")))?;

        // Detaches usblp (or similar) on Linux; plain claim elsewhere.
        let interface = handle
            .detach_and_claim_interface(INTERFACE)
            .wait()
            .map_err(|e| TransportError::Usb(format!("interface claim error: {e}")))?;

        let out_ep = interface
            .endpoint::<Bulk, Out>(WRITE_EP)
            .map_err(|e| TransportError::Usb(format!("OUT endpoint {WRITE_EP:#04x}: {e}")))?;
        let in_ep = interface
            .endpoint::<Bulk, In>(READ_EP)
            .map_err(|e| TransportError::Usb(format!("IN endpoint {READ_EP:#04x}: {e}")))?;

        tracing::debug!(
            "Claimed interface {INTERFACE} on {:04x}:{:04x}",
            device.vendor_id(),
            device.product_id()
        );

        Ok(UsbTransport {
            device: handle,
            interface,
            out_ep,
            in_ep,
            timeout: self.timeout,
        })
    }
}

pub struct UsbTransport {
    device: nusb::Device,
    interface: nusb::Interface,
    out_ep: Endpoint<Bulk, Out>,
    in_ep: Endpoint<Bulk, In>,
    timeout: Duration,
}

fn map_transfer_error(e: TransferError) -> TransportError {
    match e {
        TransferError::Disconnected => TransportError::Disconnected,
        TransferError::Stall => TransportError::Stall,
        other => TransportError::Usb(other.to_string()),
    }
}

/// Bytes a completed IN transfer actually delivered.
fn received_bytes(buffer: &[u8], actual_len: usize) -> Vec<u8> {
    buffer[..actual_len.min(buffer.len())].to_vec()
}

impl Transport for UsbTransport {
    fn write_bulk(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let mut buf = Buffer::new(data.len());
        buf.extend_from_slice(data);

        let completion = self.out_ep.transfer_blocking(buf, self.timeout);
        match completion.status {
            Ok(()) => {}
            // A timed-out write may still have moved part of the data.
            Err(TransferError::Cancelled) => {
                tracing::warn!(
                    "USB write timed out after {} of {} bytes",
                    completion.actual_len,
                    data.len()
                );
            }
            Err(e) => return Err(map_transfer_error(e)),
        }

        tracing::trace!("USB write {} bytes", completion.actual_len);
        Ok(completion.actual_len)
    }

    fn read_bulk(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        // Request length must be a multiple of the max packet size
        let max_packet_size = self.in_ep.max_packet_size();
        let request_len = max_len.div_ceil(max_packet_size) * max_packet_size;
        let mut in_buf = Buffer::new(request_len);
        in_buf.set_requested_len(request_len);

        let completion = self.in_ep.transfer_blocking(in_buf, self.timeout);
        let received = completion.actual_len;
        match completion.status {
            Ok(()) => {
                tracing::trace!("USB read {received} bytes");
            }
            // A timed out transfer may still have filled part of the buffer
            Err(TransferError::Cancelled) => {
                tracing::trace!("USB read timed out after {received} bytes");
            }
            Err(e) => return Err(map_transfer_error(e)),
        }

        Ok(received_bytes(&completion.buffer, received))
    }

    fn close(self) {
        let UsbTransport {
            device,
            interface,
            out_ep,
            in_ep,
            ..
        } = self;
        drop(out_ep);
        drop(in_ep);
        // Dropping the last interface handle releases the claim.
        drop(interface);
        drop(device);
        tracing::debug!("Released interface {INTERFACE} and closed device");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_read_keeps_received_bytes() {
        let mut buffer = vec![0u8; 64];
        buffer[..10].copy_from_slice(&[0x80; 10]);
        assert_eq!(received_bytes(&buffer, 10), vec![0x80; 10]);
    }

    #[test]
    fn received_length_is_clamped_to_buffer() {
        assert_eq!(received_bytes(&[1, 2, 3], 8), vec![1, 2, 3]);
        assert!(received_bytes(&[1, 2, 3], 0).is_empty());
    }

    #[test]
    fn transfer_errors_map_to_transport_errors() {
        assert_eq!(
            map_transfer_error(TransferError::Disconnected),
            TransportError::Disconnected
        );
        assert_eq!(map_transfer_error(TransferError::Stall), TransportError::Stall);
    }
}
