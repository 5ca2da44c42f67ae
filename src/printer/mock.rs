//! Scripted in-memory printer used by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::TransportError;
use crate::printer::usb::{Transport, UsbBus, UsbCandidate};

/// Shared view of everything a [`MockTransport`] saw, readable after the
/// transport has been moved into a session.
#[derive(Debug, Default)]
pub struct MockLog {
    pub writes: RefCell<Vec<Vec<u8>>>,
    pub reads: Cell<usize>,
    pub closed: Cell<bool>,
}

impl MockLog {
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.borrow().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.borrow().len()
    }
}

#[derive(Debug, Default)]
pub struct MockTransport {
    pub log: Rc<MockLog>,
    /// Replies handed out in order; an exhausted script reads as empty.
    pub replies: VecDeque<Result<Vec<u8>, TransportError>>,
    /// When set, every write reports this many bytes transferred.
    pub short_write: Option<usize>,
    /// Fail the write with this (1-based) index.
    pub fail_write: Option<(usize, TransportError)>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, bytes: &[u8]) -> Self {
        self.replies.push_back(Ok(bytes.to_vec()));
        self
    }

    pub fn reply_err(mut self, err: TransportError) -> Self {
        self.replies.push_back(Err(err));
        self
    }

    pub fn log(&self) -> Rc<MockLog> {
        Rc::clone(&self.log)
    }
}

impl Transport for MockTransport {
    fn write_bulk(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        self.log.writes.borrow_mut().push(data.to_vec());
        let index = self.log.write_count();
        if let Some((fail_at, err)) = &self.fail_write {
            if *fail_at == index {
                return Err(err.clone());
            }
        }
        Ok(self.short_write.unwrap_or(data.len()))
    }

    fn read_bulk(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        self.log.reads.set(self.log.reads.get() + 1);
        match self.replies.pop_front() {
            Some(Ok(mut bytes)) => {
                bytes.truncate(max_len);
                Ok(bytes)
            }
            Some(Err(e)) => Err(e),
            None => Ok(Vec::new()),
        }
    }

    fn close(self) {
        self.log.closed.set(true);
    }
}

/// A 32-byte status frame with a valid header and the given tape width.
pub fn status_frame(tape_mm: u8) -> [u8; 32] {
    let mut frame = [0u8; 32];
    frame[0] = 0x80;
    frame[1] = 0x20;
    frame[10] = tape_mm;
    frame[11] = 0x01;
    frame
}

#[derive(Debug, Clone)]
pub struct MockDevice {
    pub vendor_id: u16,
    pub product_id: u16,
    pub address: u8,
}

impl MockDevice {
    pub fn new(vendor_id: u16, product_id: u16, address: u8) -> Self {
        Self {
            vendor_id,
            product_id,
            address,
        }
    }
}

impl UsbCandidate for MockDevice {
    fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    fn product_id(&self) -> u16 {
        self.product_id
    }

    fn location(&self) -> String {
        format!("USB bus 1, device {}", self.address)
    }
}

#[derive(Debug, Default)]
pub struct MockBus {
    pub devices: Vec<MockDevice>,
    pub enumerate_error: Option<TransportError>,
    pub claim_error: Option<TransportError>,
    /// Addresses of every device `claim` was called with.
    pub claimed: RefCell<Vec<u8>>,
    /// Transport handed out by the first successful claim.
    pub transport: RefCell<Option<MockTransport>>,
}

impl MockBus {
    pub fn with_devices(devices: Vec<MockDevice>) -> Self {
        Self {
            devices,
            ..Self::default()
        }
    }
}

impl UsbBus for MockBus {
    type Device = MockDevice;
    type Transport = MockTransport;

    fn enumerate(&self) -> Result<Vec<MockDevice>, TransportError> {
        match &self.enumerate_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.devices.clone()),
        }
    }

    fn claim(&self, device: MockDevice) -> Result<MockTransport, TransportError> {
        self.claimed.borrow_mut().push(device.address);
        if let Some(e) = &self.claim_error {
            return Err(e.clone());
        }
        Ok(self.transport.borrow_mut().take().unwrap_or_default())
    }
}
