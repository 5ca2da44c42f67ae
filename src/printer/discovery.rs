use std::time::Duration;

use serde::Serialize;

use crate::error::OpenError;
use crate::printer::models::{Catalog, DeviceDescriptor};
use crate::printer::usb::{NusbBus, UsbBus, UsbCandidate};

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredPrinter {
    pub vendor_id: u16,
    pub product_id: u16,
    pub model_name: String,
    pub location: String,
    pub serial: Option<String>,
}

/// First attached device with an enabled catalog entry, in enumeration order.
pub fn find_printer<B: UsbBus>(
    bus: &B,
    catalog: &Catalog,
) -> Result<(B::Device, &'static DeviceDescriptor), OpenError> {
    let devices = bus
        .enumerate()
        .map_err(|e| OpenError::Enumeration(e.to_string()))?;

    for dev in devices {
        let Some(model) = catalog.find_device(dev.vendor_id(), dev.product_id()) else {
            continue;
        };
        if model.is_disabled() {
            tracing::debug!(
                "Skipping {} on {}: disabled in catalog",
                model.name,
                dev.location()
            );
            continue;
        }
        return Ok((dev, model));
    }

    Err(OpenError::NoDeviceFound)
}

/// List every attached printer the catalog knows, without claiming any.
pub fn list_printers<B: UsbBus>(
    bus: &B,
    catalog: &Catalog,
) -> Result<Vec<DiscoveredPrinter>, OpenError> {
    let devices = bus
        .enumerate()
        .map_err(|e| OpenError::Enumeration(e.to_string()))?;
    let mut printers = Vec::new();

    for dev in devices {
        let vid = dev.vendor_id();
        let pid = dev.product_id();
        let Some(model) = catalog.find_device(vid, pid) else {
            continue;
        };

        tracing::info!(
            "Found P-touch device: {} (VID={:04x} PID={:04x})",
            model.name,
            vid,
            pid
        );

        printers.push(DiscoveredPrinter {
            vendor_id: vid,
            product_id: pid,
            model_name: model.name.to_string(),
            location: dev.location(),
            serial: dev.serial(),
        });
    }

    Ok(printers)
}

pub fn scan_for_printers() -> Result<Vec<DiscoveredPrinter>, OpenError> {
    list_printers(&NusbBus::new(Duration::from_secs(1)), &Catalog::builtin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::mock::{MockBus, MockDevice};

    #[test]
    fn lists_only_catalog_devices() {
        let bus = MockBus::with_devices(vec![
            MockDevice::new(0x04f9, 0x202d, 3),
            MockDevice::new(0x1d6b, 0x0002, 1),
            MockDevice::new(0x04f9, 0x202c, 4),
        ]);
        let printers = list_printers(&bus, &Catalog::builtin()).unwrap();
        let names: Vec<_> = printers.iter().map(|p| p.model_name.as_str()).collect();
        assert_eq!(names, vec!["PT-2430PC", "PT-1230PC"]);
        assert_eq!(printers[0].location, "USB bus 1, device 3");
        assert!(bus.claimed.borrow().is_empty());
    }

    #[test]
    fn find_printer_returns_first_match() {
        let bus = MockBus::with_devices(vec![
            MockDevice::new(0x04f9, 0x202c, 7),
            MockDevice::new(0x04f9, 0x202d, 8),
        ]);
        let (dev, model) = find_printer(&bus, &Catalog::builtin()).unwrap();
        assert_eq!(dev.address, 7);
        assert_eq!(model.name, "PT-1230PC");
    }

    #[test]
    fn no_printers_is_empty_list() {
        let bus = MockBus::default();
        assert!(list_printers(&bus, &Catalog::builtin()).unwrap().is_empty());
    }
}
