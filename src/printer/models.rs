use bitflags::bitflags;

pub const BROTHER_VENDOR_ID: u16 = 0x04f9;

bitflags! {
    /// Per-model quirks. `DISABLED` entries are known but never opened.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DeviceFlags: u32 {
        const DISABLED = 1 << 31;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    pub name: &'static str,
    /// Widest raster the print head can address, in pixels.
    pub max_px: u32,
    pub flags: DeviceFlags,
}

impl DeviceDescriptor {
    pub fn is_disabled(&self) -> bool {
        self.flags.contains(DeviceFlags::DISABLED)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapeWidthEntry {
    pub mm: u8,
    pub px: u32,
}

pub static KNOWN_MODELS: &[DeviceDescriptor] = &[
    // 180dpi, maximum 128px
    DeviceDescriptor {
        vendor_id: BROTHER_VENDOR_ID,
        product_id: 0x202d,
        name: "PT-2430PC",
        max_px: 128,
        flags: DeviceFlags::empty(),
    },
    // 180dpi, tapes up to 12mm
    DeviceDescriptor {
        vendor_id: BROTHER_VENDOR_ID,
        product_id: 0x202c,
        name: "PT-1230PC",
        max_px: 76,
        flags: DeviceFlags::empty(),
    },
];

pub static TAPE_WIDTHS: &[TapeWidthEntry] = &[
    TapeWidthEntry { mm: 9, px: 52 },
    TapeWidthEntry { mm: 12, px: 76 },
    TapeWidthEntry { mm: 18, px: 120 },
    TapeWidthEntry { mm: 24, px: 128 },
];

/// A device table paired with a tape table. Discovery and status decoding
/// both go through a catalog so a curated subset can stand in for the
/// built-in tables.
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    pub devices: &'static [DeviceDescriptor],
    pub tapes: &'static [TapeWidthEntry],
}

impl Catalog {
    pub const fn builtin() -> Self {
        Self {
            devices: KNOWN_MODELS,
            tapes: TAPE_WIDTHS,
        }
    }

    pub fn find_device(&self, vendor_id: u16, product_id: u16) -> Option<&'static DeviceDescriptor> {
        self.devices
            .iter()
            .find(|d| d.vendor_id == vendor_id && d.product_id == product_id)
    }

    pub fn tape_width_px(&self, mm: u8) -> Option<u32> {
        self.tapes.iter().find(|t| t.mm == mm).map(|t| t.px)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

pub fn find_device(vendor_id: u16, product_id: u16) -> Option<&'static DeviceDescriptor> {
    Catalog::builtin().find_device(vendor_id, product_id)
}

pub fn tape_width_px(mm: u8) -> Option<u32> {
    Catalog::builtin().tape_width_px(mm)
}
