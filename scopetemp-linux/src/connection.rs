use crate::{HostError, decode};
use scopetemp_protocol::{
    CHANNELS, Command, FanCommand, MANUFACTURER, Opcode, PRODUCT, PRODUCT_ID, REQUEST_TYPE_OUT,
    Record, Setup, VENDOR_ID, device_id,
};

/// Access to the attached USB devices.
pub trait UsbBackend {
    /// An enumerated, unopened device.
    type Candidate;
    /// An opened device.
    type Pipe: ControlPipe;

    /// Every attached device with its vendor and product id.
    fn candidates(&mut self) -> Result<Vec<(u16, u16, Self::Candidate)>, HostError>;

    /// Open a device for control transfers.
    fn open(&mut self, candidate: &Self::Candidate) -> Result<Self::Pipe, HostError>;
}

/// Control transfers on an opened device.
pub trait ControlPipe {
    /// Manufacturer and product string descriptors.
    fn strings(&mut self) -> Result<(String, String), HostError>;

    /// Device-to-host transfer. Returns the number of bytes received.
    fn control_in(&mut self, setup: Setup, buf: &mut [u8]) -> Result<usize, HostError>;

    /// Host-to-device transfer without a data stage.
    fn control_out(&mut self, setup: Setup) -> Result<(), HostError>;
}

/// What a device must report to be accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    vendor_id: u16,
    product_id: u16,
    manufacturer: String,
    product: String,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            vendor_id: VENDOR_ID,
            product_id: PRODUCT_ID,
            manufacturer: MANUFACTURER.into(),
            product: PRODUCT.into(),
        }
    }
}

impl DeviceIdentity {
    /// Match a different vendor and product id.
    pub fn with_ids(mut self, vendor_id: u16, product_id: u16) -> Self {
        self.vendor_id = vendor_id;
        self.product_id = product_id;
        self
    }

    /// Match a different manufacturer string.
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = manufacturer.into();
        self
    }

    /// Match a different product string.
    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = product.into();
        self
    }

    /// Combined id this identity accepts.
    pub fn device_id(&self) -> u32 {
        device_id(self.vendor_id, self.product_id)
    }

    fn strings_match(&self, manufacturer: &str, product: &str) -> bool {
        self.manufacturer == manufacturer && self.product == product
    }
}

/// Connection to one accessory.
///
/// The connection is an explicit resource: every request fails with
/// [`HostError::LinkUnavailable`] until [`connect`](ScopeTemp::connect) succeeds, and the
/// device is released by [`disconnect`](ScopeTemp::disconnect) or on drop.
pub struct ScopeTemp<B: UsbBackend> {
    backend: B,
    identity: DeviceIdentity,
    pipe: Option<B::Pipe>,
}

impl<B: UsbBackend> ScopeTemp<B> {
    /// Creates an unconnected handle matching the default identity.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            identity: DeviceIdentity::default(),
            pipe: None,
        }
    }

    /// Match devices against `identity` instead.
    pub fn with_identity(mut self, identity: DeviceIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Find the first matching device and open it. Drops any connection already held.
    ///
    /// Devices with the right ids whose strings cannot be read or do not match are
    /// skipped.
    pub fn connect(&mut self) -> Result<(), HostError> {
        self.disconnect();
        let wanted = self.identity.device_id();
        for (vid, pid, candidate) in self.backend.candidates()? {
            if device_id(vid, pid) != wanted {
                continue;
            }
            let mut pipe = match self.backend.open(&candidate) {
                Ok(pipe) => pipe,
                Err(e) => {
                    log::debug!("{vid:04x}:{pid:04x}: open failed: {e}");
                    continue;
                }
            };
            match pipe.strings() {
                Ok((manufacturer, product))
                    if self.identity.strings_match(&manufacturer, &product) =>
                {
                    log::info!("connected to {product} ({manufacturer})");
                    self.pipe = Some(pipe);
                    return Ok(());
                }
                Ok((manufacturer, product)) => {
                    log::debug!("{vid:04x}:{pid:04x}: skipping {product} ({manufacturer})")
                }
                Err(e) => log::debug!("{vid:04x}:{pid:04x}: unreadable strings: {e}"),
            }
        }
        Err(HostError::DeviceNotFound)
    }

    /// Release the device. Does nothing when not connected.
    pub fn disconnect(&mut self) {
        if self.pipe.take().is_some() {
            log::info!("disconnected");
        }
    }

    /// Whether a device is held.
    pub fn is_connected(&self) -> bool {
        self.pipe.is_some()
    }

    fn pipe(&mut self) -> Result<&mut B::Pipe, HostError> {
        self.pipe.as_mut().ok_or(HostError::LinkUnavailable)
    }

    /// Last validated record of one channel.
    pub fn get_record(&mut self, channel: usize) -> Result<Record, HostError> {
        let setup = Command::GetTemperatures { channel }.setup();
        let mut buf = [0; Record::LEN];
        let got = self.pipe()?.control_in(setup, &mut buf)?;
        if got != Record::LEN {
            log::warn!("channel {channel}: short read ({got} bytes)");
            return Err(HostError::ShortRead {
                expected: Record::LEN,
                got,
            });
        }
        Ok(Record::from_bytes(buf))
    }

    /// Records of all channels.
    pub fn get_records(&mut self) -> Result<[Record; CHANNELS], HostError> {
        let mut records = [Record::EMPTY; CHANNELS];
        for (channel, record) in records.iter_mut().enumerate() {
            *record = self.get_record(channel)?;
        }
        Ok(records)
    }

    /// Temperatures of all channels in degrees Celsius. `None` for channels that have not
    /// produced a reading yet.
    pub fn get_temperatures(&mut self) -> Result<[Option<f64>; CHANNELS], HostError> {
        Ok(self.get_records()?.map(|record| decode::celsius(&record)))
    }

    /// Set both fans. The command must match the board's fan wiring.
    pub fn set_fan_outputs(&mut self, command: FanCommand) -> Result<(), HostError> {
        let (value, index) = decode::fan_fields(command);
        self.send(Opcode::SetFanOutputs, value, index)
    }

    /// Replace the guide output state.
    pub fn set_guide_outputs(
        &mut self,
        north: bool,
        south: bool,
        west: bool,
        east: bool,
    ) -> Result<(), HostError> {
        let value = decode::guide_value(north, south, west, east);
        self.send(Opcode::SetGuideOutputs, value, 0)
    }

    fn send(&mut self, opcode: Opcode, value: u16, index: u16) -> Result<(), HostError> {
        let setup = Setup {
            request_type: REQUEST_TYPE_OUT,
            request: opcode as u8,
            value,
            index,
            length: 0,
        };
        self.pipe()?.control_out(setup).inspect_err(|e| {
            log::warn!("request {}: {e}", setup.request);
        })
    }
}
