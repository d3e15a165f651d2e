use crate::{ControlPipe, HostError, UsbBackend};
use rusb::{Context, Device, DeviceDescriptor, DeviceHandle, UsbContext};
use scopetemp_protocol::Setup;
use std::time::Duration;

/// [`UsbBackend`] on libusb.
#[derive(Debug)]
pub struct RusbBackend {
    context: Context,
    timeout: Duration,
}

impl RusbBackend {
    /// Creates a libusb context. Transfers time out after one second.
    pub fn new() -> Result<Self, HostError> {
        Ok(Self {
            context: Context::new().map_err(HostError::backend)?,
            timeout: Duration::from_secs(1),
        })
    }

    /// Set the control transfer timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl UsbBackend for RusbBackend {
    type Candidate = Device<Context>;
    type Pipe = RusbPipe;

    fn candidates(&mut self) -> Result<Vec<(u16, u16, Self::Candidate)>, HostError> {
        let devices = self.context.devices().map_err(HostError::backend)?;
        let mut found = Vec::new();
        for device in devices.iter() {
            match device.device_descriptor() {
                Ok(desc) => found.push((desc.vendor_id(), desc.product_id(), device)),
                Err(e) => log::debug!(
                    "bus {} address {}: no descriptor: {e}",
                    device.bus_number(),
                    device.address()
                ),
            }
        }
        Ok(found)
    }

    fn open(&mut self, candidate: &Self::Candidate) -> Result<Self::Pipe, HostError> {
        let descriptor = candidate.device_descriptor().map_err(HostError::backend)?;
        let handle = candidate.open().map_err(HostError::backend)?;
        Ok(RusbPipe {
            handle,
            descriptor,
            timeout: self.timeout,
        })
    }
}

/// An opened device. Closed on drop.
#[derive(Debug)]
pub struct RusbPipe {
    handle: DeviceHandle<Context>,
    descriptor: DeviceDescriptor,
    timeout: Duration,
}

impl ControlPipe for RusbPipe {
    fn strings(&mut self) -> Result<(String, String), HostError> {
        let manufacturer = self
            .handle
            .read_manufacturer_string_ascii(&self.descriptor)
            .map_err(HostError::backend)?;
        let product = self
            .handle
            .read_product_string_ascii(&self.descriptor)
            .map_err(HostError::backend)?;
        Ok((manufacturer, product))
    }

    fn control_in(&mut self, setup: Setup, buf: &mut [u8]) -> Result<usize, HostError> {
        let len = buf.len().min(setup.length as usize);
        self.handle
            .read_control(
                setup.request_type,
                setup.request,
                setup.value,
                setup.index,
                &mut buf[..len],
                self.timeout,
            )
            .map_err(HostError::backend)
    }

    fn control_out(&mut self, setup: Setup) -> Result<(), HostError> {
        self.handle
            .write_control(
                setup.request_type,
                setup.request,
                setup.value,
                setup.index,
                &[],
                self.timeout,
            )
            .map(|_| ())
            .map_err(HostError::backend)
    }
}
