#![no_std]
#![deny(missing_docs)]
//! # scopetemp-firmware
//!
//! Board-independent core of the ScopeTemp telescope accessory: four DS1820 temperature
//! channels polled round-robin, four autoguider relay outputs and two fan outputs, all
//! driven by vendor control requests from the host.
//!
//! A board crate supplies the pins and the USB bus and runs the main loop:
//!
//! ```ignore
//! let profile = Profile::PWM_FANS;
//! let lines = GpioLines::for_profile([(7, t1), (6, t2), (1, t3), (0, t4)], delay, &profile);
//! let guide = GuidePins { north, south, west, east };
//! let fans = PwmFans { fan1: pwm_a, fan2: pwm_b };
//! let mut controller = Controller::new(lines, guide, fans, profile);
//!
//! loop {
//!     usb_dev.poll(&mut [&mut controller]);
//!     controller.step();
//! }
//! ```
//!
//! Each `step` holds the CPU for at most one 1-Wire transaction (a reset plus a few bytes,
//! or a nine byte scratchpad read), so requests are serviced between steps without
//! starving the USB stack.
//!
//! ## Features
//! - `usb-device`: implements `usb_device::class::UsbClass` for [`Controller`].

mod control;
mod lines;
mod outputs;
mod profile;
mod scheduler;
#[cfg(feature = "usb-device")]
mod usb;

pub use control::{ControlError, Controller, Reply};
pub use lines::{BusLines, GpioLines};
pub use outputs::{FanOutputs, GuideOutputs, GuidePins, OutputError, PwmFans, SwitchedFans};
pub use profile::Profile;
pub use scheduler::{Channel, ChannelState, Fault, Scheduler, StepEvent, StepOutcome};

pub use scopetemp_protocol::{FanCommand, FanVariant, GuideBits, ProtocolError, Record};
