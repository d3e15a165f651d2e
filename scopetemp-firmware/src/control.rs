use crate::{
    BusLines, FanOutputs, GuideOutputs, OutputError, Profile, Scheduler, StepOutcome,
};
use core::fmt;
use scopetemp_protocol::{CHANNELS, Command, FanCommand, GuideBits, ProtocolError, Record};

/// Why a control request was refused. The USB binding answers all of these with a STALL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    /// Unknown request code.
    Protocol(ProtocolError),
    /// The guide outputs could not be driven.
    GuideOutput,
    /// The fan outputs could not be driven.
    FanOutput,
    /// The fan driver does not match the profile's fan variant.
    UnsupportedFanCommand,
}

impl From<ProtocolError> for ControlError {
    fn from(value: ProtocolError) -> Self {
        Self::Protocol(value)
    }
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol(e) => write!(f, "{e}"),
            Self::GuideOutput => f.write_str("guide output failed"),
            Self::FanOutput => f.write_str("fan output failed"),
            Self::UnsupportedFanCommand => f.write_str("fan command does not match board"),
        }
    }
}

/// Data stage of a handled request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Send this record to the host.
    Record([u8; Record::LEN]),
    /// Nothing to send.
    Empty,
}

impl Reply {
    /// Bytes of the data stage.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Record(bytes) => bytes,
            Self::Empty => &[],
        }
    }
}

/// The accessory: sensor polling plus the vendor request handler.
///
/// The main loop alternates between servicing the USB device and calling
/// [`step`](Controller::step):
///
/// ```ignore
/// loop {
///     usb_dev.poll(&mut [&mut controller]);
///     controller.step();
/// }
/// ```
#[derive(Debug)]
pub struct Controller<L, G, F> {
    scheduler: Scheduler<L>,
    guide: G,
    fans: F,
    profile: Profile,
    guide_state: GuideBits,
    fan_state: Option<FanCommand>,
}

impl<L: BusLines, G: GuideOutputs, F: FanOutputs> Controller<L, G, F> {
    /// Creates the controller. Outputs are left untouched until the first request.
    pub fn new(lines: L, guide: G, fans: F, profile: Profile) -> Self {
        Self {
            scheduler: Scheduler::new(lines, &profile),
            guide,
            fans,
            profile,
            guide_state: GuideBits::new(),
            fan_state: None,
        }
    }

    /// One scheduler step. See [`Scheduler::step`].
    pub fn step(&mut self) -> StepOutcome {
        self.scheduler.step()
    }

    /// Handle a vendor request.
    ///
    /// Output changes take effect before this returns. There is no state besides the
    /// outputs and the channel records, so requests are independent of each other.
    pub fn handle(&mut self, request: u8, value: u16, index: u16) -> Result<Reply, ControlError> {
        match Command::decode(request, value, index, self.profile.fan_variant())? {
            Command::GetTemperatures { channel } => Ok(Reply::Record(self.record(channel).to_bytes())),
            Command::SetGuideOutputs(bits) => {
                let bits = bits.masked(self.profile.guide_mask());
                self.guide.apply(bits).map_err(|e| {
                    log::warn!("guide outputs {:#04x}: {e:?}", bits.into_bits());
                    ControlError::GuideOutput
                })?;
                self.guide_state = bits;
                Ok(Reply::Empty)
            }
            Command::SetFanOutputs(command) => {
                self.fans.apply(command).map_err(|e| match e {
                    OutputError::Unsupported => ControlError::UnsupportedFanCommand,
                    OutputError::Hardware(e) => {
                        log::warn!("fan outputs {command:?}: {e:?}");
                        ControlError::FanOutput
                    }
                })?;
                self.fan_state = Some(command);
                Ok(Reply::Empty)
            }
        }
    }

    /// Last valid record of a channel; `channel` wraps like the request's channel field.
    pub fn record(&self, channel: usize) -> Record {
        self.scheduler.channels()[channel % CHANNELS].record()
    }

    /// Guide bits last applied.
    pub fn guide_state(&self) -> GuideBits {
        self.guide_state
    }

    /// Fan command last applied.
    pub fn fan_state(&self) -> Option<FanCommand> {
        self.fan_state
    }

    /// Board profile.
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// The polling scheduler.
    pub fn scheduler(&self) -> &Scheduler<L> {
        &self.scheduler
    }

    /// The polling scheduler, mutably.
    pub fn scheduler_mut(&mut self) -> &mut Scheduler<L> {
        &mut self.scheduler
    }

    /// Guide output driver.
    pub fn guide_outputs(&self) -> &G {
        &self.guide
    }

    /// Fan output driver.
    pub fn fan_outputs(&self) -> &F {
        &self.fans
    }
}
