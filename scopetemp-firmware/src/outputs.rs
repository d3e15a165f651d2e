//! Guide and fan output drivers.

use core::fmt::Debug;
use embedded_hal::{digital::OutputPin, pwm::SetDutyCycle};
use scopetemp_protocol::{FanCommand, GuideBits};

/// Errors from output drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputError<E> {
    /// The pin or PWM driver failed.
    Hardware(E),
    /// The driver cannot produce this kind of fan command.
    Unsupported,
}

impl<E> From<E> for OutputError<E> {
    fn from(value: E) -> Self {
        Self::Hardware(value)
    }
}

/// Guide relay outputs.
pub trait GuideOutputs {
    /// Hardware error type.
    type Error: Debug;

    /// Drive every guide line to the state in `bits`.
    fn apply(&mut self, bits: GuideBits) -> Result<(), OutputError<Self::Error>>;
}

/// Fan outputs.
pub trait FanOutputs {
    /// Hardware error type.
    type Error: Debug;

    /// Set both fans.
    fn apply(&mut self, command: FanCommand) -> Result<(), OutputError<Self::Error>>;
}

/// Four guide lines on push-pull GPIO, active high.
#[derive(Debug)]
pub struct GuidePins<P> {
    /// DEC+
    pub north: P,
    /// DEC-
    pub south: P,
    /// RA+
    pub west: P,
    /// RA-
    pub east: P,
}

impl<P: OutputPin> GuideOutputs for GuidePins<P> {
    type Error = P::Error;

    fn apply(&mut self, bits: GuideBits) -> Result<(), OutputError<Self::Error>> {
        self.north.set_state(bits.north().into())?;
        self.south.set_state(bits.south().into())?;
        self.west.set_state(bits.west().into())?;
        self.east.set_state(bits.east().into())?;
        Ok(())
    }
}

/// Two PWM channels; a 16-bit duty of `0xffff` is full speed.
///
/// The channels may be of different types, e.g. two timers, as long as they share an
/// error type.
#[derive(Debug)]
pub struct PwmFans<A, B = A> {
    /// Fan 1 channel.
    pub fan1: A,
    /// Fan 2 channel.
    pub fan2: B,
}

impl<A: SetDutyCycle, B: SetDutyCycle<Error = A::Error>> FanOutputs for PwmFans<A, B> {
    type Error = A::Error;

    fn apply(&mut self, command: FanCommand) -> Result<(), OutputError<Self::Error>> {
        let FanCommand::Duty { fan1, fan2 } = command else {
            return Err(OutputError::Unsupported);
        };
        self.fan1.set_duty_cycle_fraction(fan1, u16::MAX)?;
        self.fan2.set_duty_cycle_fraction(fan2, u16::MAX)?;
        Ok(())
    }
}

/// Two switched fans on push-pull GPIO, active high.
#[derive(Debug)]
pub struct SwitchedFans<A, B = A> {
    /// Fan 1 output.
    pub fan1: A,
    /// Fan 2 output.
    pub fan2: B,
}

impl<A: OutputPin, B: OutputPin<Error = A::Error>> FanOutputs for SwitchedFans<A, B> {
    type Error = A::Error;

    fn apply(&mut self, command: FanCommand) -> Result<(), OutputError<Self::Error>> {
        let FanCommand::Switched { fan1, fan2 } = command else {
            return Err(OutputError::Unsupported);
        };
        self.fan1.set_state(fan1.into())?;
        self.fan2.set_state(fan2.into())?;
        Ok(())
    }
}
