use crate::{OneWire, OneWireError, OneWireResult};
use embedded_hal::{
    delay::DelayNs,
    digital::{ErrorType, InputPin, OutputPin},
};

/// Standard-speed 1-Wire timing, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Length of the reset pulse.
    pub reset_low_us: u32,
    /// Delay after releasing the line before sampling for presence.
    pub presence_sample_us: u32,
    /// Length of the whole presence window, measured from the release.
    pub reset_window_us: u32,
    /// Time the line is driven low to open a slot.
    pub slot_lead_us: u32,
    /// Sampling point, measured from the start of the slot.
    pub slot_sample_us: u32,
    /// Length of a whole time slot.
    pub slot_us: u32,
}

impl Timing {
    /// Standard speed timing.
    pub const STANDARD: Timing = Timing {
        reset_low_us: 480,
        presence_sample_us: 66,
        reset_window_us: 480,
        slot_lead_us: 1,
        slot_sample_us: 15,
        slot_us: 60,
    };
}

impl Default for Timing {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// A bit-banged 1-Wire master.
///
/// Takes ownership of an open-drain pin (driving low pulls the line down, setting high
/// releases it to the pull-up) and a timer object implementing the
/// [`DelayNs`](embedded_hal::delay::DelayNs) trait. Both may be borrowed (`&mut P`, `&mut D`)
/// since `embedded-hal` implements its traits for mutable references.
///
/// Bus timing is not protected against interrupts unless
/// [`with_critical_sections`](OneWireGpio::with_critical_sections) is enabled. Without it
/// a long interrupt can stretch a slot; callers are expected to validate data with
/// [`OneWireCrc`](crate::OneWireCrc) and retry.
#[derive(Debug)]
pub struct OneWireGpio<P, D> {
    pin: P,
    delay: D,
    timing: Timing,
    critical_sections: bool,
}

impl<P, D> OneWireGpio<P, D> {
    /// Creates a new master on the given line with standard timing.
    pub fn new(pin: P, delay: D) -> Self {
        Self {
            pin,
            delay,
            timing: Timing::STANDARD,
            critical_sections: false,
        }
    }

    /// Overrides the slot timing.
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Run each time slot and the presence sample inside a critical section.
    ///
    /// Keeps slots within their timing limits under interrupt load, delaying interrupts by up to
    /// one slot (60 µs) or one presence sample (66 µs).
    pub fn with_critical_sections(mut self, enable: bool) -> Self {
        self.critical_sections = enable;
        self
    }

    /// Releases the pin and the timer.
    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }
}

impl<P: InputPin + OutputPin, D: DelayNs> OneWireGpio<P, D> {
    fn guarded<T>(
        &mut self,
        f: impl FnOnce(&mut P, &mut D) -> Result<T, <P as ErrorType>::Error>,
    ) -> Result<T, <P as ErrorType>::Error> {
        if self.critical_sections {
            critical_section::with(|_| f(&mut self.pin, &mut self.delay))
        } else {
            f(&mut self.pin, &mut self.delay)
        }
    }
}

impl<P: InputPin + OutputPin, D: DelayNs> OneWire for OneWireGpio<P, D> {
    type BusError = <P as ErrorType>::Error;

    fn reset(&mut self) -> OneWireResult<(), Self::BusError> {
        let t = self.timing;
        self.pin.set_low()?;
        self.delay.delay_us(t.reset_low_us);
        let present = self.guarded(|pin, delay| {
            pin.set_high()?;
            delay.delay_us(t.presence_sample_us);
            pin.is_low()
        })?;
        self.delay
            .delay_us(t.reset_window_us.saturating_sub(t.presence_sample_us));
        // the presence pulse must be over by now
        let stuck = self.pin.is_low()?;
        if !present {
            Err(OneWireError::NoDevicePresent)
        } else if stuck {
            Err(OneWireError::BusStuck)
        } else {
            Ok(())
        }
    }

    fn write_bit(&mut self, bit: bool) -> OneWireResult<bool, Self::BusError> {
        let t = self.timing;
        let observed = self.guarded(|pin, delay| {
            pin.set_low()?;
            delay.delay_us(t.slot_lead_us);
            if bit {
                pin.set_high()?;
            }
            delay.delay_us(t.slot_sample_us.saturating_sub(t.slot_lead_us));
            let low = pin.is_low()?;
            delay.delay_us(t.slot_us.saturating_sub(t.slot_sample_us));
            pin.set_high()?;
            Ok(bit && !low)
        })?;
        Ok(observed)
    }
}
