use crate::Profile;
use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};
use onewire_gpio::{OneWire, OneWireGpio};

/// A set of independent 1-Wire lines, one sensor on each.
///
/// Handing out a bus borrows the whole set, so only one line can carry a transaction at a
/// time.
pub trait BusLines {
    /// Bus driver for one line.
    type Bus<'a>: OneWire
    where
        Self: 'a;

    /// Borrow the line with this id, if it exists.
    fn line(&mut self, pin_id: u8) -> Option<Self::Bus<'_>>;
}

/// Bit-banged lines on open-drain GPIO pins sharing one delay source.
///
/// Each pin is registered under the `pin_id` a [`Profile`] uses for it, usually its bit
/// number on the port.
#[derive(Debug)]
pub struct GpioLines<P, D, const M: usize> {
    pins: [(u8, P); M],
    delay: D,
    critical_sections: bool,
}

impl<P, D, const M: usize> GpioLines<P, D, M> {
    /// Creates the line set without interrupt masking.
    pub fn new(pins: [(u8, P); M], delay: D) -> Self {
        Self {
            pins,
            delay,
            critical_sections: false,
        }
    }

    /// Creates the line set with the profile's interrupt masking setting.
    pub fn for_profile(pins: [(u8, P); M], delay: D, profile: &Profile) -> Self {
        Self::new(pins, delay).with_critical_sections(profile.mask_interrupts())
    }

    /// Run bus slots inside critical sections.
    pub fn with_critical_sections(mut self, enable: bool) -> Self {
        self.critical_sections = enable;
        self
    }

    /// Releases the pins and the delay.
    pub fn release(self) -> ([(u8, P); M], D) {
        (self.pins, self.delay)
    }
}

impl<P: InputPin + OutputPin, D: DelayNs, const M: usize> BusLines for GpioLines<P, D, M> {
    type Bus<'a>
        = OneWireGpio<&'a mut P, &'a mut D>
    where
        Self: 'a;

    fn line(&mut self, pin_id: u8) -> Option<Self::Bus<'_>> {
        let (_, pin) = self.pins.iter_mut().find(|(id, _)| *id == pin_id)?;
        Some(OneWireGpio::new(pin, &mut self.delay).with_critical_sections(self.critical_sections))
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use embedded_hal_mock::eh1::{
        delay::NoopDelay,
        digital::{Mock as PinMock, State, Transaction as PinTransaction},
    };

    #[test]
    fn lines_are_found_by_id() {
        let presence = [
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
            PinTransaction::get(State::Low),
            PinTransaction::get(State::High),
        ];
        let mut lines = GpioLines::new(
            [(7, PinMock::new(&presence)), (0, PinMock::new(&[]))],
            NoopDelay::new(),
        );
        assert!(lines.line(3).is_none());
        lines.line(7).unwrap().reset().unwrap();

        let (pins, _) = lines.release();
        for (_, mut pin) in pins {
            pin.done();
        }
    }
}
