use scopetemp_protocol::{CHANNELS, FanVariant, GuideBits};

/// Board revision description.
///
/// Everything that differs between hardware revisions lives here, so the polling and
/// request handling code is shared by all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    lines: [u8; CHANNELS],
    fan: FanVariant,
    guide_mask: u8,
    mask_interrupts: bool,
}

impl Default for Profile {
    fn default() -> Self {
        Self::PWM_FANS
    }
}

impl Profile {
    /// Revision with two PWM fan outputs. Sensors on port bits 7, 6, 1 and 0.
    pub const PWM_FANS: Profile = Profile {
        lines: [7, 6, 1, 0],
        fan: FanVariant::Pwm,
        guide_mask: GuideBits::MASK,
        mask_interrupts: false,
    };

    /// Revision with two switched fan outputs, wired like [`PWM_FANS`](Self::PWM_FANS)
    /// otherwise.
    pub const SWITCHED_FANS: Profile = Profile {
        lines: [7, 6, 1, 0],
        fan: FanVariant::Switched,
        guide_mask: GuideBits::MASK,
        mask_interrupts: false,
    };

    /// Map logical channel `i` to bus line `lines[i]`.
    pub const fn with_lines(mut self, lines: [u8; CHANNELS]) -> Self {
        self.lines = lines;
        self
    }

    /// Select how fan requests are interpreted.
    pub const fn with_fan_variant(mut self, fan: FanVariant) -> Self {
        self.fan = fan;
        self
    }

    /// Restrict which guide bits reach the outputs.
    pub const fn with_guide_mask(mut self, mask: u8) -> Self {
        self.guide_mask = mask & GuideBits::MASK;
        self
    }

    /// Mask interrupts during each bus time slot.
    ///
    /// Off by default: the USB stack needs its interrupt serviced promptly, and a slot
    /// stretched by an interrupt is caught by the scratchpad CRC.
    pub const fn with_interrupt_masking(mut self, enable: bool) -> Self {
        self.mask_interrupts = enable;
        self
    }

    /// Bus line of each logical channel.
    pub const fn lines(&self) -> [u8; CHANNELS] {
        self.lines
    }

    /// Fan wiring.
    pub const fn fan_variant(&self) -> FanVariant {
        self.fan
    }

    /// Guide bits wired on this board.
    pub const fn guide_mask(&self) -> u8 {
        self.guide_mask
    }

    /// Whether bus slots run with interrupts masked.
    pub const fn mask_interrupts(&self) -> bool {
        self.mask_interrupts
    }
}
