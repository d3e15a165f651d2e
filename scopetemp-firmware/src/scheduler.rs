//! Round-robin sensor polling.
//!
//! Each [`Scheduler::step`] visits one channel and performs at most one bus transaction on
//! it, then returns so the caller can service the USB link before the next step. Four
//! consecutive steps visit every channel exactly once, whatever the individual outcomes.

use crate::{BusLines, Profile};
use ds1820::{Ds1820, Record};
use onewire_gpio::OneWireError;
use scopetemp_protocol::CHANNELS;

/// Per-channel conversion state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    /// Next visit starts a conversion.
    #[default]
    Idle,
    /// Waiting for the sensor to release the line.
    Converting,
    /// Conversion done, scratchpad not read successfully yet.
    Reading,
}

/// One sensor line and the last reading it produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    pin_id: u8,
    state: ChannelState,
    record: Record,
}

impl Channel {
    fn new(pin_id: u8) -> Self {
        Self {
            pin_id,
            state: ChannelState::Idle,
            record: Record::EMPTY,
        }
    }

    /// Line this channel is wired to.
    pub fn pin_id(&self) -> u8 {
        self.pin_id
    }

    /// Current conversion state.
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Last record that passed the CRC check, [`Record::EMPTY`] before the first one.
    pub fn record(&self) -> Record {
        self.record
    }
}

/// Why a visit did not advance a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The profile names a line the board does not have.
    NoLine,
    /// No presence pulse.
    NoPresence,
    /// Line held low after reset.
    BusStuck,
    /// Scratchpad CRC mismatch.
    Crc,
    /// The pin driver reported an error.
    Pin,
}

impl<E> From<&OneWireError<E>> for Fault {
    fn from(e: &OneWireError<E>) -> Self {
        match e {
            OneWireError::Other(_) => Fault::Pin,
            OneWireError::NoDevicePresent => Fault::NoPresence,
            OneWireError::BusStuck => Fault::BusStuck,
            OneWireError::InvalidCrc => Fault::Crc,
        }
    }
}

/// What a step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
    /// Convert T issued.
    ConversionStarted,
    /// The sensor still holds the line.
    StillConverting,
    /// The sensor released the line.
    ConversionDone,
    /// A new record was stored.
    RecordUpdated(Record),
    /// The bus operation failed; the channel will retry on its next visit.
    Fault(Fault),
}

/// Result of one [`Scheduler::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    /// Visited channel.
    pub channel: usize,
    /// State before the visit.
    pub from: ChannelState,
    /// State after the visit.
    pub to: ChannelState,
    /// What happened on the bus.
    pub event: StepEvent,
}

/// Owns the channels and the lines they are wired to.
#[derive(Debug)]
pub struct Scheduler<L> {
    lines: L,
    channels: [Channel; CHANNELS],
    cursor: usize,
    sensor: Ds1820,
}

impl<L: BusLines> Scheduler<L> {
    /// Creates every channel in [`ChannelState::Idle`] with an empty record.
    pub fn new(lines: L, profile: &Profile) -> Self {
        Self {
            lines,
            channels: profile.lines().map(Channel::new),
            cursor: 0,
            sensor: Ds1820::any(),
        }
    }

    /// Service the channel under the cursor and advance the cursor.
    pub fn step(&mut self) -> StepOutcome {
        let index = self.cursor;
        self.cursor = (self.cursor + 1) % CHANNELS;

        let channel = &mut self.channels[index];
        let from = channel.state;
        let event = match self.lines.line(channel.pin_id) {
            None => StepEvent::Fault(Fault::NoLine),
            Some(mut bus) => match from {
                ChannelState::Idle => match self.sensor.start_conversion(&mut bus) {
                    Ok(()) => {
                        channel.state = ChannelState::Converting;
                        StepEvent::ConversionStarted
                    }
                    Err(e) => StepEvent::Fault(Fault::from(&e)),
                },
                ChannelState::Converting => match self.sensor.poll_busy(&mut bus) {
                    Ok(true) => StepEvent::StillConverting,
                    Ok(false) => {
                        channel.state = ChannelState::Reading;
                        StepEvent::ConversionDone
                    }
                    Err(e) => StepEvent::Fault(Fault::from(&e)),
                },
                ChannelState::Reading => match self.sensor.read_and_validate(&mut bus) {
                    Ok(record) => {
                        channel.record = record;
                        channel.state = ChannelState::Idle;
                        StepEvent::RecordUpdated(record)
                    }
                    Err(e) => StepEvent::Fault(Fault::from(&e)),
                },
            },
        };

        let to = channel.state;
        match event {
            StepEvent::Fault(fault) => {
                log::trace!("channel {index}: {fault:?} in {from:?}, retrying next visit")
            }
            _ if from != to => log::debug!("channel {index}: {from:?} -> {to:?}"),
            _ => {}
        }

        StepOutcome {
            channel: index,
            from,
            to,
            event,
        }
    }

    /// Channel that the next [`step`](Scheduler::step) visits.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// All channels, in logical order.
    pub fn channels(&self) -> &[Channel; CHANNELS] {
        &self.channels
    }

    /// Last valid record of a channel.
    pub fn record(&self, channel: usize) -> Option<Record> {
        self.channels.get(channel).map(Channel::record)
    }

    /// The line set, e.g. to reach board-specific state.
    pub fn lines_mut(&mut self) -> &mut L {
        &mut self.lines
    }
}
