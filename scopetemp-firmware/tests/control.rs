use core::convert::Infallible;
use ds1820::sim::SimDs1820;
use scopetemp_firmware::{
    BusLines, ControlError, Controller, FanCommand, FanOutputs, FanVariant, GuideBits,
    GuideOutputs, OutputError, Profile, ProtocolError, Record, Reply,
};

const GET_TEMPERATURES: u8 = 1;
const SET_GUIDE_OUTPUTS: u8 = 2;
const SET_FAN_OUTPUTS: u8 = 3;

/// One simulated sensor per logical channel, wired as the built-in profiles expect.
struct SimLines {
    ids: [u8; 4],
    sensors: [SimDs1820; 4],
}

impl SimLines {
    fn new(sensors: [SimDs1820; 4]) -> Self {
        Self {
            ids: Profile::PWM_FANS.lines(),
            sensors,
        }
    }
}

impl BusLines for SimLines {
    type Bus<'a> = &'a mut SimDs1820;

    fn line(&mut self, pin_id: u8) -> Option<Self::Bus<'_>> {
        let i = self.ids.iter().position(|&id| id == pin_id)?;
        self.sensors.get_mut(i)
    }
}

#[derive(Debug, Default)]
struct RecordingGuide {
    applied: Vec<u8>,
    fail: bool,
}

impl GuideOutputs for RecordingGuide {
    type Error = &'static str;

    fn apply(&mut self, bits: GuideBits) -> Result<(), OutputError<Self::Error>> {
        if self.fail {
            return Err(OutputError::Hardware("relay driver fault"));
        }
        self.applied.push(bits.into_bits());
        Ok(())
    }
}

#[derive(Debug)]
struct RecordingFans {
    variant: FanVariant,
    applied: Vec<FanCommand>,
}

impl RecordingFans {
    fn new(variant: FanVariant) -> Self {
        Self {
            variant,
            applied: Vec::new(),
        }
    }
}

impl FanOutputs for RecordingFans {
    type Error = Infallible;

    fn apply(&mut self, command: FanCommand) -> Result<(), OutputError<Self::Error>> {
        if command.variant() != self.variant {
            return Err(OutputError::Unsupported);
        }
        self.applied.push(command);
        Ok(())
    }
}

type TestController = Controller<SimLines, RecordingGuide, RecordingFans>;

fn record(lsb: u8, count_remain: u8) -> Record {
    Record::from_bytes([lsb, 0x00, count_remain, 0x10])
}

fn controller(profile: Profile) -> TestController {
    let sensors = [record(0x50, 0x0c), record(0x31, 0x04), record(0x2e, 0x08), record(0x60, 0x10)]
        .map(SimDs1820::new);
    Controller::new(
        SimLines::new(sensors),
        RecordingGuide::default(),
        RecordingFans::new(profile.fan_variant()),
        profile,
    )
}

fn unplugged() -> SimLines {
    SimLines::new(std::array::from_fn(|_| {
        SimDs1820::new(Record::EMPTY).with_present(false)
    }))
}

fn read(ctl: &mut TestController, channel: u16) -> [u8; 4] {
    match ctl.handle(GET_TEMPERATURES, channel, 0) {
        Ok(Reply::Record(bytes)) => bytes,
        other => panic!("unexpected reply {other:?}"),
    }
}

#[test]
fn temperatures_are_empty_until_first_read() {
    let mut ctl = controller(Profile::PWM_FANS);
    assert_eq!(read(&mut ctl, 0), [0; 4]);
    // converting, then reading: still no record
    for _ in 0..8 {
        ctl.step();
    }
    assert_eq!(read(&mut ctl, 0), [0; 4]);
    for _ in 0..4 {
        ctl.step();
    }
    assert_eq!(read(&mut ctl, 0), [0x50, 0x00, 0x0c, 0x10]);
    assert_eq!(read(&mut ctl, 3), [0x60, 0x00, 0x10, 0x10]);
}

#[test]
fn reading_does_not_disturb_polling() {
    let mut ctl = controller(Profile::PWM_FANS);
    for _ in 0..12 {
        ctl.step();
        read(&mut ctl, 1);
    }
    assert_eq!(ctl.scheduler().cursor(), 0);
    assert_eq!(read(&mut ctl, 1), [0x31, 0x00, 0x04, 0x10]);
}

#[test]
fn record_changes_only_on_successful_read() {
    let mut ctl = controller(Profile::PWM_FANS);
    for _ in 0..12 {
        ctl.step();
    }
    let sensor = &mut ctl.scheduler_mut().lines_mut().sensors[2];
    sensor.set_record(record(0x32, 0x02));
    sensor.set_corrupt_reads(1);

    // new conversion plus a corrupted read: the old record stays
    for _ in 0..12 {
        ctl.step();
        assert_eq!(read(&mut ctl, 2), [0x2e, 0x00, 0x08, 0x10]);
    }
    for _ in 0..4 {
        ctl.step();
    }
    assert_eq!(read(&mut ctl, 2), [0x32, 0x00, 0x02, 0x10]);
}

#[test]
fn channel_index_wraps() {
    let mut ctl = controller(Profile::PWM_FANS);
    for _ in 0..12 {
        ctl.step();
    }
    assert_eq!(read(&mut ctl, 5), read(&mut ctl, 1));
    assert_eq!(read(&mut ctl, 0xff07), read(&mut ctl, 3));
}

#[test]
fn guide_request_replaces_state() {
    let mut ctl = controller(Profile::PWM_FANS);
    let north_east = GuideBits::from_directions(true, false, false, true).into_bits();
    assert_eq!(ctl.handle(SET_GUIDE_OUTPUTS, north_east as u16, 0), Ok(Reply::Empty));
    assert_eq!(ctl.guide_state().into_bits(), 0b10_0010);

    let south = GuideBits::from_directions(false, true, false, false).into_bits();
    ctl.handle(SET_GUIDE_OUTPUTS, south as u16, 0).unwrap();
    assert_eq!(ctl.guide_state().into_bits(), 0b01_0000);

    // same value twice leaves the outputs where they were
    ctl.handle(SET_GUIDE_OUTPUTS, south as u16, 0).unwrap();
    assert_eq!(ctl.guide_outputs().applied, vec![0b10_0010, 0b01_0000, 0b01_0000]);
}

#[test]
fn guide_request_ignores_unwired_bits() {
    let mut ctl = controller(Profile::PWM_FANS);
    ctl.handle(SET_GUIDE_OUTPUTS, 0xffff, 0).unwrap();
    assert_eq!(ctl.guide_state().into_bits(), GuideBits::MASK);

    // a board with only the DEC relays fitted
    let mut ctl = controller(Profile::PWM_FANS.with_guide_mask(0b0001_0010));
    ctl.handle(SET_GUIDE_OUTPUTS, 0xff, 0).unwrap();
    let state = ctl.guide_state();
    assert!(state.north() && state.south());
    assert!(!state.west() && !state.east());
}

#[test]
fn failed_guide_output_keeps_previous_state() {
    let mut ctl = Controller::new(
        unplugged(),
        RecordingGuide {
            applied: Vec::new(),
            fail: true,
        },
        RecordingFans::new(FanVariant::Pwm),
        Profile::PWM_FANS,
    );
    assert_eq!(ctl.handle(SET_GUIDE_OUTPUTS, 0b10, 0), Err(ControlError::GuideOutput));
    assert_eq!(ctl.guide_state(), GuideBits::new());
}

#[test]
fn pwm_fan_request_carries_both_duties() {
    let mut ctl = controller(Profile::PWM_FANS);
    ctl.handle(SET_FAN_OUTPUTS, 0x8000, 0xffff).unwrap();
    ctl.handle(SET_FAN_OUTPUTS, 0, 0x1000).unwrap();
    assert_eq!(
        ctl.fan_outputs().applied,
        vec![
            FanCommand::Duty {
                fan1: 0x8000,
                fan2: 0xffff
            },
            FanCommand::Duty {
                fan1: 0,
                fan2: 0x1000
            },
        ]
    );
    assert_eq!(
        ctl.fan_state(),
        Some(FanCommand::Duty {
            fan1: 0,
            fan2: 0x1000
        })
    );
}

#[test]
fn switched_fan_request_uses_low_bits() {
    let mut ctl = controller(Profile::SWITCHED_FANS);
    ctl.handle(SET_FAN_OUTPUTS, 0b01, 0).unwrap();
    ctl.handle(SET_FAN_OUTPUTS, 0b10, 0).unwrap();
    assert_eq!(
        ctl.fan_outputs().applied,
        vec![
            FanCommand::Switched {
                fan1: true,
                fan2: false
            },
            FanCommand::Switched {
                fan1: false,
                fan2: true
            },
        ]
    );
}

#[test]
fn fan_driver_of_other_variant_is_refused() {
    let mut ctl = Controller::new(
        unplugged(),
        RecordingGuide::default(),
        RecordingFans::new(FanVariant::Pwm),
        Profile::SWITCHED_FANS,
    );
    assert_eq!(
        ctl.handle(SET_FAN_OUTPUTS, 0b11, 0),
        Err(ControlError::UnsupportedFanCommand)
    );
    assert_eq!(ctl.fan_state(), None);
}

#[test]
fn unknown_request_is_refused() {
    let mut ctl = controller(Profile::PWM_FANS);
    assert_eq!(
        ctl.handle(0, 0, 0),
        Err(ControlError::Protocol(ProtocolError::UnknownRequest(0)))
    );
    assert_eq!(
        ctl.handle(0x42, 0xffff, 0xffff),
        Err(ControlError::Protocol(ProtocolError::UnknownRequest(0x42)))
    );
    assert!(ctl.guide_outputs().applied.is_empty());
    assert!(ctl.fan_outputs().applied.is_empty());
}
