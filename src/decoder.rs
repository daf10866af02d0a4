use enum_dispatch::*;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;
use std::convert::TryFrom;

/// Temperature reads above the sensor's range.
pub const TEMP_OVER_RANGE: u16 = 20000;
/// Temperature reads below the sensor's range (-20000 as an unsigned word).
pub const TEMP_UNDER_RANGE: u16 = (65536 - 20000) as u16;
/// No sensor connected on this input.
pub const TEMP_SENSOR_ABSENT: u16 = 20001;
/// Sensor input switched off.
pub const TEMP_SENSOR_INACTIVE: u16 = 20002;

/// Flap is still homing after power-up.
pub const FLAP_INITIALIZING: u16 = 255;
/// SDS sensitivity switched off.
pub const SDS_OFF: u16 = 255;

// DecodedValue {{{
/// What a consumer sees for one register.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DecodedValue {
    Integer(u16),
    Float(f64),
    /// Fixed label from one of the lookup tables or a sentinel.
    Label(&'static str),
    /// Text assembled from several parts.
    Text(String),
    /// No reading has ever been cached for this register.
    Unavailable,
}

impl DecodedValue {
    pub fn is_available(&self) -> bool {
        !matches!(self, Self::Unavailable)
    }
}

impl std::fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{:.1}", v),
            Self::Label(s) => write!(f, "{}", s),
            Self::Text(s) => write!(f, "{}", s),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}
// }}}

/// Divides and rounds to one decimal place.
///
/// Rounds the quotient as stored, so 9/60 (0.1499..) gives 0.1 and exact
/// ties such as 15/60 go to the even digit.
pub fn scale(raw: u16, divider: u16) -> f64 {
    let value = raw as f64 / divider.max(1) as f64;
    format!("{:.1}", value).parse().unwrap_or(value)
}

fn scaled_or_raw(raw: u16, divider: Option<u16>) -> DecodedValue {
    match divider {
        Some(d) => DecodedValue::Float(scale(raw, d)),
        None => DecodedValue::Integer(raw),
    }
}

#[enum_dispatch]
pub trait Decode {
    /// Maps one raw word to its display value. Never fails.
    fn decode(&self, raw: u16, divider: Option<u16>) -> DecodedValue;
}

/// One variant per kind of register, picked when the register catalog is
/// built.
#[enum_dispatch(Decode)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DecodeRule {
    Temperature(Temperature),
    Minutes(Minutes),
    FlapPosition(FlapPosition),
    Sensitivity(Sensitivity),
    Lookup(Lookup),
    FaultFlags(FaultFlags),
    Plain(Plain),
}

// {{{ Temperature
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Temperature;

impl Decode for Temperature {
    fn decode(&self, raw: u16, divider: Option<u16>) -> DecodedValue {
        match raw {
            TEMP_OVER_RANGE => DecodedValue::Label("HI"),
            TEMP_UNDER_RANGE => DecodedValue::Label("LO"),
            TEMP_SENSOR_ABSENT => DecodedValue::Label("---"),
            TEMP_SENSOR_INACTIVE => DecodedValue::Label("Neaktivní"),
            // tenths of a degree
            _ => scaled_or_raw(raw, divider),
        }
    }
}
// }}}

// {{{ Minutes
/// Seconds on the wire, minutes on display.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Minutes;

impl Decode for Minutes {
    fn decode(&self, raw: u16, divider: Option<u16>) -> DecodedValue {
        scaled_or_raw(raw, divider)
    }
}
// }}}

// {{{ FlapPosition
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FlapPosition;

impl Decode for FlapPosition {
    fn decode(&self, raw: u16, _divider: Option<u16>) -> DecodedValue {
        if raw == FLAP_INITIALIZING {
            return DecodedValue::Label("Inicializace");
        }

        DecodedValue::Integer(raw.min(100))
    }
}
// }}}

// {{{ Sensitivity
/// Tens digit is the level, units digit is 1 when the detector is active.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Sensitivity;

impl Decode for Sensitivity {
    fn decode(&self, raw: u16, _divider: Option<u16>) -> DecodedValue {
        if raw == SDS_OFF {
            return DecodedValue::Label("Vypnuto");
        }

        let active = raw % 10;
        let level = raw / 10;

        let level = Offset::try_from(level)
            .map(Offset::label)
            .unwrap_or("Neznámé");
        let state = if active == 1 {
            "(Aktivní)"
        } else {
            "(Neaktivní)"
        };

        DecodedValue::Text(format!("{} {}", level, state))
    }
}
// }}}

// {{{ Lookup
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Table {
    UnitStatus,
    CombustionMode,
    FuelType,
    RefuelOffset,
    StatusColor,
    BeepMode,
    Relay,
}

impl Table {
    pub fn label(&self, raw: u16) -> Option<&'static str> {
        match self {
            Self::UnitStatus => UnitStatus::try_from(raw).ok().map(UnitStatus::label),
            Self::CombustionMode => CombustionMode::try_from(raw).ok().map(CombustionMode::label),
            Self::FuelType => FuelType::try_from(raw).ok().map(FuelType::label),
            Self::RefuelOffset => Offset::try_from(raw).ok().map(Offset::label),
            Self::StatusColor => StatusColor::try_from(raw).ok().map(StatusColor::label),
            Self::BeepMode => BeepMode::try_from(raw).ok().map(BeepMode::label),
            Self::Relay => RelayState::try_from(raw).ok().map(RelayState::label),
        }
    }
}

/// Enumerated register; values missing from the table pass through as the
/// raw integer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Lookup(pub Table);

impl Decode for Lookup {
    fn decode(&self, raw: u16, _divider: Option<u16>) -> DecodedValue {
        match self.0.label(raw) {
            Some(label) => DecodedValue::Label(label),
            None => DecodedValue::Integer(raw),
        }
    }
}
// }}}

// {{{ FaultFlags
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive)]
#[repr(u16)]
pub enum Fault {
    SensorT1 = 1 << 0,
    SensorT2 = 1 << 1,
    DoorSensor = 1 << 3,
}

impl Fault {
    /// In ascending bit order.
    pub const ALL: [Fault; 3] = [Fault::SensorT1, Fault::SensorT2, Fault::DoorSensor];

    pub fn label(self) -> &'static str {
        match self {
            Self::SensorT1 => "T1",
            Self::SensorT2 => "T2",
            Self::DoorSensor => "Dvířka",
        }
    }

    pub fn active(raw: u16) -> Vec<Fault> {
        Self::ALL
            .into_iter()
            .filter(|f| raw & u16::from(*f) != 0)
            .collect()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FaultFlags;

impl Decode for FaultFlags {
    fn decode(&self, raw: u16, _divider: Option<u16>) -> DecodedValue {
        if raw == 0 {
            return DecodedValue::Label("Bez poruchy");
        }

        let faults: Vec<&str> = Fault::active(raw).into_iter().map(Fault::label).collect();
        if faults.is_empty() {
            return DecodedValue::Text(format!("Neznámá ({})", raw));
        }

        DecodedValue::Text(faults.join(", "))
    }
}
// }}}

// {{{ Plain
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Plain;

impl Decode for Plain {
    fn decode(&self, raw: u16, divider: Option<u16>) -> DecodedValue {
        scaled_or_raw(raw, divider)
    }
}
// }}}

// {{{ label tables
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum UnitStatus {
    PowerOn = 0,
    Idle100 = 1,
    Idle0 = 2,
    Kindling = 3,
    RegulationStart = 4,
    BurningRising = 5,
    BurningFalling = 6,
    Refuel = 7,
    Embers = 8,
    NotLit = 10,
    Overheated = 13,
    DoorOpenTooLong = 14,
    TestMode = 15,
    TemperatureFault = 20,
}

impl UnitStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::PowerOn => "Start napájení",
            Self::Idle100 => "Klidový stav 100%",
            Self::Idle0 => "Klidový stav 0%",
            Self::Kindling => "Zatápění",
            Self::RegulationStart => "Start regulace",
            Self::BurningRising => "Hoření (vzrůstající teplota)",
            Self::BurningFalling => "Hoření (klesající teplota)",
            Self::Refuel => "Přiložit",
            Self::Embers => "Žárový proces",
            Self::NotLit => "Nezatopeno",
            Self::Overheated => "Přetopeno",
            Self::DoorOpenTooLong => "Dlouho otevřená dvířka",
            Self::TestMode => "Testovací režim",
            Self::TemperatureFault => "Porucha teploty",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum CombustionMode {
    Eco = 1,
    Standard = 2,
    Turbo = 3,
}

impl CombustionMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Eco => "Eco",
            Self::Standard => "Standard",
            Self::Turbo => "Turbo",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum FuelType {
    Wood = 1,
    Briquettes = 2,
}

impl FuelType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Wood => "Dřevo",
            Self::Briquettes => "Brikety",
        }
    }
}

/// Five-step scale shared by the refuel offset and the SDS level.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum Offset {
    Minus2 = 1,
    Minus1 = 2,
    Standard = 3,
    Plus1 = 4,
    Plus2 = 5,
}

impl Offset {
    pub fn label(self) -> &'static str {
        match self {
            Self::Minus2 => "-2",
            Self::Minus1 => "-1",
            Self::Standard => "Standard",
            Self::Plus1 => "+1",
            Self::Plus2 => "+2",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum StatusColor {
    NoColor = 0,
    Yellow = 1,
    Green = 2,
    Red = 3,
}

impl StatusColor {
    pub fn label(self) -> &'static str {
        match self {
            Self::NoColor => "Bez barvy",
            Self::Yellow => "Žlutá",
            Self::Green => "Zelená",
            Self::Red => "Červená",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum BeepMode {
    Off = 0,
    On = 15,
}

impl BeepMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "Vypnuto",
            Self::On => "Zapnuto",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum RelayState {
    Open = 0,
    Closed = 1,
}

impl RelayState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "Rozepnuto",
            Self::Closed => "Sepnuto",
        }
    }
}
// }}}

// DeviceVariant {{{
/// Hardware model, guessed from the T2 input.
///
/// The TimNet 100 has no T2 line, so that register reads one of the
/// over-range/absent/inactive sentinels. There is no model register; this is
/// a display filter, not an identification.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum DeviceVariant {
    TimNet100,
    TimNet200,
}

impl DeviceVariant {
    /// A missing T2 value is read as 0, i.e. the larger variant.
    pub fn infer(t2: Option<u16>) -> Self {
        match t2.unwrap_or(0) {
            TEMP_OVER_RANGE | TEMP_SENSOR_ABSENT | TEMP_SENSOR_INACTIVE => Self::TimNet100,
            _ => Self::TimNet200,
        }
    }

    pub fn model(&self) -> &'static str {
        match self {
            Self::TimNet100 => "TimNet 100",
            Self::TimNet200 => "TimNet 200",
        }
    }

    pub fn is_larger(&self) -> bool {
        matches!(self, Self::TimNet200)
    }
}
// }}}

/// Door switch: 0 is closed, anything else is open.
pub fn door_open(raw: Option<u16>) -> Option<bool> {
    raw.map(|v| v != 0)
}
