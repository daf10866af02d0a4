use crate::decoder::{
    Decode, DecodeRule, DecodedValue, DeviceVariant, FaultFlags, FlapPosition, Lookup, Minutes,
    Plain, Sensitivity, Table, Temperature,
};
use serde::Serialize;

/// Presentation hints for consumers. They never change how a value decodes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Presentation {
    pub device_class: Option<&'static str>,
    pub state_class: Option<&'static str>,
    pub entity_category: Option<&'static str>,
    pub icon: Option<&'static str>,
}

impl Presentation {
    const fn icon(icon: &'static str) -> Self {
        Self {
            device_class: None,
            state_class: None,
            entity_category: None,
            icon: Some(icon),
        }
    }

    const fn diagnostic(icon: &'static str) -> Self {
        Self {
            device_class: None,
            state_class: None,
            entity_category: Some("diagnostic"),
            icon: Some(icon),
        }
    }

    const fn measurement(device_class: Option<&'static str>, icon: &'static str) -> Self {
        Self {
            device_class,
            state_class: Some("measurement"),
            entity_category: None,
            icon: Some(icon),
        }
    }

    const fn total_increasing(device_class: Option<&'static str>, icon: &'static str) -> Self {
        Self {
            device_class,
            state_class: Some("total_increasing"),
            entity_category: None,
            icon: Some(icon),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterDescriptor {
    pub address: u16,
    pub key: &'static str,
    pub display_name: &'static str,
    pub unit: Option<&'static str>,
    pub divider: Option<u16>,
    pub presentation: Presentation,
    /// Only meaningful on the TimNet 200.
    pub device_variant_only: bool,
    pub rule: DecodeRule,
}

impl RegisterDescriptor {
    pub fn decode(&self, raw: u16) -> DecodedValue {
        self.rule.decode(raw, self.divider)
    }

    /// Whether this register should be presented on the given hardware.
    pub fn applies_to(&self, variant: DeviceVariant) -> bool {
        !self.device_variant_only || variant.is_larger()
    }

    pub fn address_hex(&self) -> String {
        format!("0x{:04X}", self.address)
    }
}

pub const T2_ADDRESS: u16 = 0x0001;

/// Door switch, exposed as a binary rather than through [`REGISTERS`].
pub const DOOR_SWITCH: RegisterDescriptor = RegisterDescriptor {
    address: 0x0004,
    key: "INP",
    display_name: "Door Switch",
    unit: None,
    divider: None,
    presentation: Presentation {
        device_class: Some("door"),
        state_class: None,
        entity_category: None,
        icon: Some("mdi:door"),
    },
    device_variant_only: false,
    rule: DecodeRule::Plain(Plain),
};

/// Every monitored register, in the order they appear in the device manual.
pub static REGISTERS: [RegisterDescriptor; 15] = [
    RegisterDescriptor {
        address: 0x0000,
        key: "TT",
        display_name: "Temperature T1",
        unit: Some("°C"),
        divider: Some(10),
        presentation: Presentation::measurement(Some("temperature"), "mdi:thermometer"),
        device_variant_only: false,
        rule: DecodeRule::Temperature(Temperature),
    },
    RegisterDescriptor {
        address: T2_ADDRESS,
        key: "TT2",
        display_name: "Temperature T2",
        unit: Some("°C"),
        divider: Some(10),
        presentation: Presentation::measurement(Some("temperature"), "mdi:thermometer"),
        device_variant_only: true,
        rule: DecodeRule::Temperature(Temperature),
    },
    RegisterDescriptor {
        address: 0x0002,
        key: "CAS",
        display_name: "Combustion Time",
        unit: Some("min"),
        divider: Some(60),
        presentation: Presentation::total_increasing(Some("duration"), "mdi:fire-circle"),
        device_variant_only: false,
        rule: DecodeRule::Minutes(Minutes),
    },
    RegisterDescriptor {
        address: 0x0003,
        key: "SER1",
        display_name: "Flap Position",
        unit: Some("%"),
        divider: None,
        presentation: Presentation::measurement(None, "mdi:valve"),
        device_variant_only: false,
        rule: DecodeRule::FlapPosition(FlapPosition),
    },
    RegisterDescriptor {
        address: 0x0005,
        key: "REZIM",
        display_name: "Combustion Mode",
        unit: None,
        divider: None,
        presentation: Presentation::icon("mdi:fire"),
        device_variant_only: false,
        rule: DecodeRule::Lookup(Lookup(Table::CombustionMode)),
    },
    RegisterDescriptor {
        address: 0x0006,
        key: "PALIVO",
        display_name: "Fuel Type",
        unit: None,
        divider: None,
        presentation: Presentation::icon("mdi:tree"),
        device_variant_only: false,
        rule: DecodeRule::Lookup(Lookup(Table::FuelType)),
    },
    RegisterDescriptor {
        address: 0x0007,
        key: "PRILOZ",
        display_name: "Refuel Offset",
        unit: None,
        divider: None,
        presentation: Presentation::icon("mdi:plus-minus"),
        device_variant_only: false,
        rule: DecodeRule::Lookup(Lookup(Table::RefuelOffset)),
    },
    RegisterDescriptor {
        address: 0x0008,
        key: "SDS",
        display_name: "SDS Sensitivity",
        unit: None,
        divider: None,
        presentation: Presentation::diagnostic("mdi:tune"),
        device_variant_only: false,
        rule: DecodeRule::Sensitivity(Sensitivity),
    },
    RegisterDescriptor {
        address: 0x0009,
        key: "BARVA",
        display_name: "Status Color",
        unit: None,
        divider: None,
        presentation: Presentation::diagnostic("mdi:palette"),
        device_variant_only: false,
        rule: DecodeRule::Lookup(Lookup(Table::StatusColor)),
    },
    RegisterDescriptor {
        address: 0x0010,
        key: "BEEP",
        display_name: "Sound Signalization",
        unit: None,
        divider: None,
        presentation: Presentation::diagnostic("mdi:volume-high"),
        device_variant_only: false,
        rule: DecodeRule::Lookup(Lookup(Table::BeepMode)),
    },
    RegisterDescriptor {
        address: 0x0011,
        key: "RELE1",
        display_name: "Relay 1",
        unit: None,
        divider: None,
        presentation: Presentation::diagnostic("mdi:electric-switch"),
        device_variant_only: true,
        rule: DecodeRule::Lookup(Lookup(Table::Relay)),
    },
    RegisterDescriptor {
        address: 0x0012,
        key: "RELE2",
        display_name: "Relay 2",
        unit: None,
        divider: None,
        presentation: Presentation::diagnostic("mdi:electric-switch"),
        device_variant_only: true,
        rule: DecodeRule::Lookup(Lookup(Table::Relay)),
    },
    RegisterDescriptor {
        address: 0x0013,
        key: "PORUCHA",
        display_name: "Sensor Fault",
        unit: None,
        divider: None,
        presentation: Presentation::diagnostic("mdi:alert-circle"),
        device_variant_only: false,
        rule: DecodeRule::FaultFlags(FaultFlags),
    },
    RegisterDescriptor {
        address: 0x0014,
        key: "STAT",
        display_name: "Unit Status",
        unit: None,
        divider: None,
        presentation: Presentation::icon("mdi:information"),
        device_variant_only: false,
        rule: DecodeRule::Lookup(Lookup(Table::UnitStatus)),
    },
    RegisterDescriptor {
        address: 0x0015,
        key: "P_LIFE",
        display_name: "Total Refuel Count",
        unit: None,
        divider: None,
        presentation: Presentation::total_increasing(None, "mdi:counter"),
        device_variant_only: false,
        rule: DecodeRule::Plain(Plain),
    },
];

pub fn by_key(key: &str) -> Option<&'static RegisterDescriptor> {
    REGISTERS.iter().find(|r| r.key == key)
}

pub fn by_address(address: u16) -> Option<&'static RegisterDescriptor> {
    REGISTERS.iter().find(|r| r.address == address)
}

/// Registers to present for a given hardware variant, in catalog order.
pub fn for_variant(variant: DeviceVariant) -> impl Iterator<Item = &'static RegisterDescriptor> {
    REGISTERS.iter().filter(move |r| r.applies_to(variant))
}
