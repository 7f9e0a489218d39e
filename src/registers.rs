use std::borrow::Cow;

/// How the raw word of a register is turned into a meaningful value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, strum::IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Rule {
    /// The raw word, multiplied by the register's scale if it has one.
    Scaled,
    /// Index into the converter's error list.
    ErrorCode,
    /// Bit 0 signals water shortage, bit 1 signals that the pump is running.
    StatusFlags,
    /// 72 selects the high carrier frequency, anything else the low one.
    CarrierFrequency,
    /// Run/stop command code.
    StatusCommand,
    /// Pressure sensor range in bar.
    MeasurementRange,
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Mode(u8);

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(if self.0 & Self::R.0 == 0 { "-" } else { "R" })?;
        f.write_str(if self.0 & Self::W.0 == 0 { "-" } else { "W" })?;
        Ok(())
    }
}

impl Mode {
    pub const R: Self = Self(1 << 0);
    pub const W: Self = Self(1 << 1);
    pub const RW: Self = Self(Self::R.0 | Self::W.0);
    const R_: Self = Self::R;

    pub const fn is_read_only(&self) -> bool {
        self.0 & Self::W.0 == 0
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RegisterIndex(usize);

impl std::fmt::Debug for RegisterIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{:#06x}", self.name(), self.address())
    }
}

impl RegisterIndex {
    pub fn from_address(address: u16) -> Option<RegisterIndex> {
        let index = ADDRESSES.partition_point(|v| *v < address);
        (ADDRESSES.get(index) == Some(&address)).then_some(Self(index))
    }

    pub fn from_name(name: &str) -> Option<RegisterIndex> {
        let index = NAMES.iter().position(|v| *v == name);
        index.map(Self)
    }

    pub fn all() -> impl Iterator<Item = RegisterIndex> {
        (0..ADDRESSES.len()).map(Self)
    }

    pub fn address(&self) -> u16 {
        ADDRESSES[self.0]
    }

    pub fn name(&self) -> &'static str {
        NAMES[self.0]
    }

    pub fn unit(&self) -> &'static str {
        UNITS[self.0]
    }

    pub fn description(&self) -> &'static str {
        DESCRIPTIONS[self.0]
    }

    pub fn mode(&self) -> Mode {
        MODES[self.0]
    }

    pub fn read_only(&self) -> bool {
        self.mode().is_read_only()
    }

    pub fn scale(&self) -> Option<f64> {
        SCALES[self.0]
    }

    pub fn rule(&self) -> Rule {
        RULES[self.0]
    }

    pub fn descriptor(&self) -> RegisterDescriptor {
        RegisterDescriptor {
            address: self.address(),
            name: self.name(),
            unit: self.unit(),
            description: self.description(),
            read_only: self.read_only(),
            scale: self.scale(),
            rule: self.rule(),
        }
    }
}

/// The key a register at `address` is reported under.
///
/// Registers missing from the table are keyed by their address, e.g. `unknown_0x0008`.
pub fn output_key(address: u16) -> Cow<'static, str> {
    match RegisterIndex::from_address(address) {
        Some(register) => Cow::Borrowed(register.name()),
        None => Cow::Owned(format!("unknown_{address:#06x}")),
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RegisterDescriptor {
    pub address: u16,
    pub name: &'static str,
    pub unit: &'static str,
    pub description: &'static str,
    pub read_only: bool,
    pub scale: Option<f64>,
    pub rule: Rule,
}

impl RegisterDescriptor {
    pub fn is_match(&self, pattern: &str) -> bool {
        let pattern = pattern.to_lowercase();
        if self.name.contains(&pattern) {
            return true;
        }
        if self.description.to_lowercase().contains(&pattern) {
            return true;
        }
        if self.address.to_string().contains(&pattern) {
            return true;
        }
        format!("{:#06x}", self.address).contains(&pattern)
    }
}

macro_rules! for_each_register {
    ($m:ident) => {
        $m! {
            0x0001: R_, Scaled, "output_frequency", "Hz", scale = 0.1;
            0x0002: R_, Scaled, "output_current", "A", scale = 0.1;
            0x0003: R_, Scaled, "input_voltage", "V";
            0x0004: R_, Scaled, "temperature", "°C";
            0x0005: R_, Scaled, "pressure", "bar", scale = 0.01;
            0x0006: R_, ErrorCode, "error_code", "";
            0x0007: R_, StatusFlags, "status_code", "";
            0x0010: RW, Scaled, "target_pressure", "bar", scale = 0.01;
            0x0011: RW, Scaled, "start_pressure_difference", "bar", scale = 0.01;
            0x0012: RW, Scaled, "maximum_frequency", "Hz", scale = 0.1;
            0x0013: RW, Scaled, "minimum_frequency", "Hz", scale = 0.1;
            0x0014: RW, CarrierFrequency, "carrier_frequency", "";
            0x0015: RW, Scaled, "water_shortage_pressure", "bar", scale = 0.01;
            0x0016: RW, Scaled, "water_shortage_restart_delay", "min";
            0x0017: RW, Scaled, "sleep_delay", "s";
            0x0019: RW, MeasurementRange, "measurement_range", "";
            0x0020: RW, Scaled, "slave_address", "";
            0x0022: RW, Scaled, "overpressure_limit", "bar", scale = 0.01;
            0x1000: RW, Scaled, "frequency_setpoint", "Hz", scale = 0.01;
            0x1001: RW, StatusCommand, "status_command", "";
        }
    };
}

macro_rules! optional {
    () => {
        None
    };
    ($($lit: tt)+) => {
        Some($($lit)*)
    };
}

macro_rules! make_lists {
    ($($regnum: literal: $mode: ident, $rule: ident, $name: literal, $unit: literal $(, scale = $scale: literal)?;)+) => {
        pub static ADDRESSES: &[u16] = &[$($regnum),*];
        pub static NAMES: &[&str] = &[$($name),*];
        pub static UNITS: &[&str] = &[$($unit),*];
        pub static MODES: &[Mode] = &[$(Mode::$mode),*];
        pub static RULES: &[Rule] = &[$(Rule::$rule),*];
        pub static SCALES: &[Option<f64>] = &[$(optional!($($scale)?)),*];
    };
}

for_each_register!(make_lists);

pub static DESCRIPTIONS: &[&str] = &const {
    let mut result = [""; ADDRESSES.len()];
    let mut index = 0;
    let mut previous_address = 0;
    while index < result.len() {
        let address = ADDRESSES[index];
        if address <= previous_address {
            panic!("ADDRESSES is not sorted (or has duplicate values)!");
        }
        previous_address = address;
        result[index] = match address {
            0x0001 => "Frequency currently driven to the motor",
            0x0002 => "Current drawn by the motor",
            0x0003 => "Supply voltage at the converter input",
            0x0004 => "Temperature of the power module",
            0x0005 => "Pressure currently measured by the pressure sensor",
            0x0006 => "Active fault. 0 when the converter is healthy",
            0x0007 => "Status bits. Bit 0: water shortage, bit 1: running",
            0x0010 => "Pressure the converter regulates towards",
            0x0011 => {
                "Pressure drop below the target pressure at which the pump restarts after sleeping"
            }
            0x0012 => "Highest frequency the motor is driven at",
            0x0013 => "Lowest frequency the motor is driven at",
            0x0014 => "PWM carrier frequency. 72=High, anything else=Low",
            0x0015 => "Pressure below which water shortage protection engages",
            0x0016 => "Delay before restarting after water shortage protection engaged",
            0x0017 => "Time at constant pressure before the pump goes to sleep",
            0x0019 => "Full scale of the pressure sensor. 6, 10, 16 or 25 bar",
            0x0020 => "Modbus address of the converter. 1-63, 63 by default",
            0x0022 => "Pressure above which the converter stops with an overpressure fault",
            0x1000 => "Frequency setpoint when running under Modbus control",
            0x1001 => "Run command. 0=Invalid, 1=Running, 4=Stop, 17=Error reset",
            _ => panic!("register is missing a description"),
        };
        index += 1;
    }
    result
};
