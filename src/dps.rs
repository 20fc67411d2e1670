//! Data point table and value domains
//!
//! Every property the robot exposes lives at a fixed numeric index in its
//! status map. [`DataPoint`] names those indices once; the enums below name
//! the string literals the robot uses for each enumerated property.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Kind of raw value stored at a data point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    String,
    Number,
}

impl ValueKind {
    /// Whether a raw JSON value is of this kind
    pub fn matches(self, value: &Value) -> bool {
        match self {
            ValueKind::Bool => value.is_boolean(),
            ValueKind::String => value.is_string(),
            ValueKind::Number => value.is_number(),
        }
    }
}

/// Data points understood by the robot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataPoint {
    /// Index 1, reported but not used by any accessor
    Power,
    PlayPause,
    Direction,
    WorkMode,
    WorkStatus,
    GoHome,
    CleanSpeed,
    FindRobot,
    BatteryLevel,
    ErrorCode,
}

impl DataPoint {
    pub const ALL: [DataPoint; 10] = [
        DataPoint::Power,
        DataPoint::PlayPause,
        DataPoint::Direction,
        DataPoint::WorkMode,
        DataPoint::WorkStatus,
        DataPoint::GoHome,
        DataPoint::CleanSpeed,
        DataPoint::FindRobot,
        DataPoint::BatteryLevel,
        DataPoint::ErrorCode,
    ];

    /// Wire index used as the key in status and command maps
    pub fn index(self) -> &'static str {
        match self {
            DataPoint::Power => "1",
            DataPoint::PlayPause => "2",
            DataPoint::Direction => "3",
            DataPoint::WorkMode => "5",
            DataPoint::WorkStatus => "15",
            DataPoint::GoHome => "101",
            DataPoint::CleanSpeed => "102",
            DataPoint::FindRobot => "103",
            DataPoint::BatteryLevel => "104",
            DataPoint::ErrorCode => "106",
        }
    }

    /// JSON kind the robot reports for this data point
    pub fn kind(self) -> ValueKind {
        match self {
            DataPoint::Power | DataPoint::PlayPause | DataPoint::GoHome | DataPoint::FindRobot => {
                ValueKind::Bool
            }
            DataPoint::BatteryLevel => ValueKind::Number,
            DataPoint::Direction
            | DataPoint::WorkMode
            | DataPoint::WorkStatus
            | DataPoint::CleanSpeed
            | DataPoint::ErrorCode => ValueKind::String,
        }
    }

    /// Look up a data point by its wire index
    pub fn from_index(index: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|dp| dp.index() == index)
    }
}

impl fmt::Display for DataPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.index())
    }
}

/// String-valued data point domain
pub trait DpEnum: for<'a> From<&'a str> {
    /// Wire literal for this value
    fn wire(&self) -> &str;

    /// Whether this value is one of the documented literals
    fn known(&self) -> bool;
}

/// Declares a string-valued DP domain.
///
/// Literals outside the known set are kept verbatim in `Other` so that a
/// robot with newer firmware still round-trips its values.
macro_rules! dp_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            /// A literal the robot reported that is not in the known set
            Other(String),
        }

        impl $name {
            /// Wire literal for this value
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $wire,)+
                    $name::Other(raw) => raw.as_str(),
                }
            }

            /// Whether this value is one of the documented literals
            pub fn is_known(&self) -> bool {
                !matches!(self, $name::Other(_))
            }
        }

        impl DpEnum for $name {
            fn wire(&self) -> &str {
                self.as_str()
            }

            fn known(&self) -> bool {
                self.is_known()
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                match raw {
                    $($wire => $name::$variant,)+
                    other => $name::Other(other.to_string()),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Ok($name::from(raw.as_str()))
            }
        }
    };
}

dp_enum! {
    /// Suction power
    CleanSpeed {
        Standard => "Standard",
        BoostIq => "Boost_IQ",
        Max => "Max",
        NoSuction => "No_suction",
    }
}

dp_enum! {
    /// Cleaning pattern
    WorkMode {
        Auto => "auto",
        SmallRoom => "SmallRoom",
        Spot => "Spot",
        Edge => "Edge",
        NoSweep => "Nosweep",
    }
}

dp_enum! {
    /// What the robot is currently doing
    WorkStatus {
        Running => "Running",
        Standby => "standby",
        Sleeping => "Sleeping",
        Charging => "Charging",
        Completed => "completed",
        Recharge => "Recharge",
    }
}

dp_enum! {
    /// Fault reported by the robot
    ErrorCode {
        NoError => "no_error",
        Stuck5Min => "Stuck_5_min",
        CrashBarStuck => "Crash_bar_stuck",
        SensorDirty => "sensor_dirty",
        NotEnoughPower => "N_enough_pow",
        WheelStuck => "Wheel_stuck",
        SideBrushStuck => "S_brush_stuck",
        FanStuck => "Fan_stuck",
        RollerBrushStuck => "R_brush_stuck",
    }
}

dp_enum! {
    /// Manual steering direction
    Direction {
        Forward => "forward",
        Backward => "backward",
        Left => "left",
        Right => "right",
    }
}
