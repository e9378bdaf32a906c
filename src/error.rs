//! Error handling stuff
use displaydoc::Display;
use std::io;
use thiserror::Error;

/// Error type for [`crate::system::address::Address`]
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum AddressError {
    /// address is {len} bytes, longer than the 63 byte maximum
    TooLong {
        /// Length of the rejected input, in bytes.
        len: usize,
    },
}

/// Error type for [`crate::system`]
#[derive(Debug, Display, Error)]
pub enum DeviceError {
    /// {0}
    Address(#[from] AddressError),

    /// Couldn't list {class} devices: {source}
    List {
        /// Device prefix of the class directory, like `sensor`.
        class: String,
        source: io::Error,
    },

    /// Couldn't access attribute {attr}: {source}
    Attribute {
        /// Attribute path relative to its class directory, like
        /// `sensor2/address`.
        attr: String,
        source: io::Error,
    },

    /// no unclaimed {class} device has this address
    NotFound {
        /// Device prefix of the class directory.
        class: String,
    },

    /// Invalid argument: {0}
    InvalidArgument(String),

    /// Couldn't find device `{address}`: {source}
    Find {
        address: String,
        source: Box<DeviceError>,
    },

    /// Couldn't find port `{address}`: {source}
    FindPort {
        address: String,
        source: Box<DeviceError>,
    },

    /// Couldn't open sensor for port `{port}`: {source}
    OpenSensor {
        port: String,
        source: Box<DeviceError>,
    },

    /// Couldn't open tacho motor for port `{port}`: {source}
    OpenMotor {
        port: String,
        source: Box<DeviceError>,
    },

    /// Motor {action} failed: {source}
    Motor {
        /// What the motor was asked to do, like `run` or `reset`.
        action: &'static str,
        source: Box<DeviceError>,
    },

    /// Couldn't read sensor value {index}: {source}
    SensorValue {
        index: usize,
        source: Box<DeviceError>,
    },
}

impl DeviceError {
    /// Whether the root cause is [`DeviceError::NotFound`], looking through
    /// any context wrappers.
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), DeviceError::NotFound { .. })
    }

    /// The innermost error, with context wrappers removed.
    pub fn root(&self) -> &DeviceError {
        let mut e = self;
        loop {
            match e {
                DeviceError::Find { source, .. }
                | DeviceError::FindPort { source, .. }
                | DeviceError::OpenSensor { source, .. }
                | DeviceError::OpenMotor { source, .. }
                | DeviceError::Motor { source, .. }
                | DeviceError::SensorValue { source, .. } => e = source.as_ref(),
                _ => return e,
            }
        }
    }

    pub(crate) fn attr(attr: impl Into<String>, source: io::Error) -> Self {
        DeviceError::Attribute {
            attr: attr.into(),
            source,
        }
    }

    pub(crate) fn motor(action: &'static str) -> impl FnOnce(DeviceError) -> DeviceError {
        move |e| DeviceError::Motor {
            action,
            source: Box::new(e),
        }
    }
}

/// Error text.
pub(crate) mod text {
    pub const BAD_INT: &str = "invalid integer attribute";

    pub const NO_SUCH_VALUE: &str = "no such value";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_through_wrappers() {
        let e = DeviceError::OpenSensor {
            port: "spi0.1:S1".into(),
            source: Box::new(DeviceError::Find {
                address: "spi0.1:S1".into(),
                source: Box::new(DeviceError::NotFound {
                    class: "sensor".into(),
                }),
            }),
        };
        assert!(e.is_not_found());
        assert_eq!(
            e.to_string(),
            "Couldn't open sensor for port `spi0.1:S1`: Couldn't find device `spi0.1:S1`: \
             no unclaimed sensor device has this address"
        );

        let e = DeviceError::InvalidArgument("nope".into());
        assert!(!e.is_not_found());
    }
}
