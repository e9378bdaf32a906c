//! Sensors
//!
//! See the [lego-sensor class docs][1] for details
//!
//! [1]: https://docs.ev3dev.org/projects/lego-linux-drivers/en/ev3dev-stretch/sensors.html#lego-sensor-class
use std::{
    convert::TryFrom,
    fmt,
    fs::File,
    io,
    path::{Path, PathBuf},
    str::FromStr,
};

use super::Device;
use crate::{
    error::{
        text::{BAD_INT, NO_SUCH_VALUE},
        DeviceError,
    },
    fixedpoint::Value,
    util::{open_attr_read, read_attr_int, read_file_int, Result},
};

/// Most values a sensor can have.
const MAX_VALUES: usize = 8;

/// Sensors that must be configured by hand
///
/// EV3 sensors identify themselves; NXT sensors need the port told what
/// they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SensorType {
    /// NXT touch sensor
    LegoNxtTouch,
}

impl SensorType {
    /// Port mode for this sensor, written to the port's `mode` attribute.
    pub fn port_mode(self) -> Option<&'static str> {
        match self {
            SensorType::LegoNxtTouch => Some("nxt-analog"),
        }
    }

    /// Driver name, written to the port's `set_device` attribute.
    pub fn driver(self) -> Option<&'static str> {
        match self {
            SensorType::LegoNxtTouch => Some("lego-nxt-touch"),
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.driver().unwrap_or("unknown"))
    }
}

impl FromStr for SensorType {
    type Err = DeviceError;

    /// Parse a driver name, like `lego-nxt-touch`.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lego-nxt-touch" => Ok(SensorType::LegoNxtTouch),
            _ => Err(DeviceError::InvalidArgument(format!(
                "unsupported sensor type `{}`",
                s
            ))),
        }
    }
}

/// An input device
#[derive(Debug)]
pub struct Sensor {
    path: PathBuf,
    decimals: i16,
    values: Vec<File>,
}

// Public
impl Sensor {
    /// Number of values the sensor provides, at least one.
    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    /// Decimal places in every value.
    pub fn decimals(&self) -> i16 {
        self.decimals
    }

    /// Read value number `i`.
    ///
    /// # Errors
    ///
    /// - [`DeviceError::InvalidArgument`] if `i` is not below
    ///   [`Sensor::num_values`].
    /// - I/O
    pub fn value(&self, i: usize) -> Result<Value> {
        self.read_value(i).map_err(|e| DeviceError::SensorValue {
            index: i,
            source: Box::new(e),
        })
    }
}

// Private
impl Sensor {
    /// Open the sensor device at `path`
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let decimals = read_attr_int(&path.join("decimals"))?;
        // Values are scaled by `-decimals`, which must not overflow.
        let decimals = i16::try_from(decimals)
            .ok()
            .filter(|d| d.checked_neg().is_some())
            .ok_or_else(|| bad_int(path, "decimals"))?;
        let num_values = read_attr_int(&path.join("num_values"))?;
        if num_values < 1 || num_values > MAX_VALUES as i64 {
            return Err(DeviceError::InvalidArgument(format!(
                "sensor has {} values",
                num_values
            )));
        }
        let values = (0..num_values)
            .map(|i| open_attr_read(&path.join(format!("value{}", i))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            path: path.to_path_buf(),
            decimals,
            values,
        })
    }

    fn read_value(&self, i: usize) -> Result<Value> {
        let f = self
            .values
            .get(i)
            .ok_or_else(|| DeviceError::InvalidArgument(NO_SUCH_VALUE.into()))?;
        let name = format!("value{}", i);
        let v = read_file_int(f, &format!("{}/{}", self.kernel_name(), name))?;
        let v = i32::try_from(v).map_err(|_| bad_int(&self.path, &name))?;
        Ok(Value::from_int(v).shift10(-self.decimals))
    }
}

impl Device for Sensor {
    fn path(&self) -> &Path {
        &self.path
    }
}

fn bad_int(path: &Path, attr: &str) -> DeviceError {
    DeviceError::attr(
        crate::util::attr_name(&path.join(attr)),
        io::Error::new(io::ErrorKind::InvalidData, BAD_INT),
    )
}
