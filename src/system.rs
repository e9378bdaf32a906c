//! This module provides access to the motors and sensors attached to a
//! running ev3dev system
//!
//! # Examples
//!
//! Run the motor on port A
//!
//! ```rust,no_run
//! # use ev3sys::system::{Brick, class::motor::TachoSpeed};
//! let brick = Brick::system();
//! let port = brick.port_by_address("ev3-ports:outA").unwrap();
//! let motor = port.open_tacho_motor().unwrap();
//! motor.run(TachoSpeed(motor.max_speed().0 / 2)).unwrap();
//! ```
use crate::{
    error::DeviceError,
    system::{
        address::Address,
        class::{motor::TachoMotor, sensor::Sensor, sensor::SensorType, DeviceDir},
    },
    util::{
        write_attr_once,
        Result,
        PORT_CLASS,
        SENSOR_CLASS,
        SETTLE_DELAY,
        SYSFS_CLASS_PATH,
        TACHO_MOTOR_CLASS,
    },
};
use log::debug;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
    thread,
    time::Duration,
};

pub mod address;
pub mod class;

/// Scanners for the device classes a port can switch between.
///
/// Changing the mode of one port can create and remove devices in more than
/// one class, so they share a lock.
#[derive(Debug)]
struct DeviceScanners {
    tacho_motors: DeviceDir,
    sensors: DeviceDir,
}

/// Root handle to the ev3dev drivers
///
/// Each [`Brick`] remembers which devices it already handed out, so only one
/// should exist for a given root.
#[derive(Debug)]
pub struct Brick {
    ports: Mutex<DeviceDir>,
    devices: Arc<Mutex<DeviceScanners>>,
    settle_delay: Duration,
}

// Public
impl Brick {
    /// Create a new [`Brick`] for the sysfs tree under `root`.
    ///
    /// Use [`Brick::system`] for the real one.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let class = root.as_ref().join(SYSFS_CLASS_PATH);
        let dir = |(name, prefix): (&str, &str)| DeviceDir::new(class.join(name), prefix);
        Self {
            ports: Mutex::new(dir(PORT_CLASS)),
            devices: Arc::new(Mutex::new(DeviceScanners {
                tacho_motors: dir(TACHO_MOTOR_CLASS),
                sensors: dir(SENSOR_CLASS),
            })),
            settle_delay: SETTLE_DELAY,
        }
    }

    /// The running system, rooted at `/`.
    pub fn system() -> Self {
        Self::new("/")
    }

    /// Change how long to wait after switching a port mode before looking for
    /// the new device.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Find the port with address `address`, like `spi0.1:S3`.
    ///
    /// Each port is only produced once; asking for it again is an error.
    ///
    /// # Errors
    ///
    /// - If `address` is too long.
    /// - If there is no such port, or it was already produced.
    /// - I/O
    pub fn port_by_address(&self, address: &str) -> Result<Port> {
        self.find_port(address)
            .map_err(|e| DeviceError::FindPort {
                address: address.to_owned(),
                source: Box::new(e),
            })
    }
}

// Private
impl Brick {
    fn find_port(&self, address: &str) -> Result<Port> {
        let address = Address::new(address)?;
        let path = lock(&self.ports).find_by_address(&address)?;
        debug!("port {} at {}", address, path.display());
        Ok(Port {
            path,
            address,
            devices: Arc::clone(&self.devices),
            settle_delay: self.settle_delay,
        })
    }
}

/// A configurable I/O port
#[derive(Debug)]
pub struct Port {
    path: PathBuf,
    address: Address,
    devices: Arc<Mutex<DeviceScanners>>,
    settle_delay: Duration,
}

// Public
impl Port {
    /// Port address, like `spi0.1:S3`.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Full path to the port device.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Switch the port to `typ` and open the resulting sensor.
    ///
    /// # Errors
    ///
    /// - [`DeviceError::InvalidArgument`] if `typ` can't be configured.
    /// - If the sensor doesn't show up.
    /// - I/O
    pub fn open_sensor(&self, typ: SensorType) -> Result<Sensor> {
        self.sensor(typ).map_err(|e| DeviceError::OpenSensor {
            port: self.address.to_string(),
            source: Box::new(e),
        })
    }

    /// Switch the port to tacho motor mode and open the resulting motor.
    ///
    /// # Errors
    ///
    /// - If the motor doesn't show up.
    /// - I/O
    pub fn open_tacho_motor(&self) -> Result<TachoMotor> {
        self.tacho_motor().map_err(|e| DeviceError::OpenMotor {
            port: self.address.to_string(),
            source: Box::new(e),
        })
    }
}

// Private
impl Port {
    fn sensor(&self, typ: SensorType) -> Result<Sensor> {
        let (mode, driver) = match (typ.port_mode(), typ.driver()) {
            (Some(mode), Some(driver)) => (mode, driver),
            _ => {
                return Err(DeviceError::InvalidArgument(format!(
                    "invalid sensor type {:?}",
                    typ
                )))
            }
        };
        write_attr_once(&self.path.join("mode"), mode.as_bytes())?;
        write_attr_once(&self.path.join("set_device"), driver.as_bytes())?;
        self.settle();

        let path = lock(&self.devices).sensors.find_by_address(&self.address)?;
        Sensor::open(&path)
    }

    fn tacho_motor(&self) -> Result<TachoMotor> {
        write_attr_once(&self.path.join("mode"), b"tacho-motor")?;
        self.settle();

        let path = lock(&self.devices)
            .tacho_motors
            .find_by_address(&self.address)?;
        TachoMotor::open(&path)
    }

    // FIXME: Sleeping is a guess at how long the kernel takes. Waiting on a
    // uevent for the new device would be exact.
    fn settle(&self) {
        if !self.settle_delay.is_zero() {
            thread::sleep(self.settle_delay);
        }
    }
}

/// Lock `m`, ignoring poisoning.
///
/// [`DeviceDir`] never panics halfway through updating itself.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_sync() {
        fn check<T: Send + Sync>() {}
        check::<Brick>();
        check::<Port>();
    }

    #[test]
    fn class_paths() {
        let brick = Brick::new("/tmp/fake");
        assert_eq!(
            lock(&brick.ports).path(),
            Path::new("/tmp/fake/sys/class/lego-port")
        );
        let devices = lock(&brick.devices);
        assert_eq!(devices.sensors.prefix(), "sensor");
        assert_eq!(
            devices.tacho_motors.path(),
            Path::new("/tmp/fake/sys/class/tacho-motor")
        );
        assert_eq!(brick.settle_delay, SETTLE_DELAY);
    }

    #[test]
    fn address_too_long() {
        let brick = Brick::new("/nonexistent").with_settle_delay(Duration::ZERO);
        match brick.port_by_address(&"x".repeat(64)) {
            Err(DeviceError::FindPort { source, .. }) => {
                assert!(matches!(*source, DeviceError::Address(_)))
            }
            r => panic!("expected address error, got {:?}", r),
        }
    }
}
