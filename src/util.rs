//! Utility functions
use crate::{
    error::{text::BAD_INT, DeviceError},
    extensions::AttrExt,
    system::address::{Address, MAX_LEN},
};
use std::{
    fs::{self, File},
    io,
    path::Path,
    time::Duration,
};

/// Class directories, relative to the filesystem root.
///
/// ev3dev always mounts sysfs at `/sys`, but [`crate::system::Brick::new`]
/// takes the root so a fake tree can stand in for it.
pub const SYSFS_CLASS_PATH: &str = "sys/class";

/// Class directory and device prefix for ports.
pub const PORT_CLASS: (&str, &str) = ("lego-port", "port");

/// Class directory and device prefix for tacho motors.
pub const TACHO_MOTOR_CLASS: (&str, &str) = ("tacho-motor", "motor");

/// Class directory and device prefix for sensors.
pub const SENSOR_CLASS: (&str, &str) = ("lego-sensor", "sensor");

/// How long to wait after changing a port mode for the kernel to create the
/// new device.
pub const SETTLE_DELAY: Duration = Duration::from_millis(250);

pub type Result<T, E = DeviceError> = std::result::Result<T, E>;

/// Name of an attribute for error messages, `<device>/<attribute>`.
pub(crate) fn attr_name(path: &Path) -> String {
    let mut c = path.components().rev();
    match (c.next(), c.next()) {
        (Some(attr), Some(dev)) => Path::new(dev.as_os_str())
            .join(attr.as_os_str())
            .display()
            .to_string(),
        _ => path.display().to_string(),
    }
}

/// Open an attribute for reading.
pub(crate) fn open_attr_read(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| DeviceError::attr(attr_name(path), e))
}

/// Open an attribute for writing. Existing content is truncated.
pub(crate) fn open_attr_write(path: &Path) -> Result<File> {
    fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|e| DeviceError::attr(attr_name(path), e))
}

/// Read an `address` attribute
///
/// # Errors
///
/// - I/O
/// - If the address is longer than [`MAX_LEN`]
pub(crate) fn read_attr_address(path: &Path) -> Result<Address> {
    let f = open_attr_read(path)?;
    // One spare byte so an address that is too long is noticed.
    let mut buf = [0; MAX_LEN + 1];
    let n = f
        .read_attr(&mut buf)
        .map_err(|e| DeviceError::attr(attr_name(path), e))?;
    Ok(Address::from_attr_bytes(&buf[..n])?)
}

/// Read an integer attribute from an already open file
///
/// `name` is used for error messages.
pub(crate) fn read_file_int(f: &File, name: &str) -> Result<i64> {
    let mut buf = [0; 24];
    let n = f
        .read_attr(&mut buf)
        .map_err(|e| DeviceError::attr(name, e))?;
    std::str::from_utf8(&buf[..n])
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .ok_or_else(|| DeviceError::attr(name, io::Error::new(io::ErrorKind::InvalidData, BAD_INT)))
}

/// Read an integer attribute once
pub(crate) fn read_attr_int(path: &Path) -> Result<i64> {
    let f = open_attr_read(path)?;
    read_file_int(&f, &attr_name(path))
}

/// Read a short, whitespace separated, list attribute once
pub(crate) fn read_attr_words(path: &Path) -> Result<Vec<String>> {
    let f = open_attr_read(path)?;
    let mut buf = [0; 256];
    let n = f
        .read_attr(&mut buf)
        .map_err(|e| DeviceError::attr(attr_name(path), e))?;
    Ok(String::from_utf8_lossy(&buf[..n])
        .split_whitespace()
        .map(ToOwned::to_owned)
        .collect())
}

/// Write `data` to an already open attribute
pub(crate) fn write_attr(f: &File, name: &str, data: &[u8]) -> Result<()> {
    f.write_attr(data).map_err(|e| DeviceError::attr(name, e))
}

/// Write an integer to an already open attribute
pub(crate) fn write_attr_int(f: &File, name: &str, value: i64) -> Result<()> {
    write_attr(f, name, value.to_string().as_bytes())
}

/// Open, write, and close an attribute.
pub(crate) fn write_attr_once(path: &Path, data: &[u8]) -> Result<()> {
    let f = open_attr_write(path)?;
    write_attr(&f, &attr_name(path), data)
}
