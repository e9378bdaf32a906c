//! High level bindings to the ev3dev motor and sensor drivers
//!
//! # Implementation details
//!
//! ev3dev exposes every port, motor, and sensor as a directory of attribute
//! files in `/sys/class`, so this library requires them to exist.
//!
//! Devices are named by the kernel in the order they were created, not by
//! which port they are plugged in to. Finding the device for a port means
//! reading the `address` attribute of candidate devices, which
//! [`system::class::DeviceDir`] does as rarely as possible.
//!
//! Most of these interfaces are documented by the [ev3dev project][1], and
//! this crate links the relevant pages where possible.
//!
//! [1]: https://docs.ev3dev.org/projects/lego-linux-drivers/en/ev3dev-stretch/
#![doc(html_root_url = "https://docs.rs/ev3sys/0.1.0")]

pub mod error;
pub mod extensions;
pub mod fixedpoint;

pub mod system;
mod util;

pub use util::{SETTLE_DELAY, SYSFS_CLASS_PATH};
