//! sysfs-specific extensions to std types
use std::{fs::File, io};

use rustix::{fd::AsFd, io::Errno};

/// Internal implementation details
mod imp {
    use super::*;

    pub trait AttrExtSeal: AsFd {}

    impl AttrExtSeal for File {}
}

/// Extends [`File`] with methods for sysfs attributes
///
/// sysfs attributes don't behave like regular files. A value is generated
/// when the file is read from offset zero, and a value is consumed by a
/// single write, so the [`io::Read`] and [`io::Write`] helpers that
/// retry or split I/O are the wrong tool.
///
/// This trait is sealed
pub trait AttrExt: imp::AttrExtSeal {
    /// Read the current attribute value into `buf`, returning how many bytes
    /// of it are the value.
    ///
    /// A single trailing newline is not counted.
    ///
    /// # Implementation
    ///
    /// This uses `pread(2)` at offset zero, so the same [`File`] can be read
    /// any number of times.
    ///
    /// This will retry as necessary on `EINTR`
    ///
    /// # Errors
    ///
    /// - If `self` is not opened for reading.
    /// - If I/O does.
    fn read_attr(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Replace the attribute value with `data`.
    ///
    /// # Implementation
    ///
    /// The file is truncated first, which the kernel ignores but regular
    /// files used in place of sysfs need.
    ///
    /// `data` is written with a single `pwrite(2)` at offset zero. This is
    /// retried on `EINTR`, which the kernel only reports if nothing was
    /// written.
    ///
    /// # Errors
    ///
    /// - If `self` is not opened for writing.
    /// - If the kernel rejects the value.
    fn write_attr(&self, data: &[u8]) -> io::Result<()>;
}

impl AttrExt for File {
    fn read_attr(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut n = loop {
            match rustix::io::pread(self.as_fd(), buf, 0) {
                Ok(n) => break n,
                Err(Errno::INTR) => continue,
                Err(e) => return Err(e.into()),
            }
        };
        if n > 0 && buf[n - 1] == b'\n' {
            n -= 1;
        }
        Ok(n)
    }

    fn write_attr(&self, data: &[u8]) -> io::Result<()> {
        self.set_len(0)?;
        loop {
            match rustix::io::pwrite(self.as_fd(), data, 0) {
                Ok(_) => break,
                Err(Errno::INTR) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
