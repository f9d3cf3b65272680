//! `embedded-io` adapter
//!
//! Wraps any blocking serial peripheral that implements
//! [`embedded_io::Read`], [`embedded_io::ReadReady`] and
//! [`embedded_io::Write`] so it can drive the packet engine.

use embedded_io::{Read, ReadReady, Write};

use crate::transport::{ByteTransport, TransportError};

/// [`ByteTransport`] over an `embedded-io` serial port
///
/// `embedded-io` can only say whether a read would block, not how many
/// bytes are waiting, so [`ByteTransport::available`] reports 0 or 1.
pub struct IoTransport<T> {
    inner: T,
}

impl<T> IoTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn inner(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + ReadReady + Write> ByteTransport for IoTransport<T> {
    fn available(&mut self) -> usize {
        match self.inner.read_ready() {
            Ok(true) => 1,
            _ => 0,
        }
    }

    fn read_byte(&mut self) -> Result<u8, TransportError> {
        if !self.inner.read_ready().map_err(|_| TransportError::Io)? {
            return Err(TransportError::Underflow);
        }
        let mut buf = [0u8; 1];
        match self.inner.read(&mut buf) {
            Ok(1) => Ok(buf[0]),
            Ok(_) => Err(TransportError::Disconnected),
            Err(_) => Err(TransportError::Io),
        }
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        self.inner
            .write_all(&[byte])
            .map_err(|_| TransportError::Write)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.inner
            .write_all(bytes)
            .map_err(|_| TransportError::Write)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.inner.flush().map_err(|_| TransportError::Io)
    }
}
