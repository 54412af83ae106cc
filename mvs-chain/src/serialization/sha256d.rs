//! Double-SHA256 ("sha256d"), used for block and transaction hashes.

use sha2::{Digest, Sha256};
use std::io;

/// A writer that computes the sha256d hash of everything written to it
/// without buffering the input in memory.
#[derive(Default)]
pub struct Writer(Sha256);

impl Writer {
    /// Finish hashing and return the 32-byte digest, in internal
    /// (little-endian) byte order.
    pub fn finish(self) -> [u8; 32] {
        let first_round = self.0.finalize();
        let second_round = Sha256::digest(&first_round);
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&second_round);
        hash
    }
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Hash `bytes` with sha256d in one shot.
pub fn checksum(bytes: &[u8]) -> [u8; 32] {
    let mut writer = Writer::default();
    io::Write::write_all(&mut writer, bytes).expect("writing to a Writer is infallible");
    writer.finish()
}
