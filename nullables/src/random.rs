//! A random source that runs dry.

use rand::{CryptoRng, Error, RngCore};

/// Yields zero bytes until its budget is spent, then fails every
/// `try_fill_bytes` call.
pub struct FailingRandom {
    remaining: usize,
}

impl FailingRandom {
    /// Fails from the first call.
    pub fn new() -> Self {
        Self::after_bytes(0)
    }

    /// Serves `bytes` bytes before failing.
    pub fn after_bytes(bytes: usize) -> Self {
        Self { remaining: bytes }
    }
}

impl Default for FailingRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RngCore for FailingRandom {
    fn next_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        self.fill_bytes(&mut buf);
        u32::from_le_bytes(buf)
    }

    fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.fill_bytes(&mut buf);
        u64::from_le_bytes(buf)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        dest.fill(0);
        self.remaining = self.remaining.saturating_sub(dest.len());
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        if dest.len() > self.remaining {
            self.remaining = 0;
            return Err(Error::new("entropy source exhausted"));
        }
        // Non-zero so derived scalars are usable.
        dest.fill(0x5a);
        self.remaining -= dest.len();
        Ok(())
    }
}

impl CryptoRng for FailingRandom {}
