//! Transmit/receive buffer pool wrapping a board's [`NicDriver`]
//! (spec.md §5 "Shared resources"; grounded on the get/send buffer
//! pattern in `original_source/main/common/ethernet.c`).

use alloc::vec::Vec;

use crate::board::NicDriver;

/// Thin convenience wrapper over a board's [`NicDriver`]. A buffer
/// acquired with [`Device::xmit_buffer`] must be filled and handed to
/// [`Device::send`] before another is acquired; it must not be
/// retained across other protocol calls (spec.md §5).
pub struct Device<N: NicDriver> {
    nic: N,
}

impl<N: NicDriver> Device<N> {
    pub fn new(nic: N) -> Self {
        Device { nic }
    }

    pub fn mac_address(&self) -> [u8; 6] {
        self.nic.mac_address()
    }

    /// Access to the underlying driver, e.g. for board-specific status
    /// queries or test introspection.
    pub fn nic(&self) -> &N {
        &self.nic
    }

    /// Mutable access to the underlying driver, for test introspection
    /// that needs to swap or mutate the fake driver mid-test.
    pub fn nic_mut(&mut self) -> &mut N {
        &mut self.nic
    }

    pub fn xmit_buffer(&mut self, len: usize) -> Option<&mut [u8]> {
        self.nic.get_xmit_buffer(len)
    }

    pub fn send(&mut self, length: usize) {
        self.nic.send_buffer(length);
    }

    /// Poll for at most one received frame (spec.md §5 suspension
    /// point #2), copying it out since the driver's borrow only lives
    /// until the next poll or buffer acquisition.
    pub fn poll_receive(&mut self) -> Option<Vec<u8>> {
        self.nic.poll_receive().map(<[u8]>::to_vec)
    }
}
