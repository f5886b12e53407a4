/// The block number to access ranging from 0 (the first block) to n - 1 (the last
/// block) where n is number of blocks available on the device.
pub type BlockNumber = usize;

/// Whole-block access to a random-access backing store.
///
/// Reads take `&self` so several readers can share a device while the engine holds
/// its gate in read mode. Implementations that need a seek cursor must serialize
/// seek and read internally. Writes and syncs always run with exclusive access.
pub trait BlockStorage {
    /// Size in bytes of every block on the device.
    fn block_size(&self) -> usize;
    /// Total number of blocks addressable on the device.
    fn block_count(&self) -> usize;
    /// Reads exactly `buf.len()` bytes from the start of block `blocknr`.
    ///
    /// # Errors
    ///
    /// Attempting to read a block out of range, or more than one block's worth of
    /// bytes, will return an error.
    fn read_block(&self, blocknr: BlockNumber, buf: &mut [u8]) -> std::io::Result<()>;
    /// Writes the provided buffer at the start of block `blocknr`. Bytes past
    /// `buf.len()` within the block are left untouched.
    ///
    /// # Errors
    ///
    /// Attempting to write a block out of range, or a buffer longer than a block,
    /// will return an error.
    fn write_block(&mut self, blocknr: BlockNumber, buf: &[u8]) -> std::io::Result<()>;
    /// Flush any buffered disk IO from memory. This is useful if it must guaranteed
    /// the disk writes actually occurred, for instance, if being re-read from
    /// disk.
    fn sync_disk(&mut self) -> std::io::Result<()>;
}
