use crate::alloc::BlockId;
use crate::fs::FsError;
use crate::io::{BlockNumber, BlockStorage};
use crate::{BLOCK_SIZE, DEVICE_BLOCKS};

use log::trace;

/// The data region of a device. Device block 0 is reserved for a header, so data
/// block `i` lives at device block `i + 1`.
pub(crate) struct BlockStore<T: BlockStorage> {
    dev: T,
}

impl<T: BlockStorage> BlockStore<T> {
    pub fn new(dev: T) -> Result<Self, FsError> {
        if dev.block_size() != BLOCK_SIZE {
            return Err(FsError::InvalidArgument("device block size mismatch"));
        }
        if dev.block_count() < DEVICE_BLOCKS {
            return Err(FsError::InvalidArgument("device too small"));
        }
        Ok(Self { dev })
    }

    /// Byte offset of a data block within the device.
    pub fn offset(block: BlockId) -> u64 {
        ((1 + block.index()) * BLOCK_SIZE) as u64
    }

    fn device_block(block: BlockId) -> BlockNumber {
        1 + block.index()
    }

    /// Fills `buf` from the start of `block`.
    pub fn read(&self, block: BlockId, buf: &mut [u8]) -> std::io::Result<()> {
        trace!("read {} bytes at offset {}", buf.len(), Self::offset(block));
        self.dev.read_block(Self::device_block(block), buf)
    }

    pub fn write(&mut self, block: BlockId, data: &[u8]) -> std::io::Result<()> {
        debug_assert!(data.len() <= BLOCK_SIZE);
        trace!("write {} bytes at offset {}", data.len(), Self::offset(block));
        self.dev.write_block(Self::device_block(block), data)
    }

    pub fn sync(&mut self) -> std::io::Result<()> {
        self.dev.sync_disk()
    }

    pub fn into_inner(self) -> T {
        self.dev
    }
}
