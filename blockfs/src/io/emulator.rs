use crate::io::{BlockNumber, BlockStorage};
use crate::BLOCK_SIZE;

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::prelude::*;
use std::io::{BufWriter, ErrorKind, SeekFrom};
use std::path::Path;

/// Emulates block disk/flash storage in userspace using a file as block storage.
pub struct FileBlockEmulator {
    /// The file must be a fixed-size file some exact multiple of the size of a block.
    /// Readers share the emulator, so the seek cursor is guarded.
    fd: Mutex<File>,
    /// Size in bytes of a single block.
    block_size: usize,
    /// The total number of blocks available in the file store.
    block_count: usize,
}

impl FileBlockEmulator {
    /// Opens (or creates) a disk image at the specified path without clearing any
    /// existing content. The file is extended if it is too short to hold `nblocks`.
    pub fn open_disk<P: AsRef<Path>>(dest: P, nblocks: usize) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(dest)?;
        FileBlockEmulatorBuilder::from(file)
            .with_block_count(nblocks)
            .clear_medium(false)
            .build()
    }

    /// Returns ownership of the underlying file descriptor to the caller.
    pub fn into_file(self) -> File {
        self.fd.into_inner()
    }

    fn offset_of(&self, blocknr: BlockNumber, len: usize) -> std::io::Result<u64> {
        if blocknr >= self.block_count {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "block out of range",
            ));
        }
        if len > self.block_size {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "buffer exceeds block size",
            ));
        }
        Ok((blocknr * self.block_size) as u64)
    }
}

impl BlockStorage for FileBlockEmulator {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn block_count(&self) -> usize {
        self.block_count
    }

    fn read_block(&self, blocknr: BlockNumber, buf: &mut [u8]) -> std::io::Result<()> {
        let offset = self.offset_of(blocknr, buf.len())?;
        let mut fd = self.fd.lock();
        fd.seek(SeekFrom::Start(offset))?;
        fd.read_exact(buf)
    }

    fn write_block(&mut self, blocknr: BlockNumber, buf: &[u8]) -> std::io::Result<()> {
        let offset = self.offset_of(blocknr, buf.len())?;
        let fd = self.fd.get_mut();
        fd.seek(SeekFrom::Start(offset))?;
        fd.write_all(buf)
    }

    fn sync_disk(&mut self) -> std::io::Result<()> {
        self.fd.get_mut().sync_all()
    }
}

pub struct FileBlockEmulatorBuilder {
    fd: File,
    block_size: usize,
    block_count: usize,
    clear: bool,
}

impl From<File> for FileBlockEmulatorBuilder {
    fn from(fd: File) -> Self {
        FileBlockEmulatorBuilder {
            fd,
            block_size: BLOCK_SIZE,
            // A better default here might be the size of the file rounded down
            // to the nearest block.
            block_count: 0,
            clear: true,
        }
    }
}

impl FileBlockEmulatorBuilder {
    /// Sets the number of desired blocks in the block store device.
    pub fn with_block_count(mut self, blocks: usize) -> Self {
        self.block_count = blocks;
        self
    }

    /// Sets the size in bytes of each block.
    pub fn with_block_size(mut self, bytes: usize) -> Self {
        self.block_size = bytes;
        self
    }

    /// Whether the whole medium is zeroed on build. Defaults to true.
    pub fn clear_medium(mut self, clear: bool) -> Self {
        self.clear = clear;
        self
    }

    /// This builder assumes ownership of the file descriptor used and, unless told
    /// otherwise, does destructive things to prepare the file for use.
    pub fn build(mut self) -> std::io::Result<FileBlockEmulator> {
        if self.block_count == 0 || self.block_size == 0 {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "block count and block size must be non-zero",
            ));
        }
        let len = (self.block_count * self.block_size) as u64;
        if self.clear {
            self.zero_medium()?;
        } else if self.fd.metadata()?.len() < len {
            self.fd.set_len(len)?;
        }
        Ok(FileBlockEmulator {
            fd: Mutex::new(self.fd),
            block_size: self.block_size,
            block_count: self.block_count,
        })
    }

    fn zero_medium(&mut self) -> std::io::Result<()> {
        self.fd.seek(SeekFrom::Start(0))?;
        let zeros = vec![0x00; self.block_size];
        let mut bfd = BufWriter::new(&self.fd);
        // Buffer each block write to prevent excessive syscalls.
        for _ in 0..self.block_count {
            bfd.write_all(&zeros)?;
        }
        bfd.flush()
    }
}
