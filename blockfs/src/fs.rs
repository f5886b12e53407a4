use crate::alloc::{Allocator, Chain, ChainBuilder};
use crate::dir::{validate_name, Directory};
use crate::gate::Gate;
use crate::io::{BlockStorage, BlockStore};
use crate::{BLOCK_SIZE, MAX_FILE_SIZE};

use log::{debug, warn};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("{0}")]
    InvalidArgument(&'static str),
    #[error("file already exists")]
    AlreadyExists,
    #[error("file does not exist")]
    NotFound,
    #[error("{0}")]
    CapacityExceeded(&'static str),
    #[error("internal storage error")]
    Internal(#[from] std::io::Error),
}

impl FsError {
    /// True for failures of the backing store rather than rejected requests.
    pub fn is_internal(&self) -> bool {
        matches!(self, FsError::Internal(_))
    }
}

/// Number of blocks needed to hold `len` bytes.
fn blocks_needed(len: usize) -> usize {
    (len + BLOCK_SIZE - 1) / BLOCK_SIZE
}

struct Inner<T: BlockStorage> {
    dir: Directory,
    alloc: Allocator,
    store: BlockStore<T>,
}

impl<T: BlockStorage> Inner<T> {
    /// Writes `content` into freshly allocated blocks. On failure every block taken
    /// so far is returned to the pool.
    fn write_chain(&mut self, content: &[u8]) -> Result<Option<Chain>, FsError> {
        let mut builder = ChainBuilder::new();
        for chunk in content.chunks(BLOCK_SIZE) {
            let written = match self.alloc.append(&mut builder) {
                Some(block) => self.store.write(block, chunk).map_err(FsError::from),
                None => Err(FsError::CapacityExceeded("file too large")),
            };
            if let Err(err) = written {
                if let Some(partial) = builder.finish() {
                    self.alloc.free_chain(partial);
                }
                return Err(err);
            }
        }
        Ok(builder.finish())
    }
}

/// A flat file store over a fixed table of `MAX_FILES` entries and `MAX_BLOCKS`
/// data blocks of `BLOCK_SIZE` bytes.
///
/// Each file is a linked chain of blocks. Directory and allocation tables live in
/// memory only; a fresh instance always starts empty whatever the device holds.
///
/// All state sits behind one reader/writer gate: `read` and `list` share it,
/// everything else takes it exclusively.
pub struct BlockFs<T: BlockStorage> {
    gate: Gate<Inner<T>>,
}

impl<T: BlockStorage> BlockFs<T> {
    /// Builds an empty file system on top of `dev`.
    ///
    /// # Errors
    ///
    /// The device must use `BLOCK_SIZE` byte blocks and hold at least
    /// `MAX_BLOCKS + 1` of them, the first being reserved for a header.
    pub fn new(dev: T) -> Result<Self, FsError> {
        let store = BlockStore::new(dev)?;
        Ok(Self {
            gate: Gate::new(Inner {
                dir: Directory::new(),
                alloc: Allocator::new(),
                store,
            }),
        })
    }

    pub fn create(&self, name: &str) -> Result<(), FsError> {
        let mut inner = self.gate.write();
        validate_name(name)?;
        if inner.dir.find(name).is_some() {
            debug!("create {:?}: already exists", name);
            return Err(FsError::AlreadyExists);
        }
        let slot = inner
            .dir
            .find_free_slot()
            .ok_or(FsError::CapacityExceeded("no free file entries"))?;
        inner.dir.claim(slot, name);
        debug!("created {:?} in slot {}", name, slot);
        Ok(())
    }

    pub fn delete(&self, name: &str) -> Result<(), FsError> {
        let mut guard = self.gate.write();
        let inner = &mut *guard;
        let slot = inner.dir.find(name).ok_or(FsError::NotFound)?;
        if let Some(chain) = inner.dir.release(slot) {
            inner.alloc.free_chain(chain);
        }
        debug!("deleted {:?} from slot {}", name, slot);
        Ok(())
    }

    /// Replaces the whole content of `name`.
    ///
    /// The capacity check counts the file's current blocks as available, since they
    /// are released before the new content is laid down. If the device fails part
    /// way through, the file is left empty and the error is returned.
    pub fn write(&self, name: &str, content: &[u8]) -> Result<(), FsError> {
        let mut guard = self.gate.write();
        let inner = &mut *guard;
        let slot = inner.dir.find(name).ok_or(FsError::NotFound)?;

        let needed = blocks_needed(content.len());
        let owned = inner.dir.get(slot).chain().map_or(0, Chain::len);
        if content.len() > MAX_FILE_SIZE || inner.alloc.free_blocks() + owned < needed {
            debug!(
                "write {:?}: {} blocks needed, {} available",
                name,
                needed,
                inner.alloc.free_blocks() + owned
            );
            return Err(FsError::CapacityExceeded("file too large"));
        }

        if let Some(old) = inner.dir.get_mut(slot).take_chain() {
            inner.alloc.free_chain(old);
        }
        let chain = inner.write_chain(content).map_err(|err| {
            warn!("write {:?} failed, file left empty: {}", name, err);
            err
        })?;
        inner.dir.get_mut(slot).set_contents(chain, content.len());
        debug!("wrote {} bytes in {} blocks to {:?}", content.len(), needed, name);
        Ok(())
    }

    pub fn read(&self, name: &str) -> Result<Vec<u8>, FsError> {
        let inner = self.gate.read();
        let entry = inner
            .dir
            .find(name)
            .map(|slot| inner.dir.get(slot))
            .ok_or(FsError::NotFound)?;
        let chain = match entry.chain() {
            Some(chain) => chain,
            None => return Ok(Vec::new()),
        };

        let mut content = vec![0; entry.size()];
        let mut blocks = inner.alloc.chain_blocks(chain);
        for chunk in content.chunks_mut(BLOCK_SIZE) {
            // Chains always cover their entry's size.
            let block = blocks
                .next()
                .ok_or_else(|| FsError::Internal(std::io::ErrorKind::UnexpectedEof.into()))?;
            inner.store.read(block, chunk).map_err(|err| {
                warn!("read {:?} failed: {}", name, err);
                err
            })?;
        }
        Ok(content)
    }

    /// Names of all files in directory slot order.
    pub fn list(&self) -> Vec<String> {
        self.gate.read().dir.names()
    }

    pub fn free_blocks(&self) -> usize {
        self.gate.read().alloc.free_blocks()
    }

    /// Flushes the backing device.
    pub fn sync(&self) -> Result<(), FsError> {
        self.gate.write().store.sync()?;
        Ok(())
    }

    /// Gives back the device. All file metadata is discarded.
    pub fn into_inner(self) -> T {
        self.gate.into_inner().store.into_inner()
    }
}
