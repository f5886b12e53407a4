//! A small flat file store on top of fixed-size block storage.
//!
//! # Layout
//! ===========================================================
//! | Reserved (1 block) | Data Region (MAX_BLOCKS blocks) |
//! ===========================================================
//!
//! Each file occupies a singly linked chain of data blocks. The directory, the
//! block bitmap and the link nodes are held in memory only, so only the raw block
//! bytes outlive the process.
mod alloc;
mod dir;
mod fs;
mod gate;
pub mod io;

pub use fs::{BlockFs, FsError};

/// Number of directory entries, and so the maximum number of files.
pub const MAX_FILES: usize = 5;
/// Number of data blocks, which is also the number of link nodes.
pub const MAX_BLOCKS: usize = 10;
/// Size in bytes of one block.
pub const BLOCK_SIZE: usize = 128;
/// Longest file name in bytes.
pub const MAX_NAME_LEN: usize = 11;
/// Largest file the store can hold.
pub const MAX_FILE_SIZE: usize = MAX_BLOCKS * BLOCK_SIZE;

/// Number of device blocks a backing store needs: the reserved header block plus
/// the data region.
pub const DEVICE_BLOCKS: usize = 1 + MAX_BLOCKS;
