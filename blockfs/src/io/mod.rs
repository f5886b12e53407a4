mod block;
mod emulator;
mod store;

pub use block::{BlockNumber, BlockStorage};
pub use emulator::{FileBlockEmulator, FileBlockEmulatorBuilder};
pub(crate) use store::BlockStore;
