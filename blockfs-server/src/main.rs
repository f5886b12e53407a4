use anyhow::{anyhow, Context, Result};
use blockfs::io::{FileBlockEmulator, FileBlockEmulatorBuilder};
use blockfs::{BlockFs, DEVICE_BLOCKS};
use blockfs_server::{logger, Server};
use clap::Parser;
use log::{info, LevelFilter};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(version, about = "Serves a small block file store over TCP")]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:12345")]
    addr: String,

    /// Disk image backing the data blocks
    #[arg(short, long, default_value = "filesystem.dat")]
    disk: PathBuf,

    /// One of off, error, warn, info, debug, trace
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Zero the disk image before serving
    #[arg(long)]
    clear: bool,
}

fn open_device(path: &Path, clear: bool) -> std::io::Result<FileBlockEmulator> {
    if !clear {
        return FileBlockEmulator::open_disk(path, DEVICE_BLOCKS);
    }
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)?;
    FileBlockEmulatorBuilder::from(file)
        .with_block_count(DEVICE_BLOCKS)
        .build()
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {:#}", error);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let level: LevelFilter = args
        .log_level
        .parse()
        .map_err(|_| anyhow!("invalid log level {:?}", args.log_level))?;
    logger::init(level)?;

    let dev = open_device(&args.disk, args.clear)
        .with_context(|| format!("could not open disk image {}", args.disk.display()))?;
    let fs = Arc::new(BlockFs::new(dev)?);
    info!("serving {} ({} blocks)", args.disk.display(), DEVICE_BLOCKS);

    let server = Server::bind(args.addr.as_str(), Arc::clone(&fs))
        .with_context(|| format!("could not start server on {}", args.addr))?;
    let served = server.run();
    fs.sync()?;
    served.context("accept loop failed")
}
