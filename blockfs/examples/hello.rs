use blockfs::io::FileBlockEmulatorBuilder;
use blockfs::{BlockFs, DEVICE_BLOCKS};

pub fn main() {
    let tmp = tempfile::tempfile().unwrap();
    let dev = FileBlockEmulatorBuilder::from(tmp)
        .with_block_count(DEVICE_BLOCKS)
        .build()
        .expect("Could not initialize disk emulator.");

    let fs = BlockFs::new(dev).expect("should create");
    fs.create("hello.txt").unwrap();
    fs.write("hello.txt", b"hello, blocks").unwrap();

    let content = fs.read("hello.txt").unwrap();
    println!("{:?}: {}", fs.list(), String::from_utf8_lossy(&content));
    println!("{} blocks free", fs.free_blocks());
}
