use crate::protocol;

use blockfs::io::BlockStorage;
use blockfs::BlockFs;
use log::{debug, info, warn};
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;

/// Accepts clients and serves each one on its own thread against a shared store.
pub struct Server<T: BlockStorage> {
    listener: TcpListener,
    fs: Arc<BlockFs<T>>,
}

impl<T> Server<T>
where
    T: BlockStorage + Send + Sync + 'static,
{
    pub fn bind<A: ToSocketAddrs>(addr: A, fs: Arc<BlockFs<T>>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self { listener, fs })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves connections until the listener fails.
    pub fn run(&self) -> std::io::Result<()> {
        info!("listening on {}", self.local_addr()?);
        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(err) => {
                    warn!("accept failed: {}", err);
                    continue;
                }
            };
            let peer = stream
                .peer_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|_| "unknown".to_string());
            info!("accepted client {}", peer);
            let fs = Arc::clone(&self.fs);
            thread::Builder::new()
                .name(format!("client-{}", peer))
                .spawn(move || {
                    if let Err(err) = serve_client(stream, &peer, &fs) {
                        warn!("client {} dropped: {}", peer, err);
                    }
                    debug!("client {} disconnected", peer);
                })?;
        }
        Ok(())
    }
}

/// Answers requests from one client until it disconnects or sends `QUIT`.
fn serve_client<T: BlockStorage>(
    stream: TcpStream,
    peer: &str,
    fs: &BlockFs<T>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        debug!("from {}: {}", peer, line);

        let reply = protocol::handle_line(fs, line);
        writeln!(writer, "{}", reply.text)?;
        writer.flush()?;
        if reply.close {
            return Ok(());
        }
    }
}
