use smol::io::{AsyncBufReadExt, AsyncWriteExt, BufReader as AsyncBufReader};
use smol::net::TcpStream as AsyncTcpStream;
use std::cell::RefCell;
use std::io::BufRead;
use std::io::{BufReader, Write};
use std::net::{SocketAddr, TcpStream};

/// Blocking newline framed text over a borrowed stream. Blank lines are skipped.
pub struct LineStream<'a> {
    inner: &'a TcpStream,
    reader: RefCell<BufReader<&'a TcpStream>>,
}

impl<'a> LineStream<'a> {
    pub fn new(inner: &'a TcpStream) -> Self {
        Self {
            inner,
            reader: RefCell::new(BufReader::new(inner)),
        }
    }

    pub fn read_line(&self) -> Option<String> {
        let mut line = String::new();
        loop {
            if let Err(_) | Ok(0) = self.reader.borrow_mut().read_line(&mut line) {
                return None;
            }

            let result = line.trim();
            if !result.is_empty() {
                return Some(result.to_string());
            }
            line.clear();
        }
    }

    pub fn write_line(&self, mut line: String) -> Result<(), std::io::Error> {
        let mut inner = self.inner;
        line.push('\n');
        inner.write_all(line.as_bytes())
    }
}

/// Async newline framed text. Bytes of an unfinished line stay buffered in the stream,
/// so `read_line` can be dropped half way (on a timeout) without losing input.
pub struct AsyncLineStream {
    reader: AsyncBufReader<AsyncTcpStream>,
    writer: AsyncTcpStream,
    pending: Vec<u8>,
}

impl AsyncLineStream {
    pub fn new(inner: AsyncTcpStream) -> Self {
        Self {
            reader: AsyncBufReader::new(inner.clone()),
            writer: inner,
            pending: Vec::new(),
        }
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.writer.peer_addr().ok()
    }

    pub async fn read_line(&mut self) -> Option<String> {
        loop {
            if let Err(_) | Ok(0) = self.reader.read_until(b'\n', &mut self.pending).await {
                return None;
            }

            let line = String::from_utf8_lossy(&self.pending).trim().to_string();
            self.pending.clear();
            if !line.is_empty() {
                return Some(line);
            }
        }
    }

    pub async fn write_line(&mut self, line: &str) -> Result<(), std::io::Error> {
        let mut line = line.to_owned();
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smol::Timer;
    use smol::net::TcpListener;
    use std::time::Duration;

    async fn pair() -> (AsyncLineStream, AsyncLineStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = AsyncTcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (AsyncLineStream::new(server), AsyncLineStream::new(client))
    }

    #[test]
    fn skips_blank_lines() {
        smol::block_on(async {
            let (mut server, mut client) = pair().await;
            client.write_line("").await.unwrap();
            client.write_line("  ready ").await.unwrap();
            assert_eq!(server.read_line().await.as_deref(), Some("ready"));

            drop(client);
            assert_eq!(server.read_line().await, None);
        });
    }

    #[test]
    fn interrupted_read_keeps_partial_line() {
        smol::block_on(async {
            let (mut server, mut client) = pair().await;
            client.writer.write_all(b"play h7").await.unwrap();
            client.writer.flush().await.unwrap();

            let interrupted = smol::future::or(async { server.read_line().await }, async {
                Timer::after(Duration::from_millis(50)).await;
                None
            })
            .await;
            assert_eq!(interrupted, None);

            client.write_line("e7").await.unwrap();
            assert_eq!(server.read_line().await.as_deref(), Some("play h7e7"));
        });
    }
}
