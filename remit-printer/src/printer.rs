//! Printer adapters for sending ESC/POS data
//!
//! Supports:
//! - Network printers (TCP port 9100)
//! - Simulated printers (see [`crate::simulated`])

use crate::error::{PrintError, PrintResult};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{info, instrument, warn};

/// Device-reported status fields, before any interpretation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawStatus {
    pub online: bool,
    pub model: Option<String>,
    /// Exact paper gauge, when the device has one
    pub paper_level: Option<u8>,
    pub paper_near_end: bool,
    pub paper_out: bool,
    pub cover_open: bool,
    pub temperature: Option<i32>,
}

/// Capability to talk to one physical (or simulated) printer
#[async_trait]
pub trait PrinterHandle: Send + Sync {
    /// Query the device for its current status
    async fn query_status(&self) -> PrintResult<RawStatus>;

    /// Send raw ESC/POS data to the printer
    async fn write_bytes(&self, data: &[u8]) -> PrintResult<()>;
}

/// DLE EOT n - Real-time status transmission
const DLE_EOT: [u8; 2] = [0x10, 0x04];

/// Interpret the three DLE EOT status bytes (n = 1, 2, 4)
pub fn parse_realtime_status(printer: u8, offline_cause: u8, paper: u8) -> RawStatus {
    RawStatus {
        online: printer & 0x08 == 0,
        model: None,
        paper_level: None,
        paper_near_end: paper & 0x0C != 0,
        paper_out: paper & 0x60 != 0 || offline_cause & 0x20 != 0,
        cover_open: offline_cause & 0x04 != 0,
        temperature: None,
    }
}

/// Network printer (TCP port 9100)
///
/// Most thermal printers support raw TCP printing on port 9100.
#[derive(Debug, Clone)]
pub struct NetworkPrinter {
    addr: SocketAddr,
    timeout: Duration,
    model: Option<String>,
}

impl NetworkPrinter {
    /// Create a new network printer
    pub fn new(host: &str, port: u16) -> PrintResult<Self> {
        Self::from_addr(&format!("{}:{}", host, port))
    }

    /// Create from a socket address string (e.g., "192.168.1.100:9100")
    pub fn from_addr(addr: &str) -> PrintResult<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|_| PrintError::InvalidConfig(format!("Invalid address: {}", addr)))?;

        Ok(Self {
            addr,
            timeout: Duration::from_secs(5),
            model: None,
        })
    }

    /// Set connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the model name reported in status queries
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Get the printer address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    async fn connect(&self) -> PrintResult<TcpStream> {
        tokio::time::timeout(self.timeout, TcpStream::connect(self.addr))
            .await
            .map_err(|_| PrintError::Timeout(format!("Connection timeout: {}", self.addr)))?
            .map_err(|e| PrintError::Connection(format!("{}: {}", self.addr, e)))
    }

    async fn request_status_byte(&self, stream: &mut TcpStream, n: u8) -> PrintResult<u8> {
        stream.write_all(&[DLE_EOT[0], DLE_EOT[1], n]).await?;
        let mut byte = [0u8; 1];
        tokio::time::timeout(self.timeout, stream.read_exact(&mut byte))
            .await
            .map_err(|_| PrintError::Timeout(format!("No status reply (n={})", n)))??;
        Ok(byte[0])
    }
}

#[async_trait]
impl PrinterHandle for NetworkPrinter {
    #[instrument(skip(self), fields(addr = %self.addr))]
    async fn query_status(&self) -> PrintResult<RawStatus> {
        let mut stream = self.connect().await?;

        let printer = self.request_status_byte(&mut stream, 1).await?;
        let offline_cause = self.request_status_byte(&mut stream, 2).await?;
        let paper = self.request_status_byte(&mut stream, 4).await?;

        let mut status = parse_realtime_status(printer, offline_cause, paper);
        status.model = self.model.clone();
        if !status.online {
            warn!(?status, "Printer reports offline");
        }
        Ok(status)
    }

    #[instrument(skip(self, data), fields(addr = %self.addr, data_len = data.len()))]
    async fn write_bytes(&self, data: &[u8]) -> PrintResult<()> {
        info!("Connecting to printer");
        let mut stream = self.connect().await?;

        info!("Connected, sending {} bytes", data.len());
        stream.write_all(data).await.map_err(|e| {
            PrintError::Io(std::io::Error::new(
                e.kind(),
                format!("Write failed: {}", e),
            ))
        })?;
        stream.flush().await?;

        info!("Print job sent successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_network_printer_new() {
        let printer = NetworkPrinter::new("192.168.1.100", 9100).unwrap();
        assert_eq!(printer.addr().port(), 9100);
    }

    #[test]
    fn test_invalid_addr() {
        let result = NetworkPrinter::from_addr("invalid");
        assert!(matches!(result, Err(PrintError::InvalidConfig(_))));
    }

    #[test]
    fn test_parse_realtime_status() {
        // Fixed bits 1 and 4 set (0x12) as real printers report them
        let healthy = parse_realtime_status(0x12, 0x12, 0x12);
        assert!(healthy.online);
        assert!(!healthy.paper_near_end && !healthy.paper_out && !healthy.cover_open);

        let troubled = parse_realtime_status(0x1A, 0x16, 0x7E);
        assert!(!troubled.online);
        assert!(troubled.cover_open);
        assert!(troubled.paper_near_end);
        assert!(troubled.paper_out);
    }

    #[tokio::test]
    async fn test_query_status_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut req = [0u8; 3];
            // printer: online, offline cause: none, paper: near end
            for reply in [0x12u8, 0x12, 0x1E] {
                socket.read_exact(&mut req).await.unwrap();
                assert_eq!(&req[..2], &DLE_EOT);
                socket.write_all(&[reply]).await.unwrap();
            }
        });

        let printer = NetworkPrinter::from_addr(&addr.to_string())
            .unwrap()
            .with_model("TM-T20III");
        let status = printer.query_status().await.unwrap();
        assert!(status.online);
        assert!(status.paper_near_end);
        assert_eq!(status.model.as_deref(), Some("TM-T20III"));
    }

    #[tokio::test]
    async fn test_write_bytes_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            received
        });

        let printer = NetworkPrinter::from_addr(&addr.to_string()).unwrap();
        printer.write_bytes(&[0x1B, 0x40, b'h', b'i']).await.unwrap();

        assert_eq!(server.await.unwrap(), vec![0x1B, 0x40, b'h', b'i']);
    }
}
