use std::fmt::Write as _;
use std::io::Write;
use std::net::{SocketAddr, UdpSocket};

use mf_core::record::FeatureRecord;
use mf_core::traits::Transmitter;
use mf_core::CoreError;
use serde::Serialize;

/// Logs every payload in hex at `info`. Default sink on a desktop.
#[derive(Default)]
pub struct LogTransmitter {
    sent: u64,
}

impl LogTransmitter {
    /// Payloads handed over so far.
    #[must_use]
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl Transmitter for LogTransmitter {
    fn send(&mut self, channel_id: u8, payload: &[u8]) -> Result<(), CoreError> {
        let mut hex = String::with_capacity(payload.len() * 2);
        for byte in payload {
            let _ = write!(hex, "{byte:02x}");
        }
        self.sent += 1;
        log::info!("adv ch{channel_id} #{} [{} o] {hex}", self.sent, payload.len());
        Ok(())
    }
}

/// Une ligne JSON par record.
#[derive(Serialize)]
struct JsonLine<'a> {
    channel_id: u8,
    seq: u64,
    record: &'a FeatureRecord,
}

/// Decodes each payload and writes it as a JSON line to `W`.
pub struct JsonTransmitter<W: Write> {
    out: W,
    seq: u64,
}

impl<W: Write> JsonTransmitter<W> {
    pub fn new(out: W) -> Self {
        Self { out, seq: 0 }
    }

    /// Consume the sink and give the writer back.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Transmitter for JsonTransmitter<W> {
    fn send(&mut self, channel_id: u8, payload: &[u8]) -> Result<(), CoreError> {
        let record = FeatureRecord::from_bytes(payload)?;
        let line = JsonLine {
            channel_id,
            seq: self.seq,
            record: &record,
        };
        serde_json::to_writer(&mut self.out, &line)
            .map_err(|e| CoreError::Transmit(e.to_string()))?;
        writeln!(self.out).map_err(|e| CoreError::Transmit(e.to_string()))?;
        self.out
            .flush()
            .map_err(|e| CoreError::Transmit(e.to_string()))?;
        self.seq += 1;
        Ok(())
    }
}

/// Diffusion UDP du payload brut, stand-in for the BLE advertiser.
///
/// The datagram carries exactly the record bytes; the channel id only
/// shows up in logs.
pub struct UdpTransmitter {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpTransmitter {
    /// Bind an ephemeral socket allowed to broadcast.
    ///
    /// # Errors
    /// Returns an error if the socket cannot be bound or configured.
    pub fn new(target: SocketAddr) -> anyhow::Result<Self> {
        let bind: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind)?;
        socket.set_broadcast(target.is_ipv4())?;
        log::info!("Émission UDP vers {target}");
        Ok(Self { socket, target })
    }
}

impl Transmitter for UdpTransmitter {
    fn send(&mut self, channel_id: u8, payload: &[u8]) -> Result<(), CoreError> {
        let written = self
            .socket
            .send_to(payload, self.target)
            .map_err(|e| CoreError::Transmit(format!("{}: {e}", self.target)))?;
        if written != payload.len() {
            return Err(CoreError::Transmit(format!(
                "datagramme tronqué ({written}/{} o)",
                payload.len()
            )));
        }
        log::trace!("udp ch{channel_id} -> {}", self.target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mf_core::record::ChannelFeatures;
    use mf_core::window::Axis;

    use super::*;

    fn record() -> FeatureRecord {
        let mut r = FeatureRecord::default();
        *r.get_mut(Axis::AccelY) = ChannelFeatures {
            amplitude: 512,
            label: -3,
            mean: 2001,
        };
        r
    }

    #[test]
    fn json_lines_are_sequenced() {
        let mut sink = JsonTransmitter::new(Vec::new());
        assert!(sink.send(37, &record().to_bytes()).is_ok());
        assert!(sink.send(37, &record().to_bytes()).is_ok());
        let text = String::from_utf8(sink.into_inner()).unwrap_or_default();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("{\"channel_id\":37,\"seq\":0,"));
        assert!(lines[1].contains("\"seq\":1"));
        assert!(lines[1].contains("{\"amplitude\":512,\"label\":-3,\"mean\":2001}"));
    }

    #[test]
    fn json_rejects_garbage() {
        let mut sink = JsonTransmitter::new(Vec::new());
        assert!(matches!(
            sink.send(37, b"not a record"),
            Err(CoreError::PayloadLength { .. })
        ));
    }

    #[test]
    fn log_counts() {
        let mut sink = LogTransmitter::default();
        assert!(sink.send(37, &[0u8; 31]).is_ok());
        assert_eq!(sink.sent(), 1);
    }

    #[test]
    fn udp_delivers_exact_payload() {
        let listener = match UdpSocket::bind("127.0.0.1:0") {
            Ok(s) => s,
            Err(e) => panic!("bind: {e}"),
        };
        let target = match listener.local_addr() {
            Ok(a) => a,
            Err(e) => panic!("local_addr: {e}"),
        };
        let mut sink = match UdpTransmitter::new(target) {
            Ok(t) => t,
            Err(e) => panic!("udp sink: {e:#}"),
        };
        let payload = record().to_bytes();
        assert!(sink.send(37, &payload).is_ok());

        let mut buf = [0u8; 64];
        let _ = listener.set_read_timeout(Some(std::time::Duration::from_secs(2)));
        let received = match listener.recv(&mut buf) {
            Ok(n) => n,
            Err(e) => panic!("recv: {e}"),
        };
        assert_eq!(&buf[..received], &payload[..]);
    }
}
