//! UDP syslog sink: fire-and-forget datagrams.

use crate::sink::{Sink, SinkError};
use async_trait::async_trait;
use secubeat_types::{DeliveryBatch, WireEvent};
use tokio::net::UdpSocket;

fn format_message(event: &WireEvent) -> String {
    format!(
        "SecuBeat: {}@{} executed: {}",
        event.user, event.source_ip, event.command
    )
}

/// Sends one datagram per event, best-effort.
pub struct SyslogSink {
    target: String,
    socket: UdpSocket,
}

impl SyslogSink {
    /// Bind a local socket for the given syslog server.
    pub async fn new(server: impl Into<String>, port: u16) -> Result<Self, SinkError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        Ok(Self {
            target: format!("{}:{}", server.into(), port),
            socket,
        })
    }
}

#[async_trait]
impl Sink for SyslogSink {
    fn name(&self) -> &str {
        "syslog"
    }

    async fn deliver(&self, batch: &DeliveryBatch) -> Result<(), SinkError> {
        for event in &batch.events {
            let message = format_message(event);
            self.socket
                .send_to(message.as_bytes(), self.target.as_str())
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secubeat_types::{CommandEvent, EventKind};

    #[test]
    fn test_message_format() {
        let event = CommandEvent::builder(EventKind::CommandExecution)
            .user("alice")
            .command("rm -rf /tmp/scratch")
            .source_ip("10.1.2.3")
            .build();
        assert_eq!(
            format_message(&WireEvent::from_event(&event)),
            "SecuBeat: alice@10.1.2.3 executed: rm -rf /tmp/scratch"
        );
    }

    #[tokio::test]
    async fn test_datagram_reaches_receiver() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = receiver.local_addr().unwrap().port();

        let sink = SyslogSink::new("127.0.0.1", port).await.unwrap();
        let event = CommandEvent::builder(EventKind::CommandExecution)
            .user("bob")
            .command("uptime")
            .build();
        sink.deliver(&DeliveryBatch::new(vec![WireEvent::from_event(&event)]))
            .await
            .unwrap();

        let mut buf = [0u8; 256];
        let (len, _) = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            receiver.recv_from(&mut buf),
        )
        .await
        .unwrap()
        .unwrap();
        let payload = std::str::from_utf8(&buf[..len]).unwrap();
        assert_eq!(payload, "SecuBeat: bob@unknown executed: uptime");
    }
}
