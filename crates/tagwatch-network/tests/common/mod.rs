//! Fake MQTT broker shared by the integration tests.
//!
//! The broker accepts connections on an ephemeral port, answers CONNECT with
//! a scripted return code and forwards every packet it receives to the test
//! through a channel.

#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tagwatch_network::{ConnAck, ConnectReturnCode, MqttClientConfig, MqttCodec, Packet};

/// Packet observed by the fake broker, tagged with the connection number.
#[derive(Debug)]
pub struct Seen {
    pub connection: usize,
    pub packet: Packet,
}

pub struct FakeBroker {
    pub addr: SocketAddr,
    pub seen: mpsc::UnboundedReceiver<Seen>,
}

impl FakeBroker {
    /// Broker that answers every CONNECT with `code`.
    pub async fn start(code: ConnectReturnCode) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, seen) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut connection = 0;
            while let Ok((stream, _)) = listener.accept().await {
                connection += 1;
                let tx = tx.clone();
                tokio::spawn(async move {
                    let mut framed = Framed::new(stream, MqttCodec::new());
                    while let Some(Ok(packet)) = framed.next().await {
                        let is_connect = matches!(packet, Packet::Connect(_));
                        let _ = tx.send(Seen { connection, packet });
                        if is_connect {
                            let ack = Packet::ConnAck(ConnAck {
                                session_present: false,
                                code,
                            });
                            if framed.send(ack).await.is_err() || code != ConnectReturnCode::Accepted {
                                break;
                            }
                        }
                    }
                });
            }
        });

        Self { addr, seen }
    }

    pub fn client_config(&self, client_id: &str) -> MqttClientConfig {
        MqttClientConfig::new(self.addr.ip().to_string(), self.addr.port(), client_id)
            .with_timeout(Duration::from_millis(1000))
    }

    /// Next packet seen by the broker, failing the test after one second.
    pub async fn next(&mut self) -> Seen {
        tokio::time::timeout(Duration::from_secs(1), self.seen.recv())
            .await
            .expect("broker saw nothing")
            .expect("broker task ended")
    }

    /// Everything observed so far, without waiting.
    pub fn drain(&mut self) -> Vec<Seen> {
        let mut all = Vec::new();
        while let Ok(seen) = self.seen.try_recv() {
            all.push(seen);
        }
        all
    }
}

/// Listener that accepts but never answers.
pub async fn silent_listener() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });
    addr
}

/// Address with nothing listening on it.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
