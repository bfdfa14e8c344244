//! Outbound side of the realtime transport.
//!
//! The client never opens a socket itself; it issues commands to a [`Socket`] and is fed
//! inbound frames through [`crate::client::Client::handle_message`].

use tokio::sync::mpsc;
use tracing::debug;

/// Sink for connection commands and outbound frames.
pub trait Socket: Send + Sync {
    fn connect(&self, url: &str);
    fn send(&self, text: String);
    fn disconnect(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketCommand {
    Connect(String),
    Send(String),
    Disconnect,
}

/// A [`Socket`] that forwards every command to an unbounded channel, drained by whatever
/// drives the real connection.
#[derive(Debug, Clone)]
pub struct ChannelSocket {
    tx: mpsc::UnboundedSender<SocketCommand>,
}

impl ChannelSocket {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SocketCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, command: SocketCommand) {
        if self.tx.send(command).is_err() {
            debug!("socket command dropped: transport receiver closed");
        }
    }
}

impl Socket for ChannelSocket {
    fn connect(&self, url: &str) {
        self.forward(SocketCommand::Connect(url.to_string()));
    }

    fn send(&self, text: String) {
        self.forward(SocketCommand::Send(text));
    }

    fn disconnect(&self) {
        self.forward(SocketCommand::Disconnect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_arrive_in_order() {
        let (socket, mut rx) = ChannelSocket::new();
        socket.connect("wss://host/app/k");
        socket.send("hello".to_string());
        socket.disconnect();

        assert_eq!(
            rx.try_recv().unwrap(),
            SocketCommand::Connect("wss://host/app/k".to_string())
        );
        assert_eq!(rx.try_recv().unwrap(), SocketCommand::Send("hello".to_string()));
        assert_eq!(rx.try_recv().unwrap(), SocketCommand::Disconnect);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_receiver_is_tolerated() {
        let (socket, rx) = ChannelSocket::new();
        drop(rx);
        socket.send("ignored".to_string());
    }
}
