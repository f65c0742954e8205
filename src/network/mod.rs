//! Network subsystem for OSC over UDP

pub mod receiver;
pub mod sender;
pub mod udp;

pub use receiver::{MulticastReceiver, ReceiverStats};
pub use sender::{MessageSink, OscSender, SenderStats};
pub use udp::{create_multicast_sender, create_multicast_socket, create_sender_socket, resolve};
