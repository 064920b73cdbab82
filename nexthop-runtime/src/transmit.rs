use crossbeam::crossbeam_channel::Sender;

/// Boundary to the physical frame I/O layer. Fire-and-forget: there is no
/// delivery confirmation and transmission failures stay on the far side.
pub trait FrameTransmitter {
    fn send_frame(&self, frame: &[u8], interface: &str);
}

/// Transmitter shipping every outgoing frame into a channel, tagged with its
/// egress interface name. Tests drain the receiving side to observe what the
/// router put on the wire; embedders can do the same to bridge frames into
/// their own I/O loop.
#[derive(Clone)]
pub struct ChannelTransmitter {
    sender: Sender<(Vec<u8>, String)>,
}

impl ChannelTransmitter {
    pub fn new(sender: Sender<(Vec<u8>, String)>) -> ChannelTransmitter {
        ChannelTransmitter { sender }
    }
}

impl FrameTransmitter for ChannelTransmitter {
    fn send_frame(&self, frame: &[u8], interface: &str) {
        // A gone receiver means the far side shut down; nothing to surface.
        let _ = self.sender.send((frame.to_vec(), interface.to_string()));
    }
}
