use crate::prelude::*;

#[derive(Debug, Clone)]
pub struct Channels {
    pub from_coordinator: broadcast::Sender<coordinator::ChannelData>,
    pub shutdown: broadcast::Sender<()>,
}

impl Default for Channels {
    fn default() -> Self {
        Self::new()
    }
}

impl Channels {
    pub fn new() -> Self {
        Self {
            from_coordinator: Self::channel(),
            shutdown: Self::channel(),
        }
    }

    fn channel<T: Clone>() -> broadcast::Sender<T> {
        broadcast::channel(2048).0
    }
}
