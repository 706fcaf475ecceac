use tokio::sync::broadcast;

use crate::dto::sse::ServerEvent;

/// Fan-out of game events to every connected SSE client.
pub struct EventHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl EventHub {
    /// `capacity` bounds how far a slow subscriber may fall behind before it
    /// starts skipping events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// New receiver that sees every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Publish `event`, returning how many subscribers will see it. Having no
    /// subscriber is not an error.
    pub fn publish(&self, event: ServerEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_without_subscribers_is_dropped() {
        let hub = EventHub::new(4);
        assert_eq!(hub.publish(ServerEvent::new(None, "lost".into())), 0);

        let mut receiver = hub.subscribe();
        assert_eq!(
            hub.publish(ServerEvent::new(Some("game.reset".into()), "{}".into())),
            1
        );
        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some("game.reset"));
    }
}
