//! `Transport` over a livelink connection

use livelink::{ConnectionManager, WsMessage};
use tracing::warn;

use crate::application::traits::{DeliveryTicket, Transport};
use crate::domain::OutboundFrame;

impl Transport for ConnectionManager {
    fn is_connected(&self) -> bool {
        ConnectionManager::is_connected(self)
    }

    fn transmit(&self, frame: &OutboundFrame) -> Option<DeliveryTicket> {
        let payload = match frame.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("[Link] Could not encode outbound frame: {}", e);
                return None;
            }
        };
        self.send(WsMessage::Text(payload))
            .map(|ticket| DeliveryTicket(ticket.id()))
    }
}
