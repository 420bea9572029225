use leader_protocol::{MsgToUI, NotifyKind, Overlay, ipc::UiTx};
use tracing::info;

use crate::{Error, Result};

/// Sends overlay updates and notifications to the UI layer.
#[derive(Clone)]
pub struct NotificationDispatcher {
    /// Channel to the UI.
    tx: UiTx,
}

impl NotificationDispatcher {
    /// Create a new dispatcher from a UI message channel.
    pub fn new(tx: UiTx) -> Self {
        Self { tx }
    }

    /// Send a raw UI message.
    pub fn send(&self, msg: MsgToUI) -> Result<()> {
        self.tx.send(msg).map_err(|_| Error::ChannelClosed)
    }

    /// Send the overlay's opening frame.
    pub fn send_show(&self, overlay: Overlay) -> Result<()> {
        self.send(MsgToUI::Show(overlay))
    }

    /// Send an updated frame.
    pub fn send_update(&self, overlay: Overlay) -> Result<()> {
        self.send(MsgToUI::Update(overlay))
    }

    /// Send a notification with the given kind, title, and text.
    pub fn send_notification(&self, kind: NotifyKind, title: String, text: String) -> Result<()> {
        // Always log notification displays at info level, regardless of urgency.
        info!(kind = ?kind, title = %title, text = %text, "notification_display");
        self.send(MsgToUI::Notify { kind, title, text })
    }

    /// Convenience helper to send an error notification.
    pub fn send_error(&self, title: &str, text: String) -> Result<()> {
        self.send_notification(NotifyKind::Error, title.to_string(), text)
    }
}
