//! Plain-text rendering of overlay frames and notifications.

use leader_protocol::{MsgToUI, Overlay, ipc::UiRx};

/// Placeholder shown when no group has been entered.
const IDLE_GLYPH: &str = "\u{25cf}";

/// Print every UI message until the engine drops its sender.
pub async fn run(mut rx: UiRx) {
    while let Some(msg) = rx.recv().await {
        println!("{}", render(&msg));
    }
}

/// Render one message as text.
pub fn render(msg: &MsgToUI) -> String {
    match msg {
        MsgToUI::Show(o) | MsgToUI::Update(o) => overlay(o),
        MsgToUI::Hide => "[hidden]".to_string(),
        MsgToUI::Miss => "[no match]".to_string(),
        MsgToUI::Reloaded { ok: true } => "[config reloaded]".to_string(),
        MsgToUI::Reloaded { ok: false } => "[config reload failed]".to_string(),
        MsgToUI::Notify { kind, title, text } => format!("[{kind:?}] {title}: {text}"),
    }
}

/// Render an overlay frame: the display label, then entries when disclosed.
fn overlay(o: &Overlay) -> String {
    let mut out = String::new();
    out.push_str(o.display.as_deref().unwrap_or(IDLE_GLYPH));
    if let Some(title) = &o.title {
        out.push_str(&format!("  {title}"));
    }
    if o.options_visible || o.cheatsheet_visible {
        for e in &o.entries {
            let marker = if e.is_group { "/" } else { "" };
            out.push_str(&format!("\n  {}  {}{}", e.key, e.label, marker));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use leader_protocol::OverlayEntry;

    use super::*;

    #[test]
    fn renders_entries_only_when_disclosed() {
        let mut o = Overlay {
            display: Some("o".into()),
            title: Some("Operating System".into()),
            entries: vec![
                OverlayEntry {
                    key: "s".into(),
                    label: "Settings".into(),
                    is_group: false,
                },
                OverlayEntry {
                    key: "d".into(),
                    label: "Dev".into(),
                    is_group: true,
                },
            ],
            ..Overlay::default()
        };
        assert_eq!(render(&MsgToUI::Update(o.clone())), "o  Operating System");
        o.options_visible = true;
        assert_eq!(
            render(&MsgToUI::Update(o)),
            "o  Operating System\n  s  Settings\n  d  Dev/"
        );
    }

    #[test]
    fn idle_frame_and_markers() {
        assert_eq!(render(&MsgToUI::Show(Overlay::default())), IDLE_GLYPH);
        assert_eq!(render(&MsgToUI::Hide), "[hidden]");
        assert_eq!(
            render(&MsgToUI::Reloaded { ok: false }),
            "[config reload failed]"
        );
    }
}
