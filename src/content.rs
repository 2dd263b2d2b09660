//! What the bar shows: message, buttons and the optional details panel.

use crate::geometry::Rect;

pub const DEFAULT_DISMISS_LABEL: &str = "X";
pub const DEFAULT_DETAILS_LABEL: &str = "Toggle details";
pub const SCROLL_UP_LABEL: &str = "\u{25B2}";
pub const SCROLL_DOWN_LABEL: &str = "\u{25BC}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Dismiss,
    ToggleDetails,
    RunCommand,
    ScrollUp,
    ScrollDown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub label: String,
    pub kind: ActionKind,
    pub command: Option<String>,
    pub run_in_terminal: bool,
    pub dismiss_on_activate: bool,
    /// Fill box from the latest layout pass; empty when the pass did not
    /// position the button.
    pub bounds: Rect,
}

impl Button {
    fn with_kind(label: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            label: label.into(),
            kind,
            command: None,
            run_in_terminal: false,
            dismiss_on_activate: false,
            bounds: Rect::default(),
        }
    }

    pub fn dismiss(label: impl Into<String>) -> Self {
        Self::with_kind(label, ActionKind::Dismiss)
    }

    pub fn toggle_details(label: impl Into<String>) -> Self {
        Self::with_kind(label, ActionKind::ToggleDetails)
    }

    pub fn command(
        label: impl Into<String>,
        command: impl Into<String>,
        run_in_terminal: bool,
        dismiss_on_activate: bool,
    ) -> Self {
        Self {
            command: Some(command.into()),
            run_in_terminal,
            dismiss_on_activate,
            ..Self::with_kind(label, ActionKind::RunCommand)
        }
    }

    pub(crate) fn scroll(kind: ActionKind, label: &str) -> Self {
        Self::with_kind(label, kind)
    }
}

/// Expandable block of plain text under the message row.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailsPanel {
    pub visible: bool,
    pub text: String,
    /// First visible wrapped line.
    pub offset: usize,
    pub visible_lines: usize,
    pub total_lines: usize,
    pub bounds: Rect,
    /// Whether the last pass reserved the scroll column.
    pub scrollable: bool,
    pub scroll_up: Button,
    pub scroll_down: Button,
}

impl DetailsPanel {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            visible: false,
            text: text.into(),
            offset: 0,
            visible_lines: 0,
            total_lines: 0,
            bounds: Rect::default(),
            scrollable: false,
            scroll_up: Button::scroll(ActionKind::ScrollUp, SCROLL_UP_LABEL),
            scroll_down: Button::scroll(ActionKind::ScrollDown, SCROLL_DOWN_LABEL),
        }
    }

    /// Largest offset that still fills the viewport.
    pub fn max_offset(&self) -> usize {
        self.total_lines.saturating_sub(self.visible_lines)
    }

    pub fn is_overflowing(&self) -> bool {
        self.visible && self.total_lines > self.visible_lines
    }

    pub fn can_scroll_up(&self) -> bool {
        self.offset > 0
    }

    pub fn can_scroll_down(&self) -> bool {
        self.offset < self.max_offset()
    }

    /// Moves the offset by one line. Returns `false` when already at the
    /// corresponding end.
    pub fn scroll_by(&mut self, delta: i32) -> bool {
        match delta.signum() {
            -1 if self.can_scroll_up() => self.offset -= 1,
            1 if self.can_scroll_down() => self.offset += 1,
            _ => return false,
        }
        true
    }

    pub fn clamp_offset(&mut self) -> bool {
        let max = self.max_offset();
        if self.offset > max {
            self.offset = max;
            return true;
        }
        false
    }
}

/// Ordered buttons (dismiss first, details toggle last when present), the
/// message and the details panel.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentModel {
    pub message: String,
    pub buttons: Vec<Button>,
    pub details: Option<DetailsPanel>,
}

impl ContentModel {
    /// Builds the list in display order. `extra` keeps its relative order.
    pub fn new(
        message: impl Into<String>,
        dismiss_label: impl Into<String>,
        extra: Vec<Button>,
        details: Option<(String, String)>,
    ) -> Self {
        let mut buttons = Vec::with_capacity(extra.len() + 2);
        buttons.push(Button::dismiss(dismiss_label));
        buttons.extend(extra);
        let details = details.map(|(label, text)| {
            buttons.push(Button::toggle_details(label));
            DetailsPanel::new(text)
        });
        Self {
            message: message.into(),
            buttons,
            details,
        }
    }

    pub fn details_visible(&self) -> bool {
        self.details.as_ref().is_some_and(|panel| panel.visible)
    }

    pub fn toggle_details(&mut self) {
        if let Some(panel) = self.details.as_mut() {
            panel.visible = !panel.visible;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dismiss_first_and_details_toggle_last() {
        let model = ContentModel::new(
            "msg",
            DEFAULT_DISMISS_LABEL,
            vec![
                Button::command("a", "true", true, false),
                Button::command("b", "false", false, true),
            ],
            Some((DEFAULT_DETAILS_LABEL.into(), "details".into())),
        );
        let kinds: Vec<_> = model.buttons.iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ActionKind::Dismiss,
                ActionKind::RunCommand,
                ActionKind::RunCommand,
                ActionKind::ToggleDetails
            ]
        );
        assert_eq!(model.buttons[1].label, "a");
        assert!(model.buttons[2].dismiss_on_activate);
    }

    #[test]
    fn scrolling_stays_in_range() {
        let mut panel = DetailsPanel::new("x");
        panel.visible = true;
        panel.total_lines = 12;
        panel.visible_lines = 10;
        assert!(!panel.scroll_by(-1));
        assert!(panel.scroll_by(1));
        assert!(panel.scroll_by(1));
        assert!(!panel.scroll_by(1));
        assert_eq!(panel.offset, 2);

        panel.total_lines = 11;
        assert!(panel.clamp_offset());
        assert_eq!(panel.offset, 1);
    }
}
