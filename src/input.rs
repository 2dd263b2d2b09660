//! Pointer routing: hit tests presses against the button row and the
//! scroll buttons, and turns wheel motion over the details panel into
//! scroll steps.

use crate::content::ContentModel;
use crate::host::PointerEvent;

/// Outcome of routing one pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    None,
    /// The button at this list index was pressed.
    Activate(usize),
    /// The details offset moved; the frame must be redrawn.
    Scrolled,
}

/// Tracks the pointer and hit-tests presses against the last layout pass.
#[derive(Debug, Default)]
pub struct InputRouter {
    pointer: Option<(i32, i32)>,
}

impl InputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pointer(&self) -> Option<(i32, i32)> {
        self.pointer
    }

    pub fn handle(&mut self, event: &PointerEvent, content: &mut ContentModel) -> InputAction {
        match *event {
            PointerEvent::Enter { x, y } | PointerEvent::Motion { x, y } => {
                self.pointer = Some((x.floor() as i32, y.floor() as i32));
                InputAction::None
            }
            PointerEvent::Leave => {
                self.pointer = None;
                InputAction::None
            }
            PointerEvent::Button { pressed: false, .. } => InputAction::None,
            PointerEvent::Button { pressed: true, .. } => self.press(content),
            PointerEvent::Axis { delta } => self.axis(delta, content),
        }
    }

    fn press(&self, content: &mut ContentModel) -> InputAction {
        let Some((x, y)) = self.pointer else {
            return InputAction::None;
        };
        if let Some(index) = content
            .buttons
            .iter()
            .position(|button| button.bounds.contains(x, y))
        {
            return InputAction::Activate(index);
        }

        let Some(panel) = content.details.as_mut().filter(|panel| panel.is_overflowing()) else {
            return InputAction::None;
        };
        if panel.scroll_up.bounds.contains(x, y) && panel.scroll_by(-1) {
            return InputAction::Scrolled;
        }
        if panel.scroll_down.bounds.contains(x, y) && panel.scroll_by(1) {
            return InputAction::Scrolled;
        }
        InputAction::None
    }

    fn axis(&self, delta: f64, content: &mut ContentModel) -> InputAction {
        let Some((x, y)) = self.pointer else {
            return InputAction::None;
        };
        let Some(panel) = content.details.as_mut() else {
            return InputAction::None;
        };
        if !panel.is_overflowing() || !panel.bounds.contains(x, y) {
            return InputAction::None;
        }
        let direction = if delta < 0.0 {
            -1
        } else if delta > 0.0 {
            1
        } else {
            0
        };
        if panel.scroll_by(direction) {
            InputAction::Scrolled
        } else {
            InputAction::None
        }
    }
}
