use tracing::debug;

use crate::store::preferences::{
    PreferenceStore, Preferences, PreferencesPatch, TYPING_AREA_BOTTOM_RANGE,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging { start_y: i32, pre_drag_offset: i32 },
}

/// Repositions the floating typing panel. Intermediate positions stay local;
/// only the position at pointer-up is written to the preference store.
pub struct DragController {
    state: DragState,
    transient_offset: Option<i32>,
}

impl Default for DragController {
    fn default() -> Self {
        Self::new()
    }
}

impl DragController {
    pub fn new() -> Self {
        Self {
            state: DragState::Idle,
            transient_offset: None,
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Begin a drag. Ignored unless the host is in layout edit mode.
    pub fn pointer_down(&mut self, edit_mode: bool, pointer_y: i32, prefs: &PreferenceStore) -> bool {
        if !edit_mode || self.is_dragging() {
            return false;
        }
        let pre_drag_offset = prefs.get().typing_area_bottom;
        self.state = DragState::Dragging {
            start_y: pointer_y,
            pre_drag_offset,
        };
        self.transient_offset = Some(pre_drag_offset);
        debug!(pointer_y, pre_drag_offset, "layout drag started");
        true
    }

    /// Track the pointer. Screen y grows downward, so moving up raises the
    /// panel's distance from the bottom edge.
    pub fn pointer_move(&mut self, pointer_y: i32) -> Option<i32> {
        let DragState::Dragging {
            start_y,
            pre_drag_offset,
        } = self.state
        else {
            return None;
        };
        let candidate = (pre_drag_offset + (start_y - pointer_y))
            .clamp(TYPING_AREA_BOTTOM_RANGE.0, TYPING_AREA_BOTTOM_RANGE.1);
        self.transient_offset = Some(candidate);
        Some(candidate)
    }

    /// Finish the drag and commit the final position with one update.
    pub fn pointer_up(&mut self, prefs: &PreferenceStore) -> Option<Preferences> {
        if !self.is_dragging() {
            return None;
        }
        self.state = DragState::Idle;
        let offset = self.transient_offset.take()?;
        debug!(offset, "layout drag committed");
        Some(prefs.update(&PreferencesPatch {
            typing_area_bottom: Some(offset),
            ..Default::default()
        }))
    }

    /// Abandon a drag without persisting anything.
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
        self.transient_offset = None;
    }

    /// Offset to render with: the live drag position if dragging, otherwise
    /// the stored preference.
    pub fn offset(&self, prefs: &PreferenceStore) -> i32 {
        self.transient_offset
            .unwrap_or_else(|| prefs.get().typing_area_bottom)
    }
}
