//! In-memory dashboard layout: the ordered widget list and the selection.
//!
//! Every mutation is synchronous and leaves the state valid. Persisting the
//! resulting snapshot is the caller's job (see the sync crate).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{self, WidgetConstraints, WidgetType};
use crate::error::CoreError;
use crate::placement::{self, GridSpec, Rect, MAX_ROW};
use crate::types::Props;

/// One widget placed on the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetPlacement {
    pub id: String,
    #[serde(rename = "type")]
    pub widget_type: WidgetType,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    #[serde(default)]
    pub props: Props,
}

impl WidgetPlacement {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }

    /// The realtime path this widget reads, if it has a non-empty one.
    pub fn firebase_path(&self) -> Option<&str> {
        self.props
            .get("firebasePath")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    pub fn title(&self) -> Option<&str> {
        self.props.get("title").and_then(|v| v.as_str())
    }
}

/// Partial update of a placement. Absent fields are left untouched.
///
/// Coordinates are signed so that out-of-range input from a client can be
/// clamped instead of rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WidgetPatch {
    pub x: Option<i64>,
    pub y: Option<i64>,
    pub w: Option<i64>,
    pub h: Option<i64>,
    /// Merged key by key into the existing props.
    pub props: Option<Props>,
}

fn new_widget_id(widget_type: WidgetType) -> String {
    format!("{widget_type}-{}", Uuid::now_v7())
}

#[derive(Debug, Clone, Default)]
pub struct LayoutState {
    widgets: Vec<WidgetPlacement>,
    selected: Option<String>,
    grid: GridSpec,
}

impl LayoutState {
    pub fn new(grid: GridSpec) -> Self {
        Self {
            widgets: Vec::new(),
            selected: None,
            grid,
        }
    }

    /// Start from a persisted widget list, normalizing every record.
    pub fn with_widgets(grid: GridSpec, widgets: Vec<WidgetPlacement>) -> Self {
        let mut state = Self::new(grid);
        state.set_widgets(widgets);
        state
    }

    pub fn widgets(&self) -> &[WidgetPlacement] {
        &self.widgets
    }

    pub fn grid(&self) -> GridSpec {
        self.grid
    }

    pub fn get(&self, id: &str) -> Option<&WidgetPlacement> {
        self.widgets.iter().find(|w| w.id == id)
    }

    fn index_of(&self, id: &str) -> Result<usize, CoreError> {
        self.widgets
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| CoreError::WidgetNotFound(id.to_string()))
    }

    fn rects(&self) -> Vec<Rect> {
        self.widgets.iter().map(WidgetPlacement::rect).collect()
    }

    /// Width clamped to the type's range and then to the grid.
    fn fit_width(&self, c: WidgetConstraints, w: i64) -> u32 {
        c.clamp_w(w).min(self.grid.cols)
    }

    /// Add a widget of `tag` at the first free position, sized to its
    /// minimum (narrowed to the grid when the grid is smaller). Caller props
    /// are laid over the catalog defaults.
    pub fn add_widget(&mut self, tag: &str, props: Option<Props>) -> Result<&WidgetPlacement, CoreError> {
        let widget_type = catalog::parse_widget_type(tag)?;
        let entry = catalog::entry(widget_type);
        let c = entry.constraints;
        let w = self.fit_width(c, i64::from(c.min_w));

        let mut merged = entry.default_props();
        if let Some(extra) = props {
            merged.extend(extra);
        }

        let (x, y) = placement::find_free_position(&self.rects(), w, c.min_h, self.grid);
        let idx = self.widgets.len();
        self.widgets.push(WidgetPlacement {
            id: new_widget_id(widget_type),
            widget_type,
            x,
            y,
            w,
            h: c.min_h,
            props: merged,
        });

        Ok(&self.widgets[idx])
    }

    /// Apply a partial update. Sizes are clamped to the type's constraints
    /// and the grid width, `x` to the grid and `y` to [`MAX_ROW`]. Overlap is
    /// not checked here; the grid client resolves collisions while dragging.
    pub fn update_widget(&mut self, id: &str, patch: WidgetPatch) -> Result<&WidgetPlacement, CoreError> {
        let idx = self.index_of(id)?;
        let cols = self.grid.cols;
        let c = catalog::constraints(self.widgets[idx].widget_type);
        let fitted_w = patch.w.map(|w| self.fit_width(c, w));
        let widget = &mut self.widgets[idx];

        if let Some(w) = fitted_w {
            widget.w = w;
        }
        if let Some(h) = patch.h {
            widget.h = c.clamp_h(h);
        }
        let max_x = i64::from(cols.saturating_sub(widget.w));
        let x = patch.x.unwrap_or(i64::from(widget.x));
        widget.x = x.clamp(0, max_x) as u32;
        if let Some(y) = patch.y {
            widget.y = y.clamp(0, i64::from(MAX_ROW)) as u32;
        }
        if let Some(props) = patch.props {
            widget.props.extend(props);
        }

        Ok(&self.widgets[idx])
    }

    /// Remove a widget; clears the selection when it pointed at it.
    pub fn delete_widget(&mut self, id: &str) -> Result<WidgetPlacement, CoreError> {
        let idx = self.index_of(id)?;
        let removed = self.widgets.remove(idx);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        Ok(removed)
    }

    /// Copy a widget one cell right and down. If that spot is taken the
    /// placement solver picks the position instead.
    pub fn duplicate_widget(&mut self, id: &str) -> Result<&WidgetPlacement, CoreError> {
        let source = self.widgets[self.index_of(id)?].clone();
        let cols = self.grid.cols;

        let x = source.x.saturating_add(1).min(cols.saturating_sub(source.w));
        let y = source.y.saturating_add(1).min(MAX_ROW);
        let rects = self.rects();
        let (x, y) = if placement::collides(&Rect::new(x, y, source.w, source.h), &rects) {
            placement::find_free_position(&rects, source.w, source.h, self.grid)
        } else {
            (x, y)
        };

        let idx = self.widgets.len();
        self.widgets.push(WidgetPlacement {
            id: new_widget_id(source.widget_type),
            x,
            y,
            ..source
        });

        Ok(&self.widgets[idx])
    }

    /// Replace the whole list, e.g. after a drag in the grid client.
    pub fn set_widgets(&mut self, widgets: Vec<WidgetPlacement>) {
        let cols = self.grid.cols;
        let normalized: Vec<WidgetPlacement> = widgets
            .into_iter()
            .map(|mut w| {
                let c = catalog::constraints(w.widget_type);
                w.w = self.fit_width(c, i64::from(w.w));
                w.h = c.clamp_h(i64::from(w.h));
                w.x = w.x.min(cols.saturating_sub(w.w));
                w.y = w.y.min(MAX_ROW);
                w
            })
            .collect();
        self.widgets = normalized;

        if let Some(sel) = &self.selected {
            if !self.widgets.iter().any(|w| &w.id == sel) {
                self.selected = None;
            }
        }
    }

    pub fn clear_all(&mut self) {
        self.widgets.clear();
        self.selected = None;
    }

    /// Select a widget, or clear the selection with `None`.
    pub fn select(&mut self, id: Option<&str>) -> Result<(), CoreError> {
        match id {
            Some(id) => {
                self.index_of(id)?;
                self.selected = Some(id.to_string());
            }
            None => self.selected = None,
        }
        Ok(())
    }

    pub fn selected(&self) -> Option<&WidgetPlacement> {
        self.selected.as_deref().and_then(|id| self.get(id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
