//! Widget catalog: the single source of truth for widget types.
//!
//! Every widget type registers one [`CatalogEntry`] holding its size
//! constraints, its realtime binding kind, and its display metadata. The
//! placement solver, the layout state, and the settings validator all look
//! constraints up here instead of comparing type strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::live::ValueKind;
use crate::settings;
use crate::types::Props;

// ---------------------------------------------------------------------------
// WidgetType
// ---------------------------------------------------------------------------

/// Tag identifying which catalog entry (and client renderer) a widget uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", try_from = "String")]
pub enum WidgetType {
    Temperature,
    Humidity,
    TemperatureChart,
    HumidityChart,
    Clock,
    Switch,
    Button,
    Label,
    Gauge,
    Slider,
    DeviceTable,
}

impl WidgetType {
    /// Every registered type, in catalog order.
    pub const ALL: [WidgetType; 11] = [
        WidgetType::Temperature,
        WidgetType::Humidity,
        WidgetType::TemperatureChart,
        WidgetType::HumidityChart,
        WidgetType::Clock,
        WidgetType::Switch,
        WidgetType::Button,
        WidgetType::Label,
        WidgetType::Gauge,
        WidgetType::Slider,
        WidgetType::DeviceTable,
    ];

    /// The wire tag, e.g. `"temperature-chart"`.
    pub fn as_str(self) -> &'static str {
        match self {
            WidgetType::Temperature => "temperature",
            WidgetType::Humidity => "humidity",
            WidgetType::TemperatureChart => "temperature-chart",
            WidgetType::HumidityChart => "humidity-chart",
            WidgetType::Clock => "clock",
            WidgetType::Switch => "switch",
            WidgetType::Button => "button",
            WidgetType::Label => "label",
            WidgetType::Gauge => "gauge",
            WidgetType::Slider => "slider",
            WidgetType::DeviceTable => "device-table",
        }
    }
}

impl fmt::Display for WidgetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WidgetType {
    type Err = CoreError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        WidgetType::ALL
            .into_iter()
            .find(|t| t.as_str() == tag)
            .ok_or_else(|| CoreError::UnknownWidgetType(tag.to_string()))
    }
}

impl TryFrom<String> for WidgetType {
    type Error = CoreError;

    fn try_from(tag: String) -> Result<Self, Self::Error> {
        tag.parse()
    }
}

// ---------------------------------------------------------------------------
// Constraints
// ---------------------------------------------------------------------------

/// Size limits of one widget type, in grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WidgetConstraints {
    pub min_w: u32,
    pub max_w: u32,
    pub min_h: u32,
    pub max_h: u32,
}

impl WidgetConstraints {
    const fn new(min_w: u32, max_w: u32, min_h: u32, max_h: u32) -> Self {
        Self {
            min_w,
            max_w,
            min_h,
            max_h,
        }
    }

    /// Clamp a requested width (any integer, negative included) into range.
    pub fn clamp_w(&self, w: i64) -> u32 {
        w.clamp(i64::from(self.min_w), i64::from(self.max_w)) as u32
    }

    /// Clamp a requested height (any integer, negative included) into range.
    pub fn clamp_h(&self, h: i64) -> u32 {
        h.clamp(i64::from(self.min_h), i64::from(self.max_h)) as u32
    }
}

// ---------------------------------------------------------------------------
// Catalog entries
// ---------------------------------------------------------------------------

/// Grouping shown by the add-widget picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetCategory {
    Display,
    Control,
    Input,
    Visualization,
}

/// Static registration of one widget type.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub widget_type: WidgetType,
    pub name: &'static str,
    pub description: &'static str,
    pub category: WidgetCategory,
    pub constraints: WidgetConstraints,
    /// Value kind expected at the widget's realtime path, if it binds one.
    pub binding: Option<ValueKind>,
}

impl CatalogEntry {
    /// Default props for a freshly added widget, taken from its settings schema.
    pub fn default_props(&self) -> Props {
        settings::default_values(&settings::schema_for(self.widget_type))
    }
}

const CATALOG: [CatalogEntry; 11] = [
    CatalogEntry {
        widget_type: WidgetType::Temperature,
        name: "Temperature",
        description: "Live temperature readout with unit conversion and color ranges",
        category: WidgetCategory::Display,
        constraints: WidgetConstraints::new(3, 6, 2, 4),
        binding: Some(ValueKind::Number),
    },
    CatalogEntry {
        widget_type: WidgetType::Humidity,
        name: "Humidity",
        description: "Live relative humidity readout",
        category: WidgetCategory::Display,
        constraints: WidgetConstraints::new(3, 6, 2, 4),
        binding: Some(ValueKind::Number),
    },
    CatalogEntry {
        widget_type: WidgetType::TemperatureChart,
        name: "Temperature Chart",
        description: "Rolling chart of temperature readings",
        category: WidgetCategory::Visualization,
        constraints: WidgetConstraints::new(4, 12, 3, 6),
        binding: Some(ValueKind::Number),
    },
    CatalogEntry {
        widget_type: WidgetType::HumidityChart,
        name: "Humidity Chart",
        description: "Rolling chart of humidity readings",
        category: WidgetCategory::Visualization,
        constraints: WidgetConstraints::new(4, 12, 3, 6),
        binding: Some(ValueKind::Number),
    },
    CatalogEntry {
        widget_type: WidgetType::Clock,
        name: "Clock",
        description: "Local wall clock",
        category: WidgetCategory::Display,
        constraints: WidgetConstraints::new(2, 4, 2, 3),
        binding: None,
    },
    CatalogEntry {
        widget_type: WidgetType::Switch,
        name: "Switch",
        description: "Toggle switch for controlling boolean values",
        category: WidgetCategory::Control,
        constraints: WidgetConstraints::new(2, 3, 2, 3),
        binding: Some(ValueKind::Boolean),
    },
    CatalogEntry {
        widget_type: WidgetType::Button,
        name: "Button",
        description: "Momentary button that writes a value when pressed",
        category: WidgetCategory::Input,
        constraints: WidgetConstraints::new(2, 4, 1, 2),
        binding: Some(ValueKind::Boolean),
    },
    CatalogEntry {
        widget_type: WidgetType::Label,
        name: "Label",
        description: "Title, value, and unit text display",
        category: WidgetCategory::Display,
        constraints: WidgetConstraints::new(2, 4, 2, 3),
        binding: Some(ValueKind::String),
    },
    CatalogEntry {
        widget_type: WidgetType::Gauge,
        name: "Gauge",
        description: "Circular gauge for numeric values with ranges",
        category: WidgetCategory::Display,
        constraints: WidgetConstraints::new(2, 4, 2, 4),
        binding: Some(ValueKind::Number),
    },
    CatalogEntry {
        widget_type: WidgetType::Slider,
        name: "Slider",
        description: "Slider input for selecting numeric values in a range",
        category: WidgetCategory::Input,
        constraints: WidgetConstraints::new(2, 6, 1, 3),
        binding: Some(ValueKind::Number),
    },
    CatalogEntry {
        widget_type: WidgetType::DeviceTable,
        name: "Device Table",
        description: "Paginated table of devices and their last readings",
        category: WidgetCategory::Display,
        constraints: WidgetConstraints::new(4, 8, 4, 8),
        binding: Some(ValueKind::Object),
    },
];

/// Look up the catalog entry for a widget type.
pub fn entry(widget_type: WidgetType) -> &'static CatalogEntry {
    // CATALOG is laid out in variant order.
    &CATALOG[widget_type as usize]
}

/// Size constraints for a widget type.
pub fn constraints(widget_type: WidgetType) -> WidgetConstraints {
    entry(widget_type).constraints
}

/// All catalog entries in registration order.
pub fn all_entries() -> &'static [CatalogEntry] {
    &CATALOG
}

/// Entries belonging to one picker category.
pub fn entries_by_category(category: WidgetCategory) -> Vec<&'static CatalogEntry> {
    CATALOG.iter().filter(|e| e.category == category).collect()
}

/// Parse a wire tag, failing with [`CoreError::UnknownWidgetType`].
pub fn parse_widget_type(tag: &str) -> Result<WidgetType, CoreError> {
    tag.parse()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
