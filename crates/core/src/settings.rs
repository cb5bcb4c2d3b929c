//! Per-widget settings schemas and validation.
//!
//! A schema lists the editable fields of one widget type. The settings
//! dialog renders it, and the server validates submitted values against it
//! before they are merged into the widget's props.
//!
//! Field keys may be written with a `props.` prefix; every key resolves
//! inside the widget's props bag, so `props.unit` and `unit` are the same
//! field.

use serde::Serialize;
use serde_json::{json, Value};

use crate::catalog::WidgetType;
use crate::error::CoreError;
use crate::types::Props;

// ---------------------------------------------------------------------------
// Schema types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// Input kind and its kind-specific limits.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FieldKind {
    Text {
        #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    Textarea {
        #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    Number {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    Select {
        options: Vec<SelectOption>,
    },
    MultiSelect {
        options: Vec<SelectOption>,
    },
    Boolean,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub required: bool,
    #[serde(rename = "defaultValue", skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl FieldSpec {
    fn new(key: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            label,
            required: false,
            default: None,
            kind,
        }
    }

    fn text(key: &'static str, label: &'static str, max_length: Option<usize>) -> Self {
        Self::new(key, label, FieldKind::Text { max_length })
    }

    fn number(key: &'static str, label: &'static str, min: f64, max: f64) -> Self {
        Self::new(
            key,
            label,
            FieldKind::Number {
                min: Some(min),
                max: Some(max),
            },
        )
    }

    fn select(key: &'static str, label: &'static str, options: &[(&'static str, &'static str)]) -> Self {
        Self::new(key, label, FieldKind::Select { options: to_options(options) })
    }

    fn boolean(key: &'static str, label: &'static str) -> Self {
        Self::new(key, label, FieldKind::Boolean)
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Key inside the props bag.
    pub fn prop_key(&self) -> &'static str {
        self.key.strip_prefix("props.").unwrap_or(self.key)
    }
}

fn to_options(options: &[(&'static str, &'static str)]) -> Vec<SelectOption> {
    options
        .iter()
        .map(|&(value, label)| SelectOption { value, label })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct SettingsSchema {
    #[serde(rename = "type")]
    pub widget_type: WidgetType,
    pub fields: Vec<FieldSpec>,
}

// ---------------------------------------------------------------------------
// Per-type schemas
// ---------------------------------------------------------------------------

fn title_field(default: &'static str) -> FieldSpec {
    FieldSpec::text("title", "Widget Title", Some(50)).default_value(json!(default))
}

fn path_field(default: &'static str) -> FieldSpec {
    FieldSpec::text("firebasePath", "Firebase Path", None)
        .required()
        .default_value(json!(default))
}

fn precision_field() -> FieldSpec {
    FieldSpec::number("props.precision", "Decimal Precision", 0.0, 3.0).default_value(json!(1))
}

const TEMPERATURE_UNITS: &[(&str, &str)] = &[
    ("celsius", "Celsius (°C)"),
    ("fahrenheit", "Fahrenheit (°F)"),
];

const HUMIDITY_UNITS: &[(&str, &str)] = &[
    ("percentage", "Percentage (%)"),
    ("decimal", "Decimal (0-1)"),
];

const DATA_TYPES: &[(&str, &str)] = &[
    ("boolean", "Boolean (true/false)"),
    ("number", "Number"),
    ("string", "String"),
    ("object", "Object"),
];

fn chart_fields(title: &'static str, path: &'static str, units: &[(&'static str, &'static str)], unit: &'static str) -> Vec<FieldSpec> {
    vec![
        title_field(title),
        path_field(path),
        FieldSpec::new(
            "props.selectedSensors",
            "Sensors to Display",
            FieldKind::MultiSelect {
                options: to_options(&[
                    ("sensor1", "Sensor 1"),
                    ("sensor2", "Sensor 2"),
                    ("sensor3", "Sensor 3"),
                ]),
            },
        )
        .default_value(json!(["sensor1", "sensor2", "sensor3"])),
        FieldSpec::select("props.unit", "Unit", units).default_value(json!(unit)),
        precision_field(),
        FieldSpec::number("props.chartHeight", "Chart Height", 100.0, 400.0).default_value(json!(200)),
        FieldSpec::number("props.maxDataPoints", "Max Data Points", 5.0, 100.0).default_value(json!(11)),
        FieldSpec::boolean("props.showDots", "Show Data Points").default_value(json!(true)),
        FieldSpec::boolean("props.showLegend", "Show Legend").default_value(json!(true)),
    ]
}

/// The settings schema of a widget type.
pub fn schema_for(widget_type: WidgetType) -> SettingsSchema {
    let fields = match widget_type {
        WidgetType::Temperature => vec![
            title_field("Temperature"),
            path_field("/sensors/temperature"),
            FieldSpec::select("props.unit", "Temperature Unit", TEMPERATURE_UNITS)
                .default_value(json!("celsius")),
            precision_field(),
        ],
        WidgetType::Humidity => vec![
            title_field("Humidity"),
            path_field("/sensors/humidity"),
            FieldSpec::select("props.unit", "Humidity Unit", HUMIDITY_UNITS)
                .default_value(json!("percentage")),
            precision_field(),
        ],
        WidgetType::TemperatureChart => chart_fields(
            "Temperature Chart",
            "/sensors/temperature",
            TEMPERATURE_UNITS,
            "celsius",
        ),
        WidgetType::HumidityChart => {
            chart_fields("Humidity Chart", "/sensors/humidity", HUMIDITY_UNITS, "percentage")
        }
        WidgetType::Clock => vec![
            title_field("Clock"),
            FieldSpec::select(
                "props.format",
                "Clock Format",
                &[("24-hour", "24-hour (e.g., 15:30)"), ("12-hour", "12-hour (e.g., 3:30 PM)")],
            )
            .default_value(json!("24-hour")),
        ],
        WidgetType::Switch => vec![
            FieldSpec::text("title", "Switch Title", Some(50))
                .required()
                .default_value(json!("Switch")),
            FieldSpec::select(
                "variant",
                "Visual Style",
                &[
                    ("default", "Default"),
                    ("outline", "Outline"),
                    ("secondary", "Secondary"),
                    ("destructive", "Destructive"),
                ],
            )
            .default_value(json!("default")),
            FieldSpec::text("firebasePath", "Variable Path", None)
                .required()
                .default_value(json!("/controls/switch")),
            FieldSpec::select("dataType", "Data Type", DATA_TYPES).default_value(json!("boolean")),
            FieldSpec::number("updateInterval", "Update Interval (ms)", 100.0, 60000.0)
                .default_value(json!(1000)),
        ],
        WidgetType::Button => vec![
            FieldSpec::text("title", "Button Text", Some(30))
                .required()
                .default_value(json!("Button")),
            path_field("/controls/button"),
            FieldSpec::select("dataType", "Data Type", DATA_TYPES).default_value(json!("boolean")),
            FieldSpec::boolean("props.momentary", "Momentary").default_value(json!(true)),
        ],
        WidgetType::Label => vec![
            title_field("Label"),
            path_field("/sensors/label"),
            FieldSpec::text("props.unit", "Unit", Some(10)).default_value(json!("")),
            FieldSpec::new(
                "props.description",
                "Description",
                FieldKind::Textarea { max_length: Some(200) },
            ),
        ],
        WidgetType::Gauge => vec![
            title_field("Gauge"),
            path_field("/sensors/gauge"),
            FieldSpec::number("props.min", "Minimum", -1_000_000.0, 1_000_000.0).default_value(json!(0)),
            FieldSpec::number("props.max", "Maximum", -1_000_000.0, 1_000_000.0).default_value(json!(100)),
            FieldSpec::text("props.unit", "Unit", Some(10)).default_value(json!("%")),
            precision_field(),
        ],
        WidgetType::Slider => vec![
            title_field("Slider"),
            path_field("/controls/slider"),
            FieldSpec::number("props.min", "Minimum", -1_000_000.0, 1_000_000.0).default_value(json!(0)),
            FieldSpec::number("props.max", "Maximum", -1_000_000.0, 1_000_000.0).default_value(json!(100)),
            FieldSpec::number("props.step", "Step", 0.001, 1000.0).default_value(json!(1)),
        ],
        WidgetType::DeviceTable => vec![
            title_field("Devices"),
            path_field("/devices"),
            FieldSpec::number("props.pageSize", "Rows per Page", 5.0, 50.0).default_value(json!(10)),
            FieldSpec::boolean("props.showOffline", "Show Offline Devices").default_value(json!(true)),
        ],
    };

    SettingsSchema {
        widget_type,
        fields,
    }
}

// ---------------------------------------------------------------------------
// Defaults and validation
// ---------------------------------------------------------------------------

/// Collect every declared default into a props bag.
pub fn default_values(schema: &SettingsSchema) -> Props {
    schema
        .fields
        .iter()
        .filter_map(|f| f.default.clone().map(|v| (f.prop_key().to_string(), v)))
        .collect()
}

/// Validate a props bag against the widget type's schema.
///
/// All violations are collected; the error carries one message per problem.
pub fn validate_settings(widget_type: WidgetType, values: &Props) -> Result<(), CoreError> {
    let schema = schema_for(widget_type);
    let mut errors = Vec::new();

    for field in &schema.fields {
        let value = values.get(field.prop_key());

        if is_blank(value) {
            if field.required {
                errors.push(format!("{} is required", field.label));
            }
            continue;
        }
        let Some(value) = value else { continue };

        if let Some(message) = check_field(field, value) {
            errors.push(message);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(CoreError::ValidationFailed(errors))
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn check_field(field: &FieldSpec, value: &Value) -> Option<String> {
    let label = field.label;
    match &field.kind {
        FieldKind::Text { max_length } | FieldKind::Textarea { max_length } => {
            let Value::String(s) = value else {
                return Some(format!("{label} must be text"));
            };
            match max_length {
                Some(max) if s.chars().count() > *max => {
                    Some(format!("{label} must be at most {max} characters"))
                }
                _ => None,
            }
        }
        FieldKind::Number { min, max } => {
            let Some(n) = as_number(value) else {
                return Some(format!("{label} must be a valid number"));
            };
            if let Some(min) = min.filter(|m| n < *m) {
                return Some(format!("{label} must be at least {}", fmt_num(min)));
            }
            if let Some(max) = max.filter(|m| n > *m) {
                return Some(format!("{label} must be at most {}", fmt_num(max)));
            }
            None
        }
        FieldKind::Select { options } => {
            let ok = value
                .as_str()
                .is_some_and(|v| options.iter().any(|o| o.value == v));
            (!ok).then(|| one_of(label, options))
        }
        FieldKind::MultiSelect { options } => {
            let ok = value.as_array().is_some_and(|items| {
                items
                    .iter()
                    .all(|i| i.as_str().is_some_and(|v| options.iter().any(|o| o.value == v)))
            });
            (!ok).then(|| one_of(label, options))
        }
        FieldKind::Boolean => (!value.is_boolean()).then(|| format!("{label} must be true or false")),
    }
}

fn one_of(label: &str, options: &[SelectOption]) -> String {
    let allowed: Vec<&str> = options.iter().map(|o| o.value).collect();
    format!("{label} must be one of: {}", allowed.join(", "))
}

/// Numbers and numeric strings both count as numbers.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn fmt_num(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
