//! Stratum Catalog - Property Type Registry
//!
//! Static registry mapping a property type key (ACCELEROMETER,
//! THREE_DIMENSIONS, TEXT, ...) to a canonical name, description, and an
//! ordered list of named dimensions. Used to auto-populate a property's
//! shape when only a type is given; the lookup happens exactly once, at
//! property construction, never during ingestion.
//!
//! Unknown type names are valid (custom/untyped properties) and yield no
//! enrichment. Lookups return owned deep copies so callers can never mutate
//! the canonical dimension lists.
//!
//! @version 0.1.0
//! @author Stratum Development Team

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use stratum_common::{Dimension, Property};

// =============================================================================
// Property Type
// =============================================================================

/// Canonical description of a known property type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyType {
    pub key: String,
    pub name: String,
    pub description: String,
    pub dimensions: Vec<Dimension>,
}

// =============================================================================
// Lookup
// =============================================================================

/// Resolve a type key to its canonical description. Returns an owned copy;
/// absent for unknown/custom types.
pub fn resolve(type_name: &str) -> Option<PropertyType> {
    REGISTRY.get(type_name).cloned()
}

/// List every registered type, sorted by key.
pub fn types() -> Vec<PropertyType> {
    let mut all: Vec<PropertyType> = REGISTRY.values().cloned().collect();
    all.sort_by(|a, b| a.key.cmp(&b.key));
    all
}

/// Fill in name, description and dimensions from the catalog when the
/// property declares a known type and no explicit shape of its own.
pub fn enrich(property: &mut Property) {
    if property.type_name.is_empty() || !property.dimensions.is_empty() {
        return;
    }
    if let Some(spec) = resolve(&property.type_name) {
        if property.name.is_empty() {
            property.name = spec.name;
        }
        if property.description.is_empty() {
            property.description = spec.description;
        }
        property.dimensions = spec.dimensions;
    }
}

// =============================================================================
// Registry
// =============================================================================

fn dim(name: &str, description: &str, unit: &str) -> Dimension {
    Dimension::new(name, description, unit)
}

/// `Value1` .. `ValueN` dimensions for the generic N-dimension types.
fn value_dims(count: usize) -> Vec<Dimension> {
    (1..=count)
        .map(|i| dim(&format!("Value{}", i), "", ""))
        .collect()
}

fn axes(descriptions: [&str; 3], unit: &str) -> Vec<Dimension> {
    ["x", "y", "z"]
        .iter()
        .zip(descriptions.iter())
        .map(|(axis, description)| dim(axis, description, unit))
        .collect()
}

static REGISTRY: Lazy<HashMap<&'static str, PropertyType>> = Lazy::new(|| {
    let mut registry = HashMap::new();

    let mut insert = |key: &'static str, name: &str, description: &str, dimensions: Vec<Dimension>| {
        registry.insert(
            key,
            PropertyType {
                key: key.to_string(),
                name: name.to_string(),
                description: description.to_string(),
                dimensions,
            },
        );
    };

    insert("TEXT", "Text", "", vec![Dimension::text("Text", "")]);
    insert(
        "ACCELEROMETER",
        "Accelerometer",
        "Acceleration force that is applied to a device on all three physical axes x, y and z, including the force of gravity.",
        axes(
            [
                "Acceleration force that is applied to a device on physical axe x, including the force of gravity.",
                "Acceleration force that is applied to a device on physical axe y, including the force of gravity.",
                "Acceleration force that is applied to a device on physical axe z, including the force of gravity.",
            ],
            "m/s2",
        ),
    );
    insert(
        "GYROSCOPE",
        "Gyroscope",
        "Rate of rotation around the three axis x, y and z.",
        axes(
            [
                "Rate of rotation around the x axis.",
                "Rate of rotation around the y axis.",
                "Rate of rotation around the z axis.",
            ],
            "rad/s",
        ),
    );
    insert(
        "BINARY",
        "Binary",
        "Can take value 0 or 1.",
        vec![dim("state", "Binary State", "")],
    );
    insert(
        "MAGNETIC_FIELD",
        "Magnetic Field",
        "Geomagnetic field strength along the x, y and z axis.",
        axes(
            [
                "Geomagnetic field strength along the x axis.",
                "Geomagnetic field strength along the y axis.",
                "Geomagnetic field strength along the z axis.",
            ],
            "uT",
        ),
    );
    insert(
        "GRAVITY",
        "Gravity",
        "Force of gravity along x, y and z axis.",
        axes(
            [
                "Force of gravity along the x axis.",
                "Force of gravity along the y axis.",
                "Force of gravity along the z axis.",
            ],
            "m/s2",
        ),
    );
    insert(
        "ROTATION_VECTOR",
        "Rotation Vector",
        "",
        axes(
            [
                "Rotation vector component along the x axis (x * sin(theta/2)).",
                "Rotation vector component along the y axis (y * sin(theta/2)).",
                "Rotation vector component along the z axis (z * sin(theta/2)).",
            ],
            "",
        ),
    );
    insert("LIGHT", "Light", "Light level", vec![dim("Illuminance", "", "lx")]);
    insert(
        "LOCATION",
        "Location",
        "Longitude and latitude in degrees",
        vec![dim("Longitude", "", "°"), dim("Latitude", "", "°")],
    );
    insert(
        "ALTITUDE",
        "Altitude",
        "Altitude in meters above the WGS 84 reference ellipsoid.",
        vec![dim("Altitude", "", "m")],
    );
    insert("BEARING", "Bearing", "Bearing in degrees", vec![dim("Bearing", "", "°")]);
    insert("SPEED", "Speed", "", vec![dim("Speed", "", "")]);
    insert(
        "PRESSURE",
        "Pressure",
        "Atmospheric pressure in hPa (millibar)",
        vec![dim("Pressure", "", "hPa")],
    );
    insert(
        "PROXIMITY",
        "Proximity",
        "Proximity from object (binary or in cm)",
        vec![dim("Proximity", "", "cm")],
    );
    insert(
        "RELATIVE_HUMIDITY",
        "Relative Humidity",
        "Relative ambient air humidity in percent",
        vec![dim("Relative Humidity", "", "H%")],
    );
    insert("COUNT", "Count", "", vec![dim("Count", "", "")]);
    insert("FORCE", "Force", "", vec![dim("Force", "", "kg")]);
    insert("TEMPERATURE", "Temperature", "", vec![dim("Temperature", "", "°C")]);
    insert("STATE", "State", "", vec![dim("Value", "", "")]);
    insert(
        "CLASS",
        "Class",
        "",
        vec![dim(
            "Class",
            "Values of this dimension represents the classes of the property",
            "",
        )],
    );
    insert(
        "VIDEO",
        "Video",
        "",
        vec![dim("Duration", "Duration of the video record.", "ms")],
    );
    insert(
        "HEART_RATE",
        "Heart Rate",
        "Heart Rate Measurement (HRM)",
        vec![
            dim("Heart Rate", "Heart rate in beats per minutes", "BPM"),
            dim("RR-Interval", "RR-Interval in seconds", "s"),
        ],
    );
    insert(
        "WIFI",
        "WiFi",
        "WiFi interaction",
        vec![
            dim("Session duration", "Session duration", "ms"),
            dim("RSSI", "Received Signal Strength Indicator", ""),
            dim("SNR", "Signal-to-Noise Ratio", ""),
        ],
    );
    insert("ONE_DIMENSION", "1 Dimension", "", vec![dim("Value", "", "")]);
    insert("TWO_DIMENSIONS", "2 Dimensions", "", value_dims(2));
    insert("THREE_DIMENSIONS", "3 Dimensions", "", value_dims(3));
    insert("FOUR_DIMENSIONS", "4 Dimensions", "", value_dims(4));
    insert("FIVE_DIMENSIONS", "5 Dimensions", "", value_dims(5));
    insert("SIX_DIMENSIONS", "6 Dimensions", "", value_dims(6));
    insert("NINE_DIMENSIONS", "9 Dimensions", "", value_dims(9));
    insert("TEN_DIMENSIONS", "10 Dimensions", "", value_dims(10));
    insert("ELEVEN_DIMENSIONS", "11 Dimensions", "", value_dims(11));
    insert("TWELVE_DIMENSIONS", "12 Dimensions", "", value_dims(12));

    registry
});

// =============================================================================
// Tests
// =============================================================================
