//! Packson Test Utilities
//!
//! Shared fixture generators for the Packson integration tests and benches.
//! Each generator targets one regularity the codec exploits: repeated object
//! shapes, arithmetic progressions, string families and mixed arrays.

use serde_json::{json, Map, Value};

/// Builder for creating test records with common patterns
pub struct RecordBuilder {
    fields: Map<String, Value>,
}

impl RecordBuilder {
    /// Create a new record builder
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    /// Add a field with a string value
    pub fn string(mut self, key: &str, value: &str) -> Self {
        self.fields
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    /// Add a field with an integer value
    pub fn int(mut self, key: &str, value: i64) -> Self {
        self.fields.insert(key.to_string(), Value::from(value));
        self
    }

    /// Add a field with a float value
    pub fn float(mut self, key: &str, value: f64) -> Self {
        self.fields.insert(key.to_string(), json!(value));
        self
    }

    /// Add a field with a boolean value
    pub fn bool(mut self, key: &str, value: bool) -> Self {
        self.fields.insert(key.to_string(), Value::Bool(value));
        self
    }

    /// Add a field with a null value
    pub fn null(mut self, key: &str) -> Self {
        self.fields.insert(key.to_string(), Value::Null);
        self
    }

    /// Add a field with an object value
    pub fn object(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// Build the record
    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate test data with various patterns
pub struct TestDataGenerator;

impl TestDataGenerator {
    /// Records whose `value` field changes type from record to record
    pub fn schema_drift_records() -> Vec<Value> {
        vec![
            RecordBuilder::new().string("id", "1").int("value", 42).build(),
            RecordBuilder::new()
                .string("id", "2")
                .string("value", "hello")
                .build(),
            RecordBuilder::new()
                .string("id", "3")
                .bool("value", true)
                .build(),
            RecordBuilder::new().string("id", "4").null("value").build(),
        ]
    }

    /// A chain of `depth` nested objects and arrays
    pub fn deeply_nested(depth: usize) -> Value {
        let mut nested = json!("leaf");
        for i in 0..depth {
            nested = if i % 2 == 0 {
                json!({ format!("level_{i}"): nested, "depth": i })
            } else {
                json!([nested, i, null])
            };
        }
        nested
    }

    /// Records with multi-byte strings
    pub fn unicode_edge_records() -> Vec<Value> {
        vec![
            RecordBuilder::new()
                .string("id", "1")
                .string("text", "Hello, World!")
                .build(),
            RecordBuilder::new()
                .string("id", "2")
                .string("text", "Hello, 世界! 🌍")
                .build(),
            RecordBuilder::new()
                .string("id", "3")
                .string("text", "🚀🎉💯🔥⭐")
                .build(),
            RecordBuilder::new()
                .string("id", "4")
                .string("text", "ASCII + 中文 + 🎯 + العربية")
                .build(),
        ]
    }

    /// Integers on both sides of every fixed-width and VLQ cutoff
    pub fn boundary_integers() -> Vec<i64> {
        vec![
            0,
            127,
            128,
            255,
            256,
            16_383,
            16_384,
            32_767,
            32_768,
            65_535,
            65_536,
            2_097_151,
            2_097_152,
            16_777_215,
            16_777_216,
            33_554_431,
            33_554_432,
            268_435_455,
            268_435_456,
            2_147_483_647,
            2_147_483_648,
            4_294_967_295,
            4_294_967_296,
            -1,
            -128,
            -129,
            -32_768,
            -32_769,
            -8_388_608,
            -8_388_609,
            -2_147_483_648,
            -2_147_483_649,
            i64::MAX,
            i64::MIN,
        ]
    }

    /// Floats that need 32-bit or 64-bit precision
    pub fn boundary_floats() -> Vec<f64> {
        vec![
            0.5,
            -0.25,
            1.5e10,
            f32::MAX as f64,
            f32::MIN_POSITIVE as f64,
            0.1,
            std::f64::consts::PI,
            1e300,
            -1e-300,
            f64::MAX,
        ]
    }

    /// Structured log records sharing one shape
    pub fn log_records(count: usize) -> Vec<Value> {
        (0..count)
            .map(|i| {
                let level = match i % 4 {
                    0 => "DEBUG",
                    1 => "INFO",
                    2 => "WARN",
                    _ => "ERROR",
                };
                RecordBuilder::new()
                    .int("id", i as i64)
                    .int("timestamp", 1_609_459_200_000 + (i as i64) * 1_000 + (i as i64 % 7))
                    .string("level", level)
                    .string("user", &format!("user_{}", i % 100))
                    .string("message", &format!("Request {i} completed"))
                    .float("latency", (i % 50) as f64 * 0.5)
                    .bool("cached", i % 3 == 0)
                    .build()
            })
            .collect()
    }

    /// Arithmetic progression of `len` integers
    pub fn progression(len: usize, start: i64, step: i64) -> Value {
        Value::Array(
            (0..len as i64)
                .map(|i| Value::from(start + i * step))
                .collect(),
        )
    }

    /// `count` objects with identical keys and value types
    pub fn repeated_shape(count: usize) -> Value {
        Value::Array(
            (0..count)
                .map(|i| {
                    json!({
                        "name": format!("item-{}", i % 10),
                        "qty": i % 200,
                        "active": i % 2 == 0,
                        "tags": ["a", "b"],
                    })
                })
                .collect(),
        )
    }

    /// Distinct strings sharing a prefix and a suffix
    pub fn string_family(count: usize, prefix: &str, suffix: &str) -> Vec<String> {
        (0..count)
            .map(|i| format!("{prefix}{i:05}{suffix}"))
            .collect()
    }

    /// `rows` × `cols` matrix of small integers
    pub fn matrix(rows: usize, cols: usize) -> Value {
        Value::Array(
            (0..rows)
                .map(|r| {
                    Value::Array(
                        (0..cols)
                            .map(|c| Value::from(((r * cols + c) % 13) as i64))
                            .collect(),
                    )
                })
                .collect(),
        )
    }

    /// Array mixing every value kind
    pub fn mixed_array() -> Value {
        json!([
            null,
            true,
            false,
            "text",
            42,
            -7,
            2.5,
            {"k": "v"},
            [1, "two", null],
            {},
            [],
            ""
        ])
    }
}

/// Utility functions for test assertions
pub mod assertions {
    use serde_json::Value;

    /// Assert that two JSON values are structurally equal, printing both on failure
    pub fn assert_json_equal(actual: &Value, expected: &Value, context: &str) {
        if actual != expected {
            panic!(
                "JSON assertion failed in {}:\nExpected: {}\nActual: {}",
                context,
                serde_json::to_string_pretty(expected).unwrap_or_default(),
                serde_json::to_string_pretty(actual).unwrap_or_default()
            );
        }
    }
}
