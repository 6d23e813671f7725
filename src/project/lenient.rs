//! Field deserializers for snapshot files written by UIs that store slider
//! values as strings ("120" for 120).

use serde::de::{Deserializer, Error};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Number(f64),
    Text(String),
}

fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Scalar::deserialize(deserializer)? {
        Scalar::Number(n) => Ok(n),
        Scalar::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("expected a number, got {:?}", s))),
        Scalar::Bool(b) => Err(D::Error::custom(format!("expected a number, got {}", b))),
    }
}

fn integer<'de, D: Deserializer<'de>>(deserializer: D, max: f64) -> Result<f64, D::Error> {
    let n = number(deserializer)?;
    if !n.is_finite() || n < 0.0 || n > max || n.fract() != 0.0 {
        return Err(D::Error::custom(format!("expected a whole number, got {}", n)));
    }
    Ok(n)
}

pub fn f32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
    number(deserializer).map(|n| n as f32)
}

pub fn f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    number(deserializer)
}

pub fn u8<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    integer(deserializer, u8::MAX as f64).map(|n| n as u8)
}

pub fn usize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    integer(deserializer, u32::MAX as f64).map(|n| n as usize)
}

pub fn bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Scalar::deserialize(deserializer)? {
        Scalar::Bool(b) => Ok(b),
        Scalar::Number(n) => Ok(n != 0.0),
        Scalar::Text(s) => match s.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            other => Err(D::Error::custom(format!("expected a boolean, got {:?}", other))),
        },
    }
}

/// Strings pass through; bare numbers become their text ("1.0" for 1)
pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Scalar::deserialize(deserializer)? {
        Scalar::Text(s) => Ok(s),
        Scalar::Number(n) if n.fract() == 0.0 => Ok(format!("{:.1}", n)),
        Scalar::Number(n) => Ok(n.to_string()),
        Scalar::Bool(b) => Err(D::Error::custom(format!("expected a string, got {}", b))),
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Row {
        #[serde(deserialize_with = "super::f32")]
        bpm: f32,
        #[serde(deserialize_with = "super::usize")]
        step: usize,
        #[serde(deserialize_with = "super::bool")]
        muted: bool,
        #[serde(deserialize_with = "super::text")]
        version: String,
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        let a: Row =
            serde_json::from_str(r#"{"bpm": 120, "step": 3, "muted": true, "version": "1.0"}"#)
                .unwrap();
        let b: Row = serde_json::from_str(
            r#"{"bpm": "120", "step": "3", "muted": "true", "version": 1}"#,
        )
        .unwrap();
        assert_eq!(a.bpm, b.bpm);
        assert_eq!(a.step, b.step);
        assert_eq!(a.muted, b.muted);
        assert_eq!(a.version, b.version);
    }

    #[test]
    fn rejects_non_numbers() {
        let bad = [
            r#"{"bpm": "fast", "step": 3, "muted": true, "version": "1.0"}"#,
            r#"{"bpm": 120, "step": "2.5", "muted": true, "version": "1.0"}"#,
            r#"{"bpm": 120, "step": -1, "muted": true, "version": "1.0"}"#,
            r#"{"bpm": 120, "step": 3, "muted": "maybe", "version": "1.0"}"#,
        ];
        for json in bad {
            assert!(serde_json::from_str::<Row>(json).is_err(), "{}", json);
        }
    }
}
