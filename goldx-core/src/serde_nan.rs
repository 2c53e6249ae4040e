//! Serde adapters that write NaN as `null` and read `null` back as NaN.
//!
//! serde_json already emits `null` for non-finite floats but refuses to
//! deserialize `null` into `f64`, which breaks round-tripping results that
//! carry undefined metrics or warm-up values.

use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_nan() {
        serializer.serialize_none()
    } else {
        serializer.serialize_some(value)
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

pub mod vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|v| (!v.is_nan()).then_some(*v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let raw = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Sample {
        #[serde(with = "super")]
        scalar: f64,
        #[serde(with = "super::vec")]
        series: Vec<f64>,
    }

    #[test]
    fn nan_round_trips_through_null() {
        let sample = Sample {
            scalar: f64::NAN,
            series: vec![f64::NAN, 1.5],
        };
        let json = serde_json::to_string(&sample).unwrap();
        assert_eq!(json, r#"{"scalar":null,"series":[null,1.5]}"#);
        let back: Sample = serde_json::from_str(&json).unwrap();
        assert!(back.scalar.is_nan());
        assert!(back.series[0].is_nan());
        assert_eq!(back.series[1], 1.5);
    }
}
