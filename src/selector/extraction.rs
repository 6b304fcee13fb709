//! Value extraction functions applied by dimension selectors

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_bucket_size() -> f64 {
    1.0
}

/// Transformation of a dimension value into the string a reader sees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExtractionFn {
    /// Characters `[index, index + length)`; null when `index` is past the end
    Substring {
        index: usize,
        #[serde(default)]
        length: Option<usize>,
    },
    /// Map values through a fixed table
    #[serde(rename_all = "camelCase")]
    Lookup {
        map: HashMap<String, String>,
        #[serde(default)]
        retain_missing_value: bool,
        #[serde(default)]
        replace_missing_value_with: Option<String>,
    },
    /// Floor numeric values into buckets of `size` starting at `offset`
    Bucket {
        #[serde(default = "default_bucket_size")]
        size: f64,
        #[serde(default)]
        offset: f64,
    },
    Upper,
    Lower,
}

impl ExtractionFn {
    pub fn apply(&self, value: Option<&str>) -> Option<String> {
        match self {
            ExtractionFn::Substring { index, length } => {
                let value = value?;
                if *index >= value.chars().count() {
                    return None;
                }
                let chars = value.chars().skip(*index);
                Some(match length {
                    Some(len) => chars.take(*len).collect(),
                    None => chars.collect(),
                })
            }
            ExtractionFn::Lookup {
                map,
                retain_missing_value,
                replace_missing_value_with,
            } => match value.and_then(|v| map.get(v)) {
                Some(mapped) => Some(mapped.clone()),
                None if *retain_missing_value => value.map(str::to_string),
                None => replace_missing_value_with.clone(),
            },
            ExtractionFn::Bucket { size, offset } => {
                let v = value?.trim().parse::<f64>().ok()?;
                let bucket = ((v - offset) / size).floor() * size + offset;
                Some(bucket.to_string())
            }
            ExtractionFn::Upper => value.map(str::to_uppercase),
            ExtractionFn::Lower => value.map(str::to_lowercase),
        }
    }
}
