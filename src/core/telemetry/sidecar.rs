// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

use std::collections::BTreeMap;

// Layout of the JSON written by the GoPro telemetry extractor:
// { "1": { "device name": "...", "streams": { "ACCL": { "samples": [...], "name": "...", "units": "..." } } }, "frames/second": 59.94 }

#[derive(Default, Clone, Debug, serde::Deserialize)]
#[serde(default)]
pub struct DeviceTelemetry {
    #[serde(rename = "device name")]
    pub device_name: String,
    pub streams: BTreeMap<String, TelemetryStream>,
}

#[derive(Default, Clone, Debug, serde::Deserialize)]
#[serde(default)]
pub struct TelemetryStream {
    pub name: Option<String>,
    pub units: Option<serde_json::Value>, // either a string or one unit per axis
    pub samples: Vec<RawSample>,
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct RawSample {
    pub cts: f64, // milliseconds
    pub value: Vec<f64>,
}

impl TelemetryStream {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }
    pub fn display_units(&self) -> String {
        match &self.units {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(v) => v.to_string(),
            None => "unknown".into()
        }
    }
}
