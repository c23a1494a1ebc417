//! Weather tool: stub that returns deterministic weather data.
//!
//! The data is derived from the location name so demo runs and tests are
//! reproducible without network access.

use async_trait::async_trait;
use serde::Serialize;
use stepstream_core::error::ToolError;
use stepstream_core::tool::{Tool, ToolContext, ToolResult};

pub struct GetWeatherTool;

#[async_trait]
impl Tool for GetWeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather for a location. \
         Returns temperature, conditions, humidity, and wind."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "City name or place to report on"
                },
                "units": {
                    "type": "string",
                    "enum": ["metric", "imperial"],
                    "default": "metric"
                }
            },
            "required": ["location"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let location = arguments["location"]
            .as_str()
            .filter(|l| !l.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'location' argument".into()))?;
        let imperial = match arguments["units"].as_str() {
            None | Some("metric") => false,
            Some("imperial") => true,
            Some(other) => {
                return Err(ToolError::InvalidArguments(format!(
                    "Unknown units '{other}', expected 'metric' or 'imperial'"
                )));
            }
        };

        let report = WeatherReport::for_location(location, imperial);
        let data = serde_json::to_value(&report).map_err(|e| ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason: e.to_string(),
        })?;

        Ok(ToolResult::ok(report.summary()).with_data(data))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct WeatherReport {
    location: String,
    temperature: f64,
    units: &'static str,
    conditions: &'static str,
    humidity: u32,
    wind_kph: u32,
}

const CONDITIONS: [&str; 6] = [
    "Clear",
    "Partly cloudy",
    "Overcast",
    "Light rain",
    "Thunderstorms",
    "Fog",
];

impl WeatherReport {
    fn for_location(location: &str, imperial: bool) -> Self {
        let seed = location
            .to_lowercase()
            .bytes()
            .fold(7u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));

        let celsius = f64::from(seed % 38) - 5.0;
        let (temperature, units) = if imperial {
            (celsius * 9.0 / 5.0 + 32.0, "°F")
        } else {
            (celsius, "°C")
        };

        Self {
            location: location.trim().to_string(),
            temperature: (temperature * 10.0).round() / 10.0,
            units,
            conditions: CONDITIONS[(seed / 11) as usize % CONDITIONS.len()],
            humidity: 25 + seed % 70,
            wind_kph: 3 + (seed / 5) % 40,
        }
    }

    fn summary(&self) -> String {
        format!(
            "{}: {}{} and {}, humidity {}%, wind {} km/h",
            self.location,
            self.temperature,
            self.units,
            self.conditions.to_lowercase(),
            self.humidity,
            self.wind_kph
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepstream_core::tool::DocumentDraft;

    fn ctx() -> ToolContext {
        ToolContext::new("inv-1", DocumentDraft::new())
    }

    #[tokio::test]
    async fn reports_weather_with_data() {
        let result = GetWeatherTool
            .execute(serde_json::json!({"location": "Tokyo"}), &ctx())
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.output.starts_with("Tokyo:"));
        let data = result.data.unwrap();
        assert_eq!(data["location"], "Tokyo");
        assert_eq!(data["units"], "°C");
    }

    #[tokio::test]
    async fn same_location_same_weather() {
        let a = GetWeatherTool
            .execute(serde_json::json!({"location": "London"}), &ctx())
            .await
            .unwrap();
        let b = GetWeatherTool
            .execute(serde_json::json!({"location": "london"}), &ctx())
            .await
            .unwrap();
        assert_eq!(a.data.unwrap()["temperature"], b.data.unwrap()["temperature"]);
    }

    #[tokio::test]
    async fn imperial_units() {
        let result = GetWeatherTool
            .execute(
                serde_json::json!({"location": "New York", "units": "imperial"}),
                &ctx(),
            )
            .await
            .unwrap();
        assert!(result.output.contains("°F"));
    }

    #[tokio::test]
    async fn bad_arguments_are_rejected() {
        for args in [
            serde_json::json!({}),
            serde_json::json!({"location": "  "}),
            serde_json::json!({"location": "Oslo", "units": "kelvin"}),
        ] {
            let err = GetWeatherTool.execute(args, &ctx()).await.unwrap_err();
            assert!(matches!(err, ToolError::InvalidArguments(_)));
        }
    }

    #[test]
    fn definition_name() {
        assert_eq!(GetWeatherTool.to_definition().name, "get_weather");
    }
}
