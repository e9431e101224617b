//! Tools bundled with the binaries.

use serde::Deserialize;

use crate::schema::ObjectSchema;
use crate::tool::{FunctionTool, Tool};

#[derive(Debug, Deserialize)]
pub struct WeatherInput {
    pub location: String,
}

/// A canned weather lookup, handy for trying out tool calls
pub fn weather() -> impl Tool {
    FunctionTool::new(
        "get_weather",
        "Get the weather in a location",
        ObjectSchema::new()
            .string("location", "The city name", true)
            .build(),
        |input: WeatherInput| async move {
            tracing::debug!(location = %input.location, "executing weather tool");
            Ok(format!("The weather in {} is sunny, 22°C", input.location))
        },
    )
}
