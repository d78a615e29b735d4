use std::sync::Arc;

use ai::{ToolSpec, Value, create_tool, json};
use async_trait::async_trait;
use chart::{ChartKind, ChartRenderer, GraphSpec};

use crate::registry::{HandlerError, ToolHandler};

fn graph_parameters(kind: ChartKind) -> Value {
    let caption = match kind {
        ChartKind::Bar => "Bar Graph Title",
        ChartKind::Line => "Line Graph Title",
        ChartKind::Pie => "Pie Chart Title",
    };

    let mut parameters = json!({
        "type": "object",
        "properties": {
            "data": {
                "type": "object",
                "additionalProperties": {"type": "number"},
                "description": "Data: a dictionary of str and float values",
            },
            "title": {"type": "string", "description": caption},
            "xlabel": {"type": "string", "description": "X Axis Label"},
            "ylabel": {"type": "string", "description": "Y Axis Label"},
        },
        "required": ["data", "title", "xlabel", "ylabel"],
    });

    if kind == ChartKind::Pie {
        let data = parameters["properties"]["data"].take();
        let title = parameters["properties"]["title"].take();
        parameters["properties"] = json!({"data": data, "title": title});
        parameters["required"] = json!(["data", "title"]);
    }

    parameters
}

pub(crate) fn graph_spec(kind: ChartKind) -> ToolSpec {
    let (name, description) = match kind {
        ChartKind::Bar => ("draw_bar_graph", "Draw a Bar Graph"),
        ChartKind::Line => ("draw_line_graph", "Draw a Line Graph"),
        ChartKind::Pie => ("draw_pie_chart", "Draw a Pie Chart"),
    };

    create_tool(name, description, graph_parameters(kind))
}

pub(crate) struct DrawGraph {
    pub(crate) renderer: Arc<ChartRenderer>,
    pub(crate) kind: ChartKind,
}

/// Arguments have been validated, so `data` values are numbers.
fn to_graph(arguments: &Value) -> GraphSpec {
    let text = |name: &str| {
        arguments
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let data = arguments
        .get("data")
        .and_then(Value::as_object)
        .map(|entries| {
            entries
                .iter()
                .map(|(label, value)| (label.clone(), value.as_f64().unwrap_or(f64::NAN)))
                .collect()
        })
        .unwrap_or_default();

    GraphSpec::new(data, text("title")).with_labels(text("xlabel"), text("ylabel"))
}

#[async_trait]
impl ToolHandler for DrawGraph {
    async fn call(&self, arguments: Value) -> Result<String, HandlerError> {
        let graph = to_graph(&arguments);
        let renderer = Arc::clone(&self.renderer);
        let kind = self.kind;

        let status = tokio::task::spawn_blocking(move || renderer.render(kind, &graph)).await??;
        Ok(status)
    }
}
