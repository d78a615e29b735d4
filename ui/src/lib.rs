//! Terminal presentation of agent runs.

use std::fmt;
use std::io;

use agent::Step;
use colored::{ColoredString, Colorize};

pub const STEP_SEPARATOR: &str = "----";

/// One printed line of a run transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Ai(String),
    ToolCall { name: String, args: String },
    ToolResult { name: String, content: String, failed: bool },
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Ai(text) => write!(f, "AI: {text}"),
            Line::ToolCall { name, args } => write!(f, "Tool Call: {name} with args {args}"),
            Line::ToolResult { name, content, .. } => write!(f, "Tool ({name}): {content}"),
        }
    }
}

impl Line {
    fn colored(&self) -> ColoredString {
        let text = self.to_string();
        match self {
            Line::Ai(_) => text.blue(),
            Line::ToolCall { .. } => text.yellow(),
            Line::ToolResult { failed: true, .. } => text.red(),
            Line::ToolResult { .. } => text.normal(),
        }
    }
}

/// Lines for `step`, without the trailing separator. Empty model text is skipped.
pub fn step_lines(step: &Step) -> Vec<Line> {
    match step {
        Step::Agent { text, tool_calls } => {
            let mut lines = Vec::with_capacity(tool_calls.len() + 1);
            if !text.trim().is_empty() {
                lines.push(Line::Ai(text.clone()));
            }
            lines.extend(tool_calls.iter().map(|call| Line::ToolCall {
                name: call.name.clone(),
                args: match &call.arguments {
                    ai::Value::String(raw) => raw.clone(),
                    other => serde_json::to_string(other).unwrap_or_default(),
                },
            }));
            lines
        }
        Step::Tools { results } => results
            .iter()
            .map(|result| Line::ToolResult {
                name: result.name.clone(),
                content: result.content.clone(),
                failed: result.is_error,
            })
            .collect(),
    }
}

/// The step as plain text, separator included.
pub fn format_step(step: &Step) -> String {
    let mut out = String::new();
    for line in step_lines(step) {
        out.push_str(&line.to_string());
        out.push('\n');
    }
    out.push_str(STEP_SEPARATOR);
    out
}

pub fn print_step(step: &Step) {
    for line in step_lines(step) {
        println!("{}", line.colored());
    }
    println!("{STEP_SEPARATOR}");
}

/// Reads the question to answer.
pub fn ask_question() -> io::Result<String> {
    cliclack::input("Please enter your question:")
        .placeholder("List the top 5 countries by total spending and chart it")
        .validate(|input: &String| {
            if input.trim().is_empty() {
                Err("Please enter a question")
            } else {
                Ok(())
            }
        })
        .interact()
}

/// Masked prompt for a secret; `None` when the user cancels or leaves it blank.
pub fn ask_secret(prompt: &str) -> Option<String> {
    cliclack::password(prompt)
        .mask('▪')
        .interact()
        .ok()
        .filter(|secret: &String| !secret.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use agent::ToolResult;
    use ai::{ToolCall, json};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn agent_step_lists_text_then_calls() {
        let step = Step::Agent {
            text: "Let me look.".into(),
            tool_calls: vec![ToolCall::new(
                "call_1",
                "sql_db_query",
                json!({"query": "SELECT Name FROM Artist LIMIT 5"}),
            )],
        };

        assert_eq!(
            format_step(&step),
            "AI: Let me look.\n\
             Tool Call: sql_db_query with args {\"query\":\"SELECT Name FROM Artist LIMIT 5\"}\n\
             ----"
        );
    }

    #[test]
    fn silent_tool_request_prints_only_the_call() {
        let step = Step::Agent {
            text: String::new(),
            tool_calls: vec![ToolCall::new("call_1", "sql_db_list_tables", json!({}))],
        };

        assert_eq!(
            step_lines(&step),
            vec![Line::ToolCall {
                name: "sql_db_list_tables".into(),
                args: "{}".into(),
            }]
        );
    }

    #[test]
    fn tool_step_prints_each_result() {
        let step = Step::Tools {
            results: vec![
                ToolResult {
                    call_id: "call_1".into(),
                    name: "draw_bar_graph".into(),
                    content: "Graph has been saved as bar_graph.png".into(),
                    is_error: false,
                },
                ToolResult {
                    call_id: "call_2".into(),
                    name: "sql_db_query".into(),
                    content: "Error: no such column: Spent".into(),
                    is_error: true,
                },
            ],
        };

        assert_eq!(
            format_step(&step),
            "Tool (draw_bar_graph): Graph has been saved as bar_graph.png\n\
             Tool (sql_db_query): Error: no such column: Spent\n\
             ----"
        );
    }

    #[test]
    fn final_answer_is_an_ai_line() {
        let step = Step::Agent {
            text: "USA spent the most.".into(),
            tool_calls: vec![],
        };
        assert_eq!(format_step(&step), "AI: USA spent the most.\n----");
    }
}
