mod common;

use std::sync::Arc;
use std::time::Duration;

use agent::{Agent, AgentError, HandlerError, Outcome, Step, ToolHandler, ToolRegistry};
use ai::{Role, Value, create_tool, json};
use async_trait::async_trait;
use common::{ScriptedModel, answer, call};
use pretty_assertions::assert_eq;

struct Upper;

#[async_trait]
impl ToolHandler for Upper {
    async fn call(&self, arguments: Value) -> Result<String, HandlerError> {
        let text = arguments["text"].as_str().unwrap_or_default();
        if text.is_empty() {
            return Err("nothing to shout".into());
        }
        Ok(text.to_uppercase())
    }
}

fn registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry
        .register(
            create_tool(
                "shout",
                "Upper-cases text",
                json!({
                    "type": "object",
                    "properties": {"text": {"type": "string"}},
                    "required": ["text"],
                }),
            ),
            Upper,
        )
        .unwrap();
    registry
}

fn build_agent(model: ScriptedModel) -> (Arc<ScriptedModel>, Agent) {
    let model = Arc::new(model);
    let agent = Agent::new(model.clone(), registry(), "you are a test");
    (model, agent)
}

async fn run(agent: &Agent, question: &str) -> (Result<Outcome, AgentError>, Vec<Step>) {
    let mut steps = Vec::new();
    let outcome = agent
        .run(question, |step| {
            steps.push(step);
            async {}
        })
        .await;
    (outcome, steps)
}

#[tokio::test]
async fn single_tool_round_trip() {
    let (model, agent) = build_agent(ScriptedModel::new(vec![
        call("call_1", "shout", json!({"text": "hello"})),
        answer("It says HELLO."),
    ]));

    let (outcome, steps) = run(&agent, "shout hello").await;
    let outcome = outcome.unwrap();

    assert_eq!(outcome.answer, "It says HELLO.");
    assert_eq!(outcome.turns, 2);
    assert_eq!(
        outcome.conversation.roles(),
        vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant]
    );

    let tool_message = &outcome.conversation.messages()[3];
    assert_eq!(tool_message.content, "HELLO");
    assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));

    assert_eq!(steps.len(), 3);
    assert!(matches!(&steps[1], Step::Tools { results } if results[0].content == "HELLO"));
    assert_eq!(model.seen(), vec![2, 4]);
}

#[tokio::test]
async fn unknown_tool_is_reported_to_the_model() {
    let (_, agent) = build_agent(ScriptedModel::new(vec![
        call("call_1", "whisper", json!({"text": "hello"})),
        answer("Sorry."),
    ]));

    let (outcome, _) = run(&agent, "whisper hello").await;
    let conversation = outcome.unwrap().conversation;

    let tool_message = &conversation.messages()[3];
    assert_eq!(tool_message.role, Role::Tool);
    assert_eq!(
        tool_message.content,
        "Error: whisper is not a valid tool, try one of [shout]"
    );
}

#[tokio::test]
async fn nameless_tool_call_is_reported_to_the_model() {
    let (_, agent) = build_agent(ScriptedModel::new(vec![
        call("call_1", ai::UNNAMED_TOOL, json!({})),
        answer("Sorry."),
    ]));

    let (outcome, steps) = run(&agent, "shout hello").await;
    let conversation = outcome.unwrap().conversation;

    assert!(matches!(&steps[1], Step::Tools { results } if results[0].is_error));
    let tool_message = &conversation.messages()[3];
    assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(
        tool_message.content,
        "Error: <unnamed> is not a valid tool, try one of [shout]"
    );
}

#[tokio::test]
async fn bad_arguments_and_handler_errors_stay_in_the_loop() {
    let (_, agent) = build_agent(ScriptedModel::new(vec![
        ai::Message::assistant(
            "Trying twice.",
            vec![
                ai::ToolCall::new("a", "shout", json!({})),
                ai::ToolCall::new("b", "shout", json!({"text": ""})),
            ],
        ),
        answer("Gave up."),
    ]));

    let (outcome, steps) = run(&agent, "shout").await;
    let outcome = outcome.unwrap();

    let Step::Tools { results } = &steps[1] else {
        panic!("expected tool step, got {:?}", steps[1]);
    };
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.is_error));
    assert_eq!(
        results[0].content,
        "Error: invalid arguments for shout: missing required field `text`"
    );
    assert_eq!(results[1].content, "Error: nothing to shout");

    assert_eq!(
        outcome.conversation.roles(),
        vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Tool, Role::Assistant]
    );
}

#[tokio::test]
async fn runaway_model_is_stopped() {
    let replies = (0..10)
        .map(|i| call(&format!("call_{i}"), "shout", json!({"text": "again"})))
        .collect();
    let (model, agent) = build_agent(ScriptedModel::new(replies));
    let agent = agent.with_max_turns(3);

    let (outcome, steps) = run(&agent, "loop forever").await;

    assert!(matches!(outcome, Err(AgentError::Exhausted { max_turns: 3 })));
    assert_eq!(model.seen().len(), 3);
    assert_eq!(steps.len(), 6);
}

#[tokio::test]
async fn slow_model_times_out() {
    let (_, agent) = build_agent(ScriptedModel::stalled(Duration::from_secs(30)));
    let agent = agent.with_turn_timeout(Duration::from_millis(50));

    let (outcome, steps) = run(&agent, "anyone there?").await;

    assert!(matches!(outcome, Err(AgentError::Timeout(_))));
    assert!(steps.is_empty());
}

#[tokio::test]
async fn model_failure_is_fatal() {
    let (_, agent) = build_agent(ScriptedModel::new(vec![]));

    let (outcome, _) = run(&agent, "hello?").await;
    assert!(matches!(outcome, Err(AgentError::Model(_))));
}
