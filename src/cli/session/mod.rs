//! Session command - walks through a workflow in the terminal
//!
//! Reads one answer per line. Multi-select answers are comma separated.
//! Enter `:quit` to leave without finishing.

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::domain::workflow::{
    AdvanceOutcome, QuestionType, SessionStatus, StepStatus, Workflow, WorkflowEngine,
    WorkflowSummary,
};
use crate::infrastructure::guidance::create_guidance_provider;
use crate::infrastructure::logging;

const QUIT: &str = ":quit";

/// Arguments for the session command
#[derive(Args, Clone)]
pub struct SessionArgs {
    /// Workflow document to run (overrides config)
    #[arg(long)]
    pub workflow: Option<String>,

    /// Log level for the session (logs go to stdout alongside prompts)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

pub async fn run(args: SessionArgs) -> anyhow::Result<()> {
    let mut config = super::load_config()?;
    config.logging.level = args.log_level;
    logging::init_logging(&config.logging)?;

    let path = args.workflow.unwrap_or(config.workflow.path);
    let rulesets = Arc::new(crate::build_ruleset_registry()?);
    let workflow = crate::load_workflow(&path, &rulesets)?;

    let guidance = create_guidance_provider(&config.guidance)
        .await
        .context("Failed to initialize guidance provider")?;
    let engine = crate::create_engine(&config.guidance, guidance, rulesets);

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();

    run_session(&engine, &workflow, stdin, &mut stdout).await?;
    Ok(())
}

/// Drive a session from `input` until it ends or input runs out
///
/// Returns the final outcome, or `None` when the user quit early.
pub async fn run_session<R, W>(
    engine: &dyn WorkflowEngine,
    workflow: &Workflow,
    input: R,
    output: &mut W,
) -> anyhow::Result<Option<AdvanceOutcome>>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut outcome = engine.start_session(workflow).await?;

    loop {
        output.write_all(render(&outcome).as_bytes()).await?;

        if outcome.status.is_final() {
            output.flush().await?;
            return Ok(Some(outcome));
        }

        if outcome.status == SessionStatus::Computing {
            outcome = engine.advance(workflow, &outcome.state, None).await?;
            continue;
        }

        output.write_all(b"> ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            return Ok(None);
        };
        if line.trim() == QUIT {
            return Ok(None);
        }

        let value = parse_input(&line, outcome.ui.question_type);
        outcome = engine.advance(workflow, &outcome.state, Some(value)).await?;
    }
}

/// Convert a line of input into an answer for the given question type
pub fn parse_input(line: &str, question_type: Option<QuestionType>) -> Value {
    let line = line.trim();

    match question_type {
        Some(QuestionType::MultiSelect) => Value::Array(
            line.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect(),
        ),
        Some(QuestionType::Boolean) => match line.to_lowercase().as_str() {
            "y" | "yes" | "true" => Value::Bool(true),
            "n" | "no" | "false" => Value::Bool(false),
            _ => Value::String(line.to_string()),
        },
        _ => Value::String(line.to_string()),
    }
}

/// Text shown for a turn
pub fn render(outcome: &AdvanceOutcome) -> String {
    let ui = &outcome.ui;
    let mut out = String::new();

    if let Some(error) = &ui.error {
        let _ = writeln!(out, "! {}", error);
    }

    match outcome.status {
        SessionStatus::AwaitingAnswer => {
            let _ = writeln!(out, "\n== {} ==", ui.title);
            if let Some(help) = &ui.help {
                let _ = writeln!(out, "{}", help);
            }
            for citation in &outcome.citations {
                let _ = writeln!(out, "  see: {}", citation);
            }
            if let Some(question) = &ui.question {
                let _ = writeln!(out, "{}", question);
            }
            if let Some(choices) = &ui.choices {
                let _ = writeln!(out, "  [{}]", choices.join(" | "));
            }
        }
        SessionStatus::Computing => {}
        SessionStatus::Terminated | SessionStatus::Done => {
            let _ = writeln!(out, "\n== {} ==", ui.title);
            if let Some(help) = &ui.help {
                let _ = writeln!(out, "{}", help);
            }
            for advice in &outcome.advice {
                let _ = writeln!(out, "* {}", advice);
            }
            if let Some(summary) = &outcome.summary {
                out.push_str(&render_summary(summary));
            }
        }
    }

    out
}

fn render_summary(summary: &WorkflowSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{}", summary.message);

    for step in &summary.steps {
        let mark = match step.status {
            StepStatus::Completed => "x",
            StepStatus::Blocked => "!",
            StepStatus::Pending => " ",
        };
        let _ = writeln!(out, "[{}] {}", mark, step.title);

        for question in &step.questions {
            if let Some(answer) = &question.answer {
                let answer = match answer {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let _ = writeln!(out, "      {}: {}", question.label, answer);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::guidance::MockGuidanceProvider;
    use crate::infrastructure::guidance::GuidanceResolver;
    use crate::infrastructure::workflow::{DocumentFormat, WorkflowEngineImpl, WorkflowLoader};
    use crate::domain::workflow::RulesetRegistry;
    use serde_json::json;

    const WORKFLOW: &str = r#"
id: cli_test
title: CLI test
steps:
  - id: basics
    title: Basics
    ask:
      - id: mode
        label: Transport mode?
        type: single_select
        options: [air, sea]
        required: true
      - id: count
        label: How many?
        type: integer
        required: true
    actions_if:
      - when: mode == sea
        advise:
          - Sea freight is not supported.
    next:
      - when: always
        goto: done
"#;

    fn setup() -> (WorkflowEngineImpl, Workflow) {
        let mut provider = MockGuidanceProvider::new();
        provider.expect_provider_type().return_const("mock");
        provider.expect_lookup_by_titles().returning(|_| Ok(vec![]));
        provider.expect_semantic_lookup().returning(|_, _| Ok(vec![]));

        let rulesets = RulesetRegistry::new();
        let workflow =
            WorkflowLoader::parse(WORKFLOW, DocumentFormat::Yaml, "cli_test", &rulesets).unwrap();
        let engine =
            WorkflowEngineImpl::new(GuidanceResolver::new(Arc::new(provider)), Arc::new(rulesets));

        (engine, workflow)
    }

    #[test]
    fn test_parse_input_multi_select() {
        assert_eq!(
            parse_input(" a, b ,,c ", Some(QuestionType::MultiSelect)),
            json!(["a", "b", "c"])
        );
    }

    #[test]
    fn test_parse_input_boolean_and_text() {
        assert_eq!(parse_input("Yes", Some(QuestionType::Boolean)), json!(true));
        assert_eq!(parse_input("n", Some(QuestionType::Boolean)), json!(false));
        assert_eq!(parse_input("maybe", Some(QuestionType::Boolean)), json!("maybe"));
        assert_eq!(parse_input("  42 ", Some(QuestionType::Integer)), json!("42"));
        assert_eq!(parse_input("hello", None), json!("hello"));
    }

    #[tokio::test]
    async fn test_session_runs_to_done() {
        let (engine, workflow) = setup();
        let input = tokio_test::io::Builder::new()
            .read(b"air\nlots\n3\n")
            .build();
        let mut output = Vec::new();

        let outcome = run_session(&engine, &workflow, BufReader::new(input), &mut output)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.status, SessionStatus::Done);
        assert_eq!(outcome.state.answers["count"], json!(3));

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Transport mode?"));
        assert!(text.contains("[air | sea]"));
        assert!(text.contains("! Please enter a number."));
        assert!(text.contains("[x] Basics"));
    }

    #[tokio::test]
    async fn test_session_prints_advice_on_termination() {
        let (engine, workflow) = setup();
        let input = tokio_test::io::Builder::new().read(b"sea\n").build();
        let mut output = Vec::new();

        let outcome = run_session(&engine, &workflow, BufReader::new(input), &mut output)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.status, SessionStatus::Terminated);
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("* Sea freight is not supported."));
        assert!(text.contains("[!] Basics"));
    }

    #[tokio::test]
    async fn test_session_quit() {
        let (engine, workflow) = setup();
        let input = tokio_test::io::Builder::new().read(b":quit\n").build();
        let mut output = Vec::new();

        let outcome = run_session(&engine, &workflow, BufReader::new(input), &mut output)
            .await
            .unwrap();

        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn test_session_end_of_input() {
        let (engine, workflow) = setup();
        let input = tokio_test::io::Builder::new().read(b"air\n").build();
        let mut output = Vec::new();

        let outcome = run_session(&engine, &workflow, BufReader::new(input), &mut output)
            .await
            .unwrap();

        assert!(outcome.is_none());
        assert!(String::from_utf8(output).unwrap().contains("How many?"));
    }
}
