//! Validate command - loads a workflow document and prints its outline

use std::fmt::Write as _;

use anyhow::Context;
use clap::Args;
use tracing::info;

use crate::domain::workflow::Workflow;
use crate::infrastructure::logging;

/// Arguments for the validate command
#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Workflow document to validate (overrides config)
    #[arg(long)]
    pub workflow: Option<String>,

    /// Print only errors
    #[arg(long, short)]
    pub quiet: bool,
}

pub async fn run(args: ValidateArgs) -> anyhow::Result<()> {
    let config = super::load_config()?;
    logging::init_logging(&config.logging)?;

    let path = args.workflow.unwrap_or(config.workflow.path);
    let rulesets = crate::build_ruleset_registry()?;
    let workflow = crate::load_workflow(&path, &rulesets).context("Workflow is invalid")?;

    info!(workflow_id = %workflow.id(), path = %path, "Workflow is valid");

    if !args.quiet {
        print!("{}", outline(&workflow));
    }

    Ok(())
}

/// Human-readable outline of steps, questions and transitions
pub fn outline(workflow: &Workflow) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} ({} v{})",
        workflow.title(),
        workflow.id(),
        workflow.version()
    );

    for step in workflow.steps() {
        let _ = writeln!(out, "  [{}] {}", step.id, step.title);

        for question in &step.ask {
            let marker = if question.is_derived() {
                "="
            } else if question.required {
                "*"
            } else {
                "-"
            };
            let _ = writeln!(out, "    {} {}: {}", marker, question.id, question.label);
        }

        for directive in &step.compute {
            let _ = writeln!(out, "    compute {} using {}", directive.output, directive.using);
        }

        for rule in &step.next {
            let _ = writeln!(out, "    -> {} when {}", rule.goto, rule.when.as_str());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::{
        ComputeDirective, Condition, Question, QuestionType, Step, TransitionRule,
    };

    #[test]
    fn test_outline_lists_steps_and_questions() {
        let workflow = Workflow::new("wf", "Export")
            .with_version("2")
            .with_step(
                Step::new("basics", "Basics")
                    .with_question(
                        Question::new("mode", "Transport mode?", QuestionType::SingleSelect)
                            .required()
                            .with_options(["air", "sea"]),
                    )
                    .with_question(Question::new("notes", "Notes", QuestionType::LongText))
                    .with_compute(ComputeDirective::new("profile", "ruleset_x"))
                    .with_next(TransitionRule::new(
                        Condition::parse("mode == air").unwrap(),
                        "done",
                    )),
            );

        let text = outline(&workflow);

        assert!(text.starts_with("Export (wf v2)\n"));
        assert!(text.contains("  [basics] Basics\n"));
        assert!(text.contains("    * mode: Transport mode?\n"));
        assert!(text.contains("    - notes: Notes\n"));
        assert!(text.contains("    compute profile using ruleset_x\n"));
        assert!(text.contains("    -> done when mode == air\n"));
    }
}
