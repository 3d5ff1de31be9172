//! Step advance engine

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Number, Value};
use tracing::{debug, error, info};

use crate::domain::workflow::{
    is_answered, resolve_path, summarize, AdvanceOutcome, AdvisoryRule, Answers, Question,
    QuestionType, RulesetRegistry, SessionStatus, State, Step, UiDescriptor, Workflow,
    WorkflowEngine, WorkflowError, DONE_STEP_ID,
};
use crate::domain::guidance::Guidance;
use crate::infrastructure::guidance::GuidanceResolver;

/// Shown when an integer question receives something that is not a number
pub const INVALID_NUMBER_MESSAGE: &str = "Please enter a number.";

/// Shown when an answer does not match the question's `validate` pattern
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid format.";

const DEFAULT_ADVICE: &str = "The workflow cannot continue with the answers provided.";

/// Workflow engine backed by a ruleset registry and a guidance resolver
///
/// Holds no session data; every turn works on a copy of the caller's state.
#[derive(Debug, Clone)]
pub struct WorkflowEngineImpl {
    guidance: GuidanceResolver,
    rulesets: Arc<RulesetRegistry>,
}

impl WorkflowEngineImpl {
    pub fn new(guidance: GuidanceResolver, rulesets: Arc<RulesetRegistry>) -> Self {
        Self { guidance, rulesets }
    }

    pub fn rulesets(&self) -> &RulesetRegistry {
        &self.rulesets
    }

    /// Copy computed values into the answers of derived questions
    fn derive_fields(step: &Step, state: &mut State) {
        for question in &step.ask {
            let Some(path) = &question.derive_from else {
                continue;
            };

            if let Some(value) = resolve_path(&state.computed, path) {
                state.answers.insert(question.id.clone(), value.clone());
            }
        }
    }

    /// First required unanswered question, else the first unanswered one
    fn next_question<'a>(step: &'a Step, answers: &Answers) -> Option<&'a Question> {
        let pending = |q: &Question| !q.is_derived() && !is_answered(answers.get(&q.id));

        step.ask
            .iter()
            .find(|q| pending(q) && q.is_required(answers))
            .or_else(|| step.ask.iter().find(|q| pending(q)))
    }

    /// Run every compute directive of the step in order
    fn apply_computations(&self, step: &Step, state: &mut State) -> Result<(), WorkflowError> {
        for directive in &step.compute {
            let inputs = directive.collect_inputs(&state.answers);

            let value = self
                .rulesets
                .run(&directive.using, &inputs)
                .inspect_err(|e| {
                    error!(
                        step_id = %step.id,
                        ruleset = %directive.using,
                        error = %e,
                        "Ruleset execution failed"
                    );
                })?;

            debug!(
                step_id = %step.id,
                ruleset = %directive.using,
                output = %directive.output,
                "Computed ruleset output"
            );

            state.computed.insert(directive.output.clone(), value);
        }

        Ok(())
    }

    async fn ask(&self, step: &Step, question: &Question, state: State) -> AdvanceOutcome {
        let guidance = self.guidance.resolve(step).await;
        let ui = UiDescriptor::for_step(step, Some(question), guidance.help.clone());

        AdvanceOutcome::new(state, ui, SessionStatus::AwaitingAnswer, guidance)
    }

    async fn reject(
        &self,
        step: &Step,
        question: &Question,
        state: State,
        message: &str,
    ) -> AdvanceOutcome {
        let mut outcome = self.ask(step, question, state).await;
        outcome.ui = outcome.ui.with_error(message);
        outcome
    }

    async fn computing(&self, step: &Step, state: State) -> AdvanceOutcome {
        let guidance = self.guidance.resolve(step).await;
        let ui = UiDescriptor::for_step(step, None, guidance.help.clone());

        AdvanceOutcome::new(state, ui, SessionStatus::Computing, guidance)
    }

    fn terminate(
        &self,
        workflow: &Workflow,
        step: &Step,
        rule: &AdvisoryRule,
        state: State,
    ) -> AdvanceOutcome {
        info!(
            workflow_id = %workflow.id(),
            step_id = %step.id,
            condition = %rule.when,
            "Advisory rule terminated session"
        );

        let message = if rule.advise.is_empty() {
            DEFAULT_ADVICE.to_string()
        } else {
            rule.advise.join(" ")
        };

        let summary = summarize(workflow, &state, &step.id).with_message(message);
        let ui = UiDescriptor::for_step(step, None, None);

        AdvanceOutcome::new(state, ui, SessionStatus::Terminated, Guidance::none())
            .with_summary(summary)
            .with_advice(rule.advise.clone())
    }

    async fn finish(&self, workflow: &Workflow, state: State) -> AdvanceOutcome {
        let summary = summarize(workflow, &state, DONE_STEP_ID);

        let (ui, guidance) = match workflow.step(DONE_STEP_ID) {
            Some(done) => {
                let guidance = self.guidance.resolve(done).await;
                (
                    UiDescriptor::for_step(done, None, guidance.help.clone()),
                    guidance,
                )
            }
            None => (
                UiDescriptor {
                    step_id: DONE_STEP_ID.to_string(),
                    title: workflow.title().to_string(),
                    ..Default::default()
                },
                Guidance::none(),
            ),
        };

        AdvanceOutcome::new(state, ui, SessionStatus::Done, guidance).with_summary(summary)
    }
}

/// Check an answer against its question, returning the value to record
///
/// The `validate` pattern sees the raw input, before any number conversion.
fn validate_answer(question: &Question, value: Value) -> Result<Value, &'static str> {
    if let Some(pattern) = &question.validate {
        if !pattern.is_match(&raw_text(&value)) {
            return Err(INVALID_FORMAT_MESSAGE);
        }
    }

    match question.question_type {
        QuestionType::Integer => parse_number(&value).ok_or(INVALID_NUMBER_MESSAGE),
        _ => Ok(value),
    }
}

/// Integers are kept exact; other finite numbers are accepted as floats
fn parse_number(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<i64>() {
                return Some(Value::from(n));
            }
            s.parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .and_then(Number::from_f64)
                .map(Value::Number)
        }
        _ => None,
    }
}

fn raw_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl WorkflowEngine for WorkflowEngineImpl {
    async fn start_session(&self, workflow: &Workflow) -> Result<AdvanceOutcome, WorkflowError> {
        let first = workflow
            .first_step()
            .ok_or_else(|| WorkflowError::empty_workflow(workflow.id()))?;

        debug!(
            workflow_id = %workflow.id(),
            step_id = %first.id,
            "Starting workflow session"
        );

        let mut state = State::new(&first.id);
        Self::derive_fields(first, &mut state);

        match Self::next_question(first, &state.answers) {
            Some(question) => Ok(self.ask(first, question, state).await),
            None => Ok(self.computing(first, state).await),
        }
    }

    async fn advance(
        &self,
        workflow: &Workflow,
        state: &State,
        input: Option<Value>,
    ) -> Result<AdvanceOutcome, WorkflowError> {
        let mut state = state.clone();

        if state.is_done() {
            return Ok(self.finish(workflow, state).await);
        }

        let step = workflow
            .step(&state.current_step_id)
            .ok_or_else(|| WorkflowError::step_not_found(&state.current_step_id))?;

        Self::derive_fields(step, &mut state);

        let input = input.filter(|v| !v.is_null());

        if let Some(question) = Self::next_question(step, &state.answers) {
            let Some(value) = input else {
                return Ok(self.ask(step, question, state).await);
            };

            let value = match validate_answer(question, value) {
                Ok(value) => value,
                Err(message) => {
                    debug!(
                        step_id = %step.id,
                        question_id = %question.id,
                        error = message,
                        "Answer rejected"
                    );
                    return Ok(self.reject(step, question, state, message).await);
                }
            };

            state.answers.insert(question.id.clone(), value);

            if let Some(rule) = step
                .actions_if
                .iter()
                .find(|rule| rule.when.evaluate(&state.answers))
            {
                return Ok(self.terminate(workflow, step, rule, state));
            }

            if let Some(next) = Self::next_question(step, &state.answers) {
                return Ok(self.ask(step, next, state).await);
            }
        }

        self.apply_computations(step, &mut state)?;

        let next_id = step.resolve_next(&state.answers).to_string();
        state.push_history(&step.id);

        info!(
            workflow_id = %workflow.id(),
            from = %step.id,
            to = %next_id,
            "Step transition"
        );

        state.current_step_id = next_id;

        if state.is_done() {
            return Ok(self.finish(workflow, state).await);
        }

        let next_step = workflow
            .step(&state.current_step_id)
            .ok_or_else(|| WorkflowError::step_not_found(&state.current_step_id))?;

        Self::derive_fields(next_step, &mut state);

        match Self::next_question(next_step, &state.answers) {
            Some(question) => Ok(self.ask(next_step, question, state).await),
            None => Ok(self.computing(next_step, state).await),
        }
    }
}
