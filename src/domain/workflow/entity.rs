//! Workflow definition entities
//!
//! A workflow is an externally authored document: an ordered list of steps,
//! each asking questions, running rulesets and choosing the next step. It is
//! loaded once and shared read-only by every session.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::error::WorkflowError;
use super::expression::Condition;
use super::ruleset::{RulesetInputs, RulesetRegistry};
use super::state::Answers;

/// Reserved id of the terminal step
pub const DONE_STEP_ID: &str = "done";

fn default_version() -> String {
    "1".to_string()
}

/// Kind of answer a question collects
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleSelect,
    MultiSelect,
    Boolean,
    Integer,
    LongText,
    #[default]
    Text,
}

impl QuestionType {
    /// Whether the question must offer a list of options
    pub fn is_choice(&self) -> bool {
        matches!(self, Self::SingleSelect | Self::MultiSelect)
    }
}

/// Compiled `validate` regular expression
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AnswerPattern {
    source: String,
    regex: Regex,
}

impl AnswerPattern {
    pub fn new(source: impl Into<String>) -> Result<Self, regex::Error> {
        let source = source.into();
        let regex = Regex::new(&source)?;
        Ok(Self { source, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl PartialEq for AnswerPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl TryFrom<String> for AnswerPattern {
    type Error = regex::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AnswerPattern> for String {
    fn from(pattern: AnswerPattern) -> Self {
        pattern.source
    }
}

impl fmt::Display for AnswerPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// A single datum to collect from the user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    /// Unique id within the step; also the answer key
    pub id: String,

    /// Prompt shown to the user
    pub label: String,

    #[serde(rename = "type", default)]
    pub question_type: QuestionType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_if: Option<Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate: Option<AnswerPattern>,

    /// Dotted path into the computed map; derived questions are never asked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derive_from: Option<String>,
}

impl Question {
    pub fn new(id: impl Into<String>, label: impl Into<String>, question_type: QuestionType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            question_type,
            options: None,
            required: false,
            required_if: None,
            validate: None,
            derive_from: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_required_if(mut self, condition: Condition) -> Self {
        self.required_if = Some(condition);
        self
    }

    pub fn with_validate(mut self, pattern: AnswerPattern) -> Self {
        self.validate = Some(pattern);
        self
    }

    pub fn with_derive_from(mut self, path: impl Into<String>) -> Self {
        self.derive_from = Some(path.into());
        self
    }

    pub fn is_derived(&self) -> bool {
        self.derive_from.is_some()
    }

    /// Required when flagged, or when `required_if` holds for the answers
    pub fn is_required(&self, answers: &Answers) -> bool {
        self.required
            || self
                .required_if
                .as_ref()
                .is_some_and(|condition| condition.evaluate(answers))
    }
}

/// Runs a ruleset and stores its result under `output`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComputeDirective {
    pub output: String,

    pub using: String,

    /// Ruleset parameter name -> answer id. Empty passes every answer.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, String>,
}

impl ComputeDirective {
    pub fn new(output: impl Into<String>, using: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            using: using.into(),
            inputs: BTreeMap::new(),
        }
    }

    pub fn with_input(mut self, parameter: impl Into<String>, answer_id: impl Into<String>) -> Self {
        self.inputs.insert(parameter.into(), answer_id.into());
        self
    }

    /// Build the ruleset inputs from the current answers
    pub fn collect_inputs(&self, answers: &Answers) -> RulesetInputs {
        if self.inputs.is_empty() {
            return answers.clone();
        }

        self.inputs
            .iter()
            .map(|(parameter, answer_id)| {
                let value = answers.get(answer_id).cloned().unwrap_or(Value::Null);
                (parameter.clone(), value)
            })
            .collect()
    }
}

/// Conditional transition to another step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionRule {
    pub when: Condition,
    pub goto: String,
}

impl TransitionRule {
    pub fn new(when: Condition, goto: impl Into<String>) -> Self {
        Self {
            when,
            goto: goto.into(),
        }
    }

    pub fn always(goto: impl Into<String>) -> Self {
        Self::new(Condition::always(), goto)
    }

    pub fn matches(&self, answers: &Answers) -> bool {
        self.when.is_always() || self.when.evaluate(answers)
    }
}

/// Condition that ends the session early with advice for the user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdvisoryRule {
    pub when: Condition,

    #[serde(default)]
    pub advise: Vec<String>,
}

impl AdvisoryRule {
    pub fn new<I, S>(when: Condition, advise: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            when,
            advise: advise.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(title)) => vec![title],
        Some(OneOrMany::Many(titles)) => titles,
    })
}

/// A unit of the workflow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Step {
    pub id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ask: Vec<Question>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compute: Vec<ComputeDirective>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next: Vec<TransitionRule>,

    /// Exact document titles; accepts a single string or a list
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub guidance_ref: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance_query: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions_if: Vec<AdvisoryRule>,
}

impl Step {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ask: Vec::new(),
            compute: Vec::new(),
            next: Vec::new(),
            guidance_ref: Vec::new(),
            guidance_query: None,
            actions_if: Vec::new(),
        }
    }

    pub fn with_question(mut self, question: Question) -> Self {
        self.ask.push(question);
        self
    }

    pub fn with_compute(mut self, directive: ComputeDirective) -> Self {
        self.compute.push(directive);
        self
    }

    pub fn with_next(mut self, rule: TransitionRule) -> Self {
        self.next.push(rule);
        self
    }

    pub fn with_guidance_ref(mut self, title: impl Into<String>) -> Self {
        self.guidance_ref.push(title.into());
        self
    }

    pub fn with_guidance_query(mut self, query: impl Into<String>) -> Self {
        self.guidance_query = Some(query.into());
        self
    }

    pub fn with_advisory(mut self, rule: AdvisoryRule) -> Self {
        self.actions_if.push(rule);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.id == DONE_STEP_ID
    }

    /// First rule matching the answers, falling back to the terminal step
    pub fn resolve_next(&self, answers: &Answers) -> &str {
        self.next
            .iter()
            .find(|rule| rule.matches(answers))
            .map(|rule| rule.goto.as_str())
            .unwrap_or(DONE_STEP_ID)
    }
}

/// A versioned workflow definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workflow {
    /// Workflow identifier; defaults to the document's file stem when loaded
    #[serde(default)]
    id: String,

    title: String,

    #[serde(default = "default_version")]
    version: String,

    steps: Vec<Step>,
}

impl Workflow {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            version: default_version(),
            steps: Vec::new(),
        }
    }

    // Builder methods

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub(crate) fn set_default_id(&mut self, id: impl Into<String>) {
        if self.id.is_empty() {
            self.id = id.into();
        }
    }

    // Getters

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn first_step(&self) -> Option<&Step> {
        self.steps.first()
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Check the definition against itself and the registered rulesets
    ///
    /// Every problem found is reported in a single error.
    pub fn validate(&self, rulesets: &RulesetRegistry) -> Result<(), WorkflowError> {
        if self.steps.is_empty() {
            return Err(WorkflowError::empty_workflow(&self.id));
        }

        let mut issues = Vec::new();
        let mut step_ids = HashSet::new();

        let outputs: HashSet<&str> = self
            .steps
            .iter()
            .flat_map(|s| s.compute.iter().map(|c| c.output.as_str()))
            .collect();

        for step in &self.steps {
            if step.id.trim().is_empty() {
                issues.push("step with empty id".to_string());
            }
            if !step_ids.insert(step.id.as_str()) {
                issues.push(format!("duplicate step id '{}'", step.id));
            }

            let mut question_ids = HashSet::new();
            for question in &step.ask {
                if !question_ids.insert(question.id.as_str()) {
                    issues.push(format!(
                        "step '{}': duplicate question id '{}'",
                        step.id, question.id
                    ));
                }

                if question.question_type.is_choice()
                    && question.options.as_ref().is_none_or(|o| o.is_empty())
                {
                    issues.push(format!(
                        "step '{}': question '{}' requires options",
                        step.id, question.id
                    ));
                }

                if let Some(path) = &question.derive_from {
                    let root = path.split('.').next().unwrap_or_default();
                    if root.is_empty() || !outputs.contains(root) {
                        issues.push(format!(
                            "step '{}': question '{}' derives from '{}' which no compute directive produces",
                            step.id, question.id, path
                        ));
                    }
                }
            }

            for directive in &step.compute {
                if !rulesets.contains(&directive.using) {
                    issues.push(format!(
                        "step '{}': unknown ruleset '{}'",
                        step.id, directive.using
                    ));
                }
            }
        }

        for step in &self.steps {
            for rule in &step.next {
                if rule.goto != DONE_STEP_ID && !step_ids.contains(rule.goto.as_str()) {
                    issues.push(format!(
                        "step '{}': transition to unknown step '{}'",
                        step.id, rule.goto
                    ));
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(WorkflowError::invalid_definition(&self.id, issues))
        }
    }
}
