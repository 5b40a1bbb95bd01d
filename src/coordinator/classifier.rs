//! Operator input classification.
//!
//! Free-form operator input is either a question the coordinator can answer
//! directly (status, explanation, opinion) or a work request that should be
//! decomposed into tasks. A single cheap executor call decides which. When
//! the call fails in any way, the input is treated as a work request;
//! mis-routing a question into decomposition wastes a plan, but swallowing
//! a work request would stall the session.

use std::path::PathBuf;

use serde::Deserialize;

use crate::hlog_debug;
use crate::schemas::classification_schema;
use crate::worker::runner::{parse_structured, AgentRunner, RunRequest};

const CLASSIFIER_SYSTEM: &str = "You are the coordinator of a team of worker agents operating \
on a codebase. Classify the operator's input. Reply with target \"coordinator\" when the input \
is a question or comment you can answer directly from the conversation and shared context, and \
put your answer in the response field. Reply with target \"worker\" when the input asks for \
work to be done on the codebase (investigation, implementation, or testing), leaving the \
response field empty.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationTarget {
    Coordinator,
    Worker,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Classification {
    pub target: ClassificationTarget,
    #[serde(default)]
    pub response: String,
}

impl Classification {
    fn work_request() -> Self {
        Self {
            target: ClassificationTarget::Worker,
            response: String::new(),
        }
    }
}

pub struct InputClassifier {
    runner: AgentRunner,
}

impl InputClassifier {
    pub fn new(runner: AgentRunner) -> Self {
        Self { runner }
    }

    /// Classify one line of operator input.
    ///
    /// Never errors: any executor or parse failure falls back to the
    /// work-request classification.
    pub async fn classify(
        &self,
        input: &str,
        context_summary: Option<&str>,
        project_notes: Option<&str>,
        cwd: Option<PathBuf>,
    ) -> Classification {
        let mut prompt = format!("## Operator Input\n{}", input);
        if let Some(summary) = context_summary {
            prompt.push_str("\n\n## Shared Context\n");
            prompt.push_str(summary);
        }
        if let Some(notes) = project_notes {
            prompt.push_str("\n\n## Project Notes (CLAUDE.md)\n");
            prompt.push_str(notes);
        }

        let outcome = self
            .runner
            .run(&RunRequest {
                prompt,
                system_prompt: Some(CLASSIFIER_SYSTEM.to_string()),
                json_schema: Some(classification_schema()),
                max_turns: Some(1),
                cwd,
            })
            .await;

        let outcome = match outcome {
            Ok(outcome) if outcome.is_success() => outcome,
            Ok(outcome) => {
                hlog_debug!(
                    "classifier exited {}, defaulting to work request",
                    outcome.exit_code
                );
                return Classification::work_request();
            }
            Err(e) => {
                hlog_debug!("classifier failed ({}), defaulting to work request", e);
                return Classification::work_request();
            }
        };

        match parse_structured::<Classification>(&outcome.output) {
            Ok(classification) => classification,
            Err(e) => {
                hlog_debug!("classification unparseable ({}), defaulting to work request", e);
                Classification::work_request()
            }
        }
    }
}
