//! Prompt assembly for every executor call.
//!
//! Keeps all prompt text in one place: per-role system prompts, the task
//! execution prompt, the planning prompt, and the compliance prompt.

use crate::core::{SharedContext, Task, WorkerRole};

const INVESTIGATOR_SYSTEM: &str = "\
You are an Investigator agent on a multi-agent development team.
Your job is to analyze code, research project structure, and gather information.
You should:
- Read and understand code thoroughly
- Report findings clearly and concisely
- Identify key patterns, dependencies, and architectural decisions
- Provide actionable information for implementers
Do NOT modify any files. Only read and analyze.";

const IMPLEMENTER_SYSTEM: &str = "\
You are an Implementer agent on a multi-agent development team.
Your job is to write and modify code based on instructions and context from investigators.
You should:
- Write clean, well-structured code
- Follow existing project conventions
- Create or modify only the files needed
- Report what files you created or changed
Focus on implementation quality and correctness.";

const TESTER_SYSTEM: &str = "\
You are a Tester agent on a multi-agent development team.
Your job is to write tests and verify implementations.
You should:
- Write comprehensive test cases
- Run existing tests and report results
- Identify edge cases and potential issues
- Verify that implementations match requirements
Focus on test coverage and finding bugs.";

pub const PLANNER_SYSTEM: &str = "\
You are a task planning coordinator. Break user requests into concrete, \
actionable tasks for a development team. Output valid JSON matching the \
provided schema.";

pub const COMPLIANCE_SYSTEM: &str = "\
You are a compliance checker. Evaluate whether a task output complies with \
the given directives. Output valid JSON matching the provided schema.";

/// System prompt for a worker role.
pub fn role_system_prompt(role: WorkerRole) -> &'static str {
    match role {
        WorkerRole::Investigator => INVESTIGATOR_SYSTEM,
        WorkerRole::Implementer => IMPLEMENTER_SYSTEM,
        WorkerRole::Tester => TESTER_SYSTEM,
    }
}

/// The prompt a worker sends to execute one task: the task itself, its
/// context blob, the shared context so far, and any active directives.
pub fn build_task_prompt(
    task: &Task,
    shared_context: &SharedContext,
    directives: &[String],
) -> String {
    let mut prompt = format!("# Task: {}\n\n{}\n", task.title, task.description);

    if !task.context.is_empty() {
        prompt.push_str(&format!("\n## Additional Context\n{}\n", task.context));
    }

    if !shared_context.is_empty() {
        prompt.push_str("\n## Shared Context from Other Agents\n");
        for entry in &shared_context.entries {
            prompt.push_str(&format!(
                "\n### From {} ({})\n{}\n",
                entry.from, entry.task_id, entry.summary
            ));
        }
    }

    if !directives.is_empty() {
        prompt.push_str("\n## Coordinator Directives\n");
        for directive in directives {
            prompt.push_str(&format!("- {}\n", directive));
        }
    }

    prompt
}

/// The coordinator's decomposition prompt.
pub fn build_planning_prompt(
    request: &str,
    context_summary: Option<&str>,
    directives: &[String],
) -> String {
    let mut prompt = format!("# User Request\n\n{}\n\n", request);
    prompt.push_str("Break this request into concrete tasks for a development team.\n");
    prompt.push_str("Available roles:\n");
    prompt.push_str("- investigator: Code analysis, research, information gathering (read-only)\n");
    prompt.push_str("- implementer: Code writing and modification\n");
    prompt.push_str("- tester: Test writing and execution\n\n");
    prompt.push_str(
        "Consider task dependencies - investigation should come before implementation, \
         and testing after implementation.\n",
    );
    prompt.push_str(
        "Use the exact task title in the dependencies array to reference dependent tasks.\n",
    );

    if let Some(summary) = context_summary {
        prompt.push_str(&format!("\n## Current Project Context\n{}\n", summary));
    }

    if !directives.is_empty() {
        prompt.push_str("\n## Coordinator Directives\n");
        for directive in directives {
            prompt.push_str(&format!("- {}\n", directive));
        }
    }

    prompt
}

/// The compliance judgment prompt: directives, the task, its output, and
/// judging instructions.
pub fn build_compliance_prompt(task: &Task, output: &str, directives: &[String]) -> String {
    let directive_list = directives
        .iter()
        .enumerate()
        .map(|(i, d)| format!("{}. {}", i + 1, d))
        .collect::<Vec<_>>()
        .join("\n");

    [
        "## Directives".to_string(),
        directive_list,
        String::new(),
        "## Task".to_string(),
        format!("Title: {}", task.title),
        format!("Description: {}", task.description),
        String::new(),
        "## Task Output".to_string(),
        output.to_string(),
        String::new(),
        "## Instructions".to_string(),
        "Check whether the task output complies with ALL of the directives above.".to_string(),
        "For each violated directive, provide the directive text and reason for violation."
            .to_string(),
        "If all directives are satisfied, set compliant to true with an empty violations array."
            .to_string(),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ContextEntry, TaskId};

    fn sample_task() -> Task {
        Task::new(
            "add login endpoint",
            "Implement POST /login",
            WorkerRole::Implementer,
            "implementer-1",
            vec![],
        )
    }

    #[test]
    fn test_role_system_prompts_differ() {
        let prompts: Vec<&str> = WorkerRole::ALL.iter().map(|r| role_system_prompt(*r)).collect();
        assert!(prompts[0].contains("Investigator"));
        assert!(prompts[1].contains("Implementer"));
        assert!(prompts[2].contains("Tester"));
        assert_ne!(prompts[0], prompts[1]);
    }

    #[test]
    fn test_investigator_is_read_only() {
        assert!(role_system_prompt(WorkerRole::Investigator).contains("Do NOT modify"));
    }

    #[test]
    fn test_task_prompt_minimal() {
        let task = sample_task();
        let prompt = build_task_prompt(&task, &SharedContext::default(), &[]);
        assert!(prompt.starts_with("# Task: add login endpoint"));
        assert!(prompt.contains("Implement POST /login"));
        assert!(!prompt.contains("Shared Context"));
        assert!(!prompt.contains("Directives"));
    }

    #[test]
    fn test_task_prompt_includes_task_context() {
        let mut task = sample_task();
        task.context = "the auth module is src/auth.rs".to_string();
        let prompt = build_task_prompt(&task, &SharedContext::default(), &[]);
        assert!(prompt.contains("## Additional Context"));
        assert!(prompt.contains("src/auth.rs"));
    }

    #[test]
    fn test_task_prompt_includes_shared_context_and_directives() {
        let task = sample_task();
        let ctx = SharedContext {
            entries: vec![ContextEntry {
                from: "investigator-1".to_string(),
                task_id: TaskId::from("task-1"),
                summary: "use axum".to_string(),
            }],
        };
        let directives = vec!["write idiomatic code".to_string()];
        let prompt = build_task_prompt(&task, &ctx, &directives);

        assert!(prompt.contains("### From investigator-1 (task-1)"));
        assert!(prompt.contains("use axum"));
        assert!(prompt.contains("## Coordinator Directives"));
        assert!(prompt.contains("- write idiomatic code"));
    }

    #[test]
    fn test_planning_prompt_lists_roles() {
        let prompt = build_planning_prompt("add login", None, &[]);
        assert!(prompt.contains("# User Request"));
        assert!(prompt.contains("- investigator:"));
        assert!(prompt.contains("- implementer:"));
        assert!(prompt.contains("- tester:"));
        assert!(prompt.contains("exact task title"));
        assert!(!prompt.contains("Current Project Context"));
    }

    #[test]
    fn test_planning_prompt_with_context_and_directives() {
        let prompt = build_planning_prompt(
            "add login",
            Some("[investigator-1] auth is in src/auth.rs"),
            &["no new dependencies".to_string()],
        );
        assert!(prompt.contains("## Current Project Context"));
        assert!(prompt.contains("auth is in src/auth.rs"));
        assert!(prompt.contains("- no new dependencies"));
    }

    #[test]
    fn test_compliance_prompt_numbers_directives() {
        let task = sample_task();
        let prompt = build_compliance_prompt(
            &task,
            "did the thing",
            &["directive one".to_string(), "directive two".to_string()],
        );
        assert!(prompt.contains("1. directive one"));
        assert!(prompt.contains("2. directive two"));
        assert!(prompt.contains("## Task Output\ndid the thing"));
        assert!(prompt.contains("complies with ALL"));
    }
}
