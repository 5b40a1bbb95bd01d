//! Output schemas handed to the agent executor.
//!
//! Every structured executor call declares one of these JSON Schemas so the
//! agent is constrained to a parseable shape.

use serde_json::{json, Value};

/// Schema for task decomposition output: a list of planned tasks plus an
/// overall summary. Dependencies reference other tasks by exact title.
pub fn task_plan_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "tasks": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "description": "Short task title" },
                        "description": {
                            "type": "string",
                            "description": "Detailed task description with instructions"
                        },
                        "role": {
                            "type": "string",
                            "enum": ["investigator", "implementer", "tester"],
                            "description": "Worker role to assign this task to"
                        },
                        "dependencies": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Titles of tasks that must complete before this one (use exact titles)"
                        }
                    },
                    "required": ["title", "description", "role", "dependencies"]
                },
                "description": "List of tasks to execute"
            },
            "summary": {
                "type": "string",
                "description": "Brief summary of the overall plan"
            }
        },
        "required": ["tasks", "summary"]
    })
}

/// Schema for a worker's task execution output.
pub fn task_result_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "output": {
                "type": "string",
                "description": "Main output/result of the task"
            },
            "artifacts": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "path": { "type": "string", "description": "File path" },
                        "action": {
                            "type": "string",
                            "enum": ["created", "modified", "deleted"]
                        }
                    },
                    "required": ["path", "action"]
                },
                "description": "Files created, modified, or deleted"
            },
            "context_contribution": {
                "type": "string",
                "description": "Key information discovered that other workers should know about"
            }
        },
        "required": ["output", "artifacts", "context_contribution"]
    })
}

/// Schema for the directive compliance judgment.
pub fn compliance_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "compliant": {
                "type": "boolean",
                "description": "Whether the output satisfies every directive"
            },
            "violations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "directive": { "type": "string", "description": "The violated directive" },
                        "reason": { "type": "string", "description": "Why it is violated" }
                    },
                    "required": ["directive", "reason"]
                },
                "description": "Violated directives, empty when compliant"
            },
            "summary": {
                "type": "string",
                "description": "One-line judgment summary"
            }
        },
        "required": ["compliant", "violations", "summary"]
    })
}

/// Schema for operator input classification.
pub fn classification_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "target": {
                "type": "string",
                "enum": ["coordinator", "worker"],
                "description": "Who should handle this input"
            },
            "response": {
                "type": "string",
                "description": "Direct answer when target is coordinator, else empty"
            }
        },
        "required": ["target", "response"]
    })
}
