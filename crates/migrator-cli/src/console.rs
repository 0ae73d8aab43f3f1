//! Terminal output and the production guard hook.

use migrator_core::{HookDecision, Reporter, TaskHook, TaskKind, TaskSpec};
use std::error::Error;
use tracing::debug;

/// Prints report lines for a human at a terminal.
///
/// Info and warnings go to stdout; errors go to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn info(&self, message: &str) {
        println!("{}", message);
    }

    fn warn(&self, message: &str) {
        println!("  {}", message);
    }

    fn error(&self, message: &str) {
        eprintln!("{}", message);
    }
}

/// Render an error and its chain of causes, one cause per line.
///
/// A cause whose text already appears in the line above it is skipped.
pub fn render_error(err: &dyn Error) -> String {
    let mut rendered = err.to_string();
    let mut previous = rendered.clone();
    let mut cause = err.source();

    while let Some(inner) = cause {
        let text = inner.to_string();
        if !previous.contains(&text) {
            rendered.push_str("\n  caused by: ");
            rendered.push_str(&text);
        }
        previous = text;
        cause = inner.source();
    }

    rendered
}

/// Stops tasks that can lose applied state.
#[derive(Debug, Default, Clone, Copy)]
pub struct GuardHook;

impl GuardHook {
    fn blocks(kind: TaskKind) -> bool {
        matches!(kind, TaskKind::Rollback | TaskKind::Ignore)
    }
}

impl TaskHook for GuardHook {
    fn before(&self, task: &TaskSpec, _option: Option<&str>) -> HookDecision {
        if Self::blocks(task.kind) {
            debug!("Protected mode: skipping {}", task.name);
            HookDecision::Stop
        } else {
            HookDecision::Continue
        }
    }
}
