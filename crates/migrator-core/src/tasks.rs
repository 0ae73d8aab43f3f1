//! Operation table and dispatcher.
//!
//! Front ends resolve a task name through [`TASKS`], run an optional
//! [`TaskHook`] first, and only then connect to the store. A hook that stops
//! the run produces [`TaskOutcome::Aborted`], which is not an error.

use crate::config::MigratorConfig;
use crate::error::{MigratorError, Result};
use crate::executor::MigrationsManager;
use crate::report::Reporter;
use std::sync::Arc;
use tracing::debug;

/// Name of the command-line program, used in hints and help output.
pub const PROGRAM_NAME: &str = "migrator";

/// Operations exposed to front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Status,
    Apply,
    Ignore,
    Rollback,
    Dump,
    Help,
}

/// One entry of the operation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpec {
    pub kind: TaskKind,
    pub name: &'static str,
    /// Run when no task name is given.
    pub is_default: bool,
    pub description: &'static str,
}

/// Every available operation, in help order.
pub const TASKS: &[TaskSpec] = &[
    TaskSpec {
        kind: TaskKind::Status,
        name: "status",
        is_default: true,
        description: "Show status of unregistered migrations (default)",
    },
    TaskSpec {
        kind: TaskKind::Apply,
        name: "apply",
        is_default: false,
        description: "Execute pending migrations, or only the named one",
    },
    TaskSpec {
        kind: TaskKind::Ignore,
        name: "ignore",
        is_default: false,
        description: "Register pending migrations without executing them",
    },
    TaskSpec {
        kind: TaskKind::Rollback,
        name: "rollback",
        is_default: false,
        description: "Roll back the named applied migration",
    },
    TaskSpec {
        kind: TaskKind::Dump,
        name: "dump",
        is_default: false,
        description: "Back up the store with the dump utility",
    },
    TaskSpec {
        kind: TaskKind::Help,
        name: "help",
        is_default: false,
        description: "Show help for migrations commands",
    },
];

/// Resolve a task name, or the default task when `name` is `None`.
pub fn find_task(name: Option<&str>) -> Result<&'static TaskSpec> {
    let found = match name {
        Some(name) => TASKS.iter().find(|task| task.name == name),
        None => TASKS.iter().find(|task| task.is_default),
    };

    found.ok_or_else(|| MigratorError::UnknownTask {
        name: name.unwrap_or_default().to_string(),
    })
}

/// Render the command line that runs `task` with `option`.
pub fn command_line(task: Option<&str>, option: Option<&str>) -> String {
    let mut command = PROGRAM_NAME.to_string();
    if let Some(task) = task {
        command.push(' ');
        command.push_str(task);
        if let Some(option) = option {
            command.push(' ');
            command.push_str(option);
        }
    }
    command
}

/// Help lines, one per task.
pub fn help_lines() -> Vec<String> {
    TASKS
        .iter()
        .map(|task| format!("{} - {}", command_line(Some(task.name), None), task.description))
        .collect()
}

/// Decision returned by a pre-task hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookDecision {
    Continue,
    /// End the run silently before anything else happens.
    Stop,
}

/// Called before every task, before the store is contacted.
pub trait TaskHook {
    fn before(&self, task: &TaskSpec, option: Option<&str>) -> HookDecision;
}

/// Hook that always continues.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHook;

impl TaskHook for NoHook {
    fn before(&self, _task: &TaskSpec, _option: Option<&str>) -> HookDecision {
        HookDecision::Continue
    }
}

/// How a dispatched task ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    /// The pre-task hook stopped the run.
    Aborted,
}

/// Resolves task names and runs them against a freshly connected manager.
pub struct Dispatcher<H: TaskHook = NoHook> {
    config: MigratorConfig,
    reporter: Arc<dyn Reporter>,
    hook: H,
}

impl Dispatcher<NoHook> {
    pub fn new(config: MigratorConfig, reporter: Arc<dyn Reporter>) -> Self {
        Self::with_hook(config, reporter, NoHook)
    }
}

impl<H: TaskHook> Dispatcher<H> {
    pub fn with_hook(config: MigratorConfig, reporter: Arc<dyn Reporter>, hook: H) -> Self {
        Self {
            config,
            reporter,
            hook,
        }
    }

    /// The operation table this dispatcher serves.
    pub fn tasks(&self) -> &'static [TaskSpec] {
        TASKS
    }

    /// Run `task` (or the default task) with an optional migration name.
    pub fn run(&self, task: Option<&str>, option: Option<&str>) -> Result<TaskOutcome> {
        let spec = find_task(task)?;

        if self.hook.before(spec, option) == HookDecision::Stop {
            debug!("Task {} stopped by hook", spec.name);
            return Ok(TaskOutcome::Aborted);
        }

        if spec.kind == TaskKind::Help {
            for line in help_lines() {
                self.reporter.info(&line);
            }
            return Ok(TaskOutcome::Completed);
        }

        if spec.kind == TaskKind::Rollback && option.is_none() {
            return Err(MigratorError::MissingArgument {
                task: spec.name.to_string(),
            });
        }

        let manager = MigrationsManager::connect(&self.config, self.reporter.clone())?;
        match spec.kind {
            TaskKind::Status => {
                manager.status()?;
            }
            TaskKind::Apply => {
                manager.apply(option)?;
            }
            TaskKind::Ignore => {
                manager.ignore(option)?;
            }
            TaskKind::Rollback => {
                // A missing name was rejected before connecting.
                if let Some(name) = option {
                    manager.rollback(name)?;
                }
            }
            TaskKind::Dump => {
                manager.dump()?;
            }
            // Answered above without a store.
            TaskKind::Help => {}
        }

        Ok(TaskOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryReporter;
    use std::cell::RefCell;
    use std::path::Path;
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> MigratorConfig {
        let mut config = MigratorConfig {
            migrations_dir: dir.join("migrations"),
            ..MigratorConfig::default()
        };
        config.store.database = Some(dir.join("app.db").to_string_lossy().to_string());
        config
    }

    /// Hook that stops selected tasks and remembers what it saw.
    struct BlockingHook {
        blocked: Vec<&'static str>,
        seen: RefCell<Vec<(String, Option<String>)>>,
    }

    impl TaskHook for BlockingHook {
        fn before(&self, task: &TaskSpec, option: Option<&str>) -> HookDecision {
            self.seen
                .borrow_mut()
                .push((task.name.to_string(), option.map(str::to_string)));
            if self.blocked.contains(&task.name) {
                HookDecision::Stop
            } else {
                HookDecision::Continue
            }
        }
    }

    #[test]
    fn test_exactly_one_default_task() {
        assert_eq!(TASKS.iter().filter(|t| t.is_default).count(), 1);
        assert_eq!(find_task(None).unwrap().kind, TaskKind::Status);
    }

    #[test]
    fn test_find_task_by_name() {
        for task in TASKS {
            assert_eq!(find_task(Some(task.name)).unwrap(), task);
        }
        assert!(matches!(
            find_task(Some("explode")),
            Err(MigratorError::UnknownTask { .. })
        ));
    }

    #[test]
    fn test_command_line() {
        assert_eq!(command_line(None, None), "migrator");
        assert_eq!(command_line(Some("apply"), None), "migrator apply");
        assert_eq!(
            command_line(Some("rollback"), Some("1_init.sql")),
            "migrator rollback 1_init.sql"
        );
        assert_eq!(command_line(None, Some("ignored")), "migrator");
    }

    #[test]
    fn test_help_lines_cover_every_task() {
        let lines = help_lines();
        assert_eq!(lines.len(), TASKS.len());
        assert_eq!(
            lines[0],
            "migrator status - Show status of unregistered migrations (default)"
        );
    }

    #[test]
    fn test_help_does_not_need_a_store() {
        let reporter = Arc::new(MemoryReporter::new());
        let dispatcher = Dispatcher::new(MigratorConfig::default(), reporter.clone());

        let outcome = dispatcher.run(Some("help"), None).unwrap();
        assert_eq!(outcome, TaskOutcome::Completed);
        assert_eq!(reporter.messages(), help_lines());
    }

    #[test]
    fn test_default_task_is_status() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());
        std::fs::create_dir_all(&config.migrations_dir).unwrap();
        std::fs::write(config.migrations_dir.join("1_init.sql"), "SELECT 1;").unwrap();
        let reporter = Arc::new(MemoryReporter::new());
        let dispatcher = Dispatcher::new(config, reporter.clone());

        assert_eq!(dispatcher.run(None, None).unwrap(), TaskOutcome::Completed);
        assert!(reporter.messages().contains(&"1_init.sql".to_string()));
    }

    #[test]
    fn test_hook_stop_aborts_before_connecting() {
        // No database configured: connecting would fail with a config error.
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(temp_dir.path());
        config.store.database = None;
        std::fs::create_dir_all(&config.migrations_dir).unwrap();
        let reporter = Arc::new(MemoryReporter::new());
        let hook = BlockingHook {
            blocked: vec!["rollback"],
            seen: RefCell::new(Vec::new()),
        };
        let dispatcher = Dispatcher::with_hook(config, reporter.clone(), hook);

        let outcome = dispatcher.run(Some("rollback"), Some("1_init.sql")).unwrap();
        assert_eq!(outcome, TaskOutcome::Aborted);
        assert!(reporter.messages().is_empty());
        assert_eq!(
            dispatcher.hook.seen.borrow().as_slice(),
            &[("rollback".to_string(), Some("1_init.sql".to_string()))]
        );

        let err = dispatcher.run(Some("status"), None).unwrap_err();
        assert!(matches!(err, MigratorError::Config { .. }));
    }

    #[test]
    fn test_rollback_requires_name() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());
        std::fs::create_dir_all(&config.migrations_dir).unwrap();
        let dispatcher = Dispatcher::new(config, Arc::new(MemoryReporter::new()));

        let err = dispatcher.run(Some("rollback"), None).unwrap_err();
        assert!(matches!(err, MigratorError::MissingArgument { .. }));
    }

    #[test]
    fn test_rollback_without_name_is_usage_error_before_connecting() {
        // Neither a database nor a migrations directory is configured.
        let temp_dir = TempDir::new().unwrap();
        let config = MigratorConfig {
            migrations_dir: temp_dir.path().join("absent"),
            ..MigratorConfig::default()
        };
        let dispatcher = Dispatcher::new(config, Arc::new(MemoryReporter::new()));

        let err = dispatcher.run(Some("rollback"), None).unwrap_err();
        assert!(matches!(err, MigratorError::MissingArgument { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_apply_and_rollback_through_dispatcher() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());
        std::fs::create_dir_all(&config.migrations_dir).unwrap();
        std::fs::write(
            config.migrations_dir.join("1_init.sql"),
            "-- migrate:up\nCREATE TABLE users (id INTEGER);\n-- migrate:down\nDROP TABLE users;\n",
        )
        .unwrap();
        let dispatcher = Dispatcher::new(config.clone(), Arc::new(MemoryReporter::new()));

        dispatcher.run(Some("apply"), None).unwrap();
        let manager =
            MigrationsManager::connect(&config, Arc::new(MemoryReporter::new())).unwrap();
        assert!(manager.pending().unwrap().is_empty());

        dispatcher.run(Some("rollback"), Some("1_init.sql")).unwrap();
        assert_eq!(manager.pending().unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_task_is_error() {
        let dispatcher = Dispatcher::new(MigratorConfig::default(), Arc::new(MemoryReporter::new()));
        let err = dispatcher.run(Some("migrate-everything"), None).unwrap_err();
        assert!(matches!(err, MigratorError::UnknownTask { .. }));
    }
}
