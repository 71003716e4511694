//! Goal and task registry.
//!
//! A goal is a user-facing verb (`list`, `test`); each goal carries an
//! ordered list of named tasks. Tasks are installed with an explicit
//! placement so later registrations can slot in relative to earlier ones.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::EngineError;

/// One unit of work inside a goal.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: String,
    pub description: Option<String>,
}

impl Task {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            description: None,
        }
    }

    pub fn with_description(name: &str, description: &str) -> Self {
        Self {
            name: name.to_owned(),
            description: Some(description.to_owned()),
        }
    }
}

/// Where to place a task in its goal's ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement<'a> {
    /// Append after all installed tasks.
    Last,
    /// Prepend before all installed tasks.
    First,
    /// Insert immediately before the named task.
    Before(&'a str),
    /// Insert immediately after the named task.
    After(&'a str),
    /// Drop every installed task and start over with this one.
    Replace,
}

/// A named goal with its ordered tasks.
#[derive(Debug, Clone)]
pub struct Goal {
    name: String,
    description: Option<String>,
    tasks: Vec<Task>,
}

impl Goal {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            description: None,
            tasks: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The goal's description: an explicitly set one, or the description
    /// of a task sharing the goal's name.
    pub fn description(&self) -> Option<&str> {
        if let Some(description) = &self.description {
            return Some(description);
        }
        self.tasks
            .iter()
            .find(|t| t.name == self.name)
            .and_then(|t| t.description.as_deref())
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Whether the goal has any tasks to run.
    pub fn active(&self) -> bool {
        !self.tasks.is_empty()
    }
}

/// The option scope of a task: `goal.task`, collapsed to just the goal
/// name when the task is the goal's namesake.
pub fn scope(goal: &str, task: &str) -> String {
    if goal == task {
        goal.to_owned()
    } else {
        format!("{goal}.{task}")
    }
}

/// Registry of all known goals, keyed by name.
#[derive(Debug, Default)]
pub struct GoalRegistry {
    goals: BTreeMap<String, Goal>,
}

impl GoalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a task into a goal, creating the goal on first use.
    ///
    /// A `Before`/`After` placement naming a task the goal does not have
    /// appends at the end instead.
    ///
    /// # Errors
    /// Returns an error for an invalid goal name or a task of the same
    /// name already installed.
    pub fn install(
        &mut self,
        goal: &str,
        task: Task,
        placement: Placement<'_>,
    ) -> Result<(), EngineError> {
        validate_goal_name(goal)?;
        let entry = self
            .goals
            .entry(goal.to_owned())
            .or_insert_with(|| Goal::new(goal));

        if matches!(placement, Placement::Replace) {
            entry.tasks.clear();
        }

        if entry.tasks.iter().any(|t| t.name == task.name) {
            return Err(EngineError::DuplicateTask {
                goal: goal.to_owned(),
                task: task.name,
            });
        }

        let index = match placement {
            Placement::Last | Placement::Replace => entry.tasks.len(),
            Placement::First => 0,
            Placement::Before(anchor) => {
                Self::position(entry, anchor).unwrap_or(entry.tasks.len())
            }
            Placement::After(anchor) => Self::position(entry, anchor)
                .map_or(entry.tasks.len(), |i| i.saturating_add(1)),
        };
        entry.tasks.insert(index, task);
        Ok(())
    }

    fn position(goal: &Goal, anchor: &str) -> Option<usize> {
        goal.tasks.iter().position(|t| t.name == anchor)
    }

    /// Remove an installed task from a goal.
    ///
    /// # Errors
    /// Returns an error if the goal has no task of that name.
    pub fn uninstall(&mut self, goal: &str, task: &str) -> Result<(), EngineError> {
        let missing = || EngineError::UnknownTask {
            goal: goal.to_owned(),
            task: task.to_owned(),
        };
        let entry = self.goals.get_mut(goal).ok_or_else(missing)?;
        let index = Self::position(entry, task).ok_or_else(missing)?;
        entry.tasks.remove(index);
        Ok(())
    }

    /// Set a goal's own description, creating the goal if needed.
    ///
    /// # Errors
    /// Returns an error for an invalid goal name.
    pub fn describe(&mut self, goal: &str, description: &str) -> Result<(), EngineError> {
        validate_goal_name(goal)?;
        let entry = self
            .goals
            .entry(goal.to_owned())
            .or_insert_with(|| Goal::new(goal));
        entry.description = Some(description.to_owned());
        Ok(())
    }

    pub fn get(&self, goal: &str) -> Option<&Goal> {
        self.goals.get(goal)
    }

    /// All active goals in name order. A goal with a description but no
    /// installed tasks is not listed.
    pub fn all(&self) -> impl Iterator<Item = &Goal> {
        self.goals.values().filter(|g| g.active())
    }

    /// Look up a goal, erroring when it is not registered.
    ///
    /// # Errors
    /// Returns an error for an unregistered goal name.
    pub fn require(&self, goal: &str) -> Result<&Goal, EngineError> {
        self.get(goal).ok_or_else(|| EngineError::UnknownGoal {
            goal: goal.to_owned(),
        })
    }
}

fn validate_goal_name(goal: &str) -> Result<(), EngineError> {
    let ok = !goal.is_empty()
        && goal
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if ok {
        Ok(())
    } else {
        Err(EngineError::InvalidGoalName {
            goal: goal.to_owned(),
        })
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description() {
            Some(description) => write!(f, "{}: {description}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// The registry with every built-in goal installed.
///
/// # Errors
/// Never fails in practice; the error type is shared with user-driven
/// installation.
pub fn default_registry() -> Result<GoalRegistry, EngineError> {
    let mut registry = GoalRegistry::new();
    registry.install(
        "list",
        Task::with_description("list", "List the targets matching a spec"),
        Placement::Last,
    )?;
    registry.install(
        "dependencies",
        Task::with_description("dependencies", "Print the dependencies of a target"),
        Placement::Last,
    )?;
    registry.install(
        "dependees",
        Task::with_description("dependees", "Print the targets that depend on a target"),
        Placement::Last,
    )?;
    registry.install(
        "filedeps",
        Task::with_description("filedeps", "Print the source files a target covers"),
        Placement::Last,
    )?;
    registry.install(
        "validate",
        Task::with_description("validate", "Check BUILD files and the dependency graph"),
        Placement::Last,
    )?;
    registry.install(
        "test",
        Task::with_description("test", "Run the tests targets matching a spec"),
        Placement::Last,
    )?;
    registry.install(
        "goals",
        Task::with_description("goals", "List all registered goals"),
        Placement::Last,
    )?;
    Ok(registry)
}
