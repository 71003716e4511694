//! Workspace scanning, dependency resolution, goal registry, and test
//! execution for Quarry.

pub mod error;
pub mod goal;
pub mod process;
pub mod resolve;
pub mod testrun;
pub mod workspace;

pub use error::EngineError;
pub use goal::{default_registry, Goal, GoalRegistry, Placement, Task};
pub use process::{ProcessRequest, ProcessResult};
pub use resolve::DependencyGraph;
pub use testrun::{run_tests, TestOptions, TestOutcome, TestReport};
pub use workspace::{Target, Workspace};
