//! Dependency resolution over declared targets: reference checking, the
//! library/tests direction rule, cycle detection, and graph walks.

use std::collections::{BTreeMap, BTreeSet};

use quarry_address::Address;
use quarry_buildfile::TargetKind;

use crate::error::EngineError;
use crate::workspace::Workspace;

/// The checked dependency graph of a workspace.
///
/// Building the graph parses every dependency reference, verifies it names
/// a declared target, and enforces that libraries never depend on tests
/// targets. Cycles are reported by the walk methods, which visit every
/// edge they traverse.
#[derive(Debug)]
pub struct DependencyGraph {
    /// Direct dependencies per address, in declaration order.
    edges: BTreeMap<Address, Vec<Address>>,
    /// Direct dependees per address, in address order.
    reverse: BTreeMap<Address, Vec<Address>>,
}

impl DependencyGraph {
    /// Build and check the graph for the whole workspace.
    ///
    /// # Errors
    /// Returns an error for unparseable references, references to missing
    /// targets, or a library depending on a tests target.
    pub fn build(workspace: &Workspace) -> Result<Self, EngineError> {
        let mut edges: BTreeMap<Address, Vec<Address>> = BTreeMap::new();
        let mut reverse: BTreeMap<Address, Vec<Address>> = BTreeMap::new();

        for target in workspace.targets() {
            let mut deps = Vec::with_capacity(target.decl.dependencies.len());
            for dep in &target.decl.dependencies {
                let dep_address = Address::parse(dep, &target.address.spec_path).map_err(
                    |source| EngineError::InvalidDependency {
                        from: target.address.to_string(),
                        dep: dep.clone(),
                        source,
                    },
                )?;
                let Some(dep_target) = workspace.get(&dep_address) else {
                    return Err(EngineError::UnknownDependency {
                        from: target.address.to_string(),
                        dep: dep.clone(),
                    });
                };
                // Tests may depend on anything; libraries only on libraries.
                if target.kind() == TargetKind::Library && dep_target.kind() == TargetKind::Tests
                {
                    return Err(EngineError::LibraryDependsOnTests {
                        from: target.address.to_string(),
                        to: dep_address.to_string(),
                    });
                }
                reverse
                    .entry(dep_address.clone())
                    .or_default()
                    .push(target.address.clone());
                deps.push(dep_address);
            }
            edges.insert(target.address.clone(), deps);
        }

        for dependees in reverse.values_mut() {
            dependees.sort();
        }

        Ok(Self { edges, reverse })
    }

    /// Direct dependencies of `address`, in declaration order.
    pub fn dependencies(&self, address: &Address) -> &[Address] {
        self.edges.get(address).map_or(&[], Vec::as_slice)
    }

    /// Direct dependees of `address`, in address order.
    pub fn dependees(&self, address: &Address) -> &[Address] {
        self.reverse.get(address).map_or(&[], Vec::as_slice)
    }

    /// The transitive closure of `roots`, dependencies first, each address
    /// once. The roots themselves are included.
    ///
    /// # Errors
    /// Returns an error if the reachable subgraph contains a cycle.
    pub fn transitive_closure(&self, roots: &[Address]) -> Result<Vec<Address>, EngineError> {
        self.walk(roots, |graph, address| graph.dependencies(address))
    }

    /// Every address that transitively depends on one of `roots`, in
    /// postorder. The roots themselves are included.
    ///
    /// # Errors
    /// Returns an error if the reachable subgraph contains a cycle.
    pub fn transitive_dependees(&self, roots: &[Address]) -> Result<Vec<Address>, EngineError> {
        self.walk(roots, |graph, address| graph.dependees(address))
    }

    /// Check the entire graph for cycles.
    ///
    /// # Errors
    /// Returns an error naming the cycle, rendered `a -> b -> a`.
    pub fn check_acyclic(&self) -> Result<(), EngineError> {
        let roots: Vec<Address> = self.edges.keys().cloned().collect();
        self.walk(&roots, |graph, address| graph.dependencies(address))?;
        Ok(())
    }

    /// Postorder DFS with three-color marking (white, gray in-stack, black
    /// done) over whichever edge direction `neighbors` selects.
    fn walk<'a, F>(&'a self, roots: &[Address], neighbors: F) -> Result<Vec<Address>, EngineError>
    where
        F: Fn(&'a Self, &Address) -> &'a [Address],
    {
        let mut color: BTreeMap<Address, u8> = BTreeMap::new();
        let mut order: Vec<Address> = Vec::new();
        let mut stack: Vec<Address> = Vec::new();
        let mut seen: BTreeSet<&Address> = BTreeSet::new();

        for root in roots {
            if seen.insert(root) {
                self.visit(root, &neighbors, &mut color, &mut stack, &mut order)?;
            }
        }
        Ok(order)
    }

    fn visit<'a, F>(
        &'a self,
        address: &Address,
        neighbors: &F,
        color: &mut BTreeMap<Address, u8>,
        stack: &mut Vec<Address>,
        order: &mut Vec<Address>,
    ) -> Result<(), EngineError>
    where
        F: Fn(&'a Self, &Address) -> &'a [Address],
    {
        match color.get(address).copied().unwrap_or(0) {
            2 => return Ok(()),
            1 => {
                stack.push(address.clone());
                let start = stack
                    .iter()
                    .position(|a| a == address)
                    .unwrap_or(0);
                let cycle = stack
                    .get(start..)
                    .unwrap_or(stack.as_slice())
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(EngineError::DependencyCycle { cycle });
            }
            _ => {}
        }

        color.insert(address.clone(), 1);
        stack.push(address.clone());

        for next in neighbors(self, address) {
            self.visit(next, neighbors, color, stack, order)?;
        }

        color.insert(address.clone(), 2);
        stack.pop();
        order.push(address.clone());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;
    use std::path::Path;

    use quarry_config::WorkspaceConfig;

    use super::*;

    fn write_build(root: &Path, dir: &str, content: &str) {
        let dir_path = root.join(dir);
        fs::create_dir_all(&dir_path).unwrap();
        fs::write(dir_path.join("BUILD"), content).unwrap();
    }

    fn workspace(root: &Path) -> Workspace {
        Workspace::scan(root, WorkspaceConfig::default()).unwrap()
    }

    fn addr(s: &str) -> Address {
        Address::parse(s, "").unwrap()
    }

    #[test]
    fn empty_workspace_builds() {
        let tmp = tempfile::tempdir().unwrap();
        let graph = DependencyGraph::build(&workspace(tmp.path())).unwrap();
        graph.check_acyclic().unwrap();
    }

    #[test]
    fn direct_dependencies_in_declaration_order() {
        let tmp = tempfile::tempdir().unwrap();
        write_build(
            tmp.path(),
            "src",
            "java_library(name=\"z\")\njava_library(name=\"a\")\n\
             java_library(name=\"top\", dependencies=[\":z\", \":a\"])",
        );

        let graph = DependencyGraph::build(&workspace(tmp.path())).unwrap();
        let deps = graph.dependencies(&addr("src:top"));
        assert_eq!(deps, &[addr("src:z"), addr("src:a")]);
    }

    #[test]
    fn sibling_and_path_references_resolve() {
        let tmp = tempfile::tempdir().unwrap();
        write_build(tmp.path(), "lib", "java_library(name=\"lib\")");
        write_build(
            tmp.path(),
            "app",
            "java_library(name=\"base\")\n\
             java_library(name=\"app\", dependencies=[\":base\", \"lib:lib\", \"//lib\"])",
        );

        let graph = DependencyGraph::build(&workspace(tmp.path())).unwrap();
        let deps = graph.dependencies(&addr("app:app"));
        // `lib:lib` and the shorthand `//lib` resolve to the same address.
        assert_eq!(
            deps,
            &[addr("app:base"), addr("lib:lib"), addr("lib:lib")]
        );
    }

    #[test]
    fn unknown_dependency_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        write_build(
            tmp.path(),
            "src",
            "java_library(name=\"a\", dependencies=[\":ghost\"])",
        );

        let err = DependencyGraph::build(&workspace(tmp.path())).unwrap_err();
        match err {
            EngineError::UnknownDependency { from, dep } => {
                assert_eq!(from, "src:a");
                assert_eq!(dep, ":ghost");
            }
            other => panic!("expected UnknownDependency, got {other:?}"),
        }
    }

    #[test]
    fn malformed_dependency_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        write_build(
            tmp.path(),
            "src",
            "java_library(name=\"a\", dependencies=[\"../outside:lib\"])",
        );

        let err = DependencyGraph::build(&workspace(tmp.path())).unwrap_err();
        assert!(matches!(err, EngineError::InvalidDependency { .. }));
    }

    #[test]
    fn library_may_not_depend_on_tests() {
        let tmp = tempfile::tempdir().unwrap();
        write_build(
            tmp.path(),
            "src",
            "junit_tests(name=\"tests\")\n\
             java_library(name=\"lib\", dependencies=[\":tests\"])",
        );

        let err = DependencyGraph::build(&workspace(tmp.path())).unwrap_err();
        match err {
            EngineError::LibraryDependsOnTests { from, to } => {
                assert_eq!(from, "src:lib");
                assert_eq!(to, "src:tests");
            }
            other => panic!("expected LibraryDependsOnTests, got {other:?}"),
        }
    }

    #[test]
    fn tests_may_depend_on_tests() {
        let tmp = tempfile::tempdir().unwrap();
        write_build(
            tmp.path(),
            "src",
            "junit_tests(name=\"base\")\n\
             junit_tests(name=\"more\", dependencies=[\":base\"])",
        );

        DependencyGraph::build(&workspace(tmp.path())).unwrap();
    }

    #[test]
    fn transitive_closure_is_dependencies_first() {
        let tmp = tempfile::tempdir().unwrap();
        write_build(tmp.path(), "leaf", "java_library(name=\"leaf\")");
        write_build(
            tmp.path(),
            "mid",
            "java_library(name=\"mid\", dependencies=[\"leaf\"])",
        );
        write_build(
            tmp.path(),
            "top",
            "java_library(name=\"top\", dependencies=[\"mid\"])",
        );

        let graph = DependencyGraph::build(&workspace(tmp.path())).unwrap();
        let order = graph.transitive_closure(&[addr("top:top")]).unwrap();
        assert_eq!(
            order,
            vec![addr("leaf:leaf"), addr("mid:mid"), addr("top:top")]
        );
    }

    #[test]
    fn diamond_closure_deduplicates() {
        let tmp = tempfile::tempdir().unwrap();
        write_build(tmp.path(), "shared", "java_library(name=\"shared\")");
        write_build(
            tmp.path(),
            "a",
            "java_library(name=\"a\", dependencies=[\"shared\"])",
        );
        write_build(
            tmp.path(),
            "b",
            "java_library(name=\"b\", dependencies=[\"shared\"])",
        );
        write_build(
            tmp.path(),
            "top",
            "java_library(name=\"top\", dependencies=[\"a\", \"b\"])",
        );

        let graph = DependencyGraph::build(&workspace(tmp.path())).unwrap();
        let order = graph.transitive_closure(&[addr("top:top")]).unwrap();
        assert_eq!(order.len(), 4);
        let shared_count = order.iter().filter(|a| **a == addr("shared:shared")).count();
        assert_eq!(shared_count, 1);
    }

    #[test]
    fn cycle_detected_and_rendered() {
        let tmp = tempfile::tempdir().unwrap();
        write_build(
            tmp.path(),
            "a",
            "java_library(name=\"a\", dependencies=[\"b:b\"])",
        );
        write_build(
            tmp.path(),
            "b",
            "java_library(name=\"b\", dependencies=[\"a:a\"])",
        );

        let graph = DependencyGraph::build(&workspace(tmp.path())).unwrap();
        let err = graph.check_acyclic().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("cycle"), "error was: {message}");
        assert!(message.contains(" -> "), "error was: {message}");
    }

    #[test]
    fn self_cycle_detected() {
        let tmp = tempfile::tempdir().unwrap();
        write_build(
            tmp.path(),
            "a",
            "java_library(name=\"a\", dependencies=[\":a\"])",
        );

        let graph = DependencyGraph::build(&workspace(tmp.path())).unwrap();
        let err = graph.check_acyclic().unwrap_err();
        assert!(err.to_string().contains("a:a -> a:a"));
    }

    #[test]
    fn dependees_direct() {
        let tmp = tempfile::tempdir().unwrap();
        write_build(tmp.path(), "lib", "java_library(name=\"lib\")");
        write_build(
            tmp.path(),
            "app",
            "java_library(name=\"app\", dependencies=[\"lib\"])",
        );
        write_build(
            tmp.path(),
            "tests",
            "junit_tests(name=\"tests\", dependencies=[\"lib\"])",
        );

        let graph = DependencyGraph::build(&workspace(tmp.path())).unwrap();
        let dependees = graph.dependees(&addr("lib:lib"));
        assert_eq!(dependees, &[addr("app:app"), addr("tests:tests")]);
    }

    #[test]
    fn transitive_dependees_cover_the_chain() {
        let tmp = tempfile::tempdir().unwrap();
        write_build(tmp.path(), "leaf", "java_library(name=\"leaf\")");
        write_build(
            tmp.path(),
            "mid",
            "java_library(name=\"mid\", dependencies=[\"leaf\"])",
        );
        write_build(
            tmp.path(),
            "top",
            "java_library(name=\"top\", dependencies=[\"mid\"])",
        );

        let graph = DependencyGraph::build(&workspace(tmp.path())).unwrap();
        let dependees = graph.transitive_dependees(&[addr("leaf:leaf")]).unwrap();
        assert!(dependees.contains(&addr("mid:mid")));
        assert!(dependees.contains(&addr("top:top")));
        assert!(dependees.contains(&addr("leaf:leaf")));
    }

    #[test]
    fn unlisted_address_has_no_edges() {
        let tmp = tempfile::tempdir().unwrap();
        write_build(tmp.path(), "src", "java_library(name=\"lib\")");

        let graph = DependencyGraph::build(&workspace(tmp.path())).unwrap();
        let ghost = addr("ghost:ghost");
        assert!(graph.dependencies(&ghost).is_empty());
        assert!(graph.dependees(&ghost).is_empty());
    }
}
