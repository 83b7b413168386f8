//! Local `require` resolution
//!
//! Finds the files a test script pulls in through top-level
//! `var name = require('./relative/path');` declarations, recursively, so they can be
//! staged next to it. Specifiers are probed against an ordered list of suffixes relative
//! to the directory of the requiring file; the first existing file wins.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use casper_syntax::ast::{Expr, Literal, Program, Statement};
use casper_syntax::{ParseError, parse_source};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ResolverConfig;

/// A resolved dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    /// Canonical path
    pub path: PathBuf,
    /// The candidate suffix that matched (`""` when the specifier named the file exactly)
    pub resolved_extension: String,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to read {}: {error}", .path.display())]
    Read { path: PathBuf, error: io::Error },

    #[error("{}:{error}", .path.display())]
    Parse { path: PathBuf, error: ParseError },

    #[error("circular require: {}", format_chain(.chain))]
    CircularDependency { chain: Vec<PathBuf> },
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[derive(Debug, Clone)]
pub struct DependencyResolver {
    require_function: String,
    candidate_extensions: Vec<String>,
}

/// Traversal state: files on the current require chain, and files already handled.
struct Walk {
    stack: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
    nodes: Vec<DependencyNode>,
}

impl DependencyResolver {
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            require_function: config.require_function.clone(),
            candidate_extensions: config.candidate_extensions.clone(),
        }
    }

    /// All files `entry` depends on, in first-discovery order, each listed once.
    pub fn resolve(&self, entry: &Path) -> Result<Vec<DependencyNode>, ResolveError> {
        let entry = entry.canonicalize().map_err(|error| ResolveError::Read {
            path: entry.to_path_buf(),
            error,
        })?;
        let text = fs::read_to_string(&entry).map_err(|error| ResolveError::Read {
            path: entry.clone(),
            error,
        })?;
        let program = parse_source(&text).map_err(|error| ResolveError::Parse {
            path: entry.clone(),
            error,
        })?;

        let mut walk = Walk {
            stack: vec![entry.clone()],
            seen: HashSet::from([entry.clone()]),
            nodes: Vec::new(),
        };
        self.visit(&entry, &program, &mut walk)?;
        debug!("{}: {} dependencies", entry.display(), walk.nodes.len());
        Ok(walk.nodes)
    }

    fn visit(&self, file: &Path, program: &Program, walk: &mut Walk) -> Result<(), ResolveError> {
        let dir = file.parent().unwrap_or(Path::new("."));
        for specifier in require_specifiers(program, &self.require_function) {
            let Some((path, resolved_extension)) = self.probe(dir, specifier) else {
                debug!("{}: '{}' not found locally, skipping", file.display(), specifier);
                continue;
            };
            if walk.stack.contains(&path) {
                let mut chain = walk.stack.clone();
                chain.push(path);
                return Err(ResolveError::CircularDependency { chain });
            }
            if !walk.seen.insert(path.clone()) {
                continue;
            }
            walk.nodes.push(DependencyNode {
                path: path.clone(),
                resolved_extension,
            });

            if path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            let dependency = match fs::read_to_string(&path).map(|text| parse_source(&text)) {
                Ok(Ok(program)) => program,
                Ok(Err(error)) => {
                    warn!("{}:{}; its requires are not followed", path.display(), error);
                    continue;
                }
                Err(error) => {
                    warn!("cannot read {}: {}", path.display(), error);
                    continue;
                }
            };
            walk.stack.push(path.clone());
            self.visit(&path, &dependency, walk)?;
            walk.stack.pop();
        }
        Ok(())
    }

    fn probe(&self, dir: &Path, specifier: &str) -> Option<(PathBuf, String)> {
        self.candidate_extensions.iter().find_map(|ext| {
            let candidate = dir.join(format!("{}{}", specifier, ext));
            if !candidate.is_file() {
                return None;
            }
            let path = candidate.canonicalize().ok()?;
            Some((path, ext.clone()))
        })
    }
}

/// Literal arguments of top-level `<kind> x = require('<literal>')` declarators.
fn require_specifiers<'p>(program: &'p Program, require_function: &str) -> Vec<&'p str> {
    program
        .body
        .iter()
        .filter_map(|stmt| match &stmt.node {
            Statement::Var(decl) => Some(decl),
            _ => None,
        })
        .flat_map(|decl| decl.declarators.iter())
        .filter_map(|declarator| {
            let Expr::Call { callee, args, .. } = &declarator.init.as_ref()?.node else {
                return None;
            };
            match (&callee.node, args.as_slice()) {
                (Expr::Ident(name), [arg]) if name == require_function => match &arg.node {
                    Expr::Literal(Literal::String(specifier)) => Some(specifier.as_str()),
                    _ => None,
                },
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, text: &str) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, text).unwrap();
        path
    }

    fn resolver() -> DependencyResolver {
        DependencyResolver::new(&ResolverConfig::default())
    }

    fn rel(dir: &Path, nodes: &[DependencyNode]) -> Vec<String> {
        let root = dir.canonicalize().unwrap();
        nodes
            .iter()
            .map(|n| n.path.strip_prefix(&root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_require_specifiers_shapes() {
        let program = parse_source(
            "var a = require('./a'), b = require('./b');\n\
             const c = require(name);\n\
             let d = other('./d');\n\
             require('./bare');\n\
             function f() { var e = require('./nested'); }\n",
        )
        .unwrap();
        assert_eq!(require_specifiers(&program, "require"), vec!["./a", "./b"]);
    }

    #[test]
    fn test_extension_priority_follows_list_order() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "main.js", "var util = require('./util');\n");
        write(dir.path(), "util.ts", "");
        write(dir.path(), "util.js", "");

        let nodes = resolver().resolve(&entry).unwrap();
        assert_eq!(rel(dir.path(), &nodes), vec!["util.js"]);
        assert_eq!(nodes[0].resolved_extension, ".js");
    }

    #[test]
    fn test_nested_requires_resolve_against_their_own_directory() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "main.js", "var h = require('./lib/helpers');\n");
        write(dir.path(), "lib/helpers.js", "var f = require('./fmt');\nvar missing = require('./nope');\n");
        write(dir.path(), "lib/fmt.js", "");

        let nodes = resolver().resolve(&entry).unwrap();
        assert_eq!(rel(dir.path(), &nodes), vec!["lib/helpers.js", "lib/fmt.js"]);
    }

    #[test]
    fn test_diamond_is_listed_once() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "main.js", "var a = require('./a');\nvar b = require('./b');\n");
        write(dir.path(), "a.js", "var s = require('./shared');\n");
        write(dir.path(), "b.js", "var s = require('./shared.js');\n");
        write(dir.path(), "shared.js", "");

        let nodes = resolver().resolve(&entry).unwrap();
        assert_eq!(rel(dir.path(), &nodes), vec!["a.js", "shared.js", "b.js"]);
        assert_eq!(nodes[1].resolved_extension, ".js");
    }

    #[test]
    fn test_cycle_is_an_error() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "main.js", "var a = require('./a');\n");
        write(dir.path(), "a.js", "var b = require('./b');\n");
        write(dir.path(), "b.js", "var a = require('./a');\n");

        match resolver().resolve(&entry) {
            Err(ResolveError::CircularDependency { chain }) => {
                let names: Vec<_> = chain
                    .iter()
                    .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                    .collect();
                assert_eq!(names, vec!["main.js", "a.js", "b.js", "a.js"]);
            }
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_json_and_unparsable_dependencies_are_kept_but_not_followed() {
        let dir = TempDir::new().unwrap();
        let entry = write(
            dir.path(),
            "main.js",
            "var data = require('./fixtures/users');\nvar broken = require('./broken');\n",
        );
        write(dir.path(), "fixtures/users.json", "{\"a\": 1}");
        write(dir.path(), "broken.js", "var = ;\nvar x = require('./never');\n");
        write(dir.path(), "never.js", "");

        let nodes = resolver().resolve(&entry).unwrap();
        assert_eq!(rel(dir.path(), &nodes), vec!["fixtures/users.json", "broken.js"]);
    }

    #[test]
    fn test_entry_parse_error() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "main.js", "\nvar = ;\n");
        match resolver().resolve(&entry) {
            Err(ResolveError::Parse { error, .. }) => assert_eq!(error.line, 2),
            other => panic!("expected a parse error, got {:?}", other),
        }
    }
}
