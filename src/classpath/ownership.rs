//! Source ownership
//!
//! Decides whether a dependency unit is already present in the workspace as
//! source: a module owns a source file when the file sits under one of the
//! module's source roots, is not excluded there, and (if the root declares any
//! inclusion patterns) matches one of them. Patterns are filesystem globs
//! relative to the source root.

use crate::model::{ModuleSourceSet, SourceRoot};
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use tracing::warn;

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

pub struct SourceOwnershipResolver {
    workspace_root: PathBuf,
}

impl SourceOwnershipResolver {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
        }
    }

    /// Returns the first module owning any of `sources`, checked in order.
    ///
    /// `None` means the unit has to be satisfied by its archives instead.
    pub fn resolve_owner<'a>(
        &self,
        sources: &[String],
        modules: &'a [ModuleSourceSet],
    ) -> Option<&'a ModuleSourceSet> {
        sources
            .iter()
            .filter_map(|source| self.normalize(source))
            .find_map(|path| modules.iter().find(|module| owns(module, &path)))
    }

    /// Turns a build-tool source path into an absolute path.
    ///
    /// Bazel may quote paths and prefix them with `./`; relative paths are taken
    /// relative to the workspace root.
    pub fn normalize(&self, source: &str) -> Option<PathBuf> {
        let unquoted = source.replace('"', "");
        let trimmed = unquoted.trim();
        let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
        if trimmed.is_empty() {
            return None;
        }

        let path = Path::new(trimmed);
        if path.is_absolute() {
            Some(path.to_path_buf())
        } else {
            Some(self.workspace_root.join(path))
        }
    }
}

pub fn owns(module: &ModuleSourceSet, path: &Path) -> bool {
    module
        .source_roots
        .iter()
        .any(|root| root_owns(root, path))
}

fn root_owns(root: &SourceRoot, path: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(&root.path) else {
        return false;
    };

    if matches_any(&root.exclude, relative) {
        return false;
    }

    root.include.is_empty() || matches_any(&root.include, relative)
}

fn matches_any(patterns: &[String], relative: &Path) -> bool {
    patterns.iter().any(|raw| {
        // a trailing slash selects everything below that folder
        let expanded = if raw.ends_with('/') {
            format!("{}**", raw)
        } else {
            raw.clone()
        };

        match Pattern::new(&expanded) {
            Ok(pattern) => pattern.matches_path_with(relative, GLOB_OPTIONS),
            Err(e) => {
                warn!(pattern = %raw, error = %e, "Ignoring invalid source glob");
                false
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> SourceOwnershipResolver {
        SourceOwnershipResolver::new("/ws")
    }

    fn sources(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_normalize() {
        let resolver = resolver();
        assert_eq!(
            resolver.normalize("\"lib/src/Core.java\""),
            Some(PathBuf::from("/ws/lib/src/Core.java"))
        );
        assert_eq!(
            resolver.normalize("./lib/Core.java"),
            Some(PathBuf::from("/ws/lib/Core.java"))
        );
        assert_eq!(
            resolver.normalize("/abs/Core.java"),
            Some(PathBuf::from("/abs/Core.java"))
        );
        assert_eq!(resolver.normalize("\"\""), None);
    }

    #[test]
    fn test_root_without_patterns_owns_everything_below() {
        let modules = vec![ModuleSourceSet::new("lib", "/ws/lib")
            .with_source_root(SourceRoot::new("/ws/lib/src/main/java"))];

        let owner = resolver().resolve_owner(&sources(&["lib/src/main/java/a/Core.java"]), &modules);
        assert_eq!(owner.map(|m| m.name.as_str()), Some("lib"));
    }

    #[test]
    fn test_containment_is_per_path_component() {
        let modules = vec![ModuleSourceSet::new("lib", "/ws/lib")
            .with_source_root(SourceRoot::new("/ws/lib"))];

        assert!(resolver()
            .resolve_owner(&sources(&["library/Core.java"]), &modules)
            .is_none());
    }

    #[test]
    fn test_inclusion_patterns_filter() {
        let modules = vec![ModuleSourceSet::new("lib", "/ws/lib")
            .with_source_root(SourceRoot::new("/ws/lib").include("src/**/*.java"))];
        let resolver = resolver();

        assert!(resolver
            .resolve_owner(&sources(&["lib/src/main/Core.java"]), &modules)
            .is_some());
        assert!(resolver
            .resolve_owner(&sources(&["lib/src/main/Core.kt"]), &modules)
            .is_none());
        assert!(resolver
            .resolve_owner(&sources(&["lib/test/Core.java"]), &modules)
            .is_none());
    }

    #[test]
    fn test_single_star_does_not_cross_directories() {
        let modules = vec![ModuleSourceSet::new("lib", "/ws/lib")
            .with_source_root(SourceRoot::new("/ws/lib").include("src/*.java"))];

        assert!(resolver()
            .resolve_owner(&sources(&["lib/src/a/Core.java"]), &modules)
            .is_none());
        assert!(resolver()
            .resolve_owner(&sources(&["lib/src/Core.java"]), &modules)
            .is_some());
    }

    #[test]
    fn test_exclusion_wins_over_inclusion() {
        let modules = vec![ModuleSourceSet::new("lib", "/ws/lib").with_source_root(
            SourceRoot::new("/ws/lib")
                .include("src/**/*.java")
                .exclude("src/**/generated/**"),
        )];

        assert!(resolver()
            .resolve_owner(&sources(&["lib/src/main/generated/Gen.java"]), &modules)
            .is_none());
    }

    #[test]
    fn test_trailing_slash_pattern_matches_folder_contents() {
        let modules = vec![ModuleSourceSet::new("lib", "/ws/lib")
            .with_source_root(SourceRoot::new("/ws/lib").exclude("build/"))];

        assert!(resolver()
            .resolve_owner(&sources(&["lib/build/x/Gen.java"]), &modules)
            .is_none());
        assert!(resolver()
            .resolve_owner(&sources(&["lib/src/Core.java"]), &modules)
            .is_some());
    }

    #[test]
    fn test_question_mark_and_character_class() {
        let modules = vec![ModuleSourceSet::new("lib", "/ws/lib")
            .with_source_root(SourceRoot::new("/ws/lib").include("src/[A-C]ore?.java"))];

        assert!(resolver()
            .resolve_owner(&sources(&["lib/src/Core1.java"]), &modules)
            .is_some());
        assert!(resolver()
            .resolve_owner(&sources(&["lib/src/Dore1.java"]), &modules)
            .is_none());
    }

    #[test]
    fn test_excluded_in_one_module_owned_by_another() {
        let modules = vec![
            ModuleSourceSet::new("b", "/ws/shared").with_source_root(
                SourceRoot::new("/ws/shared").exclude("a/**"),
            ),
            ModuleSourceSet::new("a", "/ws/shared/a")
                .with_source_root(SourceRoot::new("/ws/shared/a").include("**/*.java")),
        ];

        let owner = resolver().resolve_owner(&sources(&["shared/a/x/Core.java"]), &modules);
        assert_eq!(owner.map(|m| m.name.as_str()), Some("a"));
    }

    #[test]
    fn test_first_matching_source_wins() {
        let modules = vec![
            ModuleSourceSet::new("one", "/ws/one").with_source_root(SourceRoot::new("/ws/one")),
            ModuleSourceSet::new("two", "/ws/two").with_source_root(SourceRoot::new("/ws/two")),
        ];

        let owner = resolver().resolve_owner(
            &sources(&["external/x/X.java", "two/B.java", "one/A.java"]),
            &modules,
        );
        assert_eq!(owner.map(|m| m.name.as_str()), Some("two"));
    }

    #[test]
    fn test_invalid_pattern_never_matches() {
        let modules = vec![ModuleSourceSet::new("lib", "/ws/lib")
            .with_source_root(SourceRoot::new("/ws/lib").include("src/[.java"))];

        assert!(resolver()
            .resolve_owner(&sources(&["lib/src/Core.java"]), &modules)
            .is_none());
    }
}
