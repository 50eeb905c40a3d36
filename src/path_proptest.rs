//! Property-based tests for lexical path resolution.
//!
//! These tests use proptest to generate random path shapes and verify that
//! the resolution invariants the sink relies on hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::path::{normalize, relative_to, resolve};
    use proptest::prelude::*;
    use std::path::{Component, Path, PathBuf};

    /// A path segment: a plain name, `.` or `..`.
    fn segment() -> impl Strategy<Value = String> {
        prop_oneof![
            6 => "[a-z0-9_]{1,8}",
            1 => Just(".".to_string()),
            1 => Just("..".to_string()),
        ]
    }

    fn plain_segment() -> impl Strategy<Value = String> {
        "[a-z0-9_]{1,8}"
    }

    fn relative_path() -> impl Strategy<Value = PathBuf> {
        prop::collection::vec(segment(), 0..8).prop_map(|parts| parts.iter().collect())
    }

    fn absolute_path() -> impl Strategy<Value = PathBuf> {
        relative_path().prop_map(|p| Path::new("/").join(p))
    }

    fn plain_absolute() -> impl Strategy<Value = PathBuf> {
        prop::collection::vec(plain_segment(), 0..6)
            .prop_map(|parts| Path::new("/").join(parts.iter().collect::<PathBuf>()))
    }

    // ============================================================================
    // normalize property tests
    // ============================================================================

    proptest! {
        /// Property: normalizing twice is the same as normalizing once
        #[test]
        fn normalize_is_idempotent(path in relative_path()) {
            let once = normalize(&path);
            prop_assert_eq!(normalize(&once), once.clone());
        }

        /// Property: a normalized path has no `.` components
        #[test]
        fn normalize_removes_cur_dir(path in relative_path()) {
            let normalized = normalize(&path);
            prop_assert!(normalized.components().all(|c| c != Component::CurDir));
        }

        /// Property: a normalized absolute path has no `..` components
        #[test]
        fn normalize_absolute_has_no_parent_dir(path in absolute_path()) {
            let normalized = normalize(&path);
            prop_assert!(normalized.is_absolute());
            prop_assert!(normalized.components().all(|c| c != Component::ParentDir));
        }

        /// Property: paths made only of plain names are left alone
        #[test]
        fn normalize_keeps_plain_paths(path in plain_absolute()) {
            prop_assert_eq!(normalize(&path), path);
        }
    }

    // ============================================================================
    // resolve property tests
    // ============================================================================

    proptest! {
        /// Property: resolving against an absolute cwd yields an absolute path
        #[test]
        fn resolve_is_absolute(cwd in plain_absolute(), path in relative_path()) {
            prop_assert!(resolve(&cwd, &path).is_absolute());
        }

        /// Property: an absolute path ignores the cwd
        #[test]
        fn resolve_absolute_ignores_cwd(
            cwd in plain_absolute(),
            other in plain_absolute(),
            path in absolute_path(),
        ) {
            prop_assert_eq!(resolve(&cwd, &path), resolve(&other, &path));
        }

        /// Property: plain relative names land below the cwd
        #[test]
        fn resolve_plain_stays_under_cwd(
            cwd in plain_absolute(),
            parts in prop::collection::vec(plain_segment(), 1..5),
        ) {
            let path: PathBuf = parts.iter().collect();
            let resolved = resolve(&cwd, &path);
            prop_assert!(resolved.starts_with(&cwd));
            prop_assert_eq!(resolved, cwd.join(path));
        }
    }

    // ============================================================================
    // relative_to property tests
    // ============================================================================

    proptest! {
        /// Property: re-joining a relative path onto its base gives the path back
        #[test]
        fn relative_to_round_trips_through_resolve(
            path in absolute_path(),
            base in absolute_path(),
        ) {
            let relative = relative_to(&path, &base);
            prop_assert_eq!(resolve(&normalize(&base), &relative), normalize(&path));
        }

        /// Property: a path is empty relative to itself
        #[test]
        fn relative_to_self_is_empty(path in absolute_path()) {
            prop_assert_eq!(relative_to(&path, &path), PathBuf::new());
        }

        /// Property: a descendant never needs `..` to be reached
        #[test]
        fn relative_to_descendant_has_no_parent_dir(
            base in plain_absolute(),
            parts in prop::collection::vec(plain_segment(), 1..5),
        ) {
            let path = base.join(parts.iter().collect::<PathBuf>());
            let relative = relative_to(&path, &base);
            prop_assert!(relative.components().all(|c| c != Component::ParentDir));
            prop_assert_eq!(base.join(relative), path);
        }
    }
}
