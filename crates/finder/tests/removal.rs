//! Stale removal on files written to disk.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tagex_core::{Expectation, ResultKind, TestPattern};
use tagex_finder::{remove_expectations_from_file, FinderError, RemovalType};

const HEADER: &str = "# tags: [ linux mac win ]\n# results: [ Failure RetryOnFailure Skip Pass ]\n";

struct Fixture {
    _dir: tempfile::TempDir,
    path: PathBuf,
}

impl Fixture {
    fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("expectations.txt");
        std::fs::write(&path, format!("{}{}", HEADER, body)).unwrap();
        Fixture { _dir: dir, path }
    }

    fn read(&self) -> String {
        std::fs::read_to_string(&self.path).unwrap()
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

fn exp(test: &str, tags: &[&str], results: &[ResultKind], reason: &str) -> Expectation {
    Expectation::new(
        TestPattern::from(test),
        tags.iter().copied(),
        results,
        reason.split_whitespace(),
    )
}

fn failure(test: &str, tags: &[&str], reason: &str) -> Expectation {
    exp(test, tags, &[ResultKind::Failure], reason)
}

fn retry(test: &str, tags: &[&str], reason: &str) -> Expectation {
    exp(test, tags, &[ResultKind::RetryOnFailure], reason)
}

fn urls(v: &[&str]) -> BTreeSet<String> {
    v.iter().map(|s| s.to_string()).collect()
}

fn remove(fixture: &Fixture, expectations: &[Expectation]) -> BTreeSet<String> {
    remove_expectations_from_file(fixture.path(), expectations, RemovalType::Stale)
        .unwrap()
        .removed_urls
}

// ── Plain removal ────────────────────────────────────────────────────

const BASIC: &str = "\n\
# This is a test comment\n\
crbug.com/1234 [ win ] foo/test [ Failure ]\n\
crbug.com/2345 [ win ] foo/test [ RetryOnFailure ]\n\
\n\
# Another comment\n\
[ linux ] bar/test [ RetryOnFailure ]\n\
[ win ] bar/test [ RetryOnFailure ]\n";

#[test]
fn removes_only_matching_lines() {
    let fixture = Fixture::new(BASIC);
    let removed = remove(
        &fixture,
        &[
            failure("foo/test", &["win"], "crbug.com/1234"),
            retry("bar/test", &["linux"], ""),
        ],
    );
    assert_eq!(removed, urls(&["crbug.com/1234"]));
    assert_eq!(
        fixture.read(),
        format!(
            "{}\n\
             # This is a test comment\n\
             crbug.com/2345 [ win ] foo/test [ RetryOnFailure ]\n\
             \n\
             # Another comment\n\
             [ win ] bar/test [ RetryOnFailure ]\n",
            HEADER
        )
    );
}

#[test]
fn removal_reports_every_bug_of_a_line() {
    let fixture = Fixture::new(
        "\ncrbug.com/1234 crbug.com/3456 crbug.com/4567 [ win ] foo/test [ Failure ]\n\
         [ win ] bar/test [ RetryOnFailure ]\n",
    );
    let removed = remove(
        &fixture,
        &[failure("foo/test", &["win"], "crbug.com/1234 crbug.com/3456 crbug.com/4567")],
    );
    assert_eq!(removed, urls(&["crbug.com/1234", "crbug.com/3456", "crbug.com/4567"]));
    assert_eq!(fixture.read(), format!("{}\n[ win ] bar/test [ RetryOnFailure ]\n", HEADER));
}

#[test]
fn unchanged_file_is_not_rewritten() {
    let fixture = Fixture::new(BASIC);
    let before = std::fs::metadata(fixture.path()).unwrap().modified().unwrap();
    let removed = remove(&fixture, &[failure("missing/test", &["win"], "")]);
    assert!(removed.is_empty());
    assert_eq!(fixture.read(), format!("{}{}", HEADER, BASIC));
    let after = std::fs::metadata(fixture.path()).unwrap().modified().unwrap();
    assert_eq!(before, after);
}

// ── Disable annotations ──────────────────────────────────────────────

const MISMATCHED: &str = "\n\
crbug.com/1234 [ win ] do_not_remove [ Failure ]\n\
# finder:disable-stale\n\
crbug.com/2345 [ win ] disabled_stale [ Failure ]\n\
# finder:enable-stale\n\
# finder:disable-unused\n\
crbug.com/3456 [ win ] disabled_unused [ Failure ]\n\
# finder:enable-unused\n\
crbug.com/4567 [ win ] also_do_not_remove [ Failure ]\n";

#[test]
fn block_disable_only_blocks_its_own_category() {
    let targets = [
        failure("disabled_stale", &["win"], "crbug.com/2345"),
        failure("disabled_unused", &["win"], "crbug.com/3456"),
    ];

    let fixture = Fixture::new(MISMATCHED);
    let outcome =
        remove_expectations_from_file(fixture.path(), &targets, RemovalType::Stale).unwrap();
    assert_eq!(outcome.removed_urls, urls(&["crbug.com/3456"]));
    assert_eq!(outcome.suppressed.len(), 1);
    assert_eq!(
        fixture.read(),
        format!(
            "{}\n\
             crbug.com/1234 [ win ] do_not_remove [ Failure ]\n\
             # finder:disable-stale\n\
             crbug.com/2345 [ win ] disabled_stale [ Failure ]\n\
             # finder:enable-stale\n\
             crbug.com/4567 [ win ] also_do_not_remove [ Failure ]\n",
            HEADER
        )
    );

    let fixture = Fixture::new(MISMATCHED);
    let outcome =
        remove_expectations_from_file(fixture.path(), &targets, RemovalType::Unused).unwrap();
    assert_eq!(outcome.removed_urls, urls(&["crbug.com/2345"]));
    assert_eq!(
        fixture.read(),
        format!(
            "{}\n\
             crbug.com/1234 [ win ] do_not_remove [ Failure ]\n\
             # finder:disable-unused\n\
             crbug.com/3456 [ win ] disabled_unused [ Failure ]\n\
             # finder:enable-unused\n\
             crbug.com/4567 [ win ] also_do_not_remove [ Failure ]\n",
            HEADER
        )
    );
}

#[test]
fn general_block_suppresses_every_category() {
    let body = "\n\
                # finder:disable-general\n\
                crbug.com/2345 [ win ] foo/test [ Failure ]\n\
                # finder:enable-general\n";
    let target = [failure("foo/test", &["win"], "crbug.com/2345")];
    for kind in [RemovalType::Stale, RemovalType::Unused, RemovalType::Narrowing] {
        let fixture = Fixture::new(body);
        let outcome = remove_expectations_from_file(fixture.path(), &target, kind).unwrap();
        assert!(outcome.removed_urls.is_empty());
        assert_eq!(fixture.read(), format!("{}{}", HEADER, body));
    }
}

#[test]
fn disable_stale_block_logs_its_reason() {
    let body = "\n\
                # finder:disable-stale keep this\n\
                crbug.com/1 [ win ] t [ Failure ]\n\
                # finder:enable-stale\n";
    let target = [failure("t", &["win"], "crbug.com/1")];

    let fixture = Fixture::new(body);
    let outcome = remove_expectations_from_file(fixture.path(), &target, RemovalType::Stale).unwrap();
    assert_eq!(fixture.read(), format!("{}{}", HEADER, body));
    assert_eq!(outcome.suppressed.len(), 1);
    assert_eq!(outcome.suppressed[0].line, 5);
    assert!(outcome.suppressed[0].reason.ends_with("keep this"));

    let fixture = Fixture::new(body);
    let outcome =
        remove_expectations_from_file(fixture.path(), &target, RemovalType::Narrowing).unwrap();
    assert_eq!(outcome.removed_urls, urls(&["crbug.com/1"]));
    assert_eq!(fixture.read(), format!("{}\n", HEADER));
}

#[test]
fn inline_disable_only_blocks_its_own_category() {
    let body = "\n\
                crbug.com/1 [ win ] a [ Failure ]  # finder:disable-stale\n\
                crbug.com/2 [ win ] b [ Failure ]  # finder:disable-unused some reason\n";
    let targets = [
        failure("a", &["win"], "crbug.com/1"),
        failure("b", &["win"], "crbug.com/2"),
    ];
    let fixture = Fixture::new(body);
    let outcome = remove_expectations_from_file(fixture.path(), &targets, RemovalType::Unused).unwrap();
    assert_eq!(outcome.removed_urls, urls(&["crbug.com/1"]));
    assert_eq!(outcome.suppressed[0].reason, "carries an inline finder:disable-unused: some reason");
    assert_eq!(
        fixture.read(),
        format!("{}\ncrbug.com/2 [ win ] b [ Failure ]  # finder:disable-unused some reason\n", HEADER)
    );
}

// ── Groups ───────────────────────────────────────────────────────────

const GROUP_PREFIX: &str = "\n\
# This is a test comment\n\
crbug.com/2345 [ win ] foo/test [ RetryOnFailure ]\n\
\n\
# Another comment\n";

#[test]
fn group_with_all_members_removable_is_removed() {
    let fixture = Fixture::new(&format!(
        "{}\n\
         # finder:group-start some group name\n\
         [ linux ] bar/test [ RetryOnFailure ]\n\
         crbug.com/1234 [ win ] foo/test [ Failure ]\n\
         # finder:group-end\n\
         [ win ] bar/test [ RetryOnFailure ]\n",
        GROUP_PREFIX
    ));
    let removed = remove(
        &fixture,
        &[
            failure("foo/test", &["win"], "crbug.com/1234"),
            retry("bar/test", &["linux"], ""),
        ],
    );
    assert_eq!(removed, urls(&["crbug.com/1234"]));
    assert_eq!(
        fixture.read(),
        format!("{}{}\n[ win ] bar/test [ RetryOnFailure ]\n", HEADER, GROUP_PREFIX)
    );
}

#[test]
fn large_group_with_all_members_removable_is_removed() {
    let names = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k"];
    let members: String = names
        .iter()
        .map(|n| format!("[ linux ] {} [ RetryOnFailure ]\n", n))
        .collect();
    let fixture = Fixture::new(&format!(
        "{}\n# finder:group-start some group name\n{}# finder:group-end\n[ win ] bar/test [ RetryOnFailure ]\n",
        GROUP_PREFIX, members
    ));
    let targets: Vec<Expectation> = names.iter().map(|n| retry(n, &["linux"], "")).collect();
    let removed = remove(&fixture, &targets);
    assert!(removed.is_empty());
    assert_eq!(
        fixture.read(),
        format!("{}{}\n[ win ] bar/test [ RetryOnFailure ]\n", HEADER, GROUP_PREFIX)
    );
}

#[test]
fn nested_disable_inside_group_is_removed_with_its_description() {
    let fixture = Fixture::new(
        "\n\
         crbug.com/2345 [ win ] baz/test [ Failure ]\n\
         \n\
         # Description\n\
         # finder:group-start name\n\
         # finder:disable-narrowing\n\
         crbug.com/1234 [ win ] foo/test [ Failure ]\n\
         crbug.com/1234 [ win ] bar/test [ Failure ]\n\
         # finder:enable-narrowing\n\
         # finder:group-end\n\
         \n\
         crbug.com/3456 [ linux ] foo/test [ Failure ]\n",
    );
    let removed = remove(
        &fixture,
        &[
            failure("foo/test", &["win"], "crbug.com/1234"),
            failure("bar/test", &["win"], "crbug.com/1234"),
        ],
    );
    assert_eq!(removed, urls(&["crbug.com/1234"]));
    assert_eq!(
        fixture.read(),
        format!(
            "{}\n\
             crbug.com/2345 [ win ] baz/test [ Failure ]\n\
             \n\
             \n\
             crbug.com/3456 [ linux ] foo/test [ Failure ]\n",
            HEADER
        )
    );
}

#[test]
fn group_with_a_kept_member_is_left_alone() {
    let body = format!(
        "{}# finder:group-start some group name\n\
         [ linux ] bar/test [ RetryOnFailure ]\n\
         crbug.com/1234 [ win ] foo/test [ Failure ]\n\
         # finder:group-end\n\
         [ win ] bar/test [ RetryOnFailure ]\n",
        GROUP_PREFIX
    );
    let fixture = Fixture::new(&body);
    let outcome = remove_expectations_from_file(
        fixture.path(),
        &[retry("bar/test", &["linux"], "")],
        RemovalType::Stale,
    )
    .unwrap();
    assert!(outcome.removed_urls.is_empty());
    assert!(outcome.suppressed[0].reason.contains("some group name"));
    assert_eq!(fixture.read(), format!("{}{}", HEADER, body));
}

#[test]
fn split_group_blocks_form_one_group() {
    let body = format!(
        "{}\n\
         # finder:group-start some group name\n\
         [ linux ] bar/test [ RetryOnFailure ]\n\
         # finder:group-end\n\
         \n\
         # finder:group-start some group name\n\
         crbug.com/1234 [ win ] foo/test [ Failure ]\n\
         # finder:group-end\n\
         [ win ] bar/test [ RetryOnFailure ]\n",
        GROUP_PREFIX
    );

    let fixture = Fixture::new(&body);
    let removed = remove(&fixture, &[retry("bar/test", &["linux"], "")]);
    assert!(removed.is_empty());
    assert_eq!(fixture.read(), format!("{}{}", HEADER, body));

    let fixture = Fixture::new(&body);
    let removed = remove(
        &fixture,
        &[
            failure("foo/test", &["win"], "crbug.com/1234"),
            retry("bar/test", &["linux"], ""),
        ],
    );
    assert_eq!(removed, urls(&["crbug.com/1234"]));
    assert_eq!(
        fixture.read(),
        format!("{}{}\n\n[ win ] bar/test [ RetryOnFailure ]\n", HEADER, GROUP_PREFIX)
    );
}

#[test]
fn separate_groups_are_judged_separately() {
    let fixture = Fixture::new(&format!(
        "{}\n\
         # finder:group-start some group name\n\
         [ linux ] bar/test [ RetryOnFailure ]\n\
         # finder:group-end\n\
         \n\
         # finder:group-start another group name\n\
         crbug.com/1234 [ win ] foo/test [ Failure ]\n\
         crbug.com/1234 [ linux ] foo/test [ Failure ]\n\
         # finder:group-end\n\
         [ win ] bar/test [ RetryOnFailure ]\n",
        GROUP_PREFIX
    ));
    let removed = remove(
        &fixture,
        &[
            failure("foo/test", &["win"], "crbug.com/1234"),
            retry("bar/test", &["linux"], ""),
        ],
    );
    assert!(removed.is_empty());
    assert_eq!(
        fixture.read(),
        format!(
            "{}{}\n\n\
             # finder:group-start another group name\n\
             crbug.com/1234 [ win ] foo/test [ Failure ]\n\
             crbug.com/1234 [ linux ] foo/test [ Failure ]\n\
             # finder:group-end\n\
             [ win ] bar/test [ RetryOnFailure ]\n",
            HEADER, GROUP_PREFIX
        )
    );
}

fn assert_annotation_error(body: &str, needle: &str) {
    let fixture = Fixture::new(body);
    let err = remove_expectations_from_file(fixture.path(), &[], RemovalType::Stale).unwrap_err();
    assert!(matches!(err, FinderError::Parse(_)), "{}", err);
    assert!(err.to_string().contains(needle), "{}", err);
    assert_eq!(fixture.read(), format!("{}{}", HEADER, body));
}

#[test]
fn malformed_groups_are_rejected() {
    assert_annotation_error(
        "\n# finder:group-start some group name\n\
         [ linux ] bar/test [ RetryOnFailure ]\n\
         # finder:group-start another group name\n\
         # finder:group-end\n\
         # finder:group-end\n",
        "that is inside another group block",
    );
    assert_annotation_error(
        "\n# finder:group-end\n[ linux ] bar/test [ RetryOnFailure ]\n",
        "without a group start comment",
    );
    assert_annotation_error(
        "\n# finder:group-start\n# finder:group-end\n[ linux ] bar/test [ RetryOnFailure ]\n",
        "did not have a group name",
    );
}

#[test]
fn malformed_disable_blocks_are_rejected() {
    assert_annotation_error(
        "\n# finder:disable-general\n# finder:disable-stale\n\
         crbug.com/1234 [ win ] foo/test [ Failure ]\n\
         # finder:enable-stale\n# finder:enable-general\n",
        "inside the finder:disable-general block",
    );
    assert_annotation_error(
        "\n# finder:enable-general\ncrbug.com/1234 [ win ] foo/test [ Failure ]\n",
        "without a preceding disable",
    );
}

// ── Comment blocks ───────────────────────────────────────────────────

fn remove_linux_foo(body: &str) -> String {
    let fixture = Fixture::new(body);
    let removed = remove(&fixture, &[failure("foo/test", &["linux"], "crbug.com/1234")]);
    assert_eq!(removed, urls(&["crbug.com/1234"]));
    fixture.read()
}

#[test]
fn comment_block_goes_when_followed_by_blank() {
    let out = remove_linux_foo(
        "\n# Comment line 1\n# Comment line 2\n\
         crbug.com/1234 [ linux ] foo/test [ Failure ]\n\
         \n\
         crbug.com/2345 [ win ] bar/test [ Failure ]\n",
    );
    assert_eq!(out, format!("{}\n\ncrbug.com/2345 [ win ] bar/test [ Failure ]\n", HEADER));
}

#[test]
fn comment_block_goes_when_followed_by_comment() {
    let out = remove_linux_foo(
        "\n# Comment line 1\n# Comment line 2\n\
         crbug.com/1234 [ linux ] foo/test [ Failure ]\n\
         # Comment line 3\n\
         crbug.com/2345 [ win ] bar/test [ Failure ]\n",
    );
    assert_eq!(
        out,
        format!("{}\n# Comment line 3\ncrbug.com/2345 [ win ] bar/test [ Failure ]\n", HEADER)
    );
}

#[test]
fn comment_block_goes_at_end_of_file() {
    let out = remove_linux_foo(
        "\ncrbug.com/2345 [ win ] bar/test [ Failure ]\n\
         \n\
         # Comment line 1\n\
         # Comment line 2\n\
         crbug.com/1234 [ linux ] foo/test [ Failure ]",
    );
    assert_eq!(out, format!("{}\ncrbug.com/2345 [ win ] bar/test [ Failure ]\n\n", HEADER));
}

#[test]
fn comment_block_goes_with_surrounding_annotations() {
    let out = remove_linux_foo(
        "\n# Comment line 1\n# Comment line 2\n\
         # finder:disable-unused\n\
         crbug.com/1234 [ linux ] foo/test [ Failure ]\n\
         # finder:enable-unused\n\
         # Comment line 3\n\
         crbug.com/2345 [ win ] bar/test [ Failure ]\n",
    );
    assert_eq!(
        out,
        format!("{}\n# Comment line 3\ncrbug.com/2345 [ win ] bar/test [ Failure ]\n", HEADER)
    );
}

#[test]
fn start_annotation_stays_without_its_end() {
    let body = "\n# Comment line 1\n# Comment line 2\n\
                # finder:disable-unused\n\
                crbug.com/1234 [ linux ] foo/test [ Failure ]\n\
                \n\
                crbug.com/1234 [ win ] foo/test [ Failure ]\n\
                # finder:enable-unused\n\
                \n\
                # Comment line 3\n\
                crbug.com/2345 [ win ] bar/test [ Failure ]\n";
    let out = remove_linux_foo(body);
    assert_eq!(
        out,
        format!(
            "{}\n# Comment line 1\n# Comment line 2\n\
             # finder:disable-unused\n\
             \n\
             crbug.com/1234 [ win ] foo/test [ Failure ]\n\
             # finder:enable-unused\n\
             \n\
             # Comment line 3\n\
             crbug.com/2345 [ win ] bar/test [ Failure ]\n",
            HEADER
        )
    );
}

#[test]
fn end_annotation_stays_without_its_start() {
    let out = remove_linux_foo(
        "\n# finder:disable-unused\n\
         crbug.com/1234 [ win ] foo/test [ Failure ]\n\
         # Comment line 1\n\
         # Comment line 2\n\
         crbug.com/1234 [ linux ] foo/test [ Failure ]\n\
         # finder:enable-unused\n\
         # Comment line 3\n\
         crbug.com/2345 [ win ] bar/test [ Failure ]\n",
    );
    assert_eq!(
        out,
        format!(
            "{}\n# finder:disable-unused\n\
             crbug.com/1234 [ win ] foo/test [ Failure ]\n\
             # finder:enable-unused\n\
             # Comment line 3\n\
             crbug.com/2345 [ win ] bar/test [ Failure ]\n",
            HEADER
        )
    );
}

#[test]
fn comment_blocks_go_for_each_removed_block() {
    let fixture = Fixture::new(
        "\n# Comment line 1\n# Comment line 2\n\
         # finder:disable-unused\n\
         crbug.com/1234 [ linux ] foo/test [ Failure ]\n\
         # finder:enable-unused\n\
         \n\
         # Comment line 4\n\
         # finder:disable-unused\n\
         crbug.com/3456 [ mac ] foo/test [ Failure ]\n\
         # finder:enable-unused\n\
         # Comment line 3\n\
         crbug.com/2345 [ win ] bar/test [ Failure ]\n",
    );
    let removed = remove(
        &fixture,
        &[
            failure("foo/test", &["linux"], "crbug.com/1234"),
            failure("foo/test", &["mac"], "crbug.com/3456"),
        ],
    );
    assert_eq!(removed, urls(&["crbug.com/1234", "crbug.com/3456"]));
    assert_eq!(
        fixture.read(),
        format!("{}\n\n# Comment line 3\ncrbug.com/2345 [ win ] bar/test [ Failure ]\n", HEADER)
    );
}

#[test]
fn empty_annotation_blocks_are_swept() {
    let fixture = Fixture::new(
        "\n# finder:disable-general\n# finder:enable-general\n\
         \n\
         # finder:disable-stale\n\
         \n\
         # finder:enable-stale\n\
         \n\
         # finder:disable-unused\n# comment\n# finder:enable-unused\n\
         \n\
         # finder:disable-narrowing description\n# comment\n# finder:enable-narrowing\n\
         \n\
         # finder:group-start name\n# finder:group-end\n",
    );
    let removed = remove(&fixture, &[]);
    assert!(removed.is_empty());
    assert_eq!(fixture.read(), format!("{}\n\n\n\n\n", HEADER));
}
