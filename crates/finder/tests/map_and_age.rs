//! Expectation maps, the age-gated view and orphaned bugs.

use std::collections::BTreeSet;
use std::path::PathBuf;
use tagex_core::{Expectation, ResultKind, TestPattern};
use tagex_finder::vcs::parse_blame_output;
use tagex_finder::{
    create_test_expectation_map, expectations_for_tests, find_orphaned_bugs, recent_content,
    InMemoryBlame,
};
use time::macros::date;
use time::{Date, Duration};

const FAKE_EXPECTATIONS: &str = "\
# tags: [ win linux ]
# results: [ Failure RetryOnFailure Skip Pass ]
crbug.com/1234 [ win ] foo/test [ Failure ]
crbug.com/5678 crbug.com/6789 [ win ] foo/another/test [ RetryOnFailure ]

[ linux ] foo/test [ Failure ]

crbug.com/2345 [ linux ] bar/* [ RetryOnFailure ]
crbug.com/3456 [ linux ] some/bad/test [ Skip ]
crbug.com/4567 [ linux ] some/good/test [ Pass ]
";

const SECONDARY_EXPECTATIONS: &str = "\
# tags: [ mac ]
# results: [ Failure ]

crbug.com/4567 [ mac ] foo/test [ Failure ]
";

const TODAY: Date = date!(2024 - 06 - 12);

fn exp(test: &str, tags: &[&str], result: ResultKind, reason: &str) -> Expectation {
    Expectation::new(
        TestPattern::from(test),
        tags.iter().copied(),
        &[result],
        reason.split_whitespace(),
    )
}

fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn assert_same_rules(actual: &[Expectation], expected: &[Expectation]) {
    assert_eq!(actual.len(), expected.len(), "{:?}", actual);
    for (a, e) in actual.iter().zip(expected) {
        assert!(a.same_rule(e), "{} != {}", a, e);
    }
}

#[test]
fn map_omits_skip_and_pass_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "foo.txt", FAKE_EXPECTATIONS);
    let map = create_test_expectation_map(&[&path], -1, &InMemoryBlame::new(), TODAY).unwrap();
    assert_eq!(map.len(), 1);
    let found = &map[&path];
    assert_same_rules(
        found,
        &[
            exp("foo/test", &["win"], ResultKind::Failure, "crbug.com/1234"),
            exp(
                "foo/another/test",
                &["win"],
                ResultKind::RetryOnFailure,
                "crbug.com/5678 crbug.com/6789",
            ),
            exp("foo/test", &["linux"], ResultKind::Failure, ""),
            exp("bar/*", &["linux"], ResultKind::RetryOnFailure, "crbug.com/2345"),
        ],
    );
    assert_eq!(found[1].reason, vec!["crbug.com/5678", "crbug.com/6789"]);
    assert!(found[3].test.is_glob());
}

#[test]
fn map_covers_every_file() {
    let dir = tempfile::tempdir().unwrap();
    let first = write(&dir, "foo.txt", FAKE_EXPECTATIONS);
    let second = write(&dir, "bar.txt", SECONDARY_EXPECTATIONS);
    let map =
        create_test_expectation_map(&[&first, &second], -1, &InMemoryBlame::new(), TODAY).unwrap();
    assert_eq!(map[&first].len(), 4);
    assert_same_rules(
        &map[&second],
        &[exp("foo/test", &["mac"], ResultKind::Failure, "crbug.com/4567")],
    );
}

#[test]
fn map_for_individual_tests() {
    let map = expectations_for_tests(["foo/test", "bar/*"]);
    assert_eq!(map.len(), 1);
    assert_same_rules(
        &map[&PathBuf::new()],
        &[
            exp("foo/test", &[], ResultKind::RetryOnFailure, ""),
            exp("bar/*", &[], ResultKind::RetryOnFailure, ""),
        ],
    );
}

fn blame_output(ages: &[i64], lines: &[&str]) -> String {
    ages.iter()
        .zip(lines)
        .enumerate()
        .map(|(i, (age, text))| {
            format!(
                "5f03bc04975c04 (Some R. Author    {} 00:00:00 +0000  {}){}",
                TODAY - Duration::days(*age),
                i + 1,
                text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

const BLAMED: [&str; 9] = [
    "# tags: [ tag1 ]",
    "# tags: [ tag2 ]",
    "# results: [ Failure ]",
    "",
    "crbug.com/1234 [ tag1 ] testname [ Failure ]",
    "[ tag2 ] testname [ Failure ] # Comment",
    "[ tag1 ] othertest [ Failure ]",
    "crbug.com/2345 testname [ Failure ]",
    "crbug.com/3456 othertest [ Failure ]",
];

const BLAMED_AGES: [i64; 9] = [0, 1, 2, 0, 0, 1, 2, 0, 2];

fn blamed_file(dir: &tempfile::TempDir) -> (PathBuf, InMemoryBlame) {
    let path = write(dir, "blamed.txt", &BLAMED.join("\n"));
    let lines = parse_blame_output(&blame_output(&BLAMED_AGES, &BLAMED)).unwrap();
    let mut blame = InMemoryBlame::new();
    blame.insert(path.clone(), lines);
    (path, blame)
}

#[test]
fn age_gate_keeps_only_old_expectations() {
    let dir = tempfile::tempdir().unwrap();
    let (path, blame) = blamed_file(&dir);
    let view = recent_content(&path, 1, &blame, TODAY).unwrap();
    assert_eq!(
        view,
        "# tags: [ tag1 ]\n\
         # tags: [ tag2 ]\n\
         # results: [ Failure ]\n\
         \n\
         [ tag1 ] othertest [ Failure ]\n\
         crbug.com/3456 othertest [ Failure ]"
    );
}

#[test]
fn negative_grace_period_disables_the_age_gate() {
    let dir = tempfile::tempdir().unwrap();
    let (path, blame) = blamed_file(&dir);
    let view = recent_content(&path, -1, &blame, TODAY).unwrap();
    assert_eq!(view, BLAMED.join("\n"));
}

#[test]
fn map_reads_the_age_gated_view() {
    let dir = tempfile::tempdir().unwrap();
    let (path, blame) = blamed_file(&dir);
    let map = create_test_expectation_map(&[&path], 1, &blame, TODAY).unwrap();
    let names: Vec<String> = map[&path].iter().map(|e| e.to_line()).collect();
    assert_eq!(
        names,
        vec!["[ tag1 ] othertest [ Failure ]", "crbug.com/3456 othertest [ Failure ]"]
    );
}

#[test]
fn orphaned_bugs_are_the_unreferenced_ones() {
    let dir = tempfile::tempdir().unwrap();
    let real = write(&dir, "real_expectations.txt", "crbug.com/1\ncrbug.com/2");
    write(&dir, "fake.txt", "crbug.com/4");

    let none = find_orphaned_bugs(&[&real], ["crbug.com/1", "crbug.com/2"]).unwrap();
    assert!(none.is_empty());

    let orphaned = find_orphaned_bugs(&[&real], ["crbug.com/1", "crbug.com/3", "crbug.com/4"]).unwrap();
    let expected: BTreeSet<String> = ["crbug.com/3", "crbug.com/4"].iter().map(|s| s.to_string()).collect();
    assert_eq!(orphaned, expected);
}
