//! Tests for driving a tree build through a scripted collaborator

use std::collections::VecDeque;

use fraudtree::domain::{
    build_tree, BuildCollaborator, BuildObserver, Condition, DecisionNode, DomainError, NoopObserver,
    Predicate,
};
use fraudtree::util::testing::init_test_setup;

#[derive(Debug, Clone)]
enum Answer {
    Attr(&'static str),
    Label(&'static str),
    Split(&'static str, Condition),
    Cancel,
}

/// Replays canned answers and records the paths it was asked about.
#[derive(Debug, Default)]
struct Script {
    answers: VecDeque<Answer>,
    asked: Vec<String>,
}

impl Script {
    fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }

    fn next(&mut self, path: &str) -> Result<Answer, String> {
        self.asked.push(path.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| format!("script exhausted at '{path}'"))
    }
}

impl BuildCollaborator for Script {
    fn ask_attribute_or_leaf(&mut self, path: &str) -> Result<Option<String>, String> {
        match self.next(path)? {
            Answer::Attr(a) => Ok(Some(a.to_string())),
            Answer::Cancel => Ok(None),
            other => Err(format!("expected attribute, script has {other:?}")),
        }
    }

    fn ask_leaf_label(&mut self, path: &str) -> Result<Option<String>, String> {
        match self.next(path)? {
            Answer::Label(l) => Ok(Some(l.to_string())),
            Answer::Cancel => Ok(None),
            other => Err(format!("expected label, script has {other:?}")),
        }
    }

    fn ask_split(&mut self, _attribute: &str, path: &str) -> Result<Option<(String, Condition)>, String> {
        match self.next(path)? {
            Answer::Split(v, c) => Ok(Some((v.to_string(), c))),
            Answer::Cancel => Ok(None),
            other => Err(format!("expected split, script has {other:?}")),
        }
    }
}

#[derive(Debug, Default)]
struct Recorder {
    paths: Vec<String>,
    trees: Vec<String>,
    rejected: Vec<DomainError>,
}

impl BuildObserver for Recorder {
    fn on_path(&mut self, path: &str) {
        self.paths.push(path.to_string());
    }

    fn on_tree(&mut self, rendered: &str) {
        self.trees.push(rendered.to_string());
    }

    fn on_rejected(&mut self, error: &DomainError) {
        self.rejected.push(error.clone());
    }
}

fn imps_script() -> Script {
    Script::new([
        Answer::Attr("Transaction Type"),
        Answer::Split("IMPS", Condition::Equals),
        Answer::Attr("result"),
        Answer::Label("Fraud"),
        Answer::Attr("result"),
        Answer::Label("Not Fraud"),
    ])
}

#[test]
fn given_single_split_script_when_building_then_tree_matches_answers() {
    // Arrange
    init_test_setup();
    let mut script = imps_script();
    let mut recorder = Recorder::default();

    // Act
    let tree = build_tree(32, "result", &mut script, &mut recorder).unwrap();

    // Assert
    let expected = DecisionNode::split(
        "Transaction Type",
        Predicate::Equals("IMPS".into()),
        DecisionNode::leaf("Fraud"),
        DecisionNode::leaf("Not Fraud"),
    );
    assert_eq!(tree, expected);
    assert_eq!(
        recorder.paths,
        vec![
            "",
            "Transaction Type == IMPS (left)",
            "Transaction Type == IMPS (right)"
        ]
    );
    // one rendering per split and per leaf
    assert_eq!(recorder.trees.len(), 3);
    assert!(recorder.trees.last().unwrap().contains("Not Fraud"));
}

#[test]
fn given_nested_splits_when_building_then_asked_depth_first_left_first() {
    init_test_setup();
    let mut script = Script::new([
        Answer::Attr("Transaction Amount"),
        Answer::Split("1000", Condition::AtLeast),
        Answer::Attr("Daily Transaction Count"),
        Answer::Split("5", Condition::AtLeast),
        Answer::Attr("result"),
        Answer::Label("Fraud"),
        Answer::Attr("result"),
        Answer::Label("Review"),
        Answer::Attr("result"),
        Answer::Label("Not Fraud"),
    ]);

    let tree = build_tree(32, "result", &mut script, &mut NoopObserver).unwrap();

    assert_eq!(tree.depth(), 2);
    assert_eq!(tree.leaf_count(), 3);
    assert_eq!(
        script.asked,
        vec![
            "",
            "",
            "Transaction Amount >= 1000 (left)",
            "Transaction Amount >= 1000 (left)",
            "Transaction Amount >= 1000 (left) -> Daily Transaction Count >= 5 (left)",
            "Transaction Amount >= 1000 (left) -> Daily Transaction Count >= 5 (left)",
            "Transaction Amount >= 1000 (left) -> Daily Transaction Count >= 5 (right)",
            "Transaction Amount >= 1000 (left) -> Daily Transaction Count >= 5 (right)",
            "Transaction Amount >= 1000 (right)",
            "Transaction Amount >= 1000 (right)",
        ]
    );
}

#[test]
fn given_cancel_midway_when_building_then_cancelled_error() {
    init_test_setup();
    let mut script = Script::new([
        Answer::Attr("Transaction Type"),
        Answer::Split("IMPS", Condition::Equals),
        Answer::Attr("result"),
        Answer::Cancel,
    ]);

    let result = build_tree(32, "result", &mut script, &mut NoopObserver);

    assert_eq!(result, Err(DomainError::BuildCancelled));
}

#[test]
fn given_non_numeric_threshold_when_building_then_question_repeated() {
    init_test_setup();
    let mut script = Script::new([
        Answer::Attr("Transaction Amount"),
        Answer::Split("lots", Condition::AtLeast),
        Answer::Split("100", Condition::AtLeast),
        Answer::Attr("result"),
        Answer::Label("Fraud"),
        Answer::Attr("result"),
        Answer::Label("Not Fraud"),
    ]);
    let mut recorder = Recorder::default();

    let tree = build_tree(32, "result", &mut script, &mut recorder).unwrap();

    assert_eq!(recorder.rejected.len(), 1);
    assert!(matches!(
        recorder.rejected[0],
        DomainError::InvalidSplitValue { .. }
    ));
    assert_eq!(tree.depth(), 1);
}

#[test]
fn given_empty_label_when_building_then_question_repeated() {
    init_test_setup();
    let mut script = Script::new([
        Answer::Attr("result"),
        Answer::Label("   "),
        Answer::Label("Fraud"),
    ]);
    let mut recorder = Recorder::default();

    let tree = build_tree(32, "result", &mut script, &mut recorder).unwrap();

    assert_eq!(tree, DecisionNode::leaf("Fraud"));
    assert!(matches!(recorder.rejected[0], DomainError::InvalidAnswer(_)));
}

#[test]
fn given_split_beyond_max_depth_when_building_then_too_deep() {
    init_test_setup();
    // max depth 1: the root may split, its children may not
    let mut script = Script::new([
        Answer::Attr("Transaction Amount"),
        Answer::Split("100", Condition::AtLeast),
        Answer::Attr("Transaction Amount"),
        Answer::Split("500", Condition::AtLeast),
    ]);

    let result = build_tree(1, "result", &mut script, &mut NoopObserver);

    assert_eq!(result, Err(DomainError::TreeTooDeep { max_depth: 1 }));
}

#[test]
fn given_always_splitting_answerer_when_building_then_terminates_too_deep() {
    init_test_setup();
    let answers = std::iter::repeat([
        Answer::Attr("Transaction Amount"),
        Answer::Split("1", Condition::AtLeast),
    ])
    .take(10)
    .flatten();
    let mut script = Script::new(answers);

    let result = build_tree(4, "result", &mut script, &mut NoopObserver);

    assert_eq!(result, Err(DomainError::TreeTooDeep { max_depth: 4 }));
    // root plus four levels of splits were accepted, the fifth was refused
    assert_eq!(script.asked.len(), 10);
}

#[test]
fn given_collaborator_failure_when_building_then_error_propagates() {
    init_test_setup();
    let mut script = Script::new([Answer::Attr("Transaction Type")]);

    let result = build_tree(32, "result", &mut script, &mut NoopObserver);

    assert!(matches!(result, Err(DomainError::Collaborator(_))));
}

#[test]
fn given_custom_sentinel_when_building_then_default_word_is_an_attribute() {
    init_test_setup();
    let mut script = Script::new([
        Answer::Attr("result"),
        Answer::Split("x", Condition::Equals),
        Answer::Attr("leaf"),
        Answer::Label("A"),
        Answer::Attr("leaf"),
        Answer::Label("B"),
    ]);

    let tree = build_tree(32, "leaf", &mut script, &mut NoopObserver).unwrap();

    assert_eq!(tree.attributes(), vec!["result"]);
}

#[test]
fn given_scientific_threshold_when_building_then_path_and_tree_show_it_as_typed() {
    init_test_setup();
    let mut script = Script::new([
        Answer::Attr("Transaction Amount"),
        Answer::Split(" 1e3 ", Condition::AtLeast),
        Answer::Attr("result"),
        Answer::Label("Fraud"),
        Answer::Attr("result"),
        Answer::Label("Not Fraud"),
    ]);
    let mut recorder = Recorder::default();

    let tree = build_tree(32, "result", &mut script, &mut recorder).unwrap();

    assert_eq!(recorder.paths[1], "Transaction Amount >= 1e3 (left)");
    assert!(recorder.trees[0].contains("Transaction Amount >= 1e3"));
    let rendered = tree.to_term_tree().to_string();
    assert!(rendered.contains("Transaction Amount >= 1e3"), "{rendered}");
    match tree {
        DecisionNode::Split { predicate, .. } => {
            assert_eq!(predicate, Predicate::AtLeast(1000.into()));
        }
        other => panic!("expected split, got {other:?}"),
    }
}
