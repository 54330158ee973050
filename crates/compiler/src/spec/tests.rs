use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;

fn todo_spec() -> MappingSpec {
	MappingSpec::new(
		"TodoMapper",
		Operand::new("crate::model", "TodoModel"),
		Operand::new("crate::domain", "Todo"),
	)
	.bidirectional()
}

/// Default operation names are the snake-cased operand names joined by `_to_`.
#[rstest]
#[case(Direction::AToB, "todo_model_to_todo")]
#[case(Direction::BToA, "todo_to_todo_model")]
fn test_default_method_names(#[case] direction: Direction, #[case] expected: &str) {
	assert_eq!(todo_spec().method_name(direction), expected);
}

/// Overrides replace the derived name for their direction only.
#[test]
fn test_method_name_override() {
	let mut spec = todo_spec();
	spec.b_to_a = Some("restore".to_string());

	assert_eq!(spec.method_name(Direction::AToB), "todo_model_to_todo");
	assert_eq!(spec.method_name(Direction::BToA), "restore");
}

/// Nested rules keep the inherited flags and drop explicit entries.
#[test]
fn test_nested_rules() {
	let mut spec = todo_spec().field("done", "finished").ignore(Side::A, "id");
	spec.rules.ignore_case = true;
	spec.rules.explicit_only = true;
	spec.rules.nil.sequence = NilPolicy::Empty;

	let nested = spec.rules.nested();
	assert!(nested.ignore_case);
	assert!(!nested.explicit_only);
	assert_eq!(nested.nil.sequence, NilPolicy::Empty);
	assert!(nested.fields.is_empty());
	assert!(nested.ignores.is_empty());
}

/// Ignore entries apply to one side and honor case folding.
#[test]
fn test_is_ignored() {
	let mut spec = todo_spec().ignore(Side::A, "validateOnly");
	assert!(spec.rules.is_ignored(Side::A, "validateOnly"));
	assert!(!spec.rules.is_ignored(Side::B, "validateOnly"));
	assert!(!spec.rules.is_ignored(Side::A, "validateonly"));

	spec.rules.ignore_case = true;
	assert!(spec.rules.is_ignored(Side::A, "validateonly"));
}
