use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;
use crate::provider::TypeCatalog;
use crate::spec::{FieldCorrespondence, IgnoreEntry};
use crate::types::QualifiedName;

fn ty(text: &str) -> TypeRef {
	TypeRef::parse(text).unwrap()
}

fn types() -> TypeCatalog {
	TypeCatalog::new()
		.record(
			"m",
			"OrderModel",
			vec![
				FieldDescriptor::direct("id", ty("String")),
				FieldDescriptor::direct("user_id", ty("String")),
				FieldDescriptor::direct("Total", ty("i64")),
				FieldDescriptor::direct("internal", ty("bool")),
				FieldDescriptor::direct("owner", ty("Option<m#UserModel>")),
			],
		)
		.record(
			"m",
			"UserModel",
			vec![FieldDescriptor::direct("name", ty("String"))],
		)
		.record(
			"d",
			"Order",
			vec![
				FieldDescriptor::direct("id", ty("String")),
				FieldDescriptor::direct("user", ty("Option<d#User>")),
				FieldDescriptor::direct("total", ty("i64")),
				FieldDescriptor::direct("internal", ty("bool")),
				FieldDescriptor {
					name: "checksum".to_string(),
					ty: ty("u32"),
					access: FieldAccess::Accessor {
						getter: Some("checksum".to_string()),
						setter: None,
					},
				},
			],
		)
		.record(
			"d",
			"User",
			vec![
				FieldDescriptor::direct("id", ty("String")),
				FieldDescriptor::accessor("secret", ty("String")),
			],
		)
}

fn rules() -> ObjectRules {
	ObjectRules {
		ignore_case: true,
		fields: vec![FieldCorrespondence {
			a: "user_id".to_string(),
			b: "user.id".to_string(),
			converter: None,
		}],
		ignores: vec![IgnoreEntry {
			side: Side::A,
			path: "internal".to_string(),
		}],
		..ObjectRules::default()
	}
}

fn run(direction: Direction, rules: &ObjectRules) -> Result<Vec<ResolvedField>, CompileError> {
	let types = types();
	let cache = DescriptorCache::new(&types);
	let model = cache.describe(&QualifiedName::new("m", "OrderModel")).unwrap();
	let domain = cache.describe(&QualifiedName::new("d", "Order")).unwrap();
	let (source, dest) = match direction {
		Direction::AToB => (model, domain),
		Direction::BToA => (domain, model),
	};
	resolve("Orders", direction, rules, &source, &dest, &cache)
}

fn pairs(fields: &[ResolvedField]) -> Vec<(String, String)> {
	fields
		.iter()
		.map(|field| (field.source.to_string(), field.dest.to_string()))
		.collect()
}

/// Destination declaration order drives the output; explicit, case-insensitive and ignored fields
/// each resolve their own way.
#[test]
fn test_resolve_forward() {
	let fields = run(Direction::AToB, &rules()).unwrap();
	assert_eq!(
		pairs(&fields),
		vec![
			("id".to_string(), "id".to_string()),
			("user_id".to_string(), "user.id".to_string()),
			("Total".to_string(), "total".to_string()),
		]
	);
	assert_eq!(fields[1].dest.ty, ty("String"));
	assert_eq!(fields[1].dest.segments[0].ty, ty("Option<d#User>"));
}

/// The reverse direction swaps the correspondence sides; ignores stay attached to their side.
#[test]
fn test_resolve_backward() {
	let mut rules = rules();
	rules.allow_unmapped = true;
	let fields = run(Direction::BToA, &rules).unwrap();
	assert_eq!(
		pairs(&fields),
		vec![
			("id".to_string(), "id".to_string()),
			("user.id".to_string(), "user_id".to_string()),
			("total".to_string(), "Total".to_string()),
		]
	);
}

/// A destination field without a source counterpart fails the unit.
#[test]
fn test_unmapped_field() {
	let err = run(Direction::BToA, &rules()).unwrap_err();
	assert_eq!(
		err,
		CompileError::UnmappedField {
			unit: "Orders".to_string(),
			field: "owner".to_string(),
			ty: "m#OrderModel".to_string(),
		}
	);
}

/// Case-sensitive matching no longer pairs `Total` with `total`.
#[test]
fn test_case_sensitive() {
	let mut rules = rules();
	rules.ignore_case = false;
	let err = run(Direction::AToB, &rules).unwrap_err();
	assert!(matches!(err, CompileError::UnmappedField { field, .. } if field == "total"));
}

/// Explicit-only units resolve nothing but their correspondences.
#[test]
fn test_explicit_only() {
	let mut rules = rules();
	rules.explicit_only = true;
	let fields = run(Direction::AToB, &rules).unwrap();
	assert_eq!(
		pairs(&fields),
		vec![("user_id".to_string(), "user.id".to_string())]
	);
}

/// A wildcard consumes the whole operand.
#[rstest]
#[case("*", "user", "*", "user")]
#[case("owner", "*", "owner", "*")]
fn test_wildcard(
	#[case] a: &str,
	#[case] b: &str,
	#[case] source: &str,
	#[case] dest: &str,
) {
	let rules = ObjectRules {
		fields: vec![FieldCorrespondence {
			a: a.to_string(),
			b: b.to_string(),
			converter: Some("Wrap".to_string()),
		}],
		..ObjectRules::default()
	};
	let fields = run(Direction::AToB, &rules).unwrap();
	assert_eq!(pairs(&fields), vec![(source.to_string(), dest.to_string())]);
	assert_eq!(fields[0].converter.as_deref(), Some("Wrap"));
}

/// Whole-operand paths carry the operand type.
#[test]
fn test_wildcard_type() {
	let rules = ObjectRules {
		fields: vec![FieldCorrespondence {
			a: "*".to_string(),
			b: "*".to_string(),
			converter: None,
		}],
		..ObjectRules::default()
	};
	let fields = run(Direction::AToB, &rules).unwrap();
	assert!(fields[0].source.is_whole());
	assert_eq!(fields[0].source.ty, ty("m#OrderModel"));
	assert_eq!(fields[0].dest.ty, ty("d#Order"));
}

/// Invalid explicit paths are reported with their side.
#[rstest]
#[case("nope", "id", Side::A)]
#[case("id", "user.nope", Side::B)]
fn test_unknown_field(#[case] a: &str, #[case] b: &str, #[case] side: Side) {
	let rules = ObjectRules {
		allow_unmapped: true,
		fields: vec![FieldCorrespondence {
			a: a.to_string(),
			b: b.to_string(),
			converter: None,
		}],
		..ObjectRules::default()
	};
	let err = run(Direction::AToB, &rules).unwrap_err();
	assert!(matches!(err, CompileError::UnknownField { side: s, .. } if s == side));
}

/// Paths that cannot be read or written are rejected when named explicitly.
#[rstest]
#[case("id", "checksum", "destination field is not writable")]
#[case("id.len", "id", "intermediate segments must be records")]
fn test_unsupported_path(#[case] a: &str, #[case] b: &str, #[case] reason: &str) {
	let rules = ObjectRules {
		allow_unmapped: true,
		fields: vec![FieldCorrespondence {
			a: a.to_string(),
			b: b.to_string(),
			converter: None,
		}],
		..ObjectRules::default()
	};
	let err = run(Direction::AToB, &rules).unwrap_err();
	assert!(matches!(err, CompileError::UnsupportedPath { reason: r, .. } if r == reason));
}

/// A read-only destination field is skipped in implicit mode.
#[test]
fn test_read_only_dest_skipped() {
	let fields = run(Direction::AToB, &rules()).unwrap();
	assert!(fields.iter().all(|field| field.dest.to_string() != "checksum"));
}

/// Accessor segments keep their access kind for the synthesizer.
#[test]
fn test_accessor_segment() {
	let types = types();
	let cache = DescriptorCache::new(&types);
	let user = cache.describe(&QualifiedName::new("d", "User")).unwrap();
	let fields = resolve(
		"Users",
		Direction::AToB,
		&ObjectRules::default(),
		&user,
		&user,
		&cache,
	)
	.unwrap();
	assert_eq!(fields.len(), 2);
	assert_eq!(
		fields[1].dest.segments[0].access,
		FieldAccess::Accessor {
			getter: Some("secret".to_string()),
			setter: Some("set_secret".to_string()),
		}
	);
}

/// A nested explicit path keeps the same-named parent mapping and is resolved after it.
#[test]
fn test_nested_path_keeps_parent() {
	let types = types()
		.record(
			"m",
			"AccountModel",
			vec![
				FieldDescriptor::direct("user_id", ty("String")),
				FieldDescriptor::direct("user", ty("Option<m#UserModel>")),
			],
		)
		.record(
			"d",
			"Account",
			vec![FieldDescriptor::direct("user", ty("Option<d#User>"))],
		);
	let cache = DescriptorCache::new(&types);
	let model = cache.describe(&QualifiedName::new("m", "AccountModel")).unwrap();
	let domain = cache.describe(&QualifiedName::new("d", "Account")).unwrap();
	let rules = ObjectRules {
		fields: vec![FieldCorrespondence {
			a: "user_id".to_string(),
			b: "user.id".to_string(),
			converter: None,
		}],
		..ObjectRules::default()
	};

	let fields = resolve("Accounts", Direction::AToB, &rules, &model, &domain, &cache).unwrap();
	assert_eq!(
		pairs(&fields),
		vec![
			("user".to_string(), "user".to_string()),
			("user_id".to_string(), "user.id".to_string()),
		]
	);
}

/// Naming the parent field itself still replaces its implicit match.
#[test]
fn test_exact_path_replaces_parent() {
	let mut rules = rules();
	rules.fields.push(FieldCorrespondence {
		a: "owner".to_string(),
		b: "user".to_string(),
		converter: None,
	});
	let fields = run(Direction::AToB, &rules).unwrap();
	assert_eq!(
		pairs(&fields),
		vec![
			("id".to_string(), "id".to_string()),
			("user_id".to_string(), "user.id".to_string()),
			("owner".to_string(), "user".to_string()),
			("Total".to_string(), "total".to_string()),
		]
	);
}
