//! Hand-written types and conversion units plus the mapping code `build.rs` generates for them.
//!
//! Module paths here must match the `location`/`module` entries of `mapweave.toml` and
//! `types.toml`.

/// Persistence-side records.
pub mod model {
	use std::collections::BTreeMap;

	#[derive(Debug, Clone, Default, PartialEq, Eq)]
	pub struct TodoModel {
		pub id: String,
		pub done: bool,
		pub user_id: String,
		pub ordinal: i32,
		pub validate_only: bool,
	}

	#[derive(Debug, Clone, Default, PartialEq, Eq)]
	pub struct UserModel {
		pub id: String,
		pub name: String,
		secret: String,
	}

	impl UserModel {
		pub fn secret(&self) -> String {
			self.secret.clone()
		}

		pub fn set_secret(&mut self, secret: String) {
			self.secret = secret;
		}
	}

	#[derive(Debug, Clone, Default, PartialEq, Eq)]
	pub struct OrderModel {
		pub owner: Option<UserModel>,
		pub items: Option<Vec<i32>>,
		pub scores: BTreeMap<String, i32>,
		pub codes: [u8; 3],
		pub priority: u8,
		pub lines: Vec<LineModel>,
	}

	#[derive(Debug, Clone, Default, PartialEq, Eq)]
	pub struct LineModel {
		pub sku: String,
		pub qty: u16,
	}

	#[derive(Debug, Clone, Default, PartialEq, Eq)]
	pub struct ListModel {
		pub values: Vec<i32>,
		pub extra: Option<Vec<i32>>,
		pub missing: Option<Vec<i32>>,
	}

	#[derive(Debug, Clone, Default, PartialEq, Eq)]
	pub struct AccountModel {
		pub user_id: String,
		pub user: Option<UserModel>,
	}
}

/// Domain-side records.
pub mod domain {
	use std::collections::HashMap;

	#[derive(Debug, Clone, Default, PartialEq, Eq)]
	pub struct Todo {
		pub id: String,
		pub finished: bool,
		pub user: Option<User>,
		pub ordinal: i64,
		/// Filled in by helpers, never mapped.
		pub audit: String,
	}

	#[derive(Debug, Clone, Default, PartialEq, Eq)]
	pub struct User {
		pub id: String,
		pub name: String,
		pub secret: String,
	}

	#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
	pub struct Priority(pub u8);

	#[derive(Debug, Clone, Default, PartialEq, Eq)]
	pub struct Order {
		pub owner: Option<User>,
		pub items: Option<Vec<i64>>,
		pub scores: HashMap<String, i64>,
		pub codes: Vec<u16>,
		pub priority: Priority,
		pub lines: Vec<Line>,
	}

	#[derive(Debug, Clone, Default, PartialEq, Eq)]
	pub struct Line {
		pub sku: String,
		pub qty: u32,
	}

	#[derive(Debug, Clone, Default, PartialEq, Eq)]
	pub struct List {
		pub values: Vec<String>,
		pub extra: Option<Vec<String>>,
		pub missing: Vec<String>,
	}

	#[derive(Debug, Clone, Default, PartialEq, Eq)]
	pub struct Account {
		pub user: Option<User>,
	}

	/// Embeds a whole user; `label` is never mapped.
	#[derive(Debug, Clone, Default, PartialEq, Eq)]
	pub struct Profile {
		pub user: User,
		pub label: String,
	}
}

/// Conversion units registered by the generated bootstrap.
pub mod convert {
	use mapweave_registry::{
		Context, ConverterFn, Exports, FuncDecl, MapError, Registry, converter_fn,
	};

	/// Global `i32 -> String` conversion.
	pub fn register_int_string(registry: &mut Registry) {
		registry.add_converter(
			"IntStringConverter",
			"i32",
			"String",
			|_ctx: &Context, value: &i32| Ok(value.to_string()),
		);
	}

	/// Scales ordinals between their stored and displayed form.
	///
	/// Only reachable through owner-qualified lookups.
	#[derive(Debug, Clone, Copy)]
	pub struct FancyIntConverter {
		pub scale: i64,
	}

	impl FancyIntConverter {
		pub fn widen(&self, _ctx: &Context, value: &i32) -> Result<i64, MapError> {
			Ok(i64::from(*value) * self.scale)
		}

		pub fn narrow(&self, _ctx: &Context, value: &i64) -> Result<i32, MapError> {
			i32::try_from(value / self.scale).map_err(MapError::other)
		}
	}

	pub fn register_fancy_int(registry: &mut Registry) {
		let exports = Exports::new()
			.func(FuncDecl::converter(
				"i32",
				"i64",
				"widen",
				|owner: &FancyIntConverter| -> ConverterFn<i32, i64> {
					let owner = *owner;
					converter_fn(move |ctx, value| owner.widen(ctx, value))
				},
			))
			.func(FuncDecl::converter(
				"i64",
				"i32",
				"narrow",
				|owner: &FancyIntConverter| -> ConverterFn<i64, i32> {
					let owner = *owner;
					converter_fn(move |ctx, value| owner.narrow(ctx, value))
				},
			))
			.local();
		registry.add("FancyIntConverter", FancyIntConverter { scale: 10 }, exports);
	}
}

/// Mapping units generated from `mapweave.toml`.
pub mod generated {
	include!(concat!(env!("OUT_DIR"), "/generated.rs"));
}

/// Registry bootstrap generated from `mapweave.toml`.
pub mod mappers {
	include!(concat!(env!("OUT_DIR"), "/mappers.rs"));
}
