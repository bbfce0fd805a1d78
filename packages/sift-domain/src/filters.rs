use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Keys carrying this suffix hold range predicates; the retrieval gateway
/// strips it to obtain the payload field name.
pub const RANGE_SUFFIX: &str = "_range";

/// One filter predicate: either equality on a field or a one/two-sided bound.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum FilterSpec {
	Exact(Value),
	Range { gte: Option<f64>, lte: Option<f64> },
}
impl FilterSpec {
	pub fn range(gte: Option<f64>, lte: Option<f64>) -> Self {
		Self::Range { gte, lte }
	}

	pub fn exact(value: impl Into<Value>) -> Self {
		Self::Exact(value.into())
	}

	/// A range with neither bound is invalid and must be dropped before
	/// dispatch.
	pub fn is_empty_range(&self) -> bool {
		matches!(self, Self::Range { gte: None, lte: None })
	}
}

/// Filters keyed by field name. A `BTreeMap` keeps dispatch order
/// deterministic.
pub type FilterMap = BTreeMap<String, FilterSpec>;

/// Strips the range suffix from a filter key, if present.
pub fn range_field(key: &str) -> Option<&str> {
	key.strip_suffix(RANGE_SUFFIX)
}

/// Overlays resolver-derived filters onto caller-supplied ones. On a key
/// collision the resolved filter wins; callers that must force a filter
/// cannot also mention that attribute in the free-text query.
pub fn merge(explicit: Option<&FilterMap>, resolved: &FilterMap) -> FilterMap {
	let mut merged = explicit.cloned().unwrap_or_default();

	for (key, spec) in resolved {
		merged.insert(key.clone(), spec.clone());
	}

	merged
}

/// Converts a loosely-typed JSON filter object into the typed filter map.
/// Keys ending in [`RANGE_SUFFIX`] whose value is an object become range
/// filters; every other key passes through as an exact match. Unrecognized
/// keys are intentionally not validated here; the retrieval gateway owns
/// schema validation.
pub fn from_json(object: &Map<String, Value>) -> FilterMap {
	let mut filters = FilterMap::new();

	for (key, value) in object {
		if key.ends_with(RANGE_SUFFIX)
			&& let Some(bounds) = value.as_object()
		{
			let gte = bounds.get("gte").and_then(Value::as_f64);
			let lte = bounds.get("lte").and_then(Value::as_f64);

			filters.insert(key.clone(), FilterSpec::Range { gte, lte });

			continue;
		}

		filters.insert(key.clone(), FilterSpec::Exact(value.clone()));
	}

	filters
}
