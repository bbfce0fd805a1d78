use std::collections::HashMap;

use qdrant_client::qdrant::{PointId, Value, point_id::PointIdOptions, value::Kind};
use serde_json::{Map, Number};

/// Payload field that names the profile a point belongs to.
pub const PROFILE_ID_FIELD: &str = "profile_id";

/// Converts a point payload into plain JSON. Map keys come out sorted, so
/// the conversion is deterministic.
pub fn payload_to_json(payload: &HashMap<String, Value>) -> serde_json::Value {
	let mut map = Map::new();

	for (key, value) in payload {
		map.insert(key.clone(), value_to_json(value));
	}

	serde_json::Value::Object(map)
}

pub fn point_id_string(id: &PointId) -> Option<String> {
	match &id.point_id_options {
		Some(PointIdOptions::Uuid(value)) => Some(value.clone()),
		Some(PointIdOptions::Num(value)) => Some(value.to_string()),
		None => None,
	}
}

/// Resolves the entity id of a hit. The `profile_id` payload field wins;
/// the raw point id is the fallback for points indexed without one.
pub fn entity_id(payload: &HashMap<String, Value>, id: Option<&PointId>) -> String {
	if let Some(value) = payload.get(PROFILE_ID_FIELD) {
		match &value.kind {
			Some(Kind::StringValue(text)) => return text.clone(),
			Some(Kind::IntegerValue(number)) => return number.to_string(),
			_ => {},
		}
	}

	id.and_then(point_id_string).unwrap_or_default()
}

fn value_to_json(value: &Value) -> serde_json::Value {
	match &value.kind {
		None | Some(Kind::NullValue(_)) => serde_json::Value::Null,
		Some(Kind::BoolValue(flag)) => (*flag).into(),
		Some(Kind::IntegerValue(number)) => (*number).into(),
		Some(Kind::DoubleValue(number)) =>
			Number::from_f64(*number).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null),
		Some(Kind::StringValue(text)) => text.clone().into(),
		Some(Kind::ListValue(list)) =>
			serde_json::Value::Array(list.values.iter().map(value_to_json).collect()),
		Some(Kind::StructValue(nested)) => {
			let mut map = Map::new();

			for (key, value) in &nested.fields {
				map.insert(key.clone(), value_to_json(value));
			}

			serde_json::Value::Object(map)
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn string_value(text: &str) -> Value {
		Value { kind: Some(Kind::StringValue(text.to_string())) }
	}

	fn integer_value(number: i64) -> Value {
		Value { kind: Some(Kind::IntegerValue(number)) }
	}

	#[test]
	fn payload_converts_to_plain_json() {
		let mut payload = HashMap::new();

		payload.insert("target".to_string(), integer_value(1));
		payload.insert("gender".to_string(), string_value("F"));
		payload.insert(
			"score".to_string(),
			Value { kind: Some(Kind::DoubleValue(0.25)) },
		);

		let json = payload_to_json(&payload);

		assert_eq!(json, serde_json::json!({ "gender": "F", "score": 0.25, "target": 1 }));
	}

	#[test]
	fn profile_id_field_wins_over_point_id() {
		let mut payload = HashMap::new();

		payload.insert(PROFILE_ID_FIELD.to_string(), integer_value(100_021));

		let id = PointId { point_id_options: Some(PointIdOptions::Num(7)) };

		assert_eq!(entity_id(&payload, Some(&id)), "100021");
		assert_eq!(entity_id(&HashMap::new(), Some(&id)), "7");
		assert_eq!(entity_id(&HashMap::new(), None), "");
	}
}
