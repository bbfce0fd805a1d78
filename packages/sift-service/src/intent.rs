use serde_json::Value;
use sift_domain::filters::{self, FilterMap};
use tracing::warn;

use crate::SiftService;

/// Fixed instruction describing the filterable payload fields and their value
/// domains, with worked examples. The reply must be one JSON object,
/// optionally fenced; everything else is handled by the parse policy below.
const SYSTEM_INSTRUCTION: &str = "You are a query understanding assistant for a credit-profile search system.

The collection has BOTH filterable payload fields AND free text descriptions.

FILTERABLE FIELDS (use for exact matching):
- target: 0 (paid back) or 1 (defaulted)
- gender: 'M', 'F'
- family_status: 'Married', 'Single / not married', 'Civil marriage', 'Widow', 'Separated'
- education: 'Secondary / secondary special', 'Higher education', 'Incomplete higher', 'Lower secondary', 'Academic degree'
- income_type: 'Working', 'Commercial associate', 'Pensioner', 'State servant', 'Student'
- owns_car: 'Y', 'N'
- owns_realty: 'Y', 'N'
- housing_type: 'House / apartment', 'Rented apartment', 'With parents', 'Municipal apartment', 'Office apartment', 'Co-op apartment'
- occupation: 'Laborers', 'Core staff', 'Sales staff', 'Managers', 'Drivers', 'High skill tech staff', 'Accountants'
- contract_type: 'Cash loans', 'Revolving loans'
- children_count: integer
- family_members: integer
- age_years: integer (young < 35, old > 55)
- years_employed: integer (stable > 5)
- income_total: number (low < 150000, middle 150000-300000, high > 300000)
- credit_amount: number

Numeric fields accept a range form: append '_range' to the field name and
give an object with optional 'gte' and 'lte' bounds.

TEXT (for semantic search): payment patterns, credit history descriptions,
risk reasoning.

Return a JSON object with:
{
  \"filters\": { \"target\": 1, \"gender\": \"F\", \"age_years_range\": { \"lte\": 35 } },
  \"detected_attributes\": [\"Payment Status: DEFAULTED\", \"Gender: FEMALE\"],
  \"search_query\": \"remaining terms for semantic search\"
}

Examples:

Query: \"Find young married female clients who didn't pay\"
Response: {
  \"filters\": { \"target\": 1, \"gender\": \"F\", \"family_status\": \"Married\", \"age_years_range\": { \"lte\": 35 } },
  \"detected_attributes\": [\"Payment Status: DEFAULTED\", \"Gender: FEMALE\", \"Marital Status: MARRIED\", \"Age: YOUNG (<35)\"],
  \"search_query\": \"\"
}

Query: \"Show high income clients who own real estate and paid back\"
Response: {
  \"filters\": { \"target\": 0, \"owns_realty\": \"Y\", \"income_total_range\": { \"gte\": 300000 } },
  \"detected_attributes\": [\"Payment Status: PAID BACK\", \"Assets: OWNS REAL ESTATE\", \"Income: HIGH (>300k)\"],
  \"search_query\": \"\"
}

Query: \"Show pensioners with low payment completion who defaulted\"
Response: {
  \"filters\": { \"target\": 1, \"income_type\": \"Pensioner\" },
  \"detected_attributes\": [\"Payment Status: DEFAULTED\", \"Income Type: PENSIONER\", \"Payment Behavior: LOW COMPLETION\"],
  \"search_query\": \"low payment completion ratio percentage\"
}

IMPORTANT:
- Use filters for ANY attribute that matches a filterable field.
- Use search_query ONLY for vague concepts or payment patterns with no field.
- Always return valid JSON, no markdown.";

/// The normalized outcome of intent resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedIntent {
	pub search_text: String,
	pub filters: FilterMap,
	pub detected_attributes: Vec<String>,
}

impl SiftService {
	/// Resolves a free-text query into a cleaned search string plus
	/// structured filters. This boundary never fails: a disabled parser, an
	/// unreachable service, or an unparsable reply all collapse to the
	/// fallback intent that searches with the raw query and no filters.
	pub async fn resolve_intent(&self, query: &str) -> ResolvedIntent {
		let cfg = &self.cfg.providers.llm_parser;

		if !cfg.enabled {
			return fallback_intent(query);
		}

		let messages = build_parse_messages(query);

		match self.providers.chat.complete(cfg, &messages).await {
			Ok(reply) => parse_reply(query, &reply),
			Err(err) => {
				warn!(error = %err, "Intent parsing call failed; using fallback intent.");

				fallback_intent(query)
			},
		}
	}
}

pub(crate) fn fallback_intent(query: &str) -> ResolvedIntent {
	ResolvedIntent {
		search_text: query.to_string(),
		filters: FilterMap::new(),
		detected_attributes: Vec::new(),
	}
}

pub(crate) fn build_parse_messages(query: &str) -> Vec<Value> {
	vec![
		serde_json::json!({ "role": "system", "content": SYSTEM_INSTRUCTION }),
		serde_json::json!({ "role": "user", "content": format!("Parse this query:\n\n{query}") }),
	]
}

/// Coerces a reply into a [`ResolvedIntent`]. Missing or empty fields default
/// rather than fail: `search_query` falls back to the original query,
/// `filters` to empty, `detected_attributes` to none. An unparsable reply
/// yields the fallback intent.
pub(crate) fn parse_reply(query: &str, reply: &str) -> ResolvedIntent {
	let body = strip_code_fence(reply);
	let parsed: Value = match serde_json::from_str(body) {
		Ok(value) => value,
		Err(err) => {
			warn!(error = %err, "Intent reply is not valid JSON; using fallback intent.");

			return fallback_intent(query);
		},
	};
	let search_text = parsed
		.get("search_query")
		.and_then(|v| v.as_str())
		.map(str::trim)
		.filter(|text| !text.is_empty())
		.unwrap_or(query)
		.to_string();
	let filters =
		parsed.get("filters").and_then(|v| v.as_object()).map(filters::from_json).unwrap_or_default();
	let detected_attributes = parsed
		.get("detected_attributes")
		.and_then(|v| v.as_array())
		.map(|items| {
			items.iter().filter_map(|item| item.as_str().map(|text| text.to_string())).collect()
		})
		.unwrap_or_default();

	ResolvedIntent { search_text, filters, detected_attributes }
}

fn strip_code_fence(reply: &str) -> &str {
	let trimmed = reply.trim();
	let Some(rest) = trimmed.strip_prefix("```") else {
		return trimmed;
	};
	let rest = rest.strip_prefix("json").unwrap_or(rest);
	let rest = rest.strip_suffix("```").unwrap_or(rest);

	rest.trim()
}

#[cfg(test)]
mod tests {
	use sift_domain::filters::FilterSpec;

	use super::*;

	#[test]
	fn parses_filters_and_attributes() {
		let reply = r#"{
			"filters": { "target": 1, "income_total_range": { "gte": 300000 } },
			"detected_attributes": ["Payment Status: DEFAULTED"],
			"search_query": "risky payment history"
		}"#;
		let intent = parse_reply("original", reply);

		assert_eq!(intent.search_text, "risky payment history");
		assert_eq!(intent.filters.get("target"), Some(&FilterSpec::exact(1)));
		assert_eq!(
			intent.filters.get("income_total_range"),
			Some(&FilterSpec::range(Some(300_000.0), None))
		);
		assert_eq!(intent.detected_attributes, vec!["Payment Status: DEFAULTED".to_string()]);
	}

	#[test]
	fn strips_json_code_fences() {
		let reply = "```json\n{ \"filters\": { \"target\": 0 } }\n```";
		let intent = parse_reply("who paid back", reply);

		assert_eq!(intent.filters.get("target"), Some(&FilterSpec::exact(0)));
		// No search_query in the reply, so the original query stands in.
		assert_eq!(intent.search_text, "who paid back");
	}

	#[test]
	fn strips_anonymous_code_fences() {
		let reply = "```\n{ \"search_query\": \"stable employment\" }\n```";
		let intent = parse_reply("original", reply);

		assert_eq!(intent.search_text, "stable employment");
	}

	#[test]
	fn empty_search_query_defaults_to_the_original() {
		let intent = parse_reply("find defaulters", r#"{ "search_query": "  ", "filters": {} }"#);

		assert_eq!(intent.search_text, "find defaulters");
	}

	#[test]
	fn unparsable_reply_yields_the_fallback_intent() {
		let intent = parse_reply("find defaulters", "I could not parse that query, sorry!");

		assert_eq!(intent, fallback_intent("find defaulters"));
		assert!(intent.filters.is_empty());
	}

	#[test]
	fn user_message_carries_the_raw_query() {
		let messages = build_parse_messages("two children");

		assert_eq!(messages.len(), 2);
		assert_eq!(messages[1]["content"], "Parse this query:\n\ntwo children");
	}
}
