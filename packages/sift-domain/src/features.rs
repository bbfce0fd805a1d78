use regex::{Captures, Regex};

/// How many characters of raw text stand in for the weighted string when no
/// attribute is recognized at all.
const RAW_FALLBACK_CHARS: usize = 500;

/// Structured sibling of [`weight_features`], used for debugging and display.
/// Fields are absent when the attribute is not present in the input.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct ProfileSummary {
	pub age: Option<u32>,
	pub children: Option<u32>,
	pub years_employed: Option<u32>,
	pub outstanding_debt: Option<u64>,
	pub payment_completion: Option<f32>,
	pub owns_realty: Option<bool>,
	pub owns_car: Option<bool>,
}

/// Rewrites a profile-style text blob into a feature-weighted string for
/// embedding. Each recognized attribute contributes its normalized phrase
/// repeated a fixed number of times set by its importance tier, so the
/// embedding leans toward discriminative attributes instead of prose filler.
///
/// Attributes absent from the input contribute nothing, except for the
/// explicit zero-state phrases ("no current overdue", "no historical
/// overdue", "no prolongations") which are emitted at a reduced weight when
/// the attribute is present with a zero value. Two derived features are
/// computed when their inputs are available: debt-to-income and credit
/// utilization, both bucketed and weighted at the top of the table.
///
/// The output is deterministic: phrases appear in recognition-table order and
/// the same input always yields byte-identical output. When nothing is
/// recognized the first 500 characters of the raw input are returned
/// verbatim.
pub fn weight_features(text: &str) -> String {
	let mut features = Vec::new();
	let mut income_value: Option<f64> = None;
	let mut debt_value: Option<f64> = None;
	let mut external_credit_value: Option<f64> = None;

	if let Some(caps) = capture(r"(?i)Age:\s*(\d+)\s*years?", text) {
		push_repeated(&mut features, format!("age {} years", &caps[1]), 1);
	}
	if let Some(caps) = capture(r"(?i)Gender:\s*([MF])", text) {
		push_repeated(&mut features, format!("gender {}", &caps[1]), 1);
	}
	if let Some(caps) = capture(r"(?i)Education Level:\s*([^\n]+)", text) {
		push_repeated(&mut features, format!("education {}", caps[1].trim()), 1);
	}
	if let Some(caps) = capture(r"(?i)Family Status:\s*([^\n]+)", text) {
		push_repeated(&mut features, format!("family status {}", caps[1].trim()), 2);
	}
	if let Some(caps) = capture(r"(?i)Number of Children:\s*(\d+)", text) {
		push_repeated(&mut features, format!("{} children", &caps[1]), 3);
	}
	if let Some(caps) = capture(r"(?i)Household Size:\s*(\d+)", text) {
		push_repeated(&mut features, format!("household size {}", &caps[1]), 2);
	}
	if let Some(caps) = capture(r"(?i)Housing Type:\s*([^\n]+)", text) {
		push_repeated(&mut features, format!("housing {}", caps[1].trim()), 2);
	}
	if let Some(caps) = capture(r"(?i)Owns Real Estate:\s*(Yes|No)", text) {
		let phrase = if caps[1].eq_ignore_ascii_case("yes") {
			"owns real estate"
		} else {
			"no real estate"
		};

		push_repeated(&mut features, phrase.to_string(), 3);
	}
	if let Some(caps) = capture(r"(?i)Owns a Car:\s*(Yes|No)", text) {
		let phrase = if caps[1].eq_ignore_ascii_case("yes") { "owns car" } else { "no car" };

		push_repeated(&mut features, phrase.to_string(), 3);
	}
	if let Some(caps) = capture(r"(?i)age:\s*(\d+)\s*years?\)", text) {
		push_repeated(&mut features, format!("car age {} years", &caps[1]), 1);
	}
	if let Some(caps) = capture(r"(?i)Income Type:\s*([^\n]+)", text) {
		push_repeated(&mut features, format!("income type {}", caps[1].trim()), 2);
	}
	if let Some(caps) = capture(r"(?i)Occupation:\s*([^\n]+)", text) {
		push_repeated(&mut features, format!("occupation {}", caps[1].trim()), 3);
	}
	if let Some(caps) = capture(r"(?i)Years Employed:\s*(\d+)", text) {
		push_repeated(&mut features, format!("employed {} years", &caps[1]), 5);
	}
	if let Some(caps) = capture(r"(?i)Annual Income:\s*\$?([\d,]+)", text) {
		let digits = strip_thousands(&caps[1]);

		income_value = digits.parse().ok();

		push_repeated(&mut features, format!("income ${digits}"), 5);
	}
	if let Some(caps) = capture(r"(?i)Contract Type:\s*([^\n]+)", text) {
		push_repeated(&mut features, format!("contract {}", caps[1].trim()), 2);
	}
	if let Some(caps) = capture(r"(?i)Requested Credit Amount[:\s]*\$?([\d,]+)", text) {
		push_repeated(&mut features, format!("requesting ${}", strip_thousands(&caps[1])), 3);
	}
	if let Some(caps) = capture(r"(?i)Monthly Annuity[:\s]*\$?([\d,]+)", text) {
		push_repeated(&mut features, format!("monthly payment ${}", strip_thousands(&caps[1])), 3);
	}
	if let Some(caps) = capture(r"(?i)Average Previous Credit Amount[:\s]*\$?([\d,]+)", text) {
		push_repeated(&mut features, format!("previous credit ${}", strip_thousands(&caps[1])), 4);
	}
	if let Some(caps) = capture(r"(?i)Approval Rate[:\s]*([\d.]+)%", text) {
		push_repeated(&mut features, format!("approval rate {}%", &caps[1]), 8);
	}
	if let Some(caps) = capture(r"(?i)Active External Credits[:\s]*(\d+)", text) {
		push_repeated(&mut features, format!("{} active credits", &caps[1]), 5);
	}
	if let Some(caps) = capture(r"(?i)Total External Credit Amount[:\s]*\$?([\d,]+)", text) {
		let digits = strip_thousands(&caps[1]);

		external_credit_value = digits.parse().ok();

		push_repeated(&mut features, format!("external credit ${digits}"), 5);
	}
	if let Some(caps) = capture(r"(?i)Total Outstanding Debt[:\s]*\$?([\d,]+)", text) {
		let digits = strip_thousands(&caps[1]);

		debt_value = digits.parse().ok();

		push_repeated(&mut features, format!("outstanding debt ${digits}"), 10);
	}
	if let Some(caps) = capture(r"(?i)Historical Maximum Overdue Amount[:\s]*\$?([\d,]+)", text) {
		push_repeated(&mut features, format!("max overdue amount ${}", strip_thousands(&caps[1])), 7);
	}
	if let Some(caps) = capture(r"(?i)Average Payment Delay[:\s]*(-?[\d.]+)\s*days", text) {
		let delay: f64 = caps[1].parse().unwrap_or(0.0);

		if delay < 0.0 {
			let magnitude = caps[1].trim_start_matches('-');

			push_repeated(&mut features, format!("early payments {magnitude} days"), 10);
		} else if delay == 0.0 {
			push_repeated(&mut features, "on-time payments".to_string(), 10);
		} else {
			push_repeated(&mut features, format!("late payments {} days", &caps[1]), 10);
		}
	}
	if let Some(caps) = capture(r"(?i)Payment Completion Ratio[:\s]*([\d.]+)%", text) {
		push_repeated(&mut features, format!("payment completion {}%", &caps[1]), 12);
	}
	if let Some(caps) = capture(r"(?i)Current Overdue Days[:\s]*(\d+)", text) {
		let overdue: u64 = caps[1].parse().unwrap_or(0);

		if overdue > 0 {
			push_repeated(&mut features, format!("currently overdue {overdue} days"), 10);
		} else {
			push_repeated(&mut features, "no current overdue".to_string(), 10);
		}
	}
	if let Some(caps) = capture(r"(?i)Historical Maximum Overdue Days[:\s]*(\d+)", text) {
		let max_overdue: u64 = caps[1].parse().unwrap_or(0);

		if max_overdue > 0 {
			push_repeated(&mut features, format!("max overdue {max_overdue} days"), 12);
		} else {
			push_repeated(&mut features, "no historical overdue".to_string(), 8);
		}
	}
	if let Some(caps) = capture(r"(?i)Total Credit Prolongations[:\s]*(\d+)", text) {
		let prolongations: u64 = caps[1].parse().unwrap_or(0);

		if prolongations > 0 {
			push_repeated(&mut features, format!("{prolongations} prolongations"), 6);
		} else {
			push_repeated(&mut features, "no prolongations".to_string(), 4);
		}
	}

	// Derived features. Both depend on outstanding debt plus a denominator
	// and rank above every directly extracted attribute.
	if let (Some(income), Some(debt)) = (income_value, debt_value)
		&& income > 0.0
	{
		let ratio = debt / income * 100.0;
		let phrase = if ratio == 0.0 {
			"debt-to-income 0% no debt".to_string()
		} else if ratio < 20.0 {
			format!("debt-to-income {ratio:.1}% low debt")
		} else if ratio < 40.0 {
			format!("debt-to-income {ratio:.1}% moderate debt")
		} else if ratio < 60.0 {
			format!("debt-to-income {ratio:.1}% high debt")
		} else {
			format!("debt-to-income {ratio:.1}% very high debt")
		};

		push_repeated(&mut features, phrase, 15);
	}
	if let (Some(external), Some(debt)) = (external_credit_value, debt_value)
		&& external > 0.0
	{
		let utilization = debt / external * 100.0;
		let phrase = if utilization == 0.0 {
			"credit utilization 0% fully paid".to_string()
		} else if utilization < 30.0 {
			format!("credit utilization {utilization:.1}% low")
		} else if utilization < 60.0 {
			format!("credit utilization {utilization:.1}% moderate")
		} else {
			format!("credit utilization {utilization:.1}% high")
		};

		push_repeated(&mut features, phrase, 12);
	}

	if features.is_empty() {
		return text.chars().take(RAW_FALLBACK_CHARS).collect();
	}

	features.join(" ")
}

/// Extracts the key fields of a profile text as typed values.
pub fn extract_summary(text: &str) -> ProfileSummary {
	let mut summary = ProfileSummary::default();

	if let Some(caps) = capture(r"(?i)Age:\s*(\d+)", text) {
		summary.age = caps[1].parse().ok();
	}
	if let Some(caps) = capture(r"(?i)Number of Children:\s*(\d+)", text) {
		summary.children = caps[1].parse().ok();
	}
	if let Some(caps) = capture(r"(?i)Years Employed:\s*(\d+)", text) {
		summary.years_employed = caps[1].parse().ok();
	}
	if let Some(caps) = capture(r"(?i)Total Outstanding Debt[:\s]*\$?([\d,]+)", text) {
		summary.outstanding_debt = strip_thousands(&caps[1]).parse().ok();
	}
	if let Some(caps) = capture(r"(?i)Payment Completion Ratio[:\s]*([\d.]+)%", text) {
		summary.payment_completion = caps[1].parse().ok();
	}
	if let Some(caps) = capture(r"(?i)Owns Real Estate:\s*(Yes|No)", text) {
		summary.owns_realty = Some(caps[1].eq_ignore_ascii_case("yes"));
	}
	if let Some(caps) = capture(r"(?i)Owns a Car:\s*(Yes|No)", text) {
		summary.owns_car = Some(caps[1].eq_ignore_ascii_case("yes"));
	}

	summary
}

fn capture<'t>(pattern: &str, text: &'t str) -> Option<Captures<'t>> {
	Regex::new(pattern).ok().and_then(|re| re.captures(text))
}

fn push_repeated(features: &mut Vec<String>, phrase: String, count: usize) {
	features.extend(std::iter::repeat_n(phrase, count));
}

fn strip_thousands(raw: &str) -> String {
	raw.replace(',', "")
}
