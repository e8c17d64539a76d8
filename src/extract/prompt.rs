//! Prompt text sent to the completion service.

use chrono::{DateTime, Utc};

/// Upper bound on categories requested from the model.
pub const MAX_CATEGORIES: usize = 3;

/// Build the extraction instruction for one piece of task text.
///
/// `now` supplies the date used to resolve relative phrases like "tomorrow".
/// `known_categories` are listed so the model reuses them instead of
/// inventing near-duplicates.
pub fn extraction_prompt(text: &str, known_categories: &[String], now: DateTime<Utc>) -> String {
    let today = now.format("%Y-%m-%d");
    let weekday = now.format("%A");
    let known = if known_categories.is_empty() {
        "(none yet)".to_string()
    } else {
        known_categories.join(", ")
    };

    format!(
        r#"Extract structured details from this to-do item: "{text}"

Today is {weekday}, {today}. Resolve relative dates ("tomorrow", "next friday") against today.

Existing categories: {known}
Prefer reusing an existing category. Only invent a new one when none fits.

Respond with ONLY a JSON object, no prose and no code fences, using exactly these keys:
{{
  "dueDate": ISO-8601 date or date-time string, or null when no date is mentioned,
  "priority": one of "P1", "P2", "P3", "P4" (P1 most urgent), or null when unclear,
  "duration": short estimate such as "15m", "1h", "2.5h", "1-2 days",
  "categories": array of 1 to {max} category names,
  "cleanTitle": the task text with date, priority and duration phrases removed
}}"#,
        text = text.trim(),
        weekday = weekday,
        today = today,
        known = known,
        max = MAX_CATEGORIES,
    )
}

/// Build the duration-only instruction.
pub fn duration_prompt(title: &str) -> String {
    format!(
        r#"Estimate how long this to-do item takes to complete: "{}"
Respond with ONLY a short duration string such as "15m", "1h", "2.5h", "3 days", "1-2 days".
Do not add quotes or any other text."#,
        title.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_extraction_prompt_embeds_date_and_categories() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap();
        let prompt = extraction_prompt(
            "  buy milk tomorrow p1 ",
            &["Errands".to_string(), "Work".to_string()],
            now,
        );
        assert!(prompt.contains("\"buy milk tomorrow p1\""));
        assert!(prompt.contains("2026-10-19"));
        assert!(prompt.contains("Monday"));
        assert!(prompt.contains("Existing categories: Errands, Work"));
        assert!(prompt.contains("\"cleanTitle\""));
        assert!(prompt.contains("1 to 3"));
    }

    #[test]
    fn test_extraction_prompt_without_categories() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let prompt = extraction_prompt("x", &[], now);
        assert!(prompt.contains("(none yet)"));
    }
}
