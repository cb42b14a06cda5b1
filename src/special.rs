use crate::error::Result;
use crate::executor::{self, QueryResult};
use std::path::Path;
use tracing::debug;

/// Fixed label passed to narration in place of a generated statement.
pub const DISABLED_VEHICLE_LABEL: &str = "Special query for calculating disabled vehicle percentage";

const INTENT_TERMS: [&str; 4] = ["נכים", "disabled", "percentage", "אחוז"];
const VEHICLE_TERMS: [&str; 2] = ["רכב", "vehicle"];

/// The נכה column mixes textual and numeric encodings of "yes", so the
/// aggregation is hand-authored rather than left for the model to reconstruct.
const DISABLED_VEHICLE_SQL: &str = "\
SELECT
    COUNT(*) as total_tickets,
    SUM(CASE WHEN נכה = 'כן' THEN 1
             WHEN נכה = 'yes' THEN 1
             WHEN נכה = '1' THEN 1
             WHEN נכה = 1 THEN 1
             ELSE 0 END) as disabled_tickets,
    ROUND((SUM(CASE WHEN נכה = 'כן' THEN 1
                 WHEN נכה = 'yes' THEN 1
                 WHEN נכה = '1' THEN 1
                 WHEN נכה = 1 THEN 1
                 ELSE 0 END) * 100.0) / COUNT(*), 2) as percentage
FROM enforcement";

/// Conjunctive trigger: a disabled/percentage term AND a vehicle term, in
/// either supported language. A disabled term alone does not match.
pub fn matches(question: &str) -> bool {
    let lower = question.to_lowercase();
    INTENT_TERMS.iter().any(|term| lower.contains(term))
        && VEHICLE_TERMS.iter().any(|term| lower.contains(term))
}

/// Execute the hand-authored aggregate. Flows through the same QueryResult
/// contract as the generic pipeline, so narration stays strategy-agnostic.
pub fn run(db_path: &Path) -> Result<QueryResult> {
    if let Ok(distinct) = executor::execute(db_path, "SELECT DISTINCT נכה FROM enforcement") {
        debug!("distinct values in נכה column: {:?}", distinct.rows);
    }

    let mut result = executor::execute(db_path, DISABLED_VEHICLE_SQL)?;
    result.columns = vec![
        "Total Tickets".to_string(),
        "Disabled Vehicle Tickets".to_string(),
        "Percentage".to_string(),
    ];
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_requires_both_terms() {
        // A disabled keyword alone must not trigger the strategy.
        assert!(!matches("How many disabled residents are registered?"));
        assert!(!matches("כמה נכים רשומים בעיר?"));
        // A vehicle keyword alone must not trigger it either.
        assert!(!matches("How many vehicles got tickets?"));
    }

    #[test]
    fn trigger_matches_in_both_languages() {
        assert!(matches("כמה רכבי נכים קיבלו דוחות?"));
        assert!(matches("What percentage of tickets went to disabled vehicles?"));
        assert!(matches("מה אחוז הדוחות לרכב נכה?"));
    }
}
