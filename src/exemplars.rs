/// A curated question/SQL pair used for few-shot guidance.
#[derive(Debug, Clone, Copy)]
pub struct Exemplar {
    pub question: &'static str,
    pub sql: &'static str,
}

/// Base exemplars covering single-report lookups across all four tables.
pub const BASE_EXAMPLES: &[Exemplar] = &[
    Exemplar {
        question: "What is the fine for report number 123?",
        sql: "SELECT קנס FROM enforcement WHERE \"מס' דו''ח\" = 123;",
    },
    Exemplar {
        question: "How much was paid for report number 456?",
        sql: "SELECT שולם FROM report_data WHERE \"מס' דו''ח\" = 456;",
    },
    Exemplar {
        question: "What is the address for the individual in report number 789?",
        sql: "SELECT רחוב, \"'מס\", דירה, עיר FROM address_database WHERE \"מס' דו''ח\" = 789;",
    },
    Exemplar {
        question: "List all financial transactions for report number 101.",
        sql: "SELECT * FROM financial_transactions WHERE \"מס' דו''ח\" = 101;",
    },
    Exemplar {
        question: "What is the offense and fine for report number 202?",
        sql: "SELECT עבירה, קנס FROM enforcement WHERE \"מס' דו''ח\" = 202;",
    },
];

/// Date-oriented exemplars: month filters, quarter filters, per-group counts.
/// These teach the model to filter on date_formatted with literal ranges.
pub const DATE_EXAMPLES: &[Exemplar] = &[
    Exemplar {
        question: "How many tickets were issued in December 2024?",
        sql: "SELECT COUNT(*) FROM enforcement WHERE strftime('%Y-%m', date_formatted) = '2024-12';",
    },
    Exemplar {
        question: "List the inspectors who issued tickets in the last quarter of 2024.",
        sql: "SELECT DISTINCT \"שם פקח\" FROM enforcement WHERE date_formatted >= '2024-10-01' AND date_formatted <= '2024-12-31';",
    },
    Exemplar {
        question: "How many tickets did each inspector issue in the first month of 2024?",
        sql: "SELECT \"שם פקח\", COUNT(*) as ticket_count FROM enforcement WHERE date_formatted BETWEEN '2024-01-01' AND '2024-01-31' GROUP BY \"שם פקח\" ORDER BY ticket_count DESC;",
    },
];

/// Merge the base bank with the date exemplars. Built per call so future
/// extensions can vary exemplars per question without mutating shared state.
pub fn merged() -> Vec<Exemplar> {
    BASE_EXAMPLES.iter().chain(DATE_EXAMPLES.iter()).copied().collect()
}
