use chrono::{Datelike, NaiveDate};

/// One physical column and its English semantic label.
#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub physical: &'static str,
    pub label: &'static str,
}

/// A table known to the assistant, with its source CSV file.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub name: &'static str,
    pub source_file: &'static str,
    pub columns: &'static [ColumnDef],
}

const fn col(physical: &'static str, label: &'static str) -> ColumnDef {
    ColumnDef { physical, label }
}

const ENFORCEMENT_COLUMNS: &[ColumnDef] = &[
    col("מס' דו''ח", "report number"),
    col("תאריך", "date"),
    col("יום", "day"),
    col("שעה", "time"),
    col("קוד פקח", "inspector code"),
    col("שם פקח", "inspector name"),
    col("קוד רחוב", "street code"),
    col("שם רחוב", "street name"),
    col("מיקום", "location"),
    col("מס' בית", "house number"),
    col("עבירה", "offense"),
    col("מס ' רישוי", "vehicle registration number"),
    col("סוג", "type"),
    col("צבע", "color"),
    col("תוצרת", "make"),
    col("נכה", "disabled"),
    col("מבוקש", "wanted"),
    col("ננעל/נגרר", "locked/towed"),
    col("כרטיס חניה 1", "parking card 1"),
    col("כרטיס חניה 2", "parking card 2"),
    col("תאריך קובע", "determining date"),
    col("לתשלום עד", "payment due date"),
    col("קנס", "fine"),
    col("הערת פקח 1", "inspector note 1"),
    col("הערת פקח 2", "inspector note 2"),
    col("הערת פקח 3", "inspector note 3"),
    col("הערת פקח 4", "inspector note 4"),
    col("אזור חניה", "parking area"),
    col("אזור פיקוח", "supervision area"),
    col("ת''ז", "ID number"),
    col("שם משפחה", "last name"),
    col("שם פרטי", "first name"),
    col("רחוב", "street"),
    col("'מס", "house number"),
    col("דירה", "apartment"),
    col("עיר", "city"),
    col("מיקוד", "postal code"),
    col("שולם", "paid"),
    col("לתשלום", "to pay"),
    col("תאריך תשלום", "payment date"),
    col("ערעור מתאריך", "appeal from date"),
    col("הסבה מתאריך", "conversion from date"),
    col("בקשה להישפט", "request for trial"),
    col("מספר יחודי", "unique number"),
    col("סטטוס לדוח", "report status"),
    col("פעולה", "action"),
    col("מספר שבב", "chip number"),
    col("/דוח מוביל", "leading report"),
    col("מספר דרכון", "passport number"),
];

const FINANCIAL_COLUMNS: &[ColumnDef] = &[
    col("מס' דו''ח", "report number"),
    col("תאריך", "date"),
    col("סוג", "type"),
    col("ת.תשלום", "payment date"),
    col("חיוב", "charge"),
    col("זיכוי", "credit"),
    col("ת. פירעון", "repayment date"),
];

const ADDRESS_COLUMNS: &[ColumnDef] = &[
    col("מס' דו''ח", "report number"),
    col("תאריך", "date"),
    col("ת.ז", "ID number"),
    col("שם משפחה", "last name"),
    col("שם פרטי", "first name"),
    col("רחוב", "street"),
    col("מס", "house number"),
    col("דירה", "apartment"),
    col("מיקוד", "postal code"),
    col("ת.ד", "PO box"),
    col("עיר", "city"),
    col("מקור", "source"),
];

const REPORT_DATA_COLUMNS: &[ColumnDef] = &[
    col("מס' דו''ח", "report number"),
    col("תאריך", "date"),
    col("יום", "day"),
    col("שעה", "time"),
    col("קוד פקח", "inspector code"),
    col("שם פקח", "inspector name"),
    col("קוד רחוב", "street code"),
    col("שם רחוב", "street name"),
    col("מיקום", "location"),
    col("מס' בית", "house number"),
    col("עבירה", "offense"),
    col("מס ' רישוי", "vehicle registration number"),
    col("סוג", "type"),
    col("צבע", "color"),
    col("תוצרת", "make"),
    col("נכה", "disabled"),
    col("מבוקש", "wanted"),
    col("ננעל/נגרר", "locked/towed"),
    col("כרטיס חניה 1", "parking card 1"),
    col("כרטיס חניה 2", "parking card 2"),
    col("תאריך קובע", "determining date"),
    col("לתשלום עד", "payment due date"),
    col("קנס", "fine"),
    col("הערת פקח 1", "inspector note 1"),
    col("הערת פקח 2", "inspector note 2"),
    col("הערת פקח 3", "inspector note 3"),
    col("הערת פקח 4", "inspector note 4"),
    col("אזור חניה", "parking area"),
    col("אזור פיקוח", "supervision area"),
    col("ת''ז", "ID number"),
    col("שם משפחה", "last name"),
    col("שם פרטי", "first name"),
    col("רחוב", "street"),
    col("'מס", "house number"),
    col("דירה", "apartment"),
    col("עיר", "city"),
    col("מיקוד", "postal code"),
    col("שולם", "paid"),
    col("לתשלום", "to pay"),
    col("תאריך תשלום", "payment date"),
    col("ערעור מתאריך", "appeal from date"),
    col("הסבה מתאריך", "conversion from date"),
    col("בקשה להישפט", "request for trial"),
    col("מספר יחודי", "unique number"),
    col("הערות לדוח", "report notes"),
    col("סטטוס לדוח", "report status"),
    col("פעולה", "action"),
    col("מספר שבב", "chip number"),
    col("/דוח מוביל", "leading report"),
    col("מספר דרכון", "passport number"),
];

/// All tables the store holds. Read-only for the lifetime of the process.
pub const REGISTRY: &[TableSchema] = &[
    TableSchema {
        name: "enforcement",
        source_file: "אכיפה.csv",
        columns: ENFORCEMENT_COLUMNS,
    },
    TableSchema {
        name: "financial_transactions",
        source_file: "תנועות כספיות.csv",
        columns: FINANCIAL_COLUMNS,
    },
    TableSchema {
        name: "address_database",
        source_file: "מאגר כתובות.csv",
        columns: ADDRESS_COLUMNS,
    },
    TableSchema {
        name: "report_data",
        source_file: "דטא דוחות.csv",
        columns: REPORT_DATA_COLUMNS,
    },
];

/// Quote a physical column name the way the generated SQL must reference it.
pub fn quote_column(physical: &str) -> String {
    if physical.contains(' ') || physical.contains('\'') {
        format!("\"{}\"", physical)
    } else {
        physical.to_string()
    }
}

/// Render the registry as the bilingual schema text used in prompts.
pub fn render_schema() -> String {
    let mut out = String::new();
    for table in REGISTRY {
        out.push_str(&format!("Table: {}\n", table.name));
        for column in table.columns {
            out.push_str(&format!("- {}: {}\n", quote_column(column.physical), column.label));
        }
        out.push('\n');
    }
    out
}

/// The fixed date range the loaded data covers. Relative time phrases are
/// resolved against this range, never against wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataHorizon {
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
}

impl DataHorizon {
    /// The range covered by the production CSV exports.
    pub fn known() -> Self {
        Self {
            earliest: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            latest: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        }
    }

    /// First day of the most recent month in the data.
    pub fn final_month_start(&self) -> NaiveDate {
        self.latest.with_day(1).unwrap()
    }

    /// Last covered day of the most recent month in the data.
    pub fn final_month_end(&self) -> NaiveDate {
        self.latest
    }

    /// `YYYY-MM` key of the most recent month, for strftime comparisons.
    pub fn final_month_key(&self) -> String {
        self.latest.format("%Y-%m").to_string()
    }

    /// Human-readable name of the most recent month, e.g. "December 2024".
    pub fn final_month_name(&self) -> String {
        self.latest.format("%B %Y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_four_tables() {
        let names: Vec<&str> = REGISTRY.iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec!["enforcement", "financial_transactions", "address_database", "report_data"]
        );
    }

    #[test]
    fn rendered_schema_quotes_columns_with_spaces() {
        let text = render_schema();
        assert!(text.contains("- \"מס' דו''ח\": report number"));
        assert!(text.contains("- תאריך: date"));
        assert!(text.contains("Table: financial_transactions"));
    }

    #[test]
    fn horizon_final_month_bounds() {
        let horizon = DataHorizon::known();
        assert_eq!(horizon.final_month_start().to_string(), "2024-12-01");
        assert_eq!(horizon.final_month_end().to_string(), "2024-12-31");
        assert_eq!(horizon.final_month_key(), "2024-12");
        assert_eq!(horizon.final_month_name(), "December 2024");
    }
}
