//! `option` directive parsing and storage.

use std::collections::{HashMap, HashSet};

/// Option names understood by the ledger format.
const KNOWN_OPTIONS: &[&str] = &[
    "title",
    "filename",
    "operating_currency",
    "name_assets",
    "name_liabilities",
    "name_equity",
    "name_income",
    "name_expenses",
    "account_rounding",
    "account_previous_balances",
    "account_previous_earnings",
    "account_previous_conversions",
    "account_current_earnings",
    "account_current_conversions",
    "account_unrealized_gains",
    "conversion_currency",
    "inferred_tolerance_default",
    "inferred_tolerance_multiplier",
    "infer_tolerance_from_cost",
    "booking_method",
    "render_commas",
    "long_string_maxlines",
    "documents",
    "insert_pythonpath",
    "plugin_processing_mode",
];

/// Options that can be specified multiple times.
const REPEATABLE_OPTIONS: &[&str] = &["operating_currency", "insert_pythonpath", "documents"];

/// A problem with an `option` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionWarning {
    /// Warning code (E7001 unknown, E7002 bad value, E7003 duplicate).
    pub code: &'static str,
    /// Warning message.
    pub message: String,
}

/// Ledger options, collected from every loaded file.
#[derive(Debug, Clone)]
pub struct Options {
    /// Title for the ledger.
    pub title: Option<String>,
    /// Path of the root file (set by the loader).
    pub filename: Option<String>,
    /// Operating currencies (for reporting).
    pub operating_currency: Vec<String>,
    /// Default booking method.
    pub booking_method: String,
    /// Whether reports group digits with commas.
    pub render_commas: bool,
    /// Directories to scan for document files.
    pub documents: Vec<String>,
    /// Known options without a dedicated field, last value wins.
    pub custom: HashMap<String, String>,
    /// Options that have been set (for duplicate detection).
    set_options: HashSet<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

impl Options {
    /// Create new options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            title: None,
            filename: None,
            operating_currency: Vec::new(),
            booking_method: "STRICT".to_string(),
            render_commas: false,
            documents: Vec::new(),
            custom: HashMap::new(),
            set_options: HashSet::new(),
        }
    }

    /// Set an option by name.
    ///
    /// Returns a warning when the option is unknown, repeated, or its value
    /// cannot be used. Unknown options are still recorded in `custom`.
    pub fn set(&mut self, key: &str, value: &str) -> Option<OptionWarning> {
        if !KNOWN_OPTIONS.contains(&key) {
            self.custom.insert(key.to_string(), value.to_string());
            return Some(OptionWarning {
                code: "E7001",
                message: format!("Invalid option \"{key}\""),
            });
        }

        if !REPEATABLE_OPTIONS.contains(&key) && !self.set_options.insert(key.to_string()) {
            return Some(OptionWarning {
                code: "E7003",
                message: format!("Option \"{key}\" can only be specified once"),
            });
        }

        match key {
            "title" => self.title = Some(value.to_string()),
            "filename" => self.filename = Some(value.to_string()),
            "operating_currency" => self.operating_currency.push(value.to_string()),
            "documents" => self.documents.push(value.to_string()),
            "booking_method" => {
                const METHODS: &[&str] =
                    &["STRICT", "FIFO", "LIFO", "HIFO", "AVERAGE", "NONE", "STRICT_WITH_SIZE"];
                let upper = value.to_uppercase();
                if !METHODS.contains(&upper.as_str()) {
                    return Some(OptionWarning {
                        code: "E7002",
                        message: format!("Invalid booking method \"{value}\""),
                    });
                }
                self.booking_method = upper;
            }
            "render_commas" => match value.to_lowercase().as_str() {
                "true" | "1" => self.render_commas = true,
                "false" | "0" => self.render_commas = false,
                _ => {
                    return Some(OptionWarning {
                        code: "E7002",
                        message: format!("Invalid value \"{value}\" for option \"render_commas\""),
                    })
                }
            },
            _ => {
                self.custom.insert(key.to_string(), value.to_string());
            }
        }
        None
    }
}
