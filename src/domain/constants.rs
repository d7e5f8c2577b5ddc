//! Stable constants for the remote metadata API.

/// Appended to every GET so collections come back whole.
pub const PAGING_DIRECTIVE: &str = "paging=False";

/// Top-level key of a metadata export that describes the server itself.
pub const SYSTEM_COLLECTION: &str = "system";

pub const METADATA_PATH: &str = "metadata.json";
pub const SECTIONS_PATH: &str = "sections.json";
pub const DATA_SETS_PATH: &str = "dataSets.json";
pub const CATEGORIES_PATH: &str = "categories.json";
pub const PROGRAMS_PATH: &str = "programs.json";
pub const PROGRAM_RULES_PATH: &str = "programRules.json";
pub const PROGRAM_RULE_ACTIONS_PATH: &str = "programRuleActions.json";
pub const SYSTEM_INFO_PATH: &str = "system/info";

pub const CONDITION_VALIDATION_PATH: &str = "programRules/condition/description";
pub const ACTION_DATA_VALIDATION_PATH: &str = "programRuleActions/data/expression/description";

/// Servers up to and including this minor version have no action-data validator.
pub const ACTION_VALIDATION_MIN_EXCLUSIVE_MINOR: u32 = 37;

pub const PROGRAM_RULE_EDIT_PATH: &str =
    "dhis-web-maintenance/index.html#/edit/programSection/programRule";

/// Validator status for an accepted expression.
pub const EXPRESSION_OK: &str = "OK";
