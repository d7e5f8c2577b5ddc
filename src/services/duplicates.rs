//! Duplicate detection over fetched metadata.
//!
//! One scan, parameterized by how a container exposes its child keys.
//! Fetched collections are only ever borrowed.

use crate::cli::CheckKind;
use crate::domain::constants::{
    CATEGORIES_PATH, DATA_SETS_PATH, METADATA_PATH, SECTIONS_PATH, SYSTEM_COLLECTION,
};
use crate::domain::models::{
    CheckOptions, CheckReport, Collection, DuplicateFinding, ServerConnection,
};
use crate::services::api::{ApiError, MetadataApi};
use crate::services::query::{follow_up_query, ApiQuery};
use serde_json::Value;
use std::collections::HashSet;
use std::hash::Hash;
use tracing::{debug, warn};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("{collection}[{index}] is missing `{field}`")]
    MissingField {
        collection: String,
        index: usize,
        field: String,
    },
    #[error("`{collection}` is not a list of records")]
    NotACollection { collection: String },
}

/// Every key seen again after its first occurrence, in encounter order.
pub fn repeated_keys<K, I>(keys: I) -> Vec<K>
where
    I: IntoIterator<Item = K>,
    K: Eq + Hash + Clone,
{
    let mut seen = HashSet::new();
    let mut repeated = Vec::new();
    for key in keys {
        if !seen.insert(key.clone()) {
            repeated.push(key);
        }
    }
    repeated
}

#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub findings: Vec<DuplicateFinding>,
    pub clean: Vec<String>,
    pub malformed: Vec<RecordError>,
}

/// The record list stored under `collection`.
pub fn records_of<'a>(metadata: &'a Collection, collection: &str) -> Result<&'a [Value], RecordError> {
    metadata
        .get(collection)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| RecordError::NotACollection {
            collection: collection.to_string(),
        })
}

#[derive(Debug, Default)]
pub struct Identified<'a> {
    /// Position in the list, id and the record itself.
    pub records: Vec<(usize, &'a str, &'a Value)>,
    pub malformed: Vec<RecordError>,
}

/// Records of `collection` split into those with an `id` and those without.
pub fn identified_records<'a>(
    metadata: &'a Collection,
    collection: &str,
) -> Result<Identified<'a>, RecordError> {
    let mut out = Identified::default();
    for (index, record) in records_of(metadata, collection)?.iter().enumerate() {
        match record.get("id").and_then(Value::as_str) {
            Some(id) => out.records.push((index, id, record)),
            None => out.malformed.push(RecordError::MissingField {
                collection: collection.to_string(),
                index,
                field: "id".to_string(),
            }),
        }
    }
    Ok(out)
}

/// Scans `records` of `collection`; `child_keys` yields a container's keys or
/// the name of the field it could not read.
pub fn scan_containers<'a, F>(collection: &str, records: &'a [Value], child_keys: F) -> ScanOutcome
where
    F: Fn(&'a Value) -> Result<Vec<&'a str>, &'static str>,
{
    let mut out = ScanOutcome::default();
    for (index, record) in records.iter().enumerate() {
        let missing = |field: &str| RecordError::MissingField {
            collection: collection.to_string(),
            index,
            field: field.to_string(),
        };
        let Some(id) = record.get("id").and_then(Value::as_str) else {
            out.malformed.push(missing("id"));
            continue;
        };
        match child_keys(record) {
            Ok(keys) => {
                let duplicates = repeated_keys(keys);
                if duplicates.is_empty() {
                    out.clean.push(id.to_string());
                } else {
                    out.findings.push(DuplicateFinding {
                        container_id: id.to_string(),
                        duplicates: duplicates.into_iter().map(str::to_string).collect(),
                    });
                }
            }
            Err(field) => out.malformed.push(missing(field)),
        }
    }
    out
}

/// Ids of `record[list][*]` reached through `path`. An absent list counts as empty.
fn nested_ids<'a>(
    record: &'a Value,
    list: &str,
    path: &[&str],
    field: &'static str,
) -> Result<Vec<&'a str>, &'static str> {
    let items = match record.get(list) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(field),
    };
    items
        .iter()
        .map(|item| {
            path.iter()
                .try_fold(item, |v, key| v.get(*key))
                .and_then(Value::as_str)
                .ok_or(field)
        })
        .collect()
}

/// Container collections whose children must be pairwise distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerShape {
    Sections,
    DataSets,
    Categories,
}

impl ContainerShape {
    pub fn for_check(kind: CheckKind) -> Option<Self> {
        match kind {
            CheckKind::SectionElements => Some(ContainerShape::Sections),
            CheckKind::DataSetElements => Some(ContainerShape::DataSets),
            CheckKind::CategoryOptions => Some(ContainerShape::Categories),
            CheckKind::Uids | CheckKind::Expressions => None,
        }
    }

    pub fn check(self) -> CheckKind {
        match self {
            ContainerShape::Sections => CheckKind::SectionElements,
            ContainerShape::DataSets => CheckKind::DataSetElements,
            ContainerShape::Categories => CheckKind::CategoryOptions,
        }
    }

    pub fn collection(self) -> &'static str {
        match self {
            ContainerShape::Sections => "sections",
            ContainerShape::DataSets => "dataSets",
            ContainerShape::Categories => "categories",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ContainerShape::Sections => "Section",
            ContainerShape::DataSets => "DataSet",
            ContainerShape::Categories => "Category",
        }
    }

    pub fn query(self) -> ApiQuery {
        match self {
            ContainerShape::Sections => ApiQuery::new(SECTIONS_PATH).fields("id,dataElements[id]"),
            ContainerShape::DataSets => {
                ApiQuery::new(DATA_SETS_PATH).fields("id,dataSetElements[dataElement[id]]")
            }
            ContainerShape::Categories => {
                ApiQuery::new(CATEGORIES_PATH).fields("id,categoryOptions[id]")
            }
        }
    }

    pub fn child_keys(self, record: &Value) -> Result<Vec<&str>, &'static str> {
        match self {
            ContainerShape::Sections => {
                nested_ids(record, "dataElements", &["id"], "dataElements[].id")
            }
            ContainerShape::DataSets => nested_ids(
                record,
                "dataSetElements",
                &["dataElement", "id"],
                "dataSetElements[].dataElement.id",
            ),
            ContainerShape::Categories => {
                nested_ids(record, "categoryOptions", &["id"], "categoryOptions[].id")
            }
        }
    }

    /// Fails only when the response carries no `collection()` list at all.
    pub fn scan(self, metadata: &Collection) -> Result<ScanOutcome, RecordError> {
        let records = records_of(metadata, self.collection())?;
        Ok(scan_containers(self.collection(), records, |r| {
            self.child_keys(r)
        }))
    }
}

#[derive(Debug, Default)]
pub struct GlobalScan {
    pub duplicate_ids: Vec<String>,
    pub malformed: Vec<RecordError>,
    pub scanned: usize,
}

/// Treats every collection of a metadata export, minus `system`, as one id space.
pub fn scan_global_ids(metadata: &Collection) -> GlobalScan {
    let mut out = GlobalScan::default();
    let mut ids: Vec<&str> = Vec::new();
    for (name, values) in metadata {
        if name == SYSTEM_COLLECTION {
            continue;
        }
        let Some(records) = values.as_array() else {
            out.malformed.push(RecordError::NotACollection {
                collection: name.clone(),
            });
            continue;
        };
        for (index, record) in records.iter().enumerate() {
            match record.get("id").and_then(Value::as_str) {
                Some(id) => ids.push(id),
                None => out.malformed.push(RecordError::MissingField {
                    collection: name.clone(),
                    index,
                    field: "id".to_string(),
                }),
            }
        }
    }
    out.scanned = ids.len();
    out.duplicate_ids = repeated_keys(ids).into_iter().map(str::to_string).collect();
    out
}

pub(crate) fn log_malformed(malformed: &[RecordError]) {
    for e in malformed {
        warn!("The received metadata is not OK, skipping record: {}", e);
    }
}

/// Fetches one container collection and reports containers with repeated children.
///
/// Only transport failures are returned as `Err`; HTTP and decode failures end
/// up in the report.
pub fn check_containers(
    api: &dyn MetadataApi,
    connection: &ServerConnection,
    _options: &CheckOptions,
    shape: ContainerShape,
) -> Result<CheckReport, ApiError> {
    let metadata = match api.get(&shape.query()) {
        Ok(m) => m,
        Err(e) if e.is_transport() => return Err(e),
        Err(e) => return Ok(CheckReport::errored(shape.check(), e.to_string())),
    };
    let outcome = match shape.scan(&metadata) {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("The received metadata is not OK: {}", e);
            return Ok(CheckReport::errored(shape.check(), e.to_string()));
        }
    };
    log_malformed(&outcome.malformed);
    for id in &outcome.clean {
        debug!(
            "{}: {} was inspected and no duplicates were found",
            shape.label(),
            id
        );
    }

    let mut report = CheckReport::new(shape.check());
    report.malformed_records = outcome.malformed.len();
    if !outcome.findings.is_empty() {
        let ids: Vec<String> = outcome
            .findings
            .iter()
            .map(|f| f.container_id.clone())
            .collect();
        report.follow_up = Some(follow_up_query(&connection.api_url, &ids));
        report.findings = outcome.findings;
    }
    report.settle(false);
    Ok(report)
}

/// Fetches the full metadata export and reports ids used more than once.
pub fn check_global_ids(
    api: &dyn MetadataApi,
    connection: &ServerConnection,
    _options: &CheckOptions,
) -> Result<CheckReport, ApiError> {
    let metadata = match api.get(&ApiQuery::new(METADATA_PATH).fields("id")) {
        Ok(m) => m,
        Err(e) if e.is_transport() => return Err(e),
        Err(e) => {
            let mut report = CheckReport::errored(CheckKind::Uids, e.to_string());
            report
                .notes
                .push("Cannot check for duplicated UIDs. Server responded badly!".to_string());
            return Ok(report);
        }
    };
    let scan = scan_global_ids(&metadata);
    log_malformed(&scan.malformed);
    debug!("Inspected {} identifiers across the metadata export", scan.scanned);

    let mut report = CheckReport::new(CheckKind::Uids);
    report.malformed_records = scan.malformed.len();
    if !scan.duplicate_ids.is_empty() {
        report.follow_up = Some(follow_up_query(&connection.api_url, &scan.duplicate_ids));
        report.duplicate_ids = scan.duplicate_ids;
    }
    report.settle(false);
    Ok(report)
}
