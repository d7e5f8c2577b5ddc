use crate::domain::constants::PAGING_DIRECTIVE;

/// A read against one API path with optional field selection and filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiQuery {
    path: String,
    fields: Option<String>,
    filters: Vec<String>,
}

impl ApiQuery {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            fields: None,
            filters: Vec::new(),
        }
    }

    pub fn fields(mut self, fields: impl Into<String>) -> Self {
        self.fields = Some(fields.into());
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }

    /// Relative request path including paging directive.
    pub fn to_path(&self) -> String {
        let mut out = self.path.clone();
        if let Some(f) = &self.fields {
            out = append_param(&out, &format!("fields={}", f));
        }
        for f in &self.filters {
            out = append_param(&out, &format!("filter={}", f));
        }
        with_paging_disabled(&out)
    }
}

/// Appends `param` using `?` or `&` depending on whether a query string exists.
pub fn append_param(path: &str, param: &str) -> String {
    if path.ends_with('?') || path.ends_with('&') {
        format!("{}{}", path, param)
    } else if path.contains('?') {
        format!("{}&{}", path, param)
    } else {
        format!("{}?{}", path, param)
    }
}

pub fn with_paging_disabled(path: &str) -> String {
    append_param(path, PAGING_DIRECTIVE)
}

/// `metadata.json?filter=id:in:[a,b]` against `api_url`, each id once.
pub fn follow_up_query(api_url: &str, ids: &[String]) -> String {
    let mut unique: Vec<&str> = Vec::new();
    for id in ids {
        if !unique.contains(&id.as_str()) {
            unique.push(id);
        }
    }
    format!(
        "{}/metadata.json?filter=id:in:[{}]",
        api_url,
        unique.join(",")
    )
}
