use url::Url;

/// Path segment Datasette uses for database-level utility pages such as
/// `/{db}/-/query`; it never names a table.
pub const UTILITY_SEGMENT: &str = "-";

/// Identifiers that scope a generation request and the panel mount.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub data_source: Option<String>,
    pub table: Option<String>,
}

impl Scope {
    pub fn new(data_source: impl Into<String>, table: Option<&str>) -> Self {
        Self {
            data_source: Some(data_source.into()),
            table: table.map(str::to_string),
        }
    }

    pub fn from_path(path: &str) -> Self {
        let mut segments = path.split('/').filter(|segment| !segment.is_empty());
        let Some(data_source) = segments.next() else {
            return Self::default();
        };

        let table = segments
            .next()
            .filter(|segment| *segment != UTILITY_SEGMENT)
            .map(str::to_string);

        Self {
            data_source: Some(data_source.to_string()),
            table,
        }
    }

    /// Accepts an absolute URL or a bare path. Query string and fragment are
    /// ignored either way.
    pub fn from_location(location: &str) -> Self {
        let location = location.trim();
        if let Ok(url) = Url::parse(location) {
            if url.has_host() {
                return Self::from_path(url.path());
            }
        }

        let path = location
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        Self::from_path(path)
    }

    pub fn is_table_page(&self) -> bool {
        self.data_source.is_some() && self.table.is_some()
    }

    pub fn describe(&self) -> String {
        match (&self.data_source, &self.table) {
            (Some(db), Some(table)) => format!("{db}/{table}"),
            (Some(db), None) => db.clone(),
            _ => "(no database)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Scope;

    #[test]
    fn database_and_table_come_from_first_two_segments() {
        let scope = Scope::from_path("/mydb/people");
        assert_eq!(scope.data_source.as_deref(), Some("mydb"));
        assert_eq!(scope.table.as_deref(), Some("people"));
        assert!(scope.is_table_page());
    }

    #[test]
    fn utility_segment_is_not_a_table() {
        let scope = Scope::from_path("/mydb/-/query");
        assert_eq!(scope.data_source.as_deref(), Some("mydb"));
        assert!(scope.table.is_none());
        assert!(!scope.is_table_page());
    }

    #[test]
    fn root_path_has_no_identifiers() {
        assert_eq!(Scope::from_path("/"), Scope::default());
        assert_eq!(Scope::from_path(""), Scope::default());
    }

    #[test]
    fn repeated_slashes_are_skipped() {
        let scope = Scope::from_path("//mydb///people/");
        assert_eq!(scope, Scope::new("mydb", Some("people")));
    }

    #[test]
    fn extra_segments_after_table_are_ignored() {
        let scope = Scope::from_path("/mydb/people/42");
        assert_eq!(scope, Scope::new("mydb", Some("people")));
    }

    #[test]
    fn absolute_url_uses_only_its_path() {
        let scope = Scope::from_location("http://localhost:8001/mydb/people?_size=10#rows");
        assert_eq!(scope, Scope::new("mydb", Some("people")));
    }

    #[test]
    fn bare_location_drops_query_string() {
        let scope = Scope::from_location("/mydb?sql=select+1");
        assert_eq!(scope, Scope::new("mydb", None));
    }
}
