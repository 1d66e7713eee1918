//! Query composition
//!
//! SQL text is only ever assembled from trusted fragments: fixed templates and
//! the identifiers of [`Column`]. Everything the user supplies (glob patterns,
//! ids) travels as a bound [`Param`], one anonymous `?` per value, bound in
//! textual order.
//!
//! Patterns use SQLite `GLOB`: `*` matches any run of characters, `?` one
//! character, `[...]` a character class. Matching is case-sensitive and the
//! `LIKE` wildcards `%` and `_` are ordinary characters.

use rusqlite::types::ToSqlOutput;
use rusqlite::ToSql;

/// Columns that can be filtered on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// Label name
    Label,
    /// Secret display name
    SecretName,
    /// Secret id
    SecretId,
    /// Owning secret of a label
    LabelSecretId,
}

impl Column {
    /// Identifier qualified by the `s` (secrets) or `l` (labels) alias
    pub fn as_sql(&self) -> &'static str {
        match self {
            Column::Label => "l.name",
            Column::SecretName => "s.name",
            Column::SecretId => "s.id",
            Column::LabelSecretId => "l.secret_id",
        }
    }
}

/// A bound parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Text(String),
    Int(i64),
}

impl ToSql for Param {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Param::Text(s) => s.to_sql(),
            Param::Int(i) => i.to_sql(),
        }
    }
}

/// A predicate and its parameters. An empty clause filters nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clause {
    predicate: Option<String>,
    params: Vec<Param>,
}

impl Clause {
    pub fn is_empty(&self) -> bool {
        self.predicate.is_none()
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// The predicate as a standalone `WHERE` clause, or `""` when empty
    pub fn where_sql(&self) -> String {
        match &self.predicate {
            Some(p) => format!("WHERE {}", p),
            None => String::new(),
        }
    }
}

/// `<col> GLOB ? OR <col> GLOB ? ...`, one parameter per pattern.
///
/// No patterns gives an empty clause, i.e. every row matches.
pub fn glob_or<S: AsRef<str>>(column: Column, patterns: &[S]) -> Clause {
    if patterns.is_empty() {
        return Clause::default();
    }

    let predicate = vec![format!("{} GLOB ?", column.as_sql()); patterns.len()].join(" OR ");

    Clause {
        predicate: Some(predicate),
        params: patterns
            .iter()
            .map(|p| Param::Text(p.as_ref().to_string()))
            .collect(),
    }
}

/// `<col> IN (?, ?, ...)`. No ids gives an empty clause.
pub fn id_in(column: Column, ids: &[i64]) -> Clause {
    if ids.is_empty() {
        return Clause::default();
    }

    let placeholders = vec!["?"; ids.len()].join(", ");

    Clause {
        predicate: Some(format!("{} IN ({})", column.as_sql(), placeholders)),
        params: ids.iter().copied().map(Param::Int).collect(),
    }
}

/// A statement template plus the filters applied to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    template: &'static str,
    filters: Vec<String>,
    params: Vec<Param>,
    order_by: Option<&'static str>,
}

impl Query {
    pub fn new(template: &'static str) -> Self {
        Self {
            template,
            filters: Vec::new(),
            params: Vec::new(),
            order_by: None,
        }
    }

    /// Adds a clause. Clauses are parenthesised and joined with `AND`.
    pub fn filter(mut self, clause: Clause) -> Self {
        if let Some(predicate) = clause.predicate {
            self.filters.push(format!("({})", predicate));
            self.params.extend(clause.params);
        }
        self
    }

    pub fn order_by(mut self, order: &'static str) -> Self {
        self.order_by = Some(order);
        self
    }

    pub fn sql(&self) -> String {
        let mut sql = self.template.trim_end().to_string();
        if !self.filters.is_empty() {
            sql.push_str("\nWHERE ");
            sql.push_str(&self.filters.join(" AND "));
        }
        if let Some(order) = self.order_by {
            sql.push_str("\nORDER BY ");
            sql.push_str(order);
        }
        sql
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_or_empty_matches_all() {
        let clause = glob_or::<&str>(Column::Label, &[]);
        assert!(clause.is_empty());
        assert_eq!(clause.where_sql(), "");
        assert!(clause.params().is_empty());
    }

    #[test]
    fn test_glob_or_one_placeholder_per_pattern() {
        let clause = glob_or(Column::Label, &["work", "pers*"]);
        assert_eq!(clause.where_sql(), "WHERE l.name GLOB ? OR l.name GLOB ?");
        assert_eq!(
            clause.params(),
            &[Param::Text("work".into()), Param::Text("pers*".into())]
        );
    }

    #[test]
    fn test_patterns_never_reach_sql_text() {
        let hostile = "x' OR 1=1; DROP TABLE secrets; --";
        let query = Query::new("SELECT 1 FROM labels l").filter(glob_or(Column::Label, &[hostile]));
        assert!(!query.sql().contains("DROP"));
        assert_eq!(query.params(), &[Param::Text(hostile.into())]);
    }

    #[test]
    fn test_id_in() {
        let clause = id_in(Column::SecretId, &[3, 1, 2]);
        assert_eq!(clause.where_sql(), "WHERE s.id IN (?, ?, ?)");
        assert_eq!(clause.params(), &[Param::Int(3), Param::Int(1), Param::Int(2)]);
        assert!(id_in(Column::SecretId, &[]).is_empty());
    }

    #[test]
    fn test_filters_are_parenthesised_and_anded() {
        let query = Query::new("SELECT * FROM t")
            .filter(glob_or(Column::Label, &["a", "b"]))
            .filter(glob_or(Column::SecretName, &["git*"]))
            .order_by("s.id");

        assert_eq!(
            query.sql(),
            "SELECT * FROM t\nWHERE (l.name GLOB ? OR l.name GLOB ?) AND (s.name GLOB ?)\nORDER BY s.id"
        );
        let params: Vec<_> = query.params().to_vec();
        assert_eq!(
            params,
            vec![
                Param::Text("a".into()),
                Param::Text("b".into()),
                Param::Text("git*".into()),
            ]
        );
    }

    #[test]
    fn test_empty_filter_leaves_template_alone() {
        let query = Query::new("SELECT * FROM t  ").filter(Clause::default());
        assert_eq!(query.sql(), "SELECT * FROM t");
        assert!(query.params().is_empty());
    }
}
