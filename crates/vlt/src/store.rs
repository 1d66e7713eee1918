//! Secret and label persistence
//!
//! [`Store`] runs every operation against an [`Executor`]: the connection
//! itself, or a transaction the caller opened. The store never begins,
//! commits or rolls back; composite writes go through [`Store::with_tx`].
//!
//! Searches join secrets with their labels and fold the rows with
//! [`aggregate::reduce`]. A label filter restricts which label rows come
//! back, so a result holds the matching labels of each secret, not
//! necessarily all of them.

use crate::aggregate::{self, LabeledSecrets, SecretLabelRow};
use crate::cancel::CancelGuard;
use crate::error::{Entity, Precondition, StoreError};
use crate::query::{self, Column, Query};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Database handle the store executes against
pub trait Executor {
    fn connection(&self) -> &Connection;
}

impl Executor for Connection {
    fn connection(&self) -> &Connection {
        self
    }
}

impl Executor for Transaction<'_> {
    fn connection(&self) -> &Connection {
        self
    }
}

const INSERT_MASTER_KEY: &str = "
    INSERT INTO master_key (id, key)
    VALUES (0, ?)
    ON CONFLICT (id) DO NOTHING
";

const SELECT_MASTER_KEY: &str = "SELECT key FROM master_key WHERE id = 0";

const INSERT_SECRET: &str = "INSERT INTO secrets (name, secret) VALUES (?, ?)";

const UPSERT_SECRET: &str = "
    INSERT INTO secrets (id, secret)
    VALUES (?, ?)
    ON CONFLICT (id) DO UPDATE SET secret = excluded.secret
";

const SELECT_SECRET: &str = "SELECT secret FROM secrets WHERE id = ?";

const RENAME_SECRET: &str = "UPDATE secrets SET name = ? WHERE id = ?";

const INSERT_LABEL: &str = "
    INSERT INTO labels (name, secret_id)
    VALUES (?, ?)
    ON CONFLICT (name, secret_id) DO NOTHING
";

const SELECT_LABEL_ID: &str = "SELECT id FROM labels WHERE name = ? AND secret_id = ?";

const SECRETS_JOIN_LABELS: &str = "
    SELECT
        s.id,
        s.name,
        l.name
    FROM
        secrets s
        JOIN labels l ON s.id = l.secret_id
";

const JOIN_ORDER: &str = "s.id, l.id";

/// Secret/label store
pub struct Store<'a> {
    db: &'a dyn Executor,
}

impl<'a> Store<'a> {
    pub fn new(db: &'a dyn Executor) -> Self {
        Self { db }
    }

    /// A store running against `tx` instead
    pub fn with_tx<'t>(&self, tx: &'t Transaction<'_>) -> Store<'t> {
        Store { db: tx }
    }

    /// Store the master key. A no-op if one already exists.
    pub fn insert_master_key(
        &self,
        cancel: &CancellationToken,
        key: &str,
    ) -> Result<(), StoreError> {
        let conn = self.db.connection();
        let _guard = CancelGuard::install(conn, cancel)?;

        let inserted = conn.execute(INSERT_MASTER_KEY, params![key])?;
        debug!(inserted, "insert master key");
        Ok(())
    }

    pub fn query_master_key(&self, cancel: &CancellationToken) -> Result<String, StoreError> {
        let conn = self.db.connection();
        let _guard = CancelGuard::install(conn, cancel)?;

        conn.query_row(SELECT_MASTER_KEY, [], |row| row.get(0))
            .optional()?
            .ok_or(StoreError::NotFound(Entity::MasterKey))
    }

    /// Insert a secret and return its generated id
    pub fn insert_new_secret(
        &self,
        cancel: &CancellationToken,
        name: &str,
        secret: &str,
    ) -> Result<i64, StoreError> {
        let conn = self.db.connection();
        let _guard = CancelGuard::install(conn, cancel)?;

        conn.execute(INSERT_SECRET, params![name, secret])?;
        let id = conn.last_insert_rowid();
        debug!(id, "inserted secret");
        Ok(id)
    }

    /// Insert or replace the payload of secret `id`.
    ///
    /// Returns the rows affected as SQLite counts them: 1 for an insert and 1
    /// for an update, even when the payload is unchanged.
    pub fn upsert_secret(
        &self,
        cancel: &CancellationToken,
        id: i64,
        secret: &str,
    ) -> Result<usize, StoreError> {
        let conn = self.db.connection();
        let _guard = CancelGuard::install(conn, cancel)?;

        let n = conn.execute(UPSERT_SECRET, params![id, secret])?;
        debug!(id, affected = n, "upserted secret");
        Ok(n)
    }

    /// The payload of secret `id`
    pub fn secret(&self, cancel: &CancellationToken, id: i64) -> Result<String, StoreError> {
        let conn = self.db.connection();
        let _guard = CancelGuard::install(conn, cancel)?;

        conn.query_row(SELECT_SECRET, params![id], |row| row.get(0))
            .optional()?
            .ok_or(StoreError::NotFound(Entity::Secret))
    }

    pub fn rename_secret(
        &self,
        cancel: &CancellationToken,
        id: i64,
        name: &str,
    ) -> Result<(), StoreError> {
        let conn = self.db.connection();
        let _guard = CancelGuard::install(conn, cancel)?;

        match conn.execute(RENAME_SECRET, params![name, id])? {
            0 => Err(StoreError::NotFound(Entity::Secret)),
            _ => Ok(()),
        }
    }

    /// Delete secrets by id, labels included. Returns the number of secrets removed.
    pub fn delete_secrets(
        &self,
        cancel: &CancellationToken,
        ids: &[i64],
    ) -> Result<usize, StoreError> {
        if ids.is_empty() {
            return Err(StoreError::Precondition(Precondition::NoIds));
        }

        let query =
            Query::new("DELETE FROM secrets AS s").filter(query::id_in(Column::SecretId, ids));

        let conn = self.db.connection();
        let _guard = CancelGuard::install(conn, cancel)?;

        let n = conn.execute(&query.sql(), params_from_iter(query.params()))?;
        debug!(requested = ids.len(), deleted = n, "deleted secrets");
        Ok(n)
    }

    /// Attach a label to a secret.
    ///
    /// Returns the label row id; attaching an existing label returns the
    /// existing row's id. Fails if `secret_id` doesn't exist.
    pub fn insert_label(
        &self,
        cancel: &CancellationToken,
        name: &str,
        secret_id: i64,
    ) -> Result<i64, StoreError> {
        let conn = self.db.connection();
        let _guard = CancelGuard::install(conn, cancel)?;

        if conn.execute(INSERT_LABEL, params![name, secret_id])? == 1 {
            return Ok(conn.last_insert_rowid());
        }

        // The insert was a no-op; last_insert_rowid would be stale.
        let id = conn.query_row(SELECT_LABEL_ID, params![name, secret_id], |row| row.get(0))?;
        Ok(id)
    }

    /// Remove the labels of `secret_id` matching any of `patterns`
    pub fn delete_labels<S: AsRef<str>>(
        &self,
        cancel: &CancellationToken,
        secret_id: i64,
        patterns: &[S],
    ) -> Result<usize, StoreError> {
        if patterns.is_empty() {
            return Err(StoreError::Precondition(Precondition::NoLabels));
        }

        let query = Query::new("DELETE FROM labels AS l")
            .filter(query::id_in(Column::LabelSecretId, &[secret_id]))
            .filter(query::glob_or(Column::Label, patterns));

        let conn = self.db.connection();
        let _guard = CancelGuard::install(conn, cancel)?;

        let n = conn.execute(&query.sql(), params_from_iter(query.params()))?;
        debug!(secret_id, deleted = n, "deleted labels");
        Ok(n)
    }

    /// Secrets whose `column` matches any of `patterns`.
    ///
    /// No patterns returns every secret with all of its labels.
    pub fn secrets_by_column<S: AsRef<str>>(
        &self,
        cancel: &CancellationToken,
        column: Column,
        patterns: &[S],
    ) -> Result<LabeledSecrets, StoreError> {
        let query = Query::new(SECRETS_JOIN_LABELS)
            .filter(query::glob_or(column, patterns))
            .order_by(JOIN_ORDER);

        self.secrets_join_labels(cancel, &query)
    }

    /// Secrets with the given ids and all their labels
    pub fn secrets_by_ids(
        &self,
        cancel: &CancellationToken,
        ids: &[i64],
    ) -> Result<LabeledSecrets, StoreError> {
        if ids.is_empty() {
            return Err(StoreError::Precondition(Precondition::NoIds));
        }

        let query = Query::new(SECRETS_JOIN_LABELS)
            .filter(query::id_in(Column::SecretId, ids))
            .order_by(JOIN_ORDER);

        self.secrets_join_labels(cancel, &query)
    }

    /// Secrets with a label matching any of `labels` and a name matching `name`
    pub fn secrets_by_labels_and_name<S: AsRef<str>>(
        &self,
        cancel: &CancellationToken,
        name: &str,
        labels: &[S],
    ) -> Result<LabeledSecrets, StoreError> {
        if labels.is_empty() {
            return Err(StoreError::Precondition(Precondition::NoLabels));
        }

        let query = Query::new(SECRETS_JOIN_LABELS)
            .filter(query::glob_or(Column::Label, labels))
            .filter(query::glob_or(Column::SecretName, &[name]))
            .order_by(JOIN_ORDER);

        self.secrets_join_labels(cancel, &query)
    }

    /// Run a secrets/labels join and fold the rows.
    ///
    /// Every row is decoded before folding; a decode error fails the whole call.
    fn secrets_join_labels(
        &self,
        cancel: &CancellationToken,
        query: &Query,
    ) -> Result<LabeledSecrets, StoreError> {
        let conn = self.db.connection();
        let _guard = CancelGuard::install(conn, cancel)?;

        let mut stmt = conn.prepare(&query.sql())?;
        let rows = stmt
            .query_map(params_from_iter(query.params()), |row| {
                Ok(SecretLabelRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    label: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        debug!(rows = rows.len(), "joined secrets with labels");
        Ok(aggregate::reduce(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::LabeledSecret;
    use crate::schema;
    use anyhow::Result;

    /// Fails the test if the store touches storage
    struct Untouchable;

    impl Executor for Untouchable {
        fn connection(&self) -> &Connection {
            panic!("storage must not be touched");
        }
    }

    const NONE: &[&str] = &[];

    fn labeled(name: &str, labels: &[&str]) -> LabeledSecret {
        LabeledSecret {
            name: name.to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }

    fn add(store: &Store, cancel: &CancellationToken, name: &str, labels: &[&str]) -> Result<i64> {
        let id = store.insert_new_secret(cancel, name, &format!("{}-payload", name))?;
        for label in labels {
            store.insert_label(cancel, label, id)?;
        }
        Ok(id)
    }

    #[test]
    fn test_master_key_is_idempotent() -> Result<()> {
        let conn = schema::open_in_memory()?;
        let store = Store::new(&conn);
        let cancel = CancellationToken::new();

        store.insert_master_key(&cancel, "k1")?;
        store.insert_master_key(&cancel, "k2")?;

        assert_eq!(store.query_master_key(&cancel)?, "k1");
        Ok(())
    }

    #[test]
    fn test_master_key_not_found() -> Result<()> {
        let conn = schema::open_in_memory()?;
        let store = Store::new(&conn);

        let err = store.query_master_key(&CancellationToken::new()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(Entity::MasterKey)));
        assert!(err.is_not_found());
        Ok(())
    }

    #[test]
    fn test_insert_and_lookup_secret() -> Result<()> {
        let conn = schema::open_in_memory()?;
        let store = Store::new(&conn);
        let cancel = CancellationToken::new();

        let first = store.insert_new_secret(&cancel, "github", "ghp_123")?;
        let second = store.insert_new_secret(&cancel, "github", "ghp_456")?;
        assert_ne!(first, second);

        assert_eq!(store.secret(&cancel, first)?, "ghp_123");
        assert_eq!(store.secret(&cancel, second)?, "ghp_456");
        Ok(())
    }

    #[test]
    fn test_secret_not_found() -> Result<()> {
        let conn = schema::open_in_memory()?;
        let store = Store::new(&conn);

        let err = store.secret(&CancellationToken::new(), 99).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(Entity::Secret)));
        Ok(())
    }

    #[test]
    fn test_upsert_affected_rows() -> Result<()> {
        let conn = schema::open_in_memory()?;
        let store = Store::new(&conn);
        let cancel = CancellationToken::new();

        assert_eq!(store.upsert_secret(&cancel, 42, "v1")?, 1);
        assert_eq!(store.secret(&cancel, 42)?, "v1");

        // SQLite counts a DO UPDATE as a change even when nothing differs.
        assert_eq!(store.upsert_secret(&cancel, 42, "v1")?, 1);

        assert_eq!(store.upsert_secret(&cancel, 42, "v2")?, 1);
        assert_eq!(store.secret(&cancel, 42)?, "v2");
        Ok(())
    }

    #[test]
    fn test_upsert_keeps_name() -> Result<()> {
        let conn = schema::open_in_memory()?;
        let store = Store::new(&conn);
        let cancel = CancellationToken::new();

        let id = add(&store, &cancel, "aws", &["cloud"])?;
        store.upsert_secret(&cancel, id, "rotated")?;

        assert_eq!(store.secret(&cancel, id)?, "rotated");
        let found = store.secrets_by_ids(&cancel, &[id])?;
        assert_eq!(found[&id], labeled("aws", &["cloud"]));
        Ok(())
    }

    #[test]
    fn test_insert_label_is_idempotent() -> Result<()> {
        let conn = schema::open_in_memory()?;
        let store = Store::new(&conn);
        let cancel = CancellationToken::new();

        let secret = store.insert_new_secret(&cancel, "s", "p")?;
        let work = store.insert_label(&cancel, "work", secret)?;
        let other = store.insert_label(&cancel, "other", secret)?;
        let again = store.insert_label(&cancel, "work", secret)?;

        assert_ne!(work, other);
        assert_eq!(work, again);

        let found = store.secrets_by_ids(&cancel, &[secret])?;
        assert_eq!(found[&secret].labels, vec!["work", "other"]);
        Ok(())
    }

    #[test]
    fn test_same_label_on_two_secrets() -> Result<()> {
        let conn = schema::open_in_memory()?;
        let store = Store::new(&conn);
        let cancel = CancellationToken::new();

        let a = store.insert_new_secret(&cancel, "a", "p")?;
        let b = store.insert_new_secret(&cancel, "b", "p")?;
        let la = store.insert_label(&cancel, "shared", a)?;
        let lb = store.insert_label(&cancel, "shared", b)?;
        assert_ne!(la, lb);
        Ok(())
    }

    #[test]
    fn test_label_requires_existing_secret() -> Result<()> {
        let conn = schema::open_in_memory()?;
        let store = Store::new(&conn);

        let err = store
            .insert_label(&CancellationToken::new(), "orphan", 12345)
            .unwrap_err();
        match err {
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => {
                assert_eq!(e.code, rusqlite::ErrorCode::ConstraintViolation);
            }
            other => panic!("expected constraint violation, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_no_patterns_returns_everything() -> Result<()> {
        let conn = schema::open_in_memory()?;
        let store = Store::new(&conn);
        let cancel = CancellationToken::new();

        let a = add(&store, &cancel, "a", &["x", "y", "z"])?;
        let b = add(&store, &cancel, "b", &["y"])?;

        let found = store.secrets_by_column(&cancel, Column::Label, NONE)?;
        assert_eq!(found.len(), 2);
        assert_eq!(found[&a], labeled("a", &["x", "y", "z"]));
        assert_eq!(found[&b], labeled("b", &["y"]));
        Ok(())
    }

    #[test]
    fn test_undecodable_row_fails_whole_search() -> Result<()> {
        let conn = schema::open_in_memory()?;
        let store = Store::new(&conn);
        let cancel = CancellationToken::new();

        add(&store, &cancel, "good", &["work"])?;
        conn.execute(
            "INSERT INTO secrets (name, secret) VALUES (X'FF00', 'payload')",
            [],
        )?;
        let bad = conn.last_insert_rowid();
        store.insert_label(&cancel, "work", bad)?;

        let err = store
            .secrets_by_column(&cancel, Column::Label, NONE)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Sqlite(rusqlite::Error::InvalidColumnType(1, _, _))
        ));
        Ok(())
    }

    #[test]
    fn test_label_patterns_are_ored() -> Result<()> {
        let conn = schema::open_in_memory()?;
        let store = Store::new(&conn);
        let cancel = CancellationToken::new();

        let a = add(&store, &cancel, "A", &["work"])?;
        let b = add(&store, &cancel, "B", &["personal"])?;
        let c = add(&store, &cancel, "C", &["home"])?;

        let found = store.secrets_by_column(&cancel, Column::Label, &["work", "personal"])?;
        assert_eq!(found.keys().copied().collect::<Vec<_>>(), vec![a, b]);
        assert!(!found.contains_key(&c));
        Ok(())
    }

    #[test]
    fn test_label_filter_returns_matching_labels_only() -> Result<()> {
        let conn = schema::open_in_memory()?;
        let store = Store::new(&conn);
        let cancel = CancellationToken::new();

        let id = add(&store, &cancel, "db", &["prod", "postgres", "team-a"])?;

        let found = store.secrets_by_column(&cancel, Column::Label, &["p*"])?;
        assert_eq!(found[&id], labeled("db", &["prod", "postgres"]));
        Ok(())
    }

    #[test]
    fn test_glob_semantics() -> Result<()> {
        let conn = schema::open_in_memory()?;
        let store = Store::new(&conn);
        let cancel = CancellationToken::new();

        let work = add(&store, &cancel, "w", &["work"])?;
        let home = add(&store, &cancel, "h", &["home"])?;
        let percent = add(&store, &cancel, "p", &["100%"])?;

        let ids = |patterns: &[&str]| -> Result<Vec<i64>> {
            Ok(store
                .secrets_by_column(&cancel, Column::Label, patterns)?
                .into_keys()
                .collect())
        };

        assert_eq!(ids(&["wo*"])?, vec![work]);
        assert_eq!(ids(&["W*"])?, Vec::<i64>::new());
        assert_eq!(ids(&["?ome"])?, vec![home]);
        assert_eq!(ids(&["[hw]o*"])?, vec![work, home]);
        assert_eq!(ids(&["wor_"])?, Vec::<i64>::new());
        assert_eq!(ids(&["%"])?, Vec::<i64>::new());
        assert_eq!(ids(&["100%"])?, vec![percent]);
        Ok(())
    }

    #[test]
    fn test_search_by_name_column() -> Result<()> {
        let conn = schema::open_in_memory()?;
        let store = Store::new(&conn);
        let cancel = CancellationToken::new();

        let github = add(&store, &cancel, "github", &["work"])?;
        add(&store, &cancel, "gmail", &["personal"])?;

        let found = store.secrets_by_column(&cancel, Column::SecretName, &["git*"])?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[&github], labeled("github", &["work"]));
        Ok(())
    }

    #[test]
    fn test_secrets_by_ids() -> Result<()> {
        let conn = schema::open_in_memory()?;
        let store = Store::new(&conn);
        let cancel = CancellationToken::new();

        let a = add(&store, &cancel, "a", &["1", "2"])?;
        add(&store, &cancel, "b", &["3"])?;
        let c = add(&store, &cancel, "c", &["4"])?;

        let found = store.secrets_by_ids(&cancel, &[c, a, 999])?;
        assert_eq!(found.len(), 2);
        assert_eq!(found[&a], labeled("a", &["1", "2"]));
        assert_eq!(found[&c], labeled("c", &["4"]));
        Ok(())
    }

    #[test]
    fn test_labels_and_name_is_an_intersection() -> Result<()> {
        let conn = schema::open_in_memory()?;
        let store = Store::new(&conn);
        let cancel = CancellationToken::new();

        let github = add(&store, &cancel, "github", &["work"])?;
        let gitlab = add(&store, &cancel, "gitlab", &["home", "ci"])?;
        let gitea = add(&store, &cancel, "gitea", &["work", "home"])?;
        add(&store, &cancel, "gmail", &["work"])?;
        add(&store, &cancel, "git-old", &["personal"])?;

        let found = store.secrets_by_labels_and_name(&cancel, "git*", &["work", "home"])?;

        assert_eq!(found.len(), 3);
        assert_eq!(found[&github], labeled("github", &["work"]));
        assert_eq!(found[&gitlab], labeled("gitlab", &["home"]));
        assert_eq!(found[&gitea], labeled("gitea", &["work", "home"]));
        Ok(())
    }

    #[test]
    fn test_preconditions_do_not_touch_storage() {
        let store = Store::new(&Untouchable);
        let cancel = CancellationToken::new();

        assert!(matches!(
            store.secrets_by_ids(&cancel, &[]),
            Err(StoreError::Precondition(Precondition::NoIds))
        ));
        assert!(matches!(
            store.secrets_by_labels_and_name(&cancel, "*", NONE),
            Err(StoreError::Precondition(Precondition::NoLabels))
        ));
        assert!(matches!(
            store.delete_secrets(&cancel, &[]),
            Err(StoreError::Precondition(Precondition::NoIds))
        ));
        assert!(matches!(
            store.delete_labels(&cancel, 1, NONE),
            Err(StoreError::Precondition(Precondition::NoLabels))
        ));
    }

    #[test]
    fn test_rolled_back_transaction_leaves_nothing() -> Result<()> {
        let conn = schema::open_in_memory()?;
        let store = Store::new(&conn);
        let cancel = CancellationToken::new();

        let id = {
            let tx = conn.unchecked_transaction()?;
            let tx_store = store.with_tx(&tx);
            let id = add(&tx_store, &cancel, "temp", &["a", "b"])?;
            assert_eq!(tx_store.secrets_by_ids(&cancel, &[id])?.len(), 1);
            id
            // dropped without commit
        };

        assert!(store.secret(&cancel, id).unwrap_err().is_not_found());
        assert!(store.secrets_by_column(&cancel, Column::Label, NONE)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_committed_transaction_is_visible() -> Result<()> {
        let conn = schema::open_in_memory()?;
        let store = Store::new(&conn);
        let cancel = CancellationToken::new();

        let tx = conn.unchecked_transaction()?;
        let id = add(&store.with_tx(&tx), &cancel, "kept", &["a"])?;
        tx.commit()?;

        assert_eq!(store.secret(&cancel, id)?, "kept-payload");
        assert_eq!(
            store.secrets_by_ids(&cancel, &[id])?[&id],
            labeled("kept", &["a"])
        );
        Ok(())
    }

    #[test]
    fn test_cancelled_token_fails_every_operation() -> Result<()> {
        let conn = schema::open_in_memory()?;
        let store = Store::new(&conn);
        let live = CancellationToken::new();
        let id = add(&store, &live, "s", &["l"])?;

        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(matches!(
            store.insert_master_key(&cancel, "k"),
            Err(StoreError::Cancelled)
        ));
        assert!(matches!(
            store.insert_new_secret(&cancel, "n", "p"),
            Err(StoreError::Cancelled)
        ));
        assert!(matches!(store.secret(&cancel, id), Err(StoreError::Cancelled)));
        assert!(matches!(
            store.secrets_by_column(&cancel, Column::Label, NONE),
            Err(StoreError::Cancelled)
        ));

        // Nothing was written.
        assert!(store.query_master_key(&live).unwrap_err().is_not_found());
        assert_eq!(store.secrets_by_column(&live, Column::Label, NONE)?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_delete_secrets_cascades_to_labels() -> Result<()> {
        let conn = schema::open_in_memory()?;
        let store = Store::new(&conn);
        let cancel = CancellationToken::new();

        let a = add(&store, &cancel, "a", &["x", "y"])?;
        let b = add(&store, &cancel, "b", &["x"])?;

        assert_eq!(store.delete_secrets(&cancel, &[a, 999])?, 1);

        let remaining: i64 = conn.query_row(
            "SELECT COUNT(*) FROM labels WHERE secret_id = ?",
            [a],
            |row| row.get(0),
        )?;
        assert_eq!(remaining, 0);

        let found = store.secrets_by_column(&cancel, Column::Label, NONE)?;
        assert_eq!(found.keys().copied().collect::<Vec<_>>(), vec![b]);
        Ok(())
    }

    #[test]
    fn test_delete_labels() -> Result<()> {
        let conn = schema::open_in_memory()?;
        let store = Store::new(&conn);
        let cancel = CancellationToken::new();

        let a = add(&store, &cancel, "a", &["tmp-1", "tmp-2", "keep"])?;
        let b = add(&store, &cancel, "b", &["tmp-1"])?;

        assert_eq!(store.delete_labels(&cancel, a, &["tmp-*"])?, 2);

        let found = store.secrets_by_ids(&cancel, &[a, b])?;
        assert_eq!(found[&a].labels, vec!["keep"]);
        assert_eq!(found[&b].labels, vec!["tmp-1"]);
        Ok(())
    }

    #[test]
    fn test_rename_secret() -> Result<()> {
        let conn = schema::open_in_memory()?;
        let store = Store::new(&conn);
        let cancel = CancellationToken::new();

        let id = add(&store, &cancel, "old", &["l"])?;
        store.rename_secret(&cancel, id, "new")?;
        assert_eq!(store.secrets_by_ids(&cancel, &[id])?[&id].name, "new");

        assert!(store
            .rename_secret(&cancel, 999, "x")
            .unwrap_err()
            .is_not_found());
        Ok(())
    }
}
