//! In-process store
//!
//! Behaves like a small Postgres: bulk inserts are atomic, unique and
//! not-null columns are enforced with the Postgres error codes, and every row
//! gets a numeric `id`.

use super::{Filter, PageQuery, Record, Store, StoreError, value_text};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

#[derive(Debug, Default, Clone)]
struct TableRules {
    unique: Vec<String>,
    not_null: Vec<String>,
}

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Record>,
    next_id: u64,
}

#[derive(Debug, Default)]
struct Calls {
    insert_many: AtomicUsize,
    insert_one: AtomicUsize,
}

/// Store kept entirely in memory
///
/// # Example
/// ```
/// use finops_backoffice::store::{MemoryStore, Store};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), finops_backoffice::store::StoreError> {
/// let store = MemoryStore::new().with_unique("vendors", ["vendor_code"]);
/// let row = json!({"vendor_code": "V-001"}).as_object().cloned().unwrap();
///
/// store.insert_one("vendors", &row).await?;
/// let dup = store.insert_one("vendors", &row).await.unwrap_err();
/// assert_eq!(dup.code(), Some("23505"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
    rules: HashMap<String, TableRules>,
    faults: Vec<(String, Filter, StoreError)>,
    calls: Calls,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare single-column unique constraints on a table
    pub fn with_unique<I, S>(mut self, table: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules
            .entry(table.to_string())
            .or_default()
            .unique
            .extend(columns.into_iter().map(Into::into));
        self
    }

    /// Declare not-null columns on a table
    pub fn with_not_null<I, S>(mut self, table: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules
            .entry(table.to_string())
            .or_default()
            .not_null
            .extend(columns.into_iter().map(Into::into));
        self
    }

    /// Make any insert into `table` containing a row that matches `filter` fail with `error`
    pub fn with_fault(mut self, table: &str, filter: Filter, error: StoreError) -> Self {
        self.faults.push((table.to_string(), filter, error));
        self
    }

    /// Number of `insert_many` calls received so far
    pub fn insert_many_calls(&self) -> usize {
        self.calls.insert_many.load(AtomicOrdering::SeqCst)
    }

    /// Number of `insert_one` calls received so far
    pub fn insert_one_calls(&self) -> usize {
        self.calls.insert_one.load(AtomicOrdering::SeqCst)
    }

    /// Number of rows currently stored in `table`
    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .map(|tables| tables.get(table).map_or(0, |t| t.rows.len()))
            .unwrap_or(0)
    }

    /// Snapshot of every row in `table`
    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.tables
            .read()
            .map(|tables| tables.get(table).map(|t| t.rows.clone()).unwrap_or_default())
            .unwrap_or_default()
    }

    fn fault_for(&self, table: &str, record: &Record) -> Option<StoreError> {
        self.faults
            .iter()
            .find(|(t, filter, _)| t == table && filter.matches(record))
            .map(|(_, _, error)| error.clone())
    }

    fn check_not_null(&self, table: &str, record: &Record) -> Result<(), StoreError> {
        let Some(rules) = self.rules.get(table) else {
            return Ok(());
        };
        for column in &rules.not_null {
            if record.get(column).is_none_or(Value::is_null) {
                return Err(StoreError::rejected(
                    "23502",
                    format!(
                        "null value in column \"{}\" of relation \"{}\" violates not-null constraint",
                        column, table
                    ),
                ));
            }
        }
        Ok(())
    }

    fn check_unique<'a>(
        &self,
        table: &str,
        record: &Record,
        existing: impl Iterator<Item = &'a Record> + Clone,
    ) -> Result<(), StoreError> {
        let Some(rules) = self.rules.get(table) else {
            return Ok(());
        };
        for column in &rules.unique {
            let Some(value) = record.get(column).filter(|v| !v.is_null()) else {
                continue;
            };
            if existing.clone().any(|row| row.get(column) == Some(value)) {
                return Err(StoreError::Rejected {
                    code: Some("23505".to_string()),
                    message: format!(
                        "duplicate key value violates unique constraint \"{}_{}_key\"",
                        table, column
                    ),
                    details: Some(format!(
                        "Key ({})=({}) already exists.",
                        column,
                        value_text(value)
                    )),
                    hint: None,
                });
            }
        }
        Ok(())
    }

    fn poisoned() -> StoreError {
        StoreError::Transport("memory store lock poisoned".to_string())
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(a), Some(b)) => value_text(a).cmp(&value_text(b)),
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_many(&self, collection: &str, records: &[Record]) -> Result<(), StoreError> {
        self.calls.insert_many.fetch_add(1, AtomicOrdering::SeqCst);
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        let table = tables.entry(collection.to_string()).or_default();

        // Validate the whole statement before touching the table
        for (i, record) in records.iter().enumerate() {
            if let Some(error) = self.fault_for(collection, record) {
                return Err(error);
            }
            self.check_not_null(collection, record)?;
            self.check_unique(
                collection,
                record,
                table.rows.iter().chain(records[..i].iter()),
            )?;
        }

        for record in records {
            let mut row = record.clone();
            table.next_id += 1;
            row.entry("id").or_insert_with(|| Value::from(table.next_id));
            table.rows.push(row);
        }
        Ok(())
    }

    async fn insert_one(&self, collection: &str, record: &Record) -> Result<Record, StoreError> {
        self.calls.insert_one.fetch_add(1, AtomicOrdering::SeqCst);
        if let Some(error) = self.fault_for(collection, record) {
            return Err(error);
        }
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        let table = tables.entry(collection.to_string()).or_default();

        self.check_not_null(collection, record)?;
        self.check_unique(collection, record, table.rows.iter())?;

        let mut row = record.clone();
        table.next_id += 1;
        row.entry("id").or_insert_with(|| Value::from(table.next_id));
        table.rows.push(row.clone());
        Ok(row)
    }

    async fn select_page(
        &self,
        collection: &str,
        query: &PageQuery,
    ) -> Result<Vec<Record>, StoreError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        let Some(table) = tables.get(collection) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<&Record> = table
            .rows
            .iter()
            .filter(|row| query.filter.as_ref().is_none_or(|f| f.matches(row)))
            .collect();
        if let Some(column) = &query.order_by {
            rows.sort_by(|a, b| compare_values(a.get(column), b.get(column)));
        }

        Ok(rows
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Record,
    ) -> Result<Vec<Record>, StoreError> {
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        let Some(table) = tables.get_mut(collection) else {
            return Ok(Vec::new());
        };

        let (matched, others): (Vec<usize>, Vec<usize>) =
            (0..table.rows.len()).partition(|&i| filter.matches(&table.rows[i]));

        let mut updated = Vec::with_capacity(matched.len());
        for &i in &matched {
            let mut row = table.rows[i].clone();
            for (key, value) in patch {
                row.insert(key.clone(), value.clone());
            }
            self.check_not_null(collection, &row)?;
            self.check_unique(
                collection,
                &row,
                others.iter().map(|&j| &table.rows[j]).chain(updated.iter()),
            )?;
            updated.push(row);
        }

        for (&i, row) in matched.iter().zip(updated.iter()) {
            table.rows[i] = row.clone();
        }
        Ok(updated)
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> Result<usize, StoreError> {
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        let Some(table) = tables.get_mut(collection) else {
            return Ok(0);
        };
        let before = table.rows.len();
        table.rows.retain(|row| !filter.matches(row));
        Ok(before - table.rows.len())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
