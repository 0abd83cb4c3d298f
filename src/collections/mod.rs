//! Collection catalog
//!
//! A collection is one back-office table together with everything needed to
//! write to it: the field mapping from dashboard payloads, default values,
//! admission rules, and the column used to name a record in error messages.
//!
//! The built-in catalog covers every table; a `collections.yml` file can
//! replace it. Example format:
//! ```yaml
//! collections:
//!   - name: vendors
//!     table: vendors
//!     key_field: vendor_code
//!     rules:
//!       - field: vendor_code
//!         check: required
//!     unique:
//!       - vendor_code
//! ```

mod catalog;
mod extractor;
mod loader;

pub use extractor::CollectionExtractor;
pub use loader::BulkLoader;

use crate::ingest::{Check, IngestTarget, RuleSet, ValidationRule};
use crate::store::MemoryStore;
use crate::transform::{DefaultFiller, FieldMapper, NumberParser, RecordPreparer};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Server-managed columns never accepted from a payload
const MANAGED_FIELDS: &[&str] = &["created_at", "updated_at"];

/// Definition of one collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionSpec {
    /// Name used in URLs and on the command line
    pub name: String,
    /// Table name in the store
    pub table: String,
    /// Column that identifies a record to a human (business code, name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_field: Option<String>,
    /// Request field → column overrides; other fields are snake_cased
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_map: BTreeMap<String, String>,
    /// Fields removed from payloads
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped: Vec<String>,
    /// Column defaults applied when a value is absent or null
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub defaults: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<ValidationRule>,
    /// Columns with a unique constraint in the schema
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique: Vec<String>,
}

impl CollectionSpec {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            key_field: None,
            field_map: BTreeMap::new(),
            dropped: MANAGED_FIELDS.iter().map(|f| f.to_string()).collect(),
            defaults: Map::new(),
            rules: Vec::new(),
            unique: Vec::new(),
        }
    }

    pub fn key(mut self, field: &str) -> Self {
        self.key_field = Some(field.to_string());
        self
    }

    pub fn map(mut self, field: &str, column: &str) -> Self {
        self.field_map.insert(field.to_string(), column.to_string());
        self
    }

    pub fn default_value(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.defaults.insert(column.to_string(), value.into());
        self
    }

    pub fn rule(mut self, rule: ValidationRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn required<const N: usize>(mut self, columns: [&str; N]) -> Self {
        self.rules
            .extend(columns.iter().map(|c| ValidationRule::required(*c)));
        self
    }

    pub fn numbers<const N: usize>(mut self, columns: [&str; N]) -> Self {
        self.rules
            .extend(columns.iter().map(|c| ValidationRule::number(*c)));
        self
    }

    pub fn unique<const N: usize>(mut self, columns: [&str; N]) -> Self {
        self.unique.extend(columns.iter().map(|c| c.to_string()));
        self
    }

    /// Transformer turning a dashboard payload into a storage-ready row
    pub fn preparer(&self) -> RecordPreparer {
        let mapper = FieldMapper::new(self.field_map.clone()).with_dropped(self.dropped.clone());
        let defaults = DefaultFiller::new(self.defaults.clone());
        let numbers = NumberParser::new(
            self.rules
                .iter()
                .filter(|rule| rule.check == Check::Number)
                .map(|rule| rule.field.clone()),
        );
        RecordPreparer::new(mapper, defaults).with_numbers(numbers)
    }

    /// Bulk ingest target for this collection
    ///
    /// # Errors
    /// Returns an error if a pattern rule does not compile
    pub fn ingest_target(&self) -> Result<IngestTarget> {
        let rules = RuleSet::compile(&self.rules)
            .with_context(|| format!("Invalid rule in collection '{}'", self.name))?;
        let mut target = IngestTarget::new(&self.table).with_rules(rules);
        if let Some(key) = &self.key_field {
            target = target.with_key_field(key);
        }
        Ok(target)
    }
}

/// Catalog file structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionCatalog {
    #[serde(default)]
    pub collections: Vec<CollectionSpec>,
}

impl Default for CollectionCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CollectionCatalog {
    /// Catalog of every back-office table
    pub fn builtin() -> Self {
        Self {
            collections: catalog::builtin_collections(),
        }
    }

    /// Read a catalog from a YAML file
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
        let catalog: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse catalog: {}", path.display()))?;
        catalog.validate()?;
        log::debug!(
            "Loaded {} collection(s) from {}",
            catalog.collections.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Write the catalog as YAML
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self).context("Failed to serialize catalog")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write catalog: {}", path.display()))?;
        Ok(())
    }

    /// Check names are unique and every rule compiles
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for spec in &self.collections {
            if !seen.insert(spec.name.as_str()) {
                eyre::bail!("Collection '{}' is defined more than once", spec.name);
            }
            spec.ingest_target()?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CollectionSpec> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Look up a collection, listing the known names on failure
    pub fn require(&self, name: &str) -> Result<&CollectionSpec> {
        self.get(name).ok_or_else(|| {
            eyre::eyre!(
                "Unknown collection '{}'. Available collections: {}",
                name,
                self.names().join(", ")
            )
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.collections.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn count(&self) -> usize {
        self.collections.len()
    }

    /// Memory store carrying the catalog's unique constraints
    pub fn memory_store(&self) -> MemoryStore {
        self.collections
            .iter()
            .fold(MemoryStore::new(), |store, spec| {
                store.with_unique(&spec.table, spec.unique.iter().cloned())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etl::Transformer;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = CollectionCatalog::builtin();
        catalog.validate().unwrap();
        assert_eq!(catalog.count(), 9);
        for name in [
            "vendors",
            "brands",
            "projects",
            "payout_accounts",
            "online_commerce_income",
            "global_marketing_income",
            "global_sales_income",
            "brand_planning_income",
            "other_income",
        ] {
            assert!(catalog.get(name).is_some(), "missing {}", name);
        }
    }

    #[test]
    fn test_every_builtin_has_key_and_unique() {
        for spec in CollectionCatalog::builtin().collections {
            assert!(spec.key_field.is_some(), "{} has no key field", spec.name);
            assert!(!spec.unique.is_empty(), "{} has no unique column", spec.name);
        }
    }

    #[test]
    fn test_require_unknown() {
        let err = CollectionCatalog::builtin().require("invoices").unwrap_err();
        assert!(err.to_string().contains("Unknown collection 'invoices'"));
        assert!(err.to_string().contains("vendors"));
    }

    #[test]
    fn test_yaml_roundtrip_through_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("collections.yml");

        let catalog = CollectionCatalog::builtin();
        catalog.write(&path).unwrap();
        assert_eq!(CollectionCatalog::read(&path).unwrap(), catalog);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("collections.yml");
        std::fs::write(
            &path,
            "collections:\n  - name: a\n    table: a\n  - name: a\n    table: b\n",
        )
        .unwrap();

        let err = CollectionCatalog::read(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("defined more than once"));
    }

    #[test]
    fn test_minimal_yaml_gets_defaults() {
        let catalog: CollectionCatalog =
            serde_yaml::from_str("collections:\n  - name: notes\n    table: notes\n").unwrap();
        let spec = &catalog.collections[0];
        assert!(spec.rules.is_empty());
        assert!(spec.dropped.is_empty());
        assert!(spec.key_field.is_none());
    }

    #[test]
    fn test_preparer_applies_map_and_defaults() {
        let catalog = CollectionCatalog::builtin();
        let spec = catalog.get("online_commerce_income").unwrap();
        let row = spec
            .preparer()
            .transform(json!({
                "orderNumber": "OC-1",
                "brandCode": "B01",
                "salesDate": "2024-07-01",
                "amount": 15000,
                "createdAt": "2024-07-02T00:00:00Z"
            }))
            .unwrap();

        assert_eq!(row["order_number"], "OC-1");
        assert_eq!(row["currency"], "KRW");
        assert!(row.get("created_at").is_none());
    }

    #[test]
    fn test_preparer_parses_number_columns() {
        let catalog = CollectionCatalog::builtin();
        let spec = catalog.get("online_commerce_income").unwrap();
        let row = spec
            .preparer()
            .transform(json!({"orderNumber": "OC-1", "amount": "1,200", "brandCode": "007"}))
            .unwrap();

        assert_eq!(row["amount"], 1200);
        assert_eq!(row["brand_code"], "007");
    }

    #[tokio::test]
    async fn test_memory_store_enforces_catalog_unique() {
        use crate::store::Store;

        let store = CollectionCatalog::builtin().memory_store();
        let row = json!({"vendor_code": "V1", "vendor_name": "One"})
            .as_object()
            .cloned()
            .unwrap();

        store.insert_one("vendors", &row).await.unwrap();
        let err = store.insert_one("vendors", &row).await.unwrap_err();
        assert_eq!(err.code(), Some("23505"));
    }
}
