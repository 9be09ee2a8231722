//! Target schema supplied by the caller.
//!
//! The pipeline never infers columns; it reads a list of [`ColumnDefinition`]s
//! and matches file headers against them. Schemas are usually built in code by
//! the host application, but [`Schema::load`] also accepts YAML or JSON files so
//! the CLI can drive imports end to end:
//!
//! ```yaml
//! columns:
//!   - id: c1
//!     name: Name
//!     type: text
//!     role: name
//!     required: true
//!   - id: c2
//!     name: Category
//!     type: select
//!     options: [Hardware, Tools]
//! ```

use std::{collections::HashSet, fmt, fs, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Number,
    Currency,
    Date,
    Select,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Number => "number",
            ColumnType::Currency => "currency",
            ColumnType::Date => "date",
            ColumnType::Select => "select",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic tag that lets downstream features find a column without relying on
/// its display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnRole {
    Name,
    Quantity,
    MinQuantity,
    Price,
    Cost,
    #[serde(other)]
    Other,
}

impl ColumnRole {
    /// Alias-table key this role resolves to, if any.
    pub fn alias_key(&self) -> Option<&'static str> {
        match self {
            ColumnRole::Name => Some("name"),
            ColumnRole::Quantity => Some("quantity"),
            ColumnRole::MinQuantity => Some("minquantity"),
            ColumnRole::Price => Some("price"),
            ColumnRole::Cost => Some("cost"),
            ColumnRole::Other => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ColumnRole>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub order: i32,
}

impl ColumnDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            column_type,
            role: None,
            options: Vec::new(),
            required: false,
            order: 0,
        }
    }

    pub fn with_role(mut self, role: ColumnRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<ColumnDefinition>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDefinition>) -> Self {
        Self { columns }
    }

    /// Loads a schema from `.json`, or from YAML for any other extension.
    /// A bare list of columns is accepted as well as a `columns:` mapping.
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            fs::read_to_string(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let document: SchemaDocument = if is_json {
            serde_json::from_str(&raw).with_context(|| format!("Parsing schema JSON {path:?}"))?
        } else {
            serde_yaml::from_str(&raw).with_context(|| format!("Parsing schema YAML {path:?}"))?
        };
        let schema = document.into_schema();
        schema
            .validate()
            .with_context(|| format!("Validating schema {path:?}"))?;
        Ok(schema)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for column in &self.columns {
            ensure!(!column.id.trim().is_empty(), "Column '{}' has an empty id", column.name);
            ensure!(
                seen.insert(column.id.as_str()),
                "Duplicate column id '{}'",
                column.id
            );
            if column.column_type == ColumnType::Select {
                ensure!(
                    !column.options.is_empty(),
                    "Select column '{}' must define at least one option",
                    column.name
                );
            }
        }
        Ok(())
    }

    /// Columns in display order; equal `order` values keep their listed order.
    pub fn ordered_columns(&self) -> Vec<&ColumnDefinition> {
        let mut columns: Vec<&ColumnDefinition> = self.columns.iter().collect();
        columns.sort_by_key(|column| column.order);
        columns
    }

    /// First column carrying `role`, for features that locate columns by meaning.
    pub fn find_by_role(&self, role: ColumnRole) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|column| column.role == Some(role))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SchemaDocument {
    Wrapped { columns: Vec<ColumnDefinition> },
    Bare(Vec<ColumnDefinition>),
}

impl SchemaDocument {
    fn into_schema(self) -> Schema {
        match self {
            SchemaDocument::Wrapped { columns } | SchemaDocument::Bare(columns) => {
                Schema::new(columns)
            }
        }
    }
}
