//! Tunable heuristics for the import pipeline.
//!
//! Every threshold and dictionary that was tuned against sample uploads lives
//! here rather than inline, so deployments can override them from a YAML file:
//!
//! ```yaml
//! reader:
//!   max_file_size_bytes: 10485760
//! matching:
//!   fuzzy_threshold: 0.7
//!   aliases:
//!     quantity: [qty, quantity, on_hand]
//! ```
//!
//! Keys that are absent keep their defaults.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_FILE_SIZE_BYTES: usize = 50 * 1024 * 1024;
pub const DEFAULT_HEADER_SCAN_ROWS: usize = 10;
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.6;

const DEFAULT_HEADER_KEYWORDS: &[&str] = &[
    "name",
    "item",
    "product",
    "title",
    "id",
    "sku",
    "code",
    "qty",
    "quantity",
    "count",
    "stock",
    "units",
    "price",
    "cost",
    "amount",
    "total",
    "value",
    "date",
    "location",
    "bin",
    "shelf",
    "warehouse",
    "description",
    "desc",
    "category",
    "type",
    "status",
    "supplier",
    "vendor",
    "notes",
    "min",
    "max",
    "reorder",
];

const DEFAULT_ALIASES: &[(&str, &[&str])] = &[
    (
        "name",
        &["name", "item", "itemname", "product", "productname", "title"],
    ),
    (
        "sku",
        &[
            "sku",
            "id",
            "code",
            "itemcode",
            "itemid",
            "productcode",
            "productid",
            "partnumber",
            "partno",
        ],
    ),
    (
        "quantity",
        &[
            "quantity",
            "qty",
            "count",
            "stock",
            "onhand",
            "qtyonhand",
            "instock",
            "units",
            "stocklevel",
        ],
    ),
    (
        "minquantity",
        &[
            "minquantity",
            "minqty",
            "minimum",
            "minstock",
            "reorderpoint",
            "reorderlevel",
            "par",
            "parlevel",
        ],
    ),
    (
        "price",
        &[
            "price",
            "unitprice",
            "sellprice",
            "sellingprice",
            "saleprice",
            "retailprice",
            "msrp",
        ],
    ),
    (
        "cost",
        &[
            "cost",
            "unitcost",
            "costprice",
            "purchaseprice",
            "buyprice",
            "wholesale",
        ],
    ),
    (
        "description",
        &["description", "desc", "details", "itemdescription"],
    ),
    (
        "location",
        &[
            "location",
            "loc",
            "bin",
            "shelf",
            "warehouse",
            "aisle",
            "storage",
            "binlocation",
        ],
    ),
    ("category", &["category", "cat", "group", "class", "department"]),
    ("supplier", &["supplier", "vendor", "manufacturer", "brand"]),
    ("date", &["date", "dateadded", "created", "updated", "lastupdated"]),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub reader: ReaderConfig,
    pub header: HeaderConfig,
    pub matching: MatchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub max_file_size_bytes: usize,
    /// When false, a JSON array of arrays is read like an array of objects keyed
    /// by position, which yields a leading `"0","1",...` row. When true, the
    /// inner arrays are taken as rows directly.
    pub json_arrays_as_rows: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            json_arrays_as_rows: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    pub scan_rows: usize,
    pub keywords: Vec<String>,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            scan_rows: DEFAULT_HEADER_SCAN_ROWS,
            keywords: DEFAULT_HEADER_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub fuzzy_threshold: f64,
    /// Canonical key to the synonyms that all refer to it. Entries are compared
    /// after name normalization.
    pub aliases: BTreeMap<String, Vec<String>>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            aliases: DEFAULT_ALIASES
                .iter()
                .map(|(key, synonyms)| {
                    (
                        key.to_string(),
                        synonyms.iter().map(|s| s.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }
}

impl ImportConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Opening config file {path:?}"))?;
        let config: ImportConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("Parsing config file {path:?}"))?;
        config.ensure_valid()?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn ensure_valid(&self) -> Result<()> {
        ensure!(
            self.reader.max_file_size_bytes > 0,
            "reader.max_file_size_bytes must be positive"
        );
        ensure!(self.header.scan_rows > 0, "header.scan_rows must be positive");
        ensure!(
            (0.0..=1.0).contains(&self.matching.fuzzy_threshold),
            "matching.fuzzy_threshold must be between 0 and 1, got {}",
            self.matching.fuzzy_threshold
        );
        Ok(())
    }
}
