//! Category table: the ordered rules that map file extensions to destination folders.
//!
//! A table is a list of `(category, extensions)` pairs. Lookup scans the
//! categories in table order and the first category listing the extension
//! wins, so an extension may appear in several categories without ambiguity.
//!
//! Tables are usually loaded from JSON in this shape, where key order is
//! the scan order:
//!
//! ```json
//! {
//!     "Images": { "extensions": ["jpg", "png", "gif"] },
//!     "Documents": { "extensions": ["pdf", "docx", "txt"] }
//! }
//! ```
//!
//! # Examples
//!
//! ```
//! use desksave::category_table::CategoryTable;
//!
//! let table = CategoryTable::from_json(
//!     r#"{"Images": {"extensions": ["jpg"]}, "Docs": {"extensions": ["pdf"]}}"#,
//! )
//! .unwrap();
//! assert_eq!(table.classify("photo.JPG").map(|c| c.name()), Some("Images"));
//! assert_eq!(table.classify("note.xyz"), None);
//! ```

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path};

/// The built-in table, in scan order.
const BUILTIN_CATEGORIES: &[(&str, &[&str])] = &[
    ("compressed", &["rar", "zip", "7z", "arj", "deb", "pkg", "rpm", "z"]),
    (
        "audio",
        &["aif", "cda", "mid", "midi", "mp3", "mpa", "ogg", "wav", "wma", "wpl"],
    ),
    ("disc", &["bin", "dmg", "iso", "toast", "vcd"]),
    (
        "data",
        &["csv", "dat", "db", "dbf", "log", "mdb", "sav", "sql", "tar", "xml"],
    ),
    ("email", &["email", "eml", "emlx", "msg", "oft", "ost", "pst", "vcf"]),
    (
        "executable",
        &[
            "apk", "bat", "bin", "cgi", "pl", "com", "exe", "gadget", "jar", "msi", "py", "wsf",
        ],
    ),
    ("font", &["fnt", "fon", "otf", "ttf"]),
    (
        "pictures",
        &[
            "jpg", "png", "gif", "webp", "tiff", "psd", "raw", "bmp", "heif", "indd", "jpeg", "svg",
            "ps", "ai",
        ],
    ),
    ("presentation", &["key", "odp", "pps", "ppt", "pptx"]),
    ("spreadsheet", &["ods", "xls", "xlsm", "xlsx"]),
    ("text", &["doc", "docx", "odt", "pdf", "rtf", "tex", "txt", "wpd"]),
    (
        "video",
        &["avi", "flv", "h264", "m4v", "mkv", "mov", "mp4", "mpg", "wmv"],
    ),
];

/// Errors raised while building or parsing a category table.
#[derive(Debug, thiserror::Error)]
pub enum CategoryTableError {
    /// The same category name was given twice.
    #[error("duplicate category '{0}'")]
    DuplicateCategory(String),
    /// The name is not usable as a single folder name under the destination.
    #[error("invalid category name '{0}': must be a single folder name")]
    InvalidCategoryName(String),
    /// The JSON document is malformed or has the wrong shape.
    #[error("invalid category table: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// True if `name` is exactly one plain path component, so joining it onto the
/// destination stays directly inside the destination.
fn is_folder_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(first)), None) if first == name
    )
}

/// Normalizes an extension for storage and comparison: trimmed, without a
/// leading dot, lower-cased.
fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Derives the lookup extension of a file name.
///
/// This is the lower-cased text after the last `.`. A name without any `.`
/// yields the whole name, which normally matches no category.
///
/// ```
/// use desksave::category_table::extension_of;
///
/// assert_eq!(extension_of("report.final.PDF"), "pdf");
/// assert_eq!(extension_of("Makefile"), "makefile");
/// assert_eq!(extension_of("trailing."), "");
/// ```
pub fn extension_of(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => file_name.to_lowercase(),
    }
}

/// A named bucket of extensions. The name doubles as the destination folder name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    name: String,
    extensions: BTreeSet<String>,
}

impl Category {
    /// Creates a category, normalizing every extension.
    pub fn new<I, S>(name: impl Into<String>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            extensions: extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The normalized extensions, sorted.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    /// Case-insensitive membership test.
    pub fn contains(&self, ext: &str) -> bool {
        self.extensions.contains(&ext.to_lowercase())
    }
}

/// JSON value stored under each category key.
#[derive(Debug, Serialize, Deserialize)]
struct CategoryEntry {
    extensions: Vec<String>,
}

/// Ordered, immutable-per-run mapping from category name to extension set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTable {
    categories: Vec<Category>,
}

impl CategoryTable {
    /// Creates an empty table. An empty table classifies nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in twelve-category table.
    ///
    /// `bin` is listed under both `disc` and `executable`; scan order
    /// resolves it to `disc`.
    pub fn builtin() -> Self {
        Self {
            categories: BUILTIN_CATEGORIES
                .iter()
                .map(|(name, exts)| Category::new(*name, exts.iter()))
                .collect(),
        }
    }

    /// Appends a category at the end of the scan order.
    ///
    /// # Errors
    ///
    /// Returns `CategoryTableError::InvalidCategoryName` if the name is not a
    /// single folder name (empty, `.`, `..`, absolute, or containing a
    /// separator), and `CategoryTableError::DuplicateCategory` if it is taken.
    pub fn push(&mut self, category: Category) -> Result<(), CategoryTableError> {
        if !is_folder_name(category.name()) {
            return Err(CategoryTableError::InvalidCategoryName(category.name));
        }
        if self.get(category.name()).is_some() {
            return Err(CategoryTableError::DuplicateCategory(category.name));
        }
        self.categories.push(category);
        Ok(())
    }

    /// Builder form of [`push`](Self::push).
    pub fn with_category<I, S>(
        mut self,
        name: impl Into<String>,
        extensions: I,
    ) -> Result<Self, CategoryTableError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.push(Category::new(name, extensions))?;
        Ok(self)
    }

    /// Parses a table from its JSON form, keeping document key order.
    pub fn from_json(json: &str) -> Result<Self, CategoryTableError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Renders the table in its JSON form.
    pub fn to_json_pretty(&self) -> Result<String, CategoryTableError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Looks up a category by exact name.
    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// First category, in scan order, whose set contains `ext`.
    pub fn category_for_extension(&self, ext: &str) -> Option<&Category> {
        let ext = ext.to_lowercase();
        self.categories.iter().find(|c| c.extensions.contains(&ext))
    }

    /// Classifies a file by name using [`extension_of`].
    pub fn classify(&self, file_name: &str) -> Option<&Category> {
        self.category_for_extension(&extension_of(file_name))
    }
}

impl Serialize for CategoryTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for category in &self.categories {
            let entry = CategoryEntry {
                extensions: category.extensions.iter().cloned().collect(),
            };
            map.serialize_entry(&category.name, &entry)?;
        }
        map.end()
    }
}

struct CategoryTableVisitor;

impl<'de> Visitor<'de> for CategoryTableVisitor {
    type Value = CategoryTable;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of category name to {\"extensions\": [...]}")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut table = CategoryTable::new();
        while let Some((name, entry)) = access.next_entry::<String, CategoryEntry>()? {
            table
                .push(Category::new(name, entry.extensions))
                .map_err(de::Error::custom)?;
        }
        Ok(table)
    }
}

impl<'de> Deserialize<'de> for CategoryTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(CategoryTableVisitor)
    }
}
