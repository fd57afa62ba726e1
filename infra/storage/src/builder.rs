use crate::engine::{Document, Store};
use crate::error::{StorageError, StorageErrorExt};
use crate::maintenance;
use private::Sealed;
use serde_json::Value;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info};

const DEFAULT_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone)]
struct StoreConfig {
    file_name: String,
    create: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { file_name: DEFAULT_FILE_NAME.to_owned(), create: true }
    }
}

#[derive(Debug, Default)]
pub struct NoRoot;
#[derive(Debug)]
pub struct WithRoot(PathBuf);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoRoot {}
impl Sealed for WithRoot {}

#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct StoreBuilder<S: Sealed = NoRoot> {
    state: S,
    config: StoreConfig,
}

#[allow(private_bounds)]
impl<S: Sealed> StoreBuilder<S> {
    /// Name of the document inside the root directory. Defaults to `config.json`.
    #[must_use]
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.config.file_name = name.into();
        self
    }

    /// Create the root directory when missing. Defaults to `true`.
    #[must_use]
    pub const fn create(mut self, enable: bool) -> Self {
        self.config.create = enable;
        self
    }
}

impl StoreBuilder<NoRoot> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn root(self, path: impl Into<PathBuf>) -> StoreBuilder<WithRoot> {
        StoreBuilder { state: WithRoot(path.into()), config: self.config }
    }
}

impl StoreBuilder<WithRoot> {
    /// Opens the document, loading existing contents.
    ///
    /// 1. Creates the root when `create(true)`.
    /// 2. Resolves the root to its canonical path.
    /// 3. Removes temporary files orphaned by interrupted writes.
    /// 4. Loads the document; a missing or empty file is an empty store.
    ///
    /// # Errors
    ///
    /// * [`StorageError::Io`] when the root cannot be created, resolved or read.
    /// * [`StorageError::Serialization`] when the file is not valid JSON.
    /// * [`StorageError::Internal`] when it holds JSON other than an object.
    pub async fn open(self) -> Result<Store, StorageError> {
        let root = &self.state.0;

        if self.config.create {
            fs::create_dir_all(root)
                .await
                .context(format!("Creating store root {}", root.display()))?;
        }
        let root = fs::canonicalize(root)
            .await
            .context(format!("Resolving store root {}", root.display()))?;

        maintenance::purge_tmp(&root).await;

        let path = root.join(&self.config.file_name);
        let doc = load(&path).await?;
        info!(path = %path.display(), keys = doc.len(), "Store opened");

        Ok(Store::from_parts(Some(path), doc))
    }
}

async fn load(path: &std::path::Path) -> Result<Document, StorageError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Store file absent, starting empty");
            return Ok(Document::new());
        }
        Err(e) => {
            return Err(StorageError::Io {
                source: e,
                context: Some(format!("Reading {}", path.display()).into()),
            });
        }
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Document::new());
    }

    match serde_json::from_slice::<Value>(&bytes).context(format!("Parsing {}", path.display()))? {
        Value::Object(doc) => Ok(doc),
        other => Err(StorageError::Internal {
            message: format!("store document must be a JSON object, found {}", kind_of(&other))
                .into(),
            context: Some(path.display().to_string().into()),
        }),
    }
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
