use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use quiz_core::model::{Question, QuestionKind};

use crate::error::CatalogError;

/// One entry of the catalog index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub id: String,
    pub label: String,
    pub file: String,
}

/// The catalog index: available datasets plus an optional default choice.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DatasetIndex {
    pub datasets: Vec<DatasetEntry>,
    #[serde(default)]
    pub default_dataset: Option<String>,
}

/// Which part of the catalog a session draws from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DatasetSelection {
    /// Merge every dataset, skipping duplicate question ids.
    All,
    /// A single dataset by index id.
    Dataset(String),
}

impl DatasetSelection {
    /// Parse a selection string; `"ALL"` or an empty string select the
    /// whole catalog.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.is_empty() || value == "ALL" {
            Self::All
        } else {
            Self::Dataset(value.to_string())
        }
    }
}

/// Contract for fetching catalog data.
///
/// Both operations may fail with a transport or format error which is
/// propagated unchanged to the caller.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Fetch the dataset index.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the index cannot be fetched or decoded.
    async fn fetch_index(&self) -> Result<DatasetIndex, CatalogError>;

    /// Fetch the questions of one dataset file.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the dataset cannot be fetched or decoded.
    async fn fetch_dataset(&self, file: &str) -> Result<Vec<Question>, CatalogError>;
}

//
// ─── HTTP PROVIDER ─────────────────────────────────────────────────────────────
//

/// Catalog provider over HTTP, rooted at a base URL serving `index.json`
/// and the dataset files it references.
#[derive(Clone)]
pub struct HttpCatalogProvider {
    client: Client,
    base_url: String,
}

impl HttpCatalogProvider {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, file: &str) -> String {
        format!("{}/{file}", self.base_url.trim_end_matches('/'))
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        file: &str,
    ) -> Result<T, CatalogError> {
        let url = self.url(file);
        debug!(%url, "fetching catalog file");
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(CatalogError::HttpStatus(response.status()));
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl CatalogProvider for HttpCatalogProvider {
    async fn fetch_index(&self) -> Result<DatasetIndex, CatalogError> {
        self.fetch_json("index.json").await
    }

    async fn fetch_dataset(&self, file: &str) -> Result<Vec<Question>, CatalogError> {
        self.fetch_json(file).await
    }
}

//
// ─── STATIC PROVIDER ───────────────────────────────────────────────────────────
//

/// In-memory catalog provider for testing and prototyping.
#[derive(Clone, Default)]
pub struct StaticCatalogProvider {
    index: DatasetIndex,
    files: HashMap<String, Vec<Question>>,
}

impl StaticCatalogProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dataset under `<id>.json`.
    #[must_use]
    pub fn with_dataset(
        mut self,
        id: impl Into<String>,
        label: impl Into<String>,
        questions: Vec<Question>,
    ) -> Self {
        let id = id.into();
        let file = format!("{id}.json");
        self.index.datasets.push(DatasetEntry {
            id,
            label: label.into(),
            file: file.clone(),
        });
        self.files.insert(file, questions);
        self
    }
}

#[async_trait]
impl CatalogProvider for StaticCatalogProvider {
    async fn fetch_index(&self) -> Result<DatasetIndex, CatalogError> {
        Ok(self.index.clone())
    }

    async fn fetch_dataset(&self, file: &str) -> Result<Vec<Question>, CatalogError> {
        self.files
            .get(file)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownDataset(file.to_string()))
    }
}

//
// ─── CACHING SERVICE ───────────────────────────────────────────────────────────
//

/// Catalog access with per-selection memoization.
///
/// The index and each requested selection are fetched once and then served
/// from memory until [`CatalogService::invalidate`] is called. Lifecycle per
/// the engine's resource model: populated on first load, dropped on explicit
/// invalidation; a concurrent first load at worst fetches twice.
pub struct CatalogService {
    provider: Arc<dyn CatalogProvider>,
    index: Mutex<Option<DatasetIndex>>,
    questions: Mutex<HashMap<DatasetSelection, Arc<Vec<Question>>>>,
}

impl CatalogService {
    #[must_use]
    pub fn new(provider: Arc<dyn CatalogProvider>) -> Self {
        Self {
            provider,
            index: Mutex::new(None),
            questions: Mutex::new(HashMap::new()),
        }
    }

    /// The dataset index, fetched once.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the index cannot be fetched or decoded.
    pub async fn index(&self) -> Result<DatasetIndex, CatalogError> {
        if let Some(index) = lock(&self.index).clone() {
            return Ok(index);
        }
        let index = self.provider.fetch_index().await?;
        *lock(&self.index) = Some(index.clone());
        Ok(index)
    }

    /// The available datasets.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the index cannot be fetched or decoded.
    pub async fn datasets(&self) -> Result<Vec<DatasetEntry>, CatalogError> {
        Ok(self.index().await?.datasets)
    }

    /// Questions for a selection, fetched once per selection key.
    ///
    /// Only single-choice questions are kept. The `All` merge additionally
    /// skips duplicate ids across datasets, first dataset wins.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` for an unknown dataset id or a failed fetch;
    /// a failure is never papered over with previously cached data for a
    /// different selection.
    pub async fn questions(
        &self,
        selection: &DatasetSelection,
    ) -> Result<Arc<Vec<Question>>, CatalogError> {
        if let Some(cached) = lock(&self.questions).get(selection).cloned() {
            return Ok(cached);
        }

        let loaded = match selection {
            DatasetSelection::All => self.load_all().await?,
            DatasetSelection::Dataset(id) => self.load_one(id).await?,
        };
        debug!(count = loaded.len(), ?selection, "catalog selection loaded");

        let loaded = Arc::new(loaded);
        lock(&self.questions).insert(selection.clone(), Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Drop the cached index and question lists.
    pub fn invalidate(&self) {
        *lock(&self.index) = None;
        lock(&self.questions).clear();
    }

    async fn load_all(&self) -> Result<Vec<Question>, CatalogError> {
        let index = self.index().await?;
        let mut all = Vec::new();
        let mut seen = HashSet::new();
        for entry in &index.datasets {
            let list = self.provider.fetch_dataset(&entry.file).await?;
            for question in list {
                if question.kind() != QuestionKind::Single {
                    continue;
                }
                if !seen.insert(question.id().clone()) {
                    continue;
                }
                all.push(question);
            }
        }
        Ok(all)
    }

    async fn load_one(&self, id: &str) -> Result<Vec<Question>, CatalogError> {
        let index = self.index().await?;
        let entry = index
            .datasets
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| CatalogError::UnknownDataset(id.to_string()))?;
        let list = self.provider.fetch_dataset(&entry.file).await?;
        Ok(list
            .into_iter()
            .filter(|q| q.kind() == QuestionKind::Single)
            .collect())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuestionId;

    fn question(id: &str) -> Question {
        Question::new(
            QuestionId::new(id),
            "subject",
            "ch1",
            format!("text {id}"),
            ["a", "b", "c", "d"].map(String::from),
            0,
            "",
            "src",
        )
        .unwrap()
    }

    fn provider() -> StaticCatalogProvider {
        StaticCatalogProvider::new()
            .with_dataset("ds1", "Dataset One", vec![question("ds1-1"), question("ds1-2")])
            .with_dataset("ds2", "Dataset Two", vec![question("ds2-1"), question("ds1-1")])
    }

    #[test]
    fn selection_parses_all_markers() {
        assert_eq!(DatasetSelection::parse("ALL"), DatasetSelection::All);
        assert_eq!(DatasetSelection::parse(""), DatasetSelection::All);
        assert_eq!(
            DatasetSelection::parse("ds1"),
            DatasetSelection::Dataset("ds1".into())
        );
    }

    #[tokio::test]
    async fn all_merge_skips_duplicate_ids_across_datasets() {
        let service = CatalogService::new(Arc::new(provider()));
        let all = service.questions(&DatasetSelection::All).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|q| q.id().as_str()).collect();
        assert_eq!(ids, vec!["ds1-1", "ds1-2", "ds2-1"]);
    }

    #[tokio::test]
    async fn single_dataset_is_served_unmerged() {
        let service = CatalogService::new(Arc::new(provider()));
        let one = service
            .questions(&DatasetSelection::Dataset("ds2".into()))
            .await
            .unwrap();
        let ids: Vec<&str> = one.iter().map(|q| q.id().as_str()).collect();
        assert_eq!(ids, vec!["ds2-1", "ds1-1"]);
    }

    #[tokio::test]
    async fn unknown_dataset_id_is_an_error() {
        let service = CatalogService::new(Arc::new(provider()));
        let err = service
            .questions(&DatasetSelection::Dataset("nope".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::UnknownDataset(id) if id == "nope"));
    }

    #[tokio::test]
    async fn non_single_kinds_are_filtered_out() {
        let json = r#"[{
            "id": "ds3-1",
            "subject": "s",
            "chapter": "c",
            "type": "cloze",
            "question_text": "t",
            "options": ["a", "b", "c", "d"],
            "answer_index": 0
        }]"#;
        let odd: Vec<Question> = serde_json::from_str(json).unwrap();
        let provider = StaticCatalogProvider::new().with_dataset("ds3", "Odd", odd);

        let service = CatalogService::new(Arc::new(provider));
        let loaded = service
            .questions(&DatasetSelection::Dataset("ds3".into()))
            .await
            .unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn selections_are_cached_until_invalidated() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct CountingProvider {
            inner: StaticCatalogProvider,
            fetches: AtomicUsize,
        }

        #[async_trait]
        impl CatalogProvider for CountingProvider {
            async fn fetch_index(&self) -> Result<DatasetIndex, CatalogError> {
                self.inner.fetch_index().await
            }

            async fn fetch_dataset(&self, file: &str) -> Result<Vec<Question>, CatalogError> {
                self.fetches.fetch_add(1, Ordering::SeqCst);
                self.inner.fetch_dataset(file).await
            }
        }

        let counting = Arc::new(CountingProvider {
            inner: provider(),
            fetches: AtomicUsize::new(0),
        });
        let service = CatalogService::new(Arc::clone(&counting) as Arc<dyn CatalogProvider>);

        let selection = DatasetSelection::Dataset("ds1".into());
        service.questions(&selection).await.unwrap();
        service.questions(&selection).await.unwrap();
        assert_eq!(counting.fetches.load(Ordering::SeqCst), 1);

        service.invalidate();
        service.questions(&selection).await.unwrap();
        assert_eq!(counting.fetches.load(Ordering::SeqCst), 2);
    }
}
