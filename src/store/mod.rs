//! File-backed persistence
//!
//! Each collection lives in one JSON array file under the data directory.
//! Loads drop duplicate ids (first occurrence wins) and writes go through a
//! temp-file rename so a crash never leaves a half-written collection.

mod models;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{info, warn};

pub use models::{Category, Recording, RecordingKind, Wallet, DEFAULT_CATEGORIES};

/// A persisted record with a string id
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync {
    fn id(&self) -> &str;
}

impl Entity for Recording {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Category {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Wallet {
    fn id(&self) -> &str {
        &self.id
    }
}

/// One JSON-array collection file
pub struct JsonStore<T: Entity> {
    path: PathBuf,
    items: RwLock<Vec<T>>,
}

impl<T: Entity> JsonStore<T> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut items: Vec<T> = if path.exists() {
            let data = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&data)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Vec::new()
        };

        // Drop duplicate ids, keeping the first occurrence
        let mut seen = HashSet::new();
        let before = items.len();
        items.retain(|item| {
            if seen.insert(item.id().to_string()) {
                true
            } else {
                warn!("Duplicate id found: {}, removing duplicate", item.id());
                false
            }
        });

        if before != seen.len() {
            // Persist the cleaned collection right away
            write_collection(&path, &items)?;
        }

        Ok(Self {
            path,
            items: RwLock::new(items),
        })
    }

    pub async fn all(&self) -> Vec<T> {
        self.items.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<T> {
        self.items
            .read()
            .await
            .iter()
            .find(|item| item.id() == id)
            .cloned()
    }

    pub async fn save(&self, item: T) -> Result<()> {
        {
            let mut items = self.items.write().await;
            items.insert(0, item);
        }
        self.persist().await
    }

    /// Apply a mutation to the item with the given id. Returns false when the
    /// id is unknown; nothing is written in that case.
    pub async fn update(&self, id: &str, apply: impl FnOnce(&mut T)) -> Result<bool> {
        let found = {
            let mut items = self.items.write().await;
            match items.iter_mut().find(|item| item.id() == id) {
                Some(item) => {
                    apply(item);
                    true
                }
                None => false,
            }
        };

        if found {
            self.persist().await?;
        }
        Ok(found)
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let removed = {
            let mut items = self.items.write().await;
            let before = items.len();
            items.retain(|item| item.id() != id);
            items.len() != before
        };

        if removed {
            self.persist().await?;
        }
        Ok(removed)
    }

    /// Next numeric id: one past the largest existing numeric id.
    pub async fn next_id(&self) -> String {
        let items = self.items.read().await;
        let max = items
            .iter()
            .filter_map(|item| item.id().parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        (max + 1).to_string()
    }

    async fn persist(&self) -> Result<()> {
        let items = self.items.read().await;
        write_collection(&self.path, &items)
    }
}

fn write_collection<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let json = serde_json::to_string_pretty(items).context("Failed to serialize collection")?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

/// All collections of the service
pub struct Store {
    pub recordings: JsonStore<Recording>,
    pub categories: JsonStore<Category>,
    pub wallets: JsonStore<Wallet>,
}

impl Store {
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir).context("Failed to create data directory")?;

        let store = Self {
            recordings: JsonStore::open(data_dir.join("recordings.json"))?,
            categories: JsonStore::open(data_dir.join("categories.json"))?,
            wallets: JsonStore::open(data_dir.join("wallets.json"))?,
        };

        store.seed_defaults().await?;

        info!("Store opened at {}", data_dir.display());
        Ok(store)
    }

    /// First run: seed the default taxonomy and a default wallet
    async fn seed_defaults(&self) -> Result<()> {
        if self.categories.all().await.is_empty() {
            for name in DEFAULT_CATEGORIES {
                let id = self.categories.next_id().await;
                self.categories
                    .save(Category {
                        id,
                        name: name.to_string(),
                    })
                    .await?;
            }
        }

        if self.wallets.all().await.is_empty() {
            self.wallets
                .save(Wallet {
                    id: "1".to_string(),
                    name: "Cash".to_string(),
                    balance: 0.0,
                })
                .await?;
        }

        Ok(())
    }

    pub async fn category_names(&self) -> Vec<String> {
        self.categories
            .all()
            .await
            .into_iter()
            .map(|c| c.name)
            .collect()
    }

    pub async fn category_id_by_name(&self, name: &str) -> Option<String> {
        self.categories
            .all()
            .await
            .into_iter()
            .find(|c| c.name == name)
            .map(|c| c.id)
    }
}
