//! Records, registries and backends for tests.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use haystack_algolia::document::{ID_FIELD, RECORD_ID_FIELD, RECORD_TYPE_FIELD};
use haystack_algolia::registry::{FieldKind, StaticRegistry};
use haystack_algolia::{
    AlgoliaConfig, AlgoliaSearchBackend, Indexable, ModelId, NativeValue, PreparedDocument,
    SearchIndex,
};

use super::mock::MockAlgoliaClient;

pub fn post_model() -> ModelId {
    ModelId::new("blog", "post")
}

pub fn product_model() -> ModelId {
    ModelId::new("shop", "product")
}

/// A blog post record.
#[derive(Debug, Clone)]
pub struct Post {
    pub id: u32,
    pub title: String,
    pub body: String,
    pub published: NaiveDateTime,
    pub tags: Vec<String>,
}

impl Post {
    pub fn new(id: u32, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            body: format!("Body of post {}", id),
            published: NaiveDate::from_ymd_opt(2024, 5, 17)
                .and_then(|d| d.and_hms_opt(9, 30, 0))
                .unwrap(),
            tags: vec!["rust".to_string(), "search".to_string(), "rust".to_string()],
        }
    }
}

impl Indexable for Post {
    fn model(&self) -> ModelId {
        post_model()
    }

    fn pk(&self) -> String {
        self.id.to_string()
    }
}

/// Creates `count` posts with ids starting at 1.
pub fn posts(count: u32) -> Vec<Post> {
    (1..=count)
        .map(|id| Post::new(id, format!("Post number {}", id)))
        .collect()
}

/// Search index for [`Post`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PostIndex;

impl SearchIndex for PostIndex {
    type Record = Post;

    fn model(&self) -> ModelId {
        post_model()
    }

    fn full_prepare(&self, record: &Post) -> PreparedDocument {
        let mut doc = PreparedDocument::new();
        doc.insert(ID_FIELD.to_string(), record.identifier().into());
        doc.insert(RECORD_TYPE_FIELD.to_string(), post_model().to_string().into());
        doc.insert(RECORD_ID_FIELD.to_string(), record.pk().into());
        doc.insert(
            "text".to_string(),
            format!("{}\n{}", record.title, record.body).into(),
        );
        doc.insert("title".to_string(), record.title.as_str().into());
        doc.insert("published".to_string(), record.published.into());
        doc.insert(
            "tags".to_string(),
            NativeValue::set(record.tags.iter().map(|t| NativeValue::text(t.as_str()))),
        );
        doc.insert("views".to_string(), NativeValue::Int(i64::from(record.id) * 10));
        doc
    }
}

/// A search index that forgets the identifier field.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrokenPostIndex;

impl SearchIndex for BrokenPostIndex {
    type Record = Post;

    fn model(&self) -> ModelId {
        post_model()
    }

    fn full_prepare(&self, record: &Post) -> PreparedDocument {
        let mut doc = PostIndex.full_prepare(record);
        doc.remove(ID_FIELD);
        doc
    }
}

/// A shop product record.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: u32,
    pub name: String,
}

impl Product {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Indexable for Product {
    fn model(&self) -> ModelId {
        product_model()
    }

    fn pk(&self) -> String {
        self.id.to_string()
    }
}

/// Search index for [`Product`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductIndex;

impl SearchIndex for ProductIndex {
    type Record = Product;

    fn model(&self) -> ModelId {
        product_model()
    }

    fn full_prepare(&self, record: &Product) -> PreparedDocument {
        let mut doc = PreparedDocument::new();
        doc.insert(ID_FIELD.to_string(), record.identifier().into());
        doc.insert(RECORD_TYPE_FIELD.to_string(), product_model().to_string().into());
        doc.insert(RECORD_ID_FIELD.to_string(), record.pk().into());
        doc.insert("text".to_string(), record.name.as_str().into());
        doc
    }
}

/// A record of either catalog model.
#[derive(Debug, Clone)]
pub enum CatalogEntry {
    Post(Post),
    Product(Product),
}

impl Indexable for CatalogEntry {
    fn model(&self) -> ModelId {
        match self {
            CatalogEntry::Post(post) => post.model(),
            CatalogEntry::Product(product) => product.model(),
        }
    }

    fn pk(&self) -> String {
        match self {
            CatalogEntry::Post(post) => post.pk(),
            CatalogEntry::Product(product) => product.pk(),
        }
    }
}

/// Search index over [`CatalogEntry`], nominally covering `blog.post`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogIndex;

impl SearchIndex for CatalogIndex {
    type Record = CatalogEntry;

    fn model(&self) -> ModelId {
        post_model()
    }

    fn full_prepare(&self, record: &CatalogEntry) -> PreparedDocument {
        match record {
            CatalogEntry::Post(post) => PostIndex.full_prepare(post),
            CatalogEntry::Product(product) => ProductIndex.full_prepare(product),
        }
    }
}

/// Registry with `blog.post` (title, text) and `shop.product` (no weights).
pub fn registry() -> StaticRegistry {
    let mut registry = StaticRegistry::new()
        .with_model(post_model(), [("text", 1.0), ("title", 3.0)])
        .with_model(product_model(), Vec::<(&str, f64)>::new());
    registry.models[0]
        .fields
        .insert("views".to_string(), FieldKind::Integer);
    registry
}

pub fn config() -> AlgoliaConfig {
    AlgoliaConfig {
        app_id: "TESTAPP".to_string(),
        api_key: "test-key".to_string(),
        index_name_prefix: Some("test_".to_string()),
        optional_words: Some(vec!["the".to_string()]),
        ..Default::default()
    }
}

/// Backend over `client` with the default registry and config.
pub fn backend(client: &MockAlgoliaClient) -> AlgoliaSearchBackend {
    backend_with(client, config())
}

/// Config sharing the index `everything` between models.
pub fn single_index_config() -> AlgoliaConfig {
    AlgoliaConfig {
        index_name: Some("everything".to_string()),
        ..config()
    }
}

/// Backend over `client` with the default registry.
pub fn backend_with(client: &MockAlgoliaClient, config: AlgoliaConfig) -> AlgoliaSearchBackend {
    AlgoliaSearchBackend::with_client("default", config, Arc::new(registry()), Arc::new(client.clone()))
        .expect("valid test configuration")
}
