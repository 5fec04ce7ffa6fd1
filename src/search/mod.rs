//! Tantivy-based search index module.
//!
//! Provides the text-relevance primitive for schemes: title, tags and
//! description are indexed with English stemming and weighted per field.
//! The index holds every scheme whatever its status; callers apply the
//! structured constraints afterwards.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, Query, QueryParser};
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, STORED, STRING,
};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::Scheme;

/// Field boost values.
const BOOST_TITLE: f32 = 10.0;
const BOOST_TAGS: f32 = 6.0;
const BOOST_DESCRIPTION: f32 = 4.0;

const WRITER_MEMORY: usize = 20_000_000;

/// A scheme matching a text query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
}

/// Search index schema fields.
struct SearchFields {
    id: Field,
    title: Field,
    tags: Field,
    description: Field,
}

/// Tantivy search index for schemes.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

impl SearchIndex {
    /// Create or open a search index at the specified path.
    ///
    /// An index written with a different schema is discarded; it is rebuilt
    /// from the database at startup anyway.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Store(format!("Failed to create index directory: {}", e)))?;

        let stemmed = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer("en_stem")
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );

        let mut schema_builder = Schema::builder();
        let id = schema_builder.add_text_field("id", STRING | STORED);
        let title = schema_builder.add_text_field("title", stemmed.clone());
        let tags = schema_builder.add_text_field("tags", stemmed.clone());
        let description = schema_builder.add_text_field("description", stemmed);
        let schema = schema_builder.build();

        let fields = SearchFields {
            id,
            title,
            tags,
            description,
        };

        let index = match open_in(index_path, &schema) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding incompatible search index");
                std::fs::remove_dir_all(index_path)
                    .and_then(|_| std::fs::create_dir_all(index_path))
                    .map_err(|e| AppError::Store(format!("Failed to reset index: {}", e)))?;
                Index::create_in_dir(index_path, schema.clone())?
            }
        };

        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()?;

        let writer = index.writer_with_num_threads(1, WRITER_MEMORY)?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Rebuild the entire index from the given schemes.
    pub async fn rebuild(&self, schemes: &[Scheme]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_all_documents()?;
        for scheme in schemes {
            writer.add_document(self.create_document(scheme))?;
        }
        writer.commit()?;

        // Reload reader to see new documents
        self.reader.reload()?;

        tracing::info!("Search index rebuilt with {} schemes", schemes.len());
        Ok(())
    }

    /// Index a single scheme, replacing any previous version.
    pub async fn index_scheme(&self, scheme: &Scheme) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_text(self.fields.id, &scheme.id));
        writer.add_document(self.create_document(scheme))?;
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Remove a scheme from the index.
    pub async fn remove_scheme(&self, id: &str) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_text(self.fields.id, id));
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Every scheme matching any query term, best match first.
    ///
    /// Query syntax errors in user input never fail the search; the
    /// parseable part of the query is used.
    pub fn search(&self, query_str: &str) -> Result<Vec<SearchHit>, AppError> {
        if query_str.trim().is_empty() {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        // One boosted subquery per field, combined with OR semantics
        let field_queries = [
            (self.fields.title, BOOST_TITLE),
            (self.fields.tags, BOOST_TAGS),
            (self.fields.description, BOOST_DESCRIPTION),
        ];

        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for (field, boost) in field_queries {
            let field_parser = QueryParser::for_index(&self.index, vec![field]);
            let (field_query, _errors) = field_parser.parse_query_lenient(query_str);
            subqueries.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
        }
        let combined_query = BooleanQuery::new(subqueries);

        let limit = (searcher.num_docs() as usize).max(1);
        let top_docs = searcher.search(&combined_query, &TopDocs::with_limit(limit))?;

        let hits = top_docs
            .into_iter()
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let id = doc.get_first(self.fields.id)?.as_str()?.to_string();
                Some(SearchHit { id, score })
            })
            .collect();

        Ok(hits)
    }

    /// Create a Tantivy document from a scheme.
    fn create_document(&self, scheme: &Scheme) -> TantivyDocument {
        doc!(
            self.fields.id => scheme.id.clone(),
            self.fields.title => scheme.details.title.clone(),
            self.fields.tags => scheme.details.tags.join(" "),
            self.fields.description => scheme.details.description.clone()
        )
    }
}

fn open_in(index_path: &Path, schema: &Schema) -> Result<Index, AppError> {
    let directory = MmapDirectory::open(index_path)
        .map_err(|e| AppError::Store(format!("Failed to open index directory: {}", e)))?;
    Ok(Index::open_or_create(directory, schema.clone())?)
}
