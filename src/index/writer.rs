//! The index writer: buffering, deferred deletes, and atomic commits.
//!
//! One [`Index`] owns the write path of an index directory. Mutations buffer
//! in memory and become visible only when `commit()` seals them into a new
//! immutable segment and atomically publishes a fresh [`Snapshot`]. Readers
//! keep whatever snapshot they hold; the writer never blocks them.

use std::io::Write;
use std::sync::Arc;

use bit_vec::BitVec;
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::analysis::{PerFieldAnalyzer, StandardAnalyzer};
use crate::document::codec::{DocumentCodec, EncodedDocument};
use crate::document::document::Document;
use crate::error::{Result, TamarixError};
use crate::index::segment::{Segment, SegmentBuilder};
use crate::index::snapshot::{SegmentReader, Snapshot};
use crate::query::query::Query;
use crate::query::searcher::Searcher;
use crate::schema::Schema;
use crate::storage::Storage;

/// Marker file claiming the single-writer role.
const WRITE_LOCK: &str = "write.lock";
/// Name of the pointer file naming the live manifest.
const CURRENT: &str = "current";

/// Immutable configuration of an index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    analyzer: Arc<PerFieldAnalyzer>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig::new()
    }
}

impl IndexConfig {
    /// Default configuration: the standard analyzer for every field.
    pub fn new() -> Self {
        IndexConfig {
            analyzer: Arc::new(PerFieldAnalyzer::new(Arc::new(StandardAnalyzer::new()))),
        }
    }

    /// Configuration with an explicit per-field analyzer.
    pub fn with_analyzer(analyzer: Arc<PerFieldAnalyzer>) -> Self {
        IndexConfig { analyzer }
    }

    /// The analyzer documents and queries are analyzed with.
    pub fn analyzer(&self) -> &Arc<PerFieldAnalyzer> {
        &self.analyzer
    }
}

/// On-disk description of one committed generation.
#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    generation: u64,
    schema: Schema,
    segments: Vec<SegmentEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SegmentEntry {
    file: String,
    doc_count: u32,
    /// Local ids of deleted documents.
    deleted: Vec<u32>,
}

/// Mutable writer state, guarded by one mutex.
#[derive(Debug)]
struct WriterState {
    generation: u64,
    /// Files backing the published segments, in snapshot order.
    segment_files: Vec<String>,
    /// Encoded documents awaiting commit.
    buffered: Vec<EncodedDocument>,
    /// Deferred deletes with the buffer length at record time. At commit a
    /// delete applies to every committed document plus buffered documents
    /// added before it, so an update's replacement survives its own delete.
    pending_deletes: Vec<(Query, usize)>,
    closed: bool,
}

/// A document index: single writer, many lock-free snapshot readers.
#[derive(Debug)]
pub struct Index {
    storage: Arc<dyn Storage>,
    schema: Arc<Schema>,
    analyzer: Arc<PerFieldAnalyzer>,
    published: RwLock<Arc<Snapshot>>,
    writer: Mutex<WriterState>,
}

impl Index {
    /// Open an existing index or create an empty one.
    ///
    /// Claims the write lock; fails `ConcurrentWriter` if another writer
    /// holds it. Opening an existing index with a different schema fails
    /// `SchemaMismatch`.
    pub fn open_or_create(
        schema: Schema,
        storage: Arc<dyn Storage>,
        config: IndexConfig,
    ) -> Result<Index> {
        if storage.file_exists(WRITE_LOCK) {
            return Err(TamarixError::concurrent_writer(
                "index already has an active writer (write.lock present)",
            ));
        }
        let mut lock = storage.create_output(WRITE_LOCK)?;
        lock.finish()?;

        let schema = Arc::new(schema);
        let analyzer = config.analyzer.clone();

        let opened = if storage.file_exists(CURRENT) {
            Self::load_current(&*storage, &schema, &analyzer)
        } else {
            info!("creating empty index");
            Ok((Snapshot::empty(schema.clone(), analyzer.clone()), 0, Vec::new()))
        };
        let (snapshot, generation, segment_files) = match opened {
            Ok(state) => state,
            Err(e) => {
                // No Index exists yet, so nothing would ever release the
                // claimed lock; a failed open must not brick later opens.
                let _ = storage.delete_file(WRITE_LOCK);
                return Err(e);
            }
        };

        Ok(Index {
            storage,
            schema,
            analyzer,
            published: RwLock::new(Arc::new(snapshot)),
            writer: Mutex::new(WriterState {
                generation,
                segment_files,
                buffered: Vec::new(),
                pending_deletes: Vec::new(),
                closed: false,
            }),
        })
    }

    fn load_current(
        storage: &dyn Storage,
        schema: &Arc<Schema>,
        analyzer: &Arc<PerFieldAnalyzer>,
    ) -> Result<(Snapshot, u64, Vec<String>)> {
        let mut input = storage.open_input(CURRENT)?;
        let pointer = String::from_utf8(input.read_all()?)
            .map_err(|_| TamarixError::storage("current pointer is not UTF-8"))?;
        let manifest_name = pointer.trim();

        let mut input = storage.open_input(manifest_name)?;
        let mut manifest: Manifest = serde_json::from_slice(&input.read_all()?)?;
        manifest.schema.rebuild_lookup();

        if manifest.schema.fields() != schema.fields() {
            return Err(TamarixError::schema_mismatch(
                "provided schema differs from the schema the index was created with",
            ));
        }

        let mut readers = Vec::with_capacity(manifest.segments.len());
        let mut files = Vec::with_capacity(manifest.segments.len());
        for entry in &manifest.segments {
            let mut input = storage.open_input(&entry.file)?;
            let segment = Arc::new(Segment::read_from(&mut *input)?);
            if segment.doc_count() != entry.doc_count {
                return Err(TamarixError::storage(format!(
                    "segment {} doc count disagrees with manifest",
                    entry.file
                )));
            }
            let mut live = BitVec::from_elem(entry.doc_count as usize, true);
            for &dead in &entry.deleted {
                live.set(dead as usize, false);
            }
            readers.push(SegmentReader::new(segment, live));
            files.push(entry.file.clone());
        }

        let snapshot = Snapshot::new(schema.clone(), analyzer.clone(), readers);
        info!(
            "opened index at generation {} with {} segments, {} live docs",
            manifest.generation,
            manifest.segments.len(),
            snapshot.live_count()
        );
        Ok((snapshot, manifest.generation, files))
    }

    /// The schema this index was created with.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The analyzer documents and queries are analyzed with.
    pub fn analyzer(&self) -> &Arc<PerFieldAnalyzer> {
        &self.analyzer
    }

    /// The most recently published snapshot.
    ///
    /// The returned snapshot is immutable and stays valid across later
    /// commits; call again to observe newer state.
    pub fn open_snapshot(&self) -> Arc<Snapshot> {
        self.published.read().clone()
    }

    /// Buffer a document for addition. Invisible to readers until `commit`.
    pub fn add(&self, document: Document) -> Result<()> {
        let encoded = DocumentCodec::encode(&document, &self.schema, &self.analyzer)?;
        let mut writer = self.writer.lock();
        Self::check_open(&writer)?;
        writer.buffered.push(encoded);
        debug!("buffered document ({} pending)", writer.buffered.len());
        Ok(())
    }

    /// Replace every document whose `field` equals `value` with `document`.
    ///
    /// Equivalent to `delete_by_query(Term(field, value))` followed by
    /// `add(document)`: after the next commit exactly the new document is
    /// live under that key.
    pub fn update_by_key(&self, field: &str, value: &str, document: Document) -> Result<()> {
        self.delete_by_query(Query::term(field, value))?;
        self.add(document)
    }

    /// Record a deferred delete of every document matching `query`.
    ///
    /// Applied at commit time to all committed documents and to documents
    /// buffered before this call. Matching zero documents is not an error.
    pub fn delete_by_query(&self, query: Query) -> Result<()> {
        let mut writer = self.writer.lock();
        Self::check_open(&writer)?;
        let watermark = writer.buffered.len();
        writer.pending_deletes.push((query, watermark));
        Ok(())
    }

    /// Number of buffered (uncommitted) documents.
    pub fn pending_docs(&self) -> usize {
        self.writer.lock().buffered.len()
    }

    /// Seal buffered changes into a new segment and publish a new snapshot.
    ///
    /// All-or-nothing: on failure the previously published snapshot stays
    /// live, the batch is discarded, and the error describes what was lost.
    pub fn commit(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        Self::check_open(&writer)?;
        if writer.buffered.is_empty() && writer.pending_deletes.is_empty() {
            debug!("commit with no pending changes, nothing to do");
            return Ok(());
        }

        let result = self.commit_locked(&mut writer);
        if result.is_err() {
            warn!(
                "commit failed, discarding batch of {} docs and {} deletes",
                writer.buffered.len(),
                writer.pending_deletes.len()
            );
            writer.buffered.clear();
            writer.pending_deletes.clear();
        }
        result
    }

    fn commit_locked(&self, writer: &mut WriterState) -> Result<()> {
        let current = self.published.read().clone();
        let generation = writer.generation + 1;

        // Seal the buffer into a tentative segment.
        let mut builder = SegmentBuilder::new();
        for encoded in &writer.buffered {
            builder.add_document(encoded);
        }
        let new_segment = if builder.is_empty() {
            None
        } else {
            Some(Arc::new(builder.seal()))
        };

        let mut readers: Vec<SegmentReader> = current.readers().to_vec();
        if let Some(segment) = &new_segment {
            readers.push(SegmentReader::all_live(segment.clone()));
        }
        let tentative = Snapshot::new(self.schema.clone(), self.analyzer.clone(), readers);

        // Resolve deferred deletes against committed docs plus the part of
        // the batch each delete saw.
        let new_segment_index = new_segment.as_ref().map(|_| tentative.readers().len() - 1);
        let mut masks: Vec<BitVec> = tentative
            .readers()
            .iter()
            .map(|r| r.live_mask().clone())
            .collect();
        let searcher = Searcher::new(&tentative);
        let mut deleted = 0u64;
        for (query, watermark) in &writer.pending_deletes {
            for global in searcher.matching(query)? {
                if let Some((segment_index, local)) = tentative.locate(global) {
                    if Some(segment_index) == new_segment_index && local as usize >= *watermark {
                        continue;
                    }
                    if masks[segment_index].get(local as usize).unwrap_or(false) {
                        masks[segment_index].set(local as usize, false);
                        deleted += 1;
                    }
                }
            }
        }

        // Persist the new segment, then the manifest, then flip `current`.
        let mut segment_files = writer.segment_files.clone();
        if let Some(segment) = &new_segment {
            let name = format!("segment-{generation:010}.bin");
            let mut out = self.storage.create_output(&name)?;
            segment.write_to(&mut *out)?;
            out.finish()?;
            segment_files.push(name);
        }

        let manifest = Manifest {
            generation,
            schema: (*self.schema).clone(),
            segments: segment_files
                .iter()
                .zip(tentative.readers())
                .zip(&masks)
                .map(|((file, reader), mask)| SegmentEntry {
                    file: file.clone(),
                    doc_count: reader.segment().doc_count(),
                    deleted: mask
                        .iter()
                        .enumerate()
                        .filter(|(_, live)| !live)
                        .map(|(i, _)| i as u32)
                        .collect(),
                })
                .collect(),
        };
        let manifest_name = format!("manifest-{generation:010}.json");
        let mut out = self.storage.create_output(&manifest_name)?;
        out.write_all(&serde_json::to_vec_pretty(&manifest)?)?;
        out.finish()?;

        let pointer_tmp = format!("{CURRENT}.next");
        let mut out = self.storage.create_output(&pointer_tmp)?;
        out.write_all(manifest_name.as_bytes())?;
        out.finish()?;
        self.storage.rename_file(&pointer_tmp, CURRENT)?;
        self.storage.sync()?;

        // Publish.
        let final_readers: Vec<SegmentReader> = tentative
            .readers()
            .iter()
            .zip(masks)
            .map(|(reader, mask)| SegmentReader::new(reader.segment().clone(), mask))
            .collect();
        let snapshot = Snapshot::new(self.schema.clone(), self.analyzer.clone(), final_readers);
        let added = writer.buffered.len();
        let live = snapshot.live_count();
        *self.published.write() = Arc::new(snapshot);

        writer.generation = generation;
        writer.segment_files = segment_files;
        writer.buffered.clear();
        writer.pending_deletes.clear();

        info!(
            "committed generation {generation}: {added} docs added, {deleted} deleted, {live} live"
        );
        Ok(())
    }

    /// Release the write lock without committing. Buffered changes are
    /// discarded; the published snapshot is unaffected.
    pub fn close(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        if writer.closed {
            return Ok(());
        }
        if !writer.buffered.is_empty() || !writer.pending_deletes.is_empty() {
            debug!(
                "closing with {} uncommitted docs and {} pending deletes, discarding",
                writer.buffered.len(),
                writer.pending_deletes.len()
            );
        }
        writer.closed = true;
        writer.buffered.clear();
        writer.pending_deletes.clear();
        self.storage.delete_file(WRITE_LOCK)?;
        Ok(())
    }

    fn check_open(writer: &WriterState) -> Result<()> {
        if writer.closed {
            return Err(TamarixError::index("index writer is closed"));
        }
        Ok(())
    }
}

impl Drop for Index {
    fn drop(&mut self) {
        // Best effort; an explicit close() reports errors instead.
        let _ = self.close();
    }
}
