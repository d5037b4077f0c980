// log.rs — Buffered, segmented, hash-chained JSONL audit log.
//
// Records accumulate in an in-memory buffer and are flushed to one file
// per UTC date (`YYYY-MM-DD.jsonl`). Sequence numbers and hashes are
// assigned under the log mutex at record time, so batching never reorders
// the chain. The persisted chain head always reflects the last record that
// actually reached disk; records that fail to write stay buffered and are
// retried on the next flush cycle.
//
// Verification is startup-only: it walks every retained segment oldest to
// newest, recomputes each hash, and on the first mismatch reports the
// broken sequence and switches the log read-only. It never deletes data.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{NaiveDate, TimeZone, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::chain::ChainHead;
use crate::error::AuditError;
use crate::record::{AuditRecord, MatchedRule, RiskAtDecision, TrustAtDecision};
use crate::redact::{ContextSnapshot, Redactor};

/// How much of the context snapshot a record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditLevel {
    /// Who did what: no parameters, no message bodies, no metadata.
    Minimal,
    /// Parameters and message bodies, no metadata.
    #[default]
    Standard,
    /// The full redacted snapshot.
    Verbose,
}

/// Construction options for [`AuditLog`].
#[derive(Debug, Clone)]
pub struct AuditLogOptions {
    /// Directory holding segments and the chain-state sidecar.
    pub dir: PathBuf,
    pub retention_days: i64,
    pub level: AuditLevel,
    pub redact_patterns: Vec<String>,
    /// Flush once this many records are buffered.
    pub flush_max_records: usize,
    /// Flush once the oldest buffered record is this old.
    pub flush_max_age: Duration,
}

impl AuditLogOptions {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            retention_days: 30,
            level: AuditLevel::Standard,
            redact_patterns: Vec::new(),
            flush_max_records: 100,
            flush_max_age: Duration::from_secs(1),
        }
    }
}

/// Everything the caller supplies for one record; sequence, id, hashes,
/// and timestamps are assigned by the log.
#[derive(Debug, Clone)]
pub struct RecordDraft {
    pub verdict: String,
    pub hook: String,
    pub agent_id: String,
    pub tool_name: Option<String>,
    pub context: ContextSnapshot,
    pub trust: TrustAtDecision,
    pub risk: RiskAtDecision,
    pub matched: Vec<MatchedRule>,
    pub eval_us: u64,
    pub llm_consulted: bool,
    pub controls: Vec<String>,
}

/// Result of a chain verification walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainVerification {
    pub ok: bool,
    pub records_checked: u64,
    /// Sequence number of the first broken record, when not ok.
    pub break_at: Option<u64>,
}

/// Filter for [`AuditLog::query`]. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub agent_id: Option<String>,
    pub verdict: Option<String>,
    /// Inclusive wall-clock bounds, milliseconds since the epoch.
    pub from_ms: Option<i64>,
    pub to_ms: Option<i64>,
    /// Result cap; 0 means the default of 1000.
    pub limit: usize,
}

const DEFAULT_QUERY_LIMIT: usize = 1000;

struct LogState {
    head: ChainHead,
    buffer: Vec<AuditRecord>,
    oldest_buffered_at: Option<Instant>,
    read_only: bool,
    last_sweep: Option<NaiveDate>,
}

/// The audit log. Single writer per process; `&self` methods throughout,
/// with a mutex guarding the buffer and head.
pub struct AuditLog {
    options: AuditLogOptions,
    redactor: Redactor,
    state: Mutex<LogState>,
}

impl AuditLog {
    pub fn new(options: AuditLogOptions) -> Self {
        let redactor = Redactor::new(&options.redact_patterns);
        Self {
            options,
            redactor,
            state: Mutex::new(LogState {
                head: ChainHead::genesis(),
                buffer: Vec::new(),
                oldest_buffered_at: None,
                read_only: false,
                last_sweep: None,
            }),
        }
    }

    /// Load the persisted chain head so new records continue the chain.
    pub fn load(&self) -> Result<(), AuditError> {
        let head = ChainHead::load(&self.head_path())?;
        self.state.lock().head = head;
        Ok(())
    }

    /// The current chain head (including not-yet-flushed records).
    pub fn head(&self) -> ChainHead {
        self.state.lock().head.clone()
    }

    /// Whether a chain break has switched the log read-only.
    pub fn is_read_only(&self) -> bool {
        self.state.lock().read_only
    }

    /// Append a record: redact, assign the next sequence, chain the hash,
    /// and buffer. Returns the assigned sequence, or `None` when the log
    /// is read-only after a detected chain break.
    pub fn record(&self, draft: RecordDraft) -> Result<Option<u64>, AuditError> {
        let context = trim_to_level(self.redactor.redact(draft.context), self.options.level);
        let now = Utc::now();

        let (seq, flush_due) = {
            let mut state = self.state.lock();
            if state.read_only {
                tracing::warn!(
                    verdict = %draft.verdict,
                    "audit log is read-only after a chain break; dropping record"
                );
                return Ok(None);
            }
            let seq = state.head.seq + 1;
            let ts_ms = now.timestamp_millis();
            let mut record = AuditRecord {
                seq,
                id: uuid::Uuid::new_v4(),
                prev_hash: state.head.last_hash.clone(),
                hash: String::new(),
                ts_ms,
                iso_time: now.to_rfc3339(),
                verdict: draft.verdict,
                hook: draft.hook,
                agent_id: draft.agent_id,
                tool_name: draft.tool_name,
                context,
                trust: draft.trust,
                risk: draft.risk,
                matched: draft.matched,
                eval_us: draft.eval_us,
                llm_consulted: draft.llm_consulted,
                controls: draft.controls,
            };
            record.hash = record.compute_hash();

            state.head.seq = seq;
            state.head.last_hash = record.hash.clone();
            state.head.last_timestamp = ts_ms;
            state.head.record_count = seq;
            if state.buffer.is_empty() {
                state.oldest_buffered_at = Some(Instant::now());
            }
            state.buffer.push(record);
            (seq, state.buffer.len() >= self.options.flush_max_records)
        };

        if flush_due {
            self.flush()?;
        }
        Ok(Some(seq))
    }

    /// Flush when the oldest buffered record has exceeded the age bound.
    /// This is the timer's entry point.
    pub fn maybe_flush(&self) -> Result<usize, AuditError> {
        let due = {
            let state = self.state.lock();
            state
                .oldest_buffered_at
                .is_some_and(|at| at.elapsed() >= self.options.flush_max_age)
        };
        if due {
            self.flush()
        } else {
            Ok(0)
        }
    }

    /// Drain the buffer to the day segments and persist the head.
    ///
    /// On a write failure the unwritten tail stays buffered (in order) and
    /// the persisted head reflects the last record that reached disk, so
    /// the next cycle retries exactly where this one stopped.
    pub fn flush(&self) -> Result<usize, AuditError> {
        let records = {
            let mut state = self.state.lock();
            state.oldest_buffered_at = None;
            std::mem::take(&mut state.buffer)
        };
        if records.is_empty() {
            return Ok(0);
        }

        fs::create_dir_all(&self.options.dir).map_err(|source| AuditError::Io {
            path: self.options.dir.clone(),
            source,
        })?;

        let mut written = 0usize;
        let mut failure: Option<AuditError> = None;
        let mut handles: BTreeMap<NaiveDate, fs::File> = BTreeMap::new();
        for record in &records {
            let date = date_of_ms(record.ts_ms);
            let file = match handles.entry(date) {
                std::collections::btree_map::Entry::Occupied(entry) => entry.into_mut(),
                std::collections::btree_map::Entry::Vacant(entry) => {
                    let path = self.segment_path(date);
                    match fs::OpenOptions::new().create(true).append(true).open(&path) {
                        Ok(file) => entry.insert(file),
                        Err(source) => {
                            failure = Some(AuditError::Io { path, source });
                            break;
                        }
                    }
                }
            };
            // Through Value so keys come out sorted.
            let line = match serde_json::to_value(record).and_then(|v| serde_json::to_string(&v))
            {
                Ok(line) => line,
                Err(err) => {
                    failure = Some(AuditError::Serialization(err));
                    break;
                }
            };
            if let Err(source) = writeln!(file, "{}", line) {
                failure = Some(AuditError::Io {
                    path: self.segment_path(date),
                    source,
                });
                break;
            }
            written += 1;
        }
        drop(handles);

        if written > 0 {
            let last = &records[written - 1];
            let disk_head = ChainHead {
                seq: last.seq,
                last_hash: last.hash.clone(),
                last_timestamp: last.ts_ms,
                record_count: last.seq,
            };
            disk_head.save(&self.head_path())?;
        }

        if written < records.len() {
            let mut state = self.state.lock();
            let mut requeued: Vec<AuditRecord> = records[written..].to_vec();
            requeued.append(&mut state.buffer);
            state.buffer = requeued;
            state.oldest_buffered_at = Some(Instant::now());
        }

        match failure {
            Some(err) => {
                tracing::warn!(%err, written, "audit flush incomplete; keeping unwritten records buffered");
                Err(err)
            }
            None => Ok(written),
        }
    }

    /// Walk every retained segment and verify the chain.
    ///
    /// On the first mismatch the broken sequence is reported, the log is
    /// switched read-only, and no data is touched.
    pub fn verify_chain(&self) -> Result<ChainVerification, AuditError> {
        let mut prev: Option<(u64, String)> = None;
        let mut checked = 0u64;
        let mut break_at: Option<u64> = None;

        'outer: for (_, path) in self.segment_files()? {
            let content = fs::read_to_string(&path).map_err(|source| AuditError::Io {
                path: path.clone(),
                source,
            })?;
            for line in content.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                let record: AuditRecord = match serde_json::from_str(line) {
                    Ok(record) => record,
                    Err(_) => {
                        // A line that no longer parses is a break at the
                        // sequence that should have lived here.
                        break_at = Some(prev.as_ref().map(|(seq, _)| seq + 1).unwrap_or(1));
                        break 'outer;
                    }
                };
                if record.compute_hash() != record.hash {
                    break_at = Some(record.seq);
                    break 'outer;
                }
                if let Some((prev_seq, prev_hash)) = &prev {
                    if record.seq != prev_seq + 1 || &record.prev_hash != prev_hash {
                        break_at = Some(record.seq);
                        break 'outer;
                    }
                }
                prev = Some((record.seq, record.hash.clone()));
                checked += 1;
            }
        }

        if let Some(seq) = break_at {
            tracing::error!(
                break_at = seq,
                "audit chain verification failed; log is now read-only"
            );
            self.state.lock().read_only = true;
            return Ok(ChainVerification {
                ok: false,
                records_checked: checked,
                break_at,
            });
        }
        Ok(ChainVerification {
            ok: true,
            records_checked: checked,
            break_at: None,
        })
    }

    /// Remove segments older than the retention window.
    pub fn apply_retention(&self) -> Result<usize, AuditError> {
        let today = Utc::now().date_naive();
        let mut removed = 0;
        for (date, path) in self.segment_files()? {
            if (today - date).num_days() > self.options.retention_days {
                fs::remove_file(&path).map_err(|source| AuditError::Io {
                    path: path.clone(),
                    source,
                })?;
                tracing::info!(segment = %path.display(), "removed expired audit segment");
                removed += 1;
            }
        }
        self.state.lock().last_sweep = Some(today);
        Ok(removed)
    }

    /// Run the retention sweep at most once per UTC day.
    pub fn maybe_apply_retention(&self) -> Result<usize, AuditError> {
        let today = Utc::now().date_naive();
        if self.state.lock().last_sweep == Some(today) {
            return Ok(0);
        }
        self.apply_retention()
    }

    /// Scan day files for records matching the filter, oldest first,
    /// capped at the query limit.
    pub fn query(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>, AuditError> {
        // Make buffered records visible to the scan.
        if !self.is_read_only() {
            self.flush()?;
        }
        let limit = if query.limit == 0 {
            DEFAULT_QUERY_LIMIT
        } else {
            query.limit
        };
        let mut out = Vec::new();
        for (date, path) in self.segment_files()? {
            if let Some(from) = query.from_ms {
                if date < date_of_ms(from) {
                    continue;
                }
            }
            if let Some(to) = query.to_ms {
                if date > date_of_ms(to) {
                    continue;
                }
            }
            let content = fs::read_to_string(&path).map_err(|source| AuditError::Io {
                path: path.clone(),
                source,
            })?;
            for line in content.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                let Ok(record) = serde_json::from_str::<AuditRecord>(line) else {
                    continue;
                };
                if let Some(agent) = &query.agent_id {
                    if &record.agent_id != agent {
                        continue;
                    }
                }
                if let Some(verdict) = &query.verdict {
                    if &record.verdict != verdict {
                        continue;
                    }
                }
                if query.from_ms.is_some_and(|from| record.ts_ms < from) {
                    continue;
                }
                if query.to_ms.is_some_and(|to| record.ts_ms > to) {
                    continue;
                }
                out.push(record);
                if out.len() >= limit {
                    return Ok(out);
                }
            }
        }
        Ok(out)
    }

    fn head_path(&self) -> PathBuf {
        self.options.dir.join("chain-state.json")
    }

    fn segment_path(&self, date: NaiveDate) -> PathBuf {
        self.options.dir.join(format!("{}.jsonl", date.format("%Y-%m-%d")))
    }

    /// Every segment file, ascending by date.
    fn segment_files(&self) -> Result<Vec<(NaiveDate, PathBuf)>, AuditError> {
        if !self.options.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.options.dir).map_err(|source| AuditError::Io {
            path: self.options.dir.clone(),
            source,
        })?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| AuditError::Io {
                path: self.options.dir.clone(),
                source,
            })?;
            let path = entry.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if path.extension().is_some_and(|ext| ext == "jsonl") {
                if let Ok(date) = NaiveDate::parse_from_str(stem, "%Y-%m-%d") {
                    files.push((date, path));
                }
            }
        }
        files.sort_by_key(|(date, _)| *date);
        Ok(files)
    }
}

fn date_of_ms(ts_ms: i64) -> NaiveDate {
    match Utc.timestamp_millis_opt(ts_ms) {
        chrono::LocalResult::Single(dt) => dt.date_naive(),
        _ => Utc::now().date_naive(),
    }
}

/// Strip the snapshot down to what the configured level keeps.
fn trim_to_level(mut snapshot: ContextSnapshot, level: AuditLevel) -> ContextSnapshot {
    match level {
        AuditLevel::Minimal => {
            snapshot.tool_params = serde_json::Map::new();
            snapshot.message_content = None;
            snapshot.metadata = serde_json::Map::new();
            snapshot
        }
        AuditLevel::Standard => {
            snapshot.metadata = serde_json::Map::new();
            snapshot
        }
        AuditLevel::Verbose => snapshot,
    }
}
