use loro::LoroDoc;

/// Name of the single text container inside each room document.
const TEXT_CONTAINER: &str = "content";

/// The per-room shared document, a CRDT text replica.
///
/// Concurrent edits from different sessions merge deterministically instead
/// of last-write-wins clobbering each other. The flattened string form is
/// what gets persisted and what fresh joiners render first.
pub struct RoomDoc {
    doc: LoroDoc,
}

/// Result of merging a remote operation into the room replica.
pub struct RemoteApply {
    /// Flattened contents after the merge (and any trimming)
    pub text_content: String,
    /// Trim operation when the merge pushed the document over the length
    /// ceiling; must reach every subscriber including the origin
    pub correction: Option<Vec<u8>>,
}

impl RoomDoc {
    pub fn new(initial: &str) -> Self {
        let doc = LoroDoc::new();
        if !initial.is_empty() {
            let text = doc.get_text(TEXT_CONTAINER);
            let _ = text.insert(0, initial);
            doc.commit();
        }
        Self { doc }
    }

    /// Flattened string form of the document.
    pub fn contents(&self) -> String {
        self.doc.get_text(TEXT_CONTAINER).to_string()
    }

    pub fn char_len(&self) -> usize {
        self.doc.get_text(TEXT_CONTAINER).len_unicode()
    }

    /// Turn a proposed full text into the minimal insert/delete against the
    /// current contents, apply it, and return the incremental operation.
    ///
    /// Proposals past `max_len` are truncated to the ceiling and applied up
    /// to that much; the ceiling truncates, it is not a validation error.
    /// Returns `None` when the proposal matches the current contents.
    pub fn apply_local_edit(
        &mut self,
        proposed: &str,
        max_len: usize,
    ) -> Result<Option<Vec<u8>>, String> {
        let bounded = truncate_chars(proposed, max_len);
        let current = self.contents();
        let Some((pos, deleted, inserted)) = diff_chars(&current, &bounded) else {
            return Ok(None);
        };

        let from = self.doc.oplog_vv();
        let text = self.doc.get_text(TEXT_CONTAINER);
        if deleted > 0 {
            text.delete(pos, deleted).map_err(|e| e.to_string())?;
        }
        if !inserted.is_empty() {
            text.insert(pos, &inserted).map_err(|e| e.to_string())?;
        }
        self.doc.commit();

        let update = self
            .doc
            .export(loro::ExportMode::updates(&from))
            .map_err(|e| e.to_string())?;
        Ok(Some(update))
    }

    /// Merge an operation produced by another replica.
    ///
    /// If the merged document exceeds the ceiling, the excess is deleted and
    /// the trim comes back as a corrective operation.
    pub fn apply_remote_op(&mut self, op: &[u8], max_len: usize) -> Result<RemoteApply, String> {
        self.doc.import(op).map_err(|e| e.to_string())?;

        let mut correction = None;
        let text = self.doc.get_text(TEXT_CONTAINER);
        let len = text.len_unicode();
        if len > max_len {
            let from = self.doc.oplog_vv();
            text.delete(max_len, len - max_len)
                .map_err(|e| e.to_string())?;
            self.doc.commit();
            correction = Some(
                self.doc
                    .export(loro::ExportMode::updates(&from))
                    .map_err(|e| e.to_string())?,
            );
        }

        Ok(RemoteApply {
            text_content: self.contents(),
            correction,
        })
    }

    /// Full document state for a session bootstrapping its replica, without
    /// replaying the operation history.
    pub fn snapshot(&self) -> Result<Vec<u8>, String> {
        self.doc
            .export(loro::ExportMode::Snapshot)
            .map_err(|e| e.to_string())
    }
}

/// Per-room editing strategy.
///
/// The registry and the protocol layer only see `apply`; whether a room
/// merges CRDT operations or overwrites wholesale is decided here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditStrategy {
    /// Merge concurrent edits through the CRDT replica.
    LiveSync,
    /// Last-write-wins overwrite. Loses intermediate keystrokes under true
    /// concurrency, accepted for rooms that opt out of live collaboration.
    Overwrite,
}

/// What the hub should broadcast after an edit.
pub enum EditOutcome {
    /// Incremental operation for everyone except the origin, plus an
    /// optional trim correction for everyone.
    Operation {
        update: Vec<u8>,
        correction: Option<Vec<u8>>,
        text_content: String,
    },
    /// Full text for everyone including the origin.
    Overwrite { text_content: String },
    /// The edit changed nothing.
    Unchanged,
}

impl EditStrategy {
    pub fn for_room(live_sync: bool) -> Self {
        if live_sync {
            EditStrategy::LiveSync
        } else {
            EditStrategy::Overwrite
        }
    }

    pub fn apply(
        self,
        doc: &mut RoomDoc,
        operation: Option<&[u8]>,
        full_text: Option<&str>,
        max_len: usize,
    ) -> Result<EditOutcome, String> {
        match (self, operation, full_text) {
            (EditStrategy::LiveSync, Some(op), _) => {
                let applied = doc.apply_remote_op(op, max_len)?;
                Ok(EditOutcome::Operation {
                    update: op.to_vec(),
                    correction: applied.correction,
                    text_content: applied.text_content,
                })
            }
            (EditStrategy::LiveSync, None, Some(full)) => {
                match doc.apply_local_edit(full, max_len)? {
                    Some(update) => Ok(EditOutcome::Operation {
                        update,
                        correction: None,
                        text_content: doc.contents(),
                    }),
                    None => Ok(EditOutcome::Unchanged),
                }
            }
            (EditStrategy::Overwrite, _, Some(full)) => {
                doc.apply_local_edit(full, max_len)?;
                Ok(EditOutcome::Overwrite {
                    text_content: doc.contents(),
                })
            }
            (EditStrategy::Overwrite, Some(_), None) => {
                Err("room has live sync disabled".to_string())
            }
            (_, None, None) => Err("edit carries no operation or text".to_string()),
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Common-prefix/suffix diff over chars.
/// Returns `(position, chars_deleted, inserted_text)`, or `None` if equal.
fn diff_chars(old: &str, new: &str) -> Option<(usize, usize, String)> {
    if old == new {
        return None;
    }
    let old_chars: Vec<char> = old.chars().collect();
    let new_chars: Vec<char> = new.chars().collect();

    let mut prefix = 0;
    while prefix < old_chars.len()
        && prefix < new_chars.len()
        && old_chars[prefix] == new_chars[prefix]
    {
        prefix += 1;
    }

    let mut suffix = 0;
    while suffix < old_chars.len() - prefix
        && suffix < new_chars.len() - prefix
        && old_chars[old_chars.len() - 1 - suffix] == new_chars[new_chars.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let deleted = old_chars.len() - prefix - suffix;
    let inserted: String = new_chars[prefix..new_chars.len() - suffix].iter().collect();
    Some((prefix, deleted, inserted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_finds_middle_edit() {
        assert_eq!(
            diff_chars("hello world", "hello brave world"),
            Some((6, 0, "brave ".to_string()))
        );
        assert_eq!(
            diff_chars("hello brave world", "hello world"),
            Some((6, 6, String::new()))
        );
        assert_eq!(diff_chars("same", "same"), None);
    }

    #[test]
    fn local_edit_truncates_to_the_ceiling() {
        let mut doc = RoomDoc::new("");
        let op = doc.apply_local_edit("abcdefghij", 5).unwrap();
        assert!(op.is_some());
        assert_eq!(doc.contents(), "abcde");
        assert_eq!(doc.char_len(), 5);
    }

    #[test]
    fn noop_edit_produces_no_operation() {
        let mut doc = RoomDoc::new("stable");
        assert!(doc.apply_local_edit("stable", 100).unwrap().is_none());
    }

    #[test]
    fn remote_op_over_ceiling_yields_correction() {
        let mut origin = RoomDoc::new("");
        let op = origin.apply_local_edit("0123456789", 100).unwrap().unwrap();

        let mut replica = RoomDoc::new("");
        let applied = replica.apply_remote_op(&op, 4).unwrap();
        assert_eq!(applied.text_content, "0123");
        let correction = applied.correction.expect("trim should produce an op");

        // The origin converges after applying the correction.
        let back = origin.apply_remote_op(&correction, 4).unwrap();
        assert_eq!(back.text_content, "0123");
        assert!(back.correction.is_none());
    }

    #[test]
    fn concurrent_edits_converge_regardless_of_arrival_order() {
        // Two typists start from the same empty document.
        let mut a = RoomDoc::new("");
        let mut b = RoomDoc::new("");
        let op_a = a.apply_local_edit("hello", 100).unwrap().unwrap();
        let op_b = b.apply_local_edit(" world", 100).unwrap().unwrap();

        // Two observers receive the same ops in opposite orders.
        let mut first = RoomDoc::new("");
        first.apply_remote_op(&op_a, 100).unwrap();
        first.apply_remote_op(&op_b, 100).unwrap();

        let mut second = RoomDoc::new("");
        second.apply_remote_op(&op_b, 100).unwrap();
        second.apply_remote_op(&op_a, 100).unwrap();

        let merged = first.contents();
        assert_eq!(merged, second.contents());
        // The merge keeps both edits intact; the tie-break between the two
        // concurrent inserts is deterministic.
        assert_eq!(merged.len(), "hello world".len());
        assert!(merged.contains("hello"));
        assert!(merged.contains(" world"));

        // The originators converge to the same result too.
        a.apply_remote_op(&op_b, 100).unwrap();
        b.apply_remote_op(&op_a, 100).unwrap();
        assert_eq!(a.contents(), merged);
        assert_eq!(b.contents(), merged);
    }

    #[test]
    fn snapshot_bootstraps_a_fresh_replica() {
        let mut doc = RoomDoc::new("");
        doc.apply_local_edit("shared state", 100).unwrap();
        let snapshot = doc.snapshot().unwrap();

        let mut joiner = RoomDoc::new("");
        joiner.apply_remote_op(&snapshot, 100).unwrap();
        assert_eq!(joiner.contents(), "shared state");
    }

    #[test]
    fn overwrite_strategy_reports_full_text() {
        let mut doc = RoomDoc::new("old");
        let outcome = EditStrategy::Overwrite
            .apply(&mut doc, None, Some("brand new"), 100)
            .unwrap();
        match outcome {
            EditOutcome::Overwrite { text_content } => assert_eq!(text_content, "brand new"),
            _ => panic!("expected overwrite outcome"),
        }
    }

    #[test]
    fn strategy_rejects_mismatched_payloads() {
        let mut doc = RoomDoc::new("");
        assert!(EditStrategy::Overwrite
            .apply(&mut doc, Some(&[1, 2, 3]), None, 100)
            .is_err());
        assert!(EditStrategy::LiveSync
            .apply(&mut doc, None, None, 100)
            .is_err());
    }
}
