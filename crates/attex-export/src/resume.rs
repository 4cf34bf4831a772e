//! Resume-from-checkpoint replay gate.

use attex_store::AttachmentRecord;

/// Two-state gate over manifest replay: Skipping until the checkpoint id
/// is seen, Dispatching afterwards. Without a checkpoint it starts in
/// Dispatching and admits everything.
#[derive(Debug)]
pub struct ResumeFilter {
    checkpoint: Option<String>,
    skipping: bool,
    skipped: usize,
}

impl ResumeFilter {
    pub fn new(checkpoint: Option<String>) -> Self {
        let skipping = checkpoint.is_some();
        Self {
            checkpoint,
            skipping,
            skipped: 0,
        }
    }

    /// Whether this row should be dispatched. The checkpoint row itself is
    /// admitted and flips the state; everything after it passes through.
    pub fn admit(&mut self, record: &AttachmentRecord) -> bool {
        if !self.skipping {
            return true;
        }
        if self.checkpoint.as_deref() == Some(record.id.as_str()) {
            log::debug!("found resume checkpoint {}", record.id);
            self.skipping = false;
            true
        } else {
            log::debug!("skipping {}", record.id);
            self.skipped += 1;
            false
        }
    }

    /// False iff a checkpoint was requested and never observed. A resumed
    /// run that dispatched nothing because of this is reportable, not a
    /// silent no-op.
    pub fn checkpoint_found(&self) -> bool {
        !self.skipping
    }

    /// Rows discarded before the checkpoint.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> AttachmentRecord {
        AttachmentRecord {
            id: id.to_string(),
            parent_id: "parent1".to_string(),
            name: "file.txt".to_string(),
            is_private: false,
            content_type: String::new(),
            body_length: 0,
            owner_id: String::new(),
            created_date: String::new(),
            created_by_id: String::new(),
            last_modified_date: String::new(),
            last_modified_by_id: String::new(),
            system_modstamp: String::new(),
            description: String::new(),
            is_partner_shared: false,
        }
    }

    fn admitted_ids(checkpoint: Option<&str>, ids: &[&str]) -> (Vec<String>, ResumeFilter) {
        let mut filter = ResumeFilter::new(checkpoint.map(str::to_string));
        let admitted = ids
            .iter()
            .filter(|id| filter.admit(&record(id)))
            .map(|id| id.to_string())
            .collect();
        (admitted, filter)
    }

    #[test]
    fn no_checkpoint_admits_everything() {
        let (admitted, filter) = admitted_ids(None, &["r1", "r2", "r3"]);
        assert_eq!(admitted, ["r1", "r2", "r3"]);
        assert!(filter.checkpoint_found());
        assert_eq!(filter.skipped(), 0);
    }

    #[test]
    fn dispatches_checkpoint_row_and_everything_after() {
        let (admitted, filter) = admitted_ids(Some("r3"), &["r1", "r2", "r3", "r4", "r5"]);
        assert_eq!(admitted, ["r3", "r4", "r5"]);
        assert!(filter.checkpoint_found());
        assert_eq!(filter.skipped(), 2);
    }

    #[test]
    fn checkpoint_at_first_row_skips_nothing() {
        let (admitted, filter) = admitted_ids(Some("r1"), &["r1", "r2"]);
        assert_eq!(admitted, ["r1", "r2"]);
        assert_eq!(filter.skipped(), 0);
        assert!(filter.checkpoint_found());
    }

    #[test]
    fn missing_checkpoint_admits_nothing() {
        let (admitted, filter) = admitted_ids(Some("r9"), &["r1", "r2", "r3"]);
        assert!(admitted.is_empty());
        assert!(!filter.checkpoint_found());
        assert_eq!(filter.skipped(), 3);
    }

    #[test]
    fn checkpoint_matches_only_whole_id() {
        let (admitted, _) = admitted_ids(Some("r1"), &["r10", "r1", "r11"]);
        assert_eq!(admitted, ["r1", "r11"]);
    }
}
