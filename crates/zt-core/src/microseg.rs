//! Resource segment registry: lookup plus the lock/unlock primitive used
//! by C11's coordinated-attack lockdown and C8's segment classification.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::types::ResourceSegment;
use zt_common::{SegmentId, ZtError, ZtResult};

pub struct SegmentRegistry {
    segments: DashMap<String, ResourceSegment>,
}

impl SegmentRegistry {
    pub fn new() -> Self {
        Self { segments: DashMap::new() }
    }

    pub fn add(&self, segment: ResourceSegment) {
        self.segments.insert(segment.segment_id.to_string(), segment);
    }

    pub fn get(&self, segment_id: &str) -> Option<ResourceSegment> {
        self.segments.get(segment_id).map(|s| s.clone())
    }

    pub fn by_category(&self, category: &str) -> Vec<ResourceSegment> {
        self.segments.iter().filter(|s| s.category == category).map(|s| s.clone()).collect()
    }

    /// Locks every segment in `category` for `duration` (the coordinated-
    /// attack lockdown); returns the ids that were locked.
    pub fn lock_category(&self, category: &str, duration: Duration, now: DateTime<Utc>) -> Vec<SegmentId> {
        let mut locked = Vec::new();
        for mut segment in self.segments.iter_mut() {
            if segment.category == category {
                segment.locked = true;
                segment.locked_until = Some(now + duration);
                locked.push(segment.segment_id.clone());
            }
        }
        locked
    }

    /// Admin-only unlock, ignoring any still-pending `locked_until`.
    pub fn unlock(&self, segment_id: &str) -> ZtResult<()> {
        let mut segment = self.segments.get_mut(segment_id).ok_or(ZtError::NotFound)?;
        segment.locked = false;
        segment.locked_until = None;
        Ok(())
    }

    /// Releases segments whose lock has expired.
    pub fn sweep_expired_locks(&self, now: DateTime<Utc>) -> Vec<SegmentId> {
        let mut released = Vec::new();
        for mut segment in self.segments.iter_mut() {
            if segment.locked {
                if let Some(until) = segment.locked_until {
                    if now >= until {
                        segment.locked = false;
                        segment.locked_until = None;
                        released.push(segment.segment_id.clone());
                    }
                }
            }
        }
        released
    }
}

impl Default for SegmentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
