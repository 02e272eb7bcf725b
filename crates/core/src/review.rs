//! §4.11 Review Operations — split, merge, dismiss. Each function is the
//! pure planning step: given the currently loaded state it decides what
//! the new canonicals, links, and audit row should be. The infra layer
//! wraps the actual load/plan/write sequence in a single database
//! transaction so the whole operation is all-or-nothing (§5, §7).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{json, Value as JsonValue};

use regiodedupe_domain::{AuditAction, AuditRecord, CanonicalEvent, DedupeError, Record, Result};

use crate::enrich::enrich;
use crate::synthesize::build_canonical;

/// Outcome of a split: the link `(canonical_id, source_id)` is removed;
/// the origin canonical is re-synthesized (or deleted, if it has no
/// remaining sources), and the detached source lands on `target`.
pub struct SplitOutcome {
    pub origin_updated: Option<CanonicalEvent>,
    pub origin_deleted: bool,
    pub target: CanonicalEvent,
    pub target_is_new: bool,
    pub target_link_already_present: bool,
    pub audit: AuditRecord,
}

/// Plan a split of `source_id` out of `origin`.
///
/// `origin_remaining_records` is `origin`'s records with `source_id`'s
/// record removed — empty if `source_id` was the only one. `detached` is
/// `source_id`'s own record. `existing_target` is `Some((canonical,
/// records_including_detached))` when `target_canonical_id` named a
/// canonical that does not already link `source_id`; it is `None` both
/// when no target was given and when the target already has the link
/// (in which case the split only removes the origin link — step 4 of the
/// spec skips re-insertion but still re-synthesizes nothing further).
///
/// # Errors
/// Returns [`DedupeError::NotFound`] via the caller before this is
/// reached if the `(canonical_id, source_id)` link does not exist — that
/// check requires a persistence lookup and is the infra layer's
/// responsibility; this function assumes the link existed.
#[allow(clippy::too_many_arguments)]
pub fn plan_split(
    origin: &CanonicalEvent,
    origin_remaining_records: &[Record],
    detached: &Record,
    existing_target: Option<(&CanonicalEvent, &[Record])>,
    target_link_already_present: bool,
    new_singleton_id: impl FnOnce() -> String,
    operator: &str,
    now: DateTime<Utc>,
) -> Result<SplitOutcome> {
    let (origin_updated, origin_deleted) = if origin_remaining_records.is_empty() {
        (None, true)
    } else {
        let mut updated = enrich(origin, origin_remaining_records, None, None, now)?;
        updated.needs_review = false;
        (Some(updated), false)
    };

    let (target, target_is_new) = match existing_target {
        Some((target_canonical, records_including_detached)) => {
            let mut updated = enrich(target_canonical, records_including_detached, None, None, now)?;
            updated.needs_review = false;
            (updated, false)
        }
        None if target_link_already_present => {
            return Err(DedupeError::Internal(
                "split target already links the detached source but no target canonical was supplied".to_string(),
            ));
        }
        None => (build_canonical(new_singleton_id(), std::slice::from_ref(detached), now)?, true),
    };

    let details: BTreeMap<String, JsonValue> = BTreeMap::from([
        ("target".to_string(), json!(target.id)),
        ("remaining_source_count".to_string(), json!(origin_remaining_records.len())),
    ]);

    let audit = AuditRecord {
        id: uuid::Uuid::new_v4().to_string(),
        action: AuditAction::Split,
        canonical_id: Some(origin.id.clone()),
        source_id: Some(detached.id.clone()),
        operator: operator.to_string(),
        details,
        created_at: now,
    };

    Ok(SplitOutcome {
        origin_updated,
        origin_deleted,
        target,
        target_is_new,
        target_link_already_present,
        audit,
    })
}

/// Outcome of a merge: `source`'s links are reassigned onto `target`
/// (skipping any source event id `target` already has) and `source` is
/// deleted.
pub struct MergeOutcome {
    pub target_updated: CanonicalEvent,
    pub deleted_source_id: String,
    pub audit: AuditRecord,
}

/// Plan a merge of `source` into `target`.
///
/// `merged_records` is the de-duplicated union of both canonicals'
/// records (the caller skips any source record `target` already links,
/// honoring the `canonical_event_sources` uniqueness constraint).
///
/// # Errors
/// Returns [`DedupeError::InvalidInput`] if `source.id == target.id`.
pub fn merge(
    source: &CanonicalEvent,
    target: &CanonicalEvent,
    merged_records: &[Record],
    operator: &str,
    now: DateTime<Utc>,
) -> Result<MergeOutcome> {
    if source.id == target.id {
        return Err(DedupeError::InvalidInput("merge requires distinct canonical ids".to_string()));
    }

    let mut target_updated = enrich(target, merged_records, None, None, now)?;
    target_updated.needs_review = false;

    let details: BTreeMap<String, JsonValue> = BTreeMap::from([
        ("deleted_id".to_string(), json!(source.id)),
        ("new_source_count".to_string(), json!(target_updated.source_count)),
    ]);

    let audit = AuditRecord {
        id: uuid::Uuid::new_v4().to_string(),
        action: AuditAction::Merge,
        canonical_id: Some(target.id.clone()),
        source_id: None,
        operator: operator.to_string(),
        details,
        created_at: now,
    };

    Ok(MergeOutcome { target_updated, deleted_source_id: source.id.clone(), audit })
}

const DISMISS_CONFIDENCE_FLOOR: f64 = 0.8;
const DISMISS_CONFIDENCE_CEILING: f64 = 1.0;

/// Outcome of a dismiss: `needs_review` is cleared; a low `match_confidence`
/// is bumped to 1.0 so the canonical leaves the low-confidence queue.
pub struct DismissOutcome {
    pub updated: CanonicalEvent,
    pub audit: AuditRecord,
}

/// Plan a dismiss of `canonical`'s review flag.
pub fn dismiss(canonical: &CanonicalEvent, reason: Option<&str>, operator: &str, now: DateTime<Utc>) -> Result<DismissOutcome> {
    let mut updated = canonical.clone();
    updated.needs_review = false;

    let original_confidence = updated.match_confidence;
    if updated.match_confidence.is_none_or(|c| c < DISMISS_CONFIDENCE_FLOOR) {
        updated.match_confidence = Some(DISMISS_CONFIDENCE_CEILING);
    }
    updated.updated_at = now;

    let mut details: BTreeMap<String, JsonValue> = BTreeMap::from([("original_match_confidence".to_string(), json!(original_confidence))]);
    if let Some(reason) = reason {
        details.insert("reason".to_string(), json!(reason));
    }

    let audit = AuditRecord {
        id: uuid::Uuid::new_v4().to_string(),
        action: AuditAction::ReviewDismiss,
        canonical_id: Some(canonical.id.clone()),
        source_id: None,
        operator: operator.to_string(),
        details,
        created_at: now,
    };

    Ok(DismissOutcome { updated, audit })
}
