// crates/stats/src/reconcile.rs
//! Incremental reconciliation of the stats snapshot with recent session logs.
//!
//! The snapshot covers every day up to and including its cutoff. Session
//! files are append-only, so a file touched after the cutoff may still hold
//! events from before it. Filtering is done per event, by the event's own
//! UTC calendar day: only events strictly after the cutoff day enter the
//! delta. Files last modified on or before the cutoff day aren't opened.

use std::collections::BTreeMap;
use std::time::Instant;

use cc_dashboard_core::{Corpus, EventKind, PricingTable, SessionFile, TokenUsage, read_events};
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use tracing::{debug, info};

use crate::snapshot::{DailyActivity, DailyModelTokens, StatsSnapshot};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayCounts {
    pub message_count: u64,
    pub session_count: u64,
    pub tool_call_count: u64,
}

/// Snapshot-shaped rollup: per-day, per-model and per-hour maps plus totals.
///
/// Both the snapshot and the delta are expressed as an `Aggregate` so they
/// can be merged key by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    pub daily_activity: BTreeMap<NaiveDate, DayCounts>,
    pub daily_model_tokens: BTreeMap<NaiveDate, BTreeMap<String, u64>>,
    pub model_usage: BTreeMap<String, TokenUsage>,
    pub hour_counts: BTreeMap<u8, u64>,
    pub total_sessions: u64,
    pub total_messages: u64,
}

impl Aggregate {
    /// Add `other` into `self`. Every counter is a plain sum.
    pub fn merge(&mut self, other: &Aggregate) {
        for (date, counts) in &other.daily_activity {
            let day = self.daily_activity.entry(*date).or_default();
            day.message_count += counts.message_count;
            day.session_count += counts.session_count;
            day.tool_call_count += counts.tool_call_count;
        }
        for (date, by_model) in &other.daily_model_tokens {
            let day = self.daily_model_tokens.entry(*date).or_default();
            for (model, tokens) in by_model {
                *day.entry(model.clone()).or_insert(0) += tokens;
            }
        }
        for (model, usage) in &other.model_usage {
            self.model_usage.entry(model.clone()).or_default().add(usage);
        }
        for (hour, count) in &other.hour_counts {
            *self.hour_counts.entry(*hour).or_insert(0) += count;
        }
        self.total_sessions += other.total_sessions;
        self.total_messages += other.total_messages;
    }

    pub fn daily_activity_series(&self) -> Vec<DailyActivity> {
        self.daily_activity
            .iter()
            .map(|(date, c)| DailyActivity {
                date: *date,
                message_count: c.message_count,
                session_count: c.session_count,
                tool_call_count: c.tool_call_count,
            })
            .collect()
    }

    pub fn daily_model_tokens_series(&self) -> Vec<DailyModelTokens> {
        self.daily_model_tokens
            .iter()
            .map(|(date, by_model)| DailyModelTokens {
                date: *date,
                tokens_by_model: by_model.clone(),
            })
            .collect()
    }
}

impl From<&StatsSnapshot> for Aggregate {
    fn from(snapshot: &StatsSnapshot) -> Self {
        let mut agg = Aggregate {
            hour_counts: snapshot.hour_counts.clone(),
            total_sessions: snapshot.total_sessions,
            total_messages: snapshot.total_messages,
            ..Default::default()
        };
        for day in &snapshot.daily_activity {
            let counts = agg.daily_activity.entry(day.date).or_default();
            counts.message_count += day.message_count;
            counts.session_count += day.session_count;
            counts.tool_call_count += day.tool_call_count;
        }
        for day in &snapshot.daily_model_tokens {
            let by_model = agg.daily_model_tokens.entry(day.date).or_default();
            for (model, tokens) in &day.tokens_by_model {
                *by_model.entry(model.clone()).or_insert(0) += tokens;
            }
        }
        for (model, usage) in &snapshot.model_usage {
            agg.model_usage.insert(
                model.clone(),
                TokenUsage {
                    input_tokens: usage.input_tokens,
                    output_tokens: usage.output_tokens,
                    cache_read_tokens: usage.cache_read_input_tokens,
                    cache_write_tokens: usage.cache_creation_input_tokens,
                },
            );
        }
        agg
    }
}

/// Statistics from events strictly newer than the snapshot cutoff.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsDelta {
    pub aggregate: Aggregate,
    /// All tokens on qualifying assistant events, including events without a model id.
    pub total_tokens: u64,
    pub estimated_cost: f64,
    /// How many files were opened.
    pub candidate_files: usize,
}

/// First instant after the cutoff day.
fn cutoff_boundary(cutoff: NaiveDate) -> Option<DateTime<Utc>> {
    cutoff.and_hms_opt(23, 59, 59).map(|dt| dt.and_utc())
}

/// Files that may hold events newer than `cutoff`.
///
/// With no cutoff every file is a candidate, and so is any file whose
/// modification time is unknown.
pub fn is_candidate(file: &SessionFile, cutoff: Option<NaiveDate>) -> bool {
    let Some(boundary) = cutoff.and_then(cutoff_boundary) else {
        return true;
    };
    match file.modified_at() {
        Some(modified) => modified > boundary,
        None => true,
    }
}

/// Scan the corpus for activity after `cutoff`.
///
/// Unreadable files contribute nothing.
pub async fn compute_delta(
    corpus: &Corpus,
    cutoff: Option<NaiveDate>,
    pricing: &PricingTable,
) -> StatsDelta {
    let started = Instant::now();
    let mut delta = StatsDelta::default();

    let candidates: Vec<SessionFile> = corpus
        .session_files()
        .await
        .into_iter()
        .filter(|f| is_candidate(f, cutoff))
        .collect();
    delta.candidate_files = candidates.len();

    for file in &candidates {
        match read_events(&file.path).await {
            Ok(events) => accumulate_file(&mut delta, &events, cutoff, pricing),
            Err(e) => debug!("Skipping unreadable session file: {}", e),
        }
    }

    info!(
        "Reconciled {} candidate files after {:?}: {} sessions, {} messages in {:?}",
        delta.candidate_files,
        cutoff,
        delta.aggregate.total_sessions,
        delta.aggregate.total_messages,
        started.elapsed()
    );
    delta
}

/// Fold one file's events into `delta` in a single pass.
///
/// The file's session is counted once, on the day of its first qualifying
/// event.
pub fn accumulate_file(
    delta: &mut StatsDelta,
    events: &[cc_dashboard_core::Event],
    cutoff: Option<NaiveDate>,
    pricing: &PricingTable,
) {
    let agg = &mut delta.aggregate;
    let mut session_counted = false;

    for event in events {
        let Some(ts) = event.timestamp else {
            continue;
        };
        let day = ts.date_naive();
        if cutoff.is_some_and(|c| day <= c) {
            continue;
        }

        if !session_counted {
            session_counted = true;
            agg.total_sessions += 1;
            agg.daily_activity.entry(day).or_default().session_count += 1;
        }

        match &event.kind {
            EventKind::User(_) => {
                agg.total_messages += 1;
                agg.daily_activity.entry(day).or_default().message_count += 1;
            }
            EventKind::Assistant(assistant) => {
                agg.total_messages += 1;
                let counts = agg.daily_activity.entry(day).or_default();
                counts.message_count += 1;
                counts.tool_call_count += assistant.content.tool_uses().count() as u64;

                if let Some(usage) = &assistant.usage {
                    let model = assistant.model.as_deref().unwrap_or("");
                    let tokens = usage.total();
                    delta.total_tokens += tokens;
                    delta.estimated_cost += pricing.cost(model, usage);

                    if !model.is_empty() {
                        agg.model_usage
                            .entry(model.to_string())
                            .or_default()
                            .add(usage);
                        *agg.daily_model_tokens
                            .entry(day)
                            .or_default()
                            .entry(model.to_string())
                            .or_insert(0) += tokens;
                    }

                    *agg.hour_counts.entry(ts.hour() as u8).or_insert(0) += 1;
                }
            }
            _ => {}
        }
    }
}
