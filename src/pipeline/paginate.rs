// src/pipeline/paginate.rs

//! Per-source pagination.
//!
//! A [`Pager`] consumes normalized pages in arrival order and decides, item by
//! item, whether to accept, skip or stop:
//!
//! 1. accepted count already at the limit: stop (`CountLimit`)
//! 2. Streams only: upcoming stream: skip, never age-checked
//! 3. Videos/Streams: older than the age limit: stop (`AgeLimit`)
//! 4. Videos/Streams: shorter than the minimum length: skip
//! 5. otherwise accept
//!
//! The age stop assumes the feed is newest first.

use std::collections::HashSet;
use std::time::Duration;

use crate::models::{ContentItem, Cursor, Limits, SourceKind, SourceSummary, StopReason};
use crate::platform::Platform;
use crate::services::{NormalizedPage, normalize_continuation};
use crate::utils::text::{is_upcoming, parse_duration_secs, parse_relative_age_days};

/// Limits applied to one source run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceLimits {
    pub count: Option<usize>,
    pub max_age_days: Option<u32>,
    pub min_length_secs: Option<u32>,
}

impl SourceLimits {
    /// Limits for `source`, with `count` as the remaining budget.
    ///
    /// Shorts ignore age and length; their budget is the shorts limit.
    pub fn for_source(source: SourceKind, limits: &Limits, count: Option<usize>) -> Self {
        match source {
            SourceKind::Shorts => Self {
                count: Some(limits.shorts_limit),
                ..Self::default()
            },
            SourceKind::Videos | SourceKind::Streams => Self {
                count,
                max_age_days: limits.max_age_days,
                min_length_secs: limits.min_length_secs,
            },
        }
    }
}

/// Pagination state of one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerState {
    Initial,
    Paging,
    Stopped(StopReason),
}

/// Item-level pagination state machine for one source.
#[derive(Debug)]
pub struct Pager {
    source: SourceKind,
    limits: SourceLimits,
    state: PagerState,
    accepted: Vec<ContentItem>,
    seen: HashSet<String>,
    skipped: usize,
    pages: usize,
}

impl Pager {
    pub fn new(source: SourceKind, limits: SourceLimits) -> Self {
        Self {
            source,
            limits,
            state: PagerState::Initial,
            accepted: Vec::new(),
            seen: HashSet::new(),
            skipped: 0,
            pages: 0,
        }
    }

    pub fn state(&self) -> PagerState {
        self.state
    }

    pub fn accepted(&self) -> &[ContentItem] {
        &self.accepted
    }

    /// Feed the next page. Returns the cursor to fetch next, or `None` once
    /// the pager has stopped.
    pub fn ingest(&mut self, page: NormalizedPage) -> Option<Cursor> {
        if let PagerState::Stopped(_) = self.state {
            return None;
        }
        self.state = PagerState::Paging;
        self.pages += 1;

        if page.items.is_empty() {
            if page.members_only_dropped + page.unrecognized > 0 {
                log::info!(
                    "{} page {} had no usable items ({} members-only, {} unrecognized){}",
                    self.source,
                    self.pages,
                    page.members_only_dropped,
                    page.unrecognized,
                    if page.cursor.is_some() { "; not following its continuation" } else { "" }
                );
            }
            return self.stop(StopReason::EmptyPage);
        }

        for item in page.items {
            if self.limit_reached() {
                return self.stop(StopReason::CountLimit);
            }
            if !self.seen.insert(item.id.clone()) {
                log::debug!("Dropping repeated {} item {}", self.source, item.id);
                self.skipped += 1;
                continue;
            }

            let text = item.relative_published_time_text.as_str();
            if self.source == SourceKind::Streams && is_upcoming(text) {
                self.skipped += 1;
                continue;
            }

            if self.source != SourceKind::Shorts {
                let too_old = match (self.limits.max_age_days, parse_relative_age_days(text)) {
                    (Some(max), Some(age)) => age > max,
                    _ => false,
                };
                if too_old {
                    log::debug!("{} item {} ({}) is past the age limit", self.source, item.id, text);
                    return self.stop(StopReason::AgeLimit);
                }

                let too_short = match (
                    self.limits.min_length_secs,
                    parse_duration_secs(&item.duration_text),
                ) {
                    (Some(min), Some(secs)) => secs < min,
                    _ => false,
                };
                if too_short {
                    self.skipped += 1;
                    continue;
                }
            }

            self.accepted.push(item);
        }

        if self.limit_reached() {
            return self.stop(StopReason::CountLimit);
        }
        match page.cursor {
            Some(cursor) => Some(cursor),
            None => self.stop(StopReason::NoMorePages),
        }
    }

    /// Consume the pager. `error` marks a run cut short by a failure, in
    /// which case no stop reason is recorded.
    pub fn finish(self, error: Option<String>) -> SourceRun {
        let stop_reason = match self.state {
            PagerState::Stopped(reason) => Some(reason),
            _ => None,
        };
        SourceRun {
            summary: SourceSummary {
                source: self.source,
                accepted: self.accepted.len(),
                skipped: self.skipped,
                pages: self.pages,
                stop_reason,
                error,
            },
            items: self.accepted,
        }
    }

    /// Stop with `reason` before any page arrives.
    pub fn stop_early(&mut self, reason: StopReason) {
        self.state = PagerState::Stopped(reason);
    }

    fn limit_reached(&self) -> bool {
        self.limits
            .count
            .is_some_and(|limit| self.accepted.len() >= limit)
    }

    fn stop(&mut self, reason: StopReason) -> Option<Cursor> {
        log::debug!(
            "{} stopped after {} pages: {:?} ({} accepted)",
            self.source,
            self.pages,
            reason,
            self.accepted.len()
        );
        self.state = PagerState::Stopped(reason);
        None
    }
}

/// Items and summary of one finished source run.
#[derive(Debug)]
pub struct SourceRun {
    pub items: Vec<ContentItem>,
    pub summary: SourceSummary,
}

/// Drive `pager` from its first page through continuations until it stops
/// or a fetch fails. A failure is recorded on the summary, not returned.
pub async fn paginate(
    platform: &dyn Platform,
    mut pager: Pager,
    first_page: NormalizedPage,
    delay: Duration,
) -> SourceRun {
    let mut next = pager.ingest(first_page);

    while let Some(cursor) = next.take() {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match platform.fetch_continuation(&cursor).await {
            Ok(response) => {
                let page = normalize_continuation(&response, pager.source, &cursor.context_url);
                next = pager.ingest(page);
            }
            Err(e) => {
                log::warn!(
                    "{} continuation failed after {} pages: {}",
                    pager.source,
                    pager.pages,
                    e
                );
                return pager.finish(Some(e.to_string()));
            }
        }
    }

    pager.finish(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentKind;
    use crate::test_support::MockPlatform;
    use crate::test_support::fixtures;
    use serde_json::Value;

    const URL: &str = "https://www.youtube.com/@creator/videos";

    fn item(id: &str, age: &str, duration: &str) -> ContentItem {
        let mut item = ContentItem::new(id, format!("Video {id}"), ContentKind::Video);
        item.relative_published_time_text = age.into();
        item.duration_text = duration.into();
        item
    }

    fn page(items: Vec<ContentItem>, cursor: Option<&str>) -> NormalizedPage {
        NormalizedPage {
            items,
            cursor: cursor.map(|t| Cursor::new(t, URL)),
            ..NormalizedPage::default()
        }
    }

    fn limits(count: Option<usize>, max_age: Option<u32>, min_len: Option<u32>) -> SourceLimits {
        SourceLimits {
            count,
            max_age_days: max_age,
            min_length_secs: min_len,
        }
    }

    #[test]
    fn test_age_limit_stops_at_first_old_item() {
        let ages = [
            "1 day ago",
            "3 days ago",
            "1 week ago",
            "2 weeks ago",
            "3 weeks ago",
            "5 weeks ago",
            "2 months ago",
            "3 months ago",
            "2 days ago",
            "1 day ago",
            "4 days ago",
            "6 days ago",
        ];
        let items = ages
            .iter()
            .enumerate()
            .map(|(i, age)| item(&format!("v{i}"), age, "10:00"))
            .collect();

        let mut pager = Pager::new(SourceKind::Videos, limits(None, Some(30), None));
        assert_eq!(pager.state(), PagerState::Initial);
        assert!(pager.ingest(page(items, Some("NEXT"))).is_none());

        assert_eq!(pager.state(), PagerState::Stopped(StopReason::AgeLimit));
        let run = pager.finish(None);
        assert_eq!(run.items.len(), 5);
        assert_eq!(run.items.last().unwrap().id, "v4");
        assert_eq!(run.summary.stop_reason, Some(StopReason::AgeLimit));
        assert!(run.summary.is_complete());
    }

    #[test]
    fn test_count_limit_reached_mid_page() {
        let items = (0..5).map(|i| item(&format!("v{i}"), "", "")).collect();
        let mut pager = Pager::new(SourceKind::Videos, limits(Some(3), None, None));

        assert!(pager.ingest(page(items, Some("NEXT"))).is_none());
        assert_eq!(pager.state(), PagerState::Stopped(StopReason::CountLimit));
        assert_eq!(pager.accepted().len(), 3);
    }

    #[test]
    fn test_count_limit_at_page_end_does_not_request_more() {
        let items = (0..3).map(|i| item(&format!("v{i}"), "", "")).collect();
        let mut pager = Pager::new(SourceKind::Videos, limits(Some(3), None, None));

        assert!(pager.ingest(page(items, Some("NEXT"))).is_none());
        assert_eq!(pager.state(), PagerState::Stopped(StopReason::CountLimit));
    }

    #[test]
    fn test_min_length_skips_but_continues() {
        let items = vec![
            item("long", "1 day ago", "12:00"),
            item("short", "1 day ago", "0:30"),
            item("unknown", "1 day ago", ""),
        ];
        let mut pager = Pager::new(SourceKind::Videos, limits(None, None, Some(60)));

        let next = pager.ingest(page(items, Some("NEXT")));
        assert_eq!(next.map(|c| c.token), Some("NEXT".to_string()));
        let ids: Vec<&str> = pager.accepted().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["long", "unknown"]);
        assert_eq!(pager.finish(None).summary.skipped, 1);
    }

    #[test]
    fn test_upcoming_streams_are_skipped_not_age_checked() {
        let items = vec![
            item("u1", "Scheduled for 6/1/26, 5:00 PM", ""),
            item("u2", "Premieres in 2 months", ""),
            item("s1", "Streamed 2 days ago", "1:00:00"),
            item("s2", "Streamed 2 years ago", "1:00:00"),
        ];
        let mut pager = Pager::new(SourceKind::Streams, limits(None, Some(30), None));

        assert!(pager.ingest(page(items, Some("NEXT"))).is_none());
        assert_eq!(pager.state(), PagerState::Stopped(StopReason::AgeLimit));
        let run = pager.finish(None);
        assert_eq!(run.items.len(), 1);
        assert_eq!(run.items[0].id, "s1");
        assert_eq!(run.summary.skipped, 2);
    }

    #[test]
    fn test_shorts_ignore_age_and_length() {
        let items = vec![item("a", "5 years ago", "0:10"), item("b", "", "")];
        let mut pager = Pager::new(SourceKind::Shorts, limits(Some(10), Some(1), Some(60)));

        assert!(pager.ingest(page(items, None)).is_none());
        assert_eq!(pager.state(), PagerState::Stopped(StopReason::NoMorePages));
        assert_eq!(pager.accepted().len(), 2);
    }

    #[test]
    fn test_empty_page_and_duplicates() {
        let mut pager = Pager::new(SourceKind::Videos, limits(None, None, None));
        let first = vec![item("a", "", ""), item("b", "", "")];
        assert!(pager.ingest(page(first, Some("NEXT"))).is_some());

        let repeated = vec![item("b", "", ""), item("c", "", "")];
        assert!(pager.ingest(page(repeated, Some("NEXT2"))).is_some());
        assert!(pager.ingest(page(Vec::new(), Some("NEXT3"))).is_none());

        let run = pager.finish(None);
        let ids: Vec<&str> = run.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(run.summary.stop_reason, Some(StopReason::EmptyPage));
        assert_eq!(run.summary.pages, 3);
    }

    #[test]
    fn test_source_limits_for_shorts() {
        let config = Limits {
            count_limit: Some(50),
            max_age_days: Some(30),
            min_length_secs: Some(60),
            shorts_limit: 7,
        };
        let shorts = SourceLimits::for_source(SourceKind::Shorts, &config, Some(50));
        assert_eq!(shorts, limits(Some(7), None, None));
        let streams = SourceLimits::for_source(SourceKind::Streams, &config, Some(12));
        assert_eq!(streams, limits(Some(12), Some(30), Some(60)));
    }

    #[tokio::test]
    async fn test_page_of_only_members_only_items_stops_empty() {
        let platform = MockPlatform::new().with_continuation(
            "TOKEN-1",
            fixtures::continuation_response(vec![fixtures::video("c1", "1 day ago", "5:00")]),
        );
        let first = NormalizedPage {
            members_only_dropped: 2,
            ..page(Vec::new(), Some("TOKEN-1"))
        };

        let pager = Pager::new(SourceKind::Videos, limits(None, None, None));
        let run = paginate(&platform, pager, first, Duration::ZERO).await;

        assert_eq!(run.summary.stop_reason, Some(StopReason::EmptyPage));
        assert!(run.items.is_empty());
        assert_eq!(platform.continuation_calls(), 0);
    }

    #[tokio::test]
    async fn test_paginate_follows_continuations() {
        let platform = MockPlatform::new()
            .with_continuation(
                "TOKEN-1",
                fixtures::continuation_response(vec![
                    fixtures::video("c1", "1 week ago", "5:00"),
                    fixtures::continuation("TOKEN-2"),
                ]),
            )
            .with_continuation(
                "TOKEN-2",
                fixtures::continuation_response(vec![fixtures::video("c2", "2 weeks ago", "5:00")]),
            );

        let pager = Pager::new(SourceKind::Videos, limits(None, None, None));
        let first = page(vec![item("v0", "1 day ago", "5:00")], Some("TOKEN-1"));
        let run = paginate(&platform, pager, first, Duration::ZERO).await;

        let ids: Vec<&str> = run.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["v0", "c1", "c2"]);
        assert_eq!(run.summary.stop_reason, Some(StopReason::NoMorePages));
        assert_eq!(run.summary.pages, 3);
        assert_eq!(platform.continuation_calls(), 2);
    }

    #[tokio::test]
    async fn test_paginate_records_fetch_error() {
        let platform = MockPlatform::new();
        let pager = Pager::new(SourceKind::Videos, limits(None, None, None));
        let first = page(vec![item("v0", "", "")], Some("MISSING"));

        let run = paginate(&platform, pager, first, Duration::ZERO).await;
        assert_eq!(run.items.len(), 1);
        assert!(run.summary.error.is_some());
        assert!(run.summary.stop_reason.is_none());
        assert!(!run.summary.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn test_paginate_waits_between_requests() {
        let platform = MockPlatform::new().with_continuation(
            "TOKEN-1",
            fixtures::continuation_response(Vec::<Value>::new()),
        );
        let pager = Pager::new(SourceKind::Videos, limits(None, None, None));
        let first = page(vec![item("v0", "", "")], Some("TOKEN-1"));

        let started = tokio::time::Instant::now();
        let run = paginate(&platform, pager, first, Duration::from_millis(500)).await;
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert_eq!(run.summary.stop_reason, Some(StopReason::EmptyPage));
    }
}
