//! Community questions and answers.
//!
//! Posts and responses feed the trust engine two flags: a response is
//! *accepted* when the post owner picks it as the resolving answer, and
//! *verified* when the external verification collaborator says so. The
//! engine reads those flags; only this subsystem writes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{PostId, ResponseId, UserId};

/// Validation failures for community content.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommunityValidationError {
    /// Title blank after trimming.
    #[error("title must not be empty")]
    EmptyTitle,
    /// Title longer than [`Post::TITLE_MAX`].
    #[error("title must be at most {max} characters")]
    TitleTooLong { max: usize },
    /// Description blank after trimming.
    #[error("description must not be empty")]
    EmptyDescription,
    /// Response content blank after trimming.
    #[error("response content must not be empty")]
    EmptyContent,
    /// Confidence outside `0.0..=1.0`.
    #[error("verification confidence must be between 0 and 1, got {value}")]
    ConfidenceOutOfRange { value: f64 },
}

/// A question asked by a farmer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[schema(value_type = String, format = Uuid)]
    pub id: PostId,
    #[schema(value_type = String, format = Uuid)]
    pub author_id: UserId,
    pub title: String,
    pub description: String,
    pub crop_name: Option<String>,
    pub tags: Vec<String>,
    pub is_resolved: bool,
    #[schema(value_type = Option<String>, format = Uuid)]
    pub accepted_response_id: Option<ResponseId>,
    pub view_count: u32,
    /// Display counter; reconciled against the response table on demand.
    pub response_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Upper bound on title length, in characters.
    pub const TITLE_MAX: usize = 200;

    /// Validate input and build an unresolved post with zeroed counters.
    pub fn draft(
        id: PostId,
        author_id: UserId,
        title: &str,
        description: &str,
        crop_name: Option<&str>,
        tags: &[String],
        now: DateTime<Utc>,
    ) -> Result<Self, CommunityValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CommunityValidationError::EmptyTitle);
        }
        if title.chars().count() > Self::TITLE_MAX {
            return Err(CommunityValidationError::TitleTooLong {
                max: Self::TITLE_MAX,
            });
        }
        let description = description.trim();
        if description.is_empty() {
            return Err(CommunityValidationError::EmptyDescription);
        }
        Ok(Self {
            id,
            author_id,
            title: title.to_owned(),
            description: description.to_owned(),
            crop_name: crop_name
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_owned),
            tags: normalize_tags(tags),
            is_resolved: false,
            accepted_response_id: None,
            view_count: 0,
            response_count: 0,
            created_at: now,
        })
    }
}

/// Trim tags and drop blanks, keeping the first spelling of each tag.
fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags.iter().map(|tag| tag.trim()).filter(|tag| !tag.is_empty()) {
        if !normalized
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(tag))
        {
            normalized.push(tag.to_owned());
        }
    }
    normalized
}

/// An answer to a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[schema(value_type = String, format = Uuid)]
    pub id: ResponseId,
    #[schema(value_type = String, format = Uuid)]
    pub post_id: PostId,
    #[schema(value_type = String, format = Uuid)]
    pub author_id: UserId,
    pub content: String,
    pub is_expert_advice: bool,
    pub is_verified: bool,
    pub verification_confidence: Option<f64>,
    pub verification_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Response {
    /// Validate input and build an unverified response.
    pub fn draft(
        id: ResponseId,
        post_id: PostId,
        author_id: UserId,
        content: &str,
        is_expert_advice: bool,
        now: DateTime<Utc>,
    ) -> Result<Self, CommunityValidationError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(CommunityValidationError::EmptyContent);
        }
        Ok(Self {
            id,
            post_id,
            author_id,
            content: content.to_owned(),
            is_expert_advice,
            is_verified: false,
            verification_confidence: None,
            verification_reason: None,
            created_at: now,
        })
    }
}

/// Verdict from the external verification collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub verified: bool,
    pub confidence: f64,
    pub reason: Option<String>,
}

impl Verification {
    /// Validate the confidence range and trim the reason.
    pub fn new(
        verified: bool,
        confidence: f64,
        reason: Option<&str>,
    ) -> Result<Self, CommunityValidationError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(CommunityValidationError::ConfidenceOutOfRange { value: confidence });
        }
        Ok(Self {
            verified,
            confidence,
            reason: reason
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_owned),
        })
    }
}

/// Resolution predicate for the post feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    #[default]
    Any,
    Resolved,
    Unresolved,
}

/// Narrowing predicates for the post feed. Empty fields match everything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PostFilter {
    pub resolution: Resolution,
    /// Case-insensitive substring of the crop name.
    pub crop: Option<String>,
    /// Matches posts sharing at least one tag, case-insensitively.
    pub tags: Vec<String>,
    /// Case-insensitive substring of title or description.
    pub search: Option<String>,
}

impl PostFilter {
    /// Whether `post` passes every predicate.
    #[must_use]
    pub fn matches(&self, post: &Post) -> bool {
        self.matches_resolution(post)
            && self.matches_crop(post)
            && self.matches_tags(post)
            && self.matches_search(post)
    }

    fn matches_resolution(&self, post: &Post) -> bool {
        match self.resolution {
            Resolution::Any => true,
            Resolution::Resolved => post.is_resolved,
            Resolution::Unresolved => !post.is_resolved,
        }
    }

    fn matches_crop(&self, post: &Post) -> bool {
        let Some(needle) = non_blank(self.crop.as_deref()) else {
            return true;
        };
        post.crop_name
            .as_deref()
            .is_some_and(|crop| contains_ignore_case(crop, needle))
    }

    fn matches_tags(&self, post: &Post) -> bool {
        let wanted: Vec<&str> = self
            .tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .collect();
        if wanted.is_empty() {
            return true;
        }
        post.tags
            .iter()
            .any(|tag| wanted.iter().any(|want| tag.to_lowercase() == want.to_lowercase()))
    }

    fn matches_search(&self, post: &Post) -> bool {
        let Some(needle) = non_blank(self.search.as_deref()) else {
            return true;
        };
        contains_ignore_case(&post.title, needle) || contains_ignore_case(&post.description, needle)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Feed ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PostSort {
    /// Most answered first, then most viewed, then newest.
    Popular,
    /// Most viewed first, then newest.
    Trending,
    /// Newest first.
    #[default]
    Recent,
}

/// Invalid pagination parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    #[error("page must be at least 1")]
    PageOutOfRange,
    #[error("limit must be between 1 and {max}")]
    LimitOutOfRange { max: u32 },
}

/// One-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    limit: u32,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    /// Validate a page request; `None` picks page 1 and the default limit.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Result<Self, PaginationError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(Self::DEFAULT_LIMIT);
        if page == 0 {
            return Err(PaginationError::PageOutOfRange);
        }
        if limit == 0 || limit > Self::MAX_LIMIT {
            return Err(PaginationError::LimitOutOfRange {
                max: Self::MAX_LIMIT,
            });
        }
        Ok(Self { page, limit })
    }

    #[must_use]
    pub const fn page(self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn limit(self) -> u32 {
        self.limit
    }

    /// Number of items preceding this page.
    #[must_use]
    pub fn offset(self) -> usize {
        let skipped = u64::from(self.page - 1) * u64::from(self.limit);
        usize::try_from(skipped).unwrap_or(usize::MAX)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// A page of the filtered, sorted feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub page: u32,
    pub limit: u32,
    /// Matches before pagination.
    pub total_count: u64,
    pub has_more: bool,
}

/// Outcome of comparing a cached response count with the true count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountReconciliation {
    #[schema(value_type = String, format = Uuid)]
    pub post_id: PostId,
    pub cached: u32,
    pub actual: u32,
}

impl CountReconciliation {
    /// Whether the cached value had drifted.
    #[must_use]
    pub const fn repaired(&self) -> bool {
        self.cached != self.actual
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn post() -> Post {
        Post::draft(
            PostId::random(),
            UserId::random(),
            "Yellow spots on tomato leaves",
            "Spots spread after rain",
            Some("Tomato"),
            &["Blight".to_owned(), " fungus ".to_owned(), String::new()],
            Utc::now(),
        )
        .expect("valid post")
    }

    #[rstest]
    fn draft_normalizes_tags(post: Post) {
        assert_eq!(post.tags, vec!["Blight".to_owned(), "fungus".to_owned()]);
        assert!(!post.is_resolved);
        assert_eq!(post.response_count, 0);
    }

    #[rstest]
    fn draft_rejects_blank_title() {
        let err = Post::draft(
            PostId::random(),
            UserId::random(),
            " ",
            "body",
            None,
            &[],
            Utc::now(),
        )
        .expect_err("blank title");
        assert_eq!(err, CommunityValidationError::EmptyTitle);
    }

    #[rstest]
    fn empty_filter_matches_everything(post: Post) {
        assert!(PostFilter::default().matches(&post));
    }

    #[rstest]
    #[case(Resolution::Resolved, false)]
    #[case(Resolution::Unresolved, true)]
    fn resolution_filter(post: Post, #[case] resolution: Resolution, #[case] expected: bool) {
        let filter = PostFilter {
            resolution,
            ..PostFilter::default()
        };
        assert_eq!(filter.matches(&post), expected);
    }

    #[rstest]
    #[case("tom", true)]
    #[case("TOMATO", true)]
    #[case("rice", false)]
    fn crop_filter_is_case_insensitive_substring(
        post: Post,
        #[case] crop: &str,
        #[case] expected: bool,
    ) {
        let filter = PostFilter {
            crop: Some(crop.to_owned()),
            ..PostFilter::default()
        };
        assert_eq!(filter.matches(&post), expected);
    }

    #[rstest]
    fn crop_filter_excludes_posts_without_crop(mut post: Post) {
        post.crop_name = None;
        let filter = PostFilter {
            crop: Some("tomato".to_owned()),
            ..PostFilter::default()
        };
        assert!(!filter.matches(&post));
    }

    #[rstest]
    #[case(&["blight"], true)]
    #[case(&["rot", "FUNGUS"], true)]
    #[case(&["rot"], false)]
    fn tag_filter_requires_overlap(post: Post, #[case] tags: &[&str], #[case] expected: bool) {
        let filter = PostFilter {
            tags: tags.iter().map(|tag| (*tag).to_owned()).collect(),
            ..PostFilter::default()
        };
        assert_eq!(filter.matches(&post), expected);
    }

    #[rstest]
    #[case("yellow", true)]
    #[case("RAIN", true)]
    #[case("aphid", false)]
    fn search_covers_title_and_description(
        post: Post,
        #[case] search: &str,
        #[case] expected: bool,
    ) {
        let filter = PostFilter {
            search: Some(search.to_owned()),
            ..PostFilter::default()
        };
        assert_eq!(filter.matches(&post), expected);
    }

    #[rstest]
    #[case(Some(0), None, PaginationError::PageOutOfRange)]
    #[case(None, Some(0), PaginationError::LimitOutOfRange { max: 100 })]
    #[case(None, Some(101), PaginationError::LimitOutOfRange { max: 100 })]
    fn pagination_rejects_out_of_range(
        #[case] page: Option<u32>,
        #[case] limit: Option<u32>,
        #[case] expected: PaginationError,
    ) {
        assert_eq!(Pagination::new(page, limit), Err(expected));
    }

    #[rstest]
    fn pagination_defaults_and_offset() {
        let first = Pagination::new(None, None).expect("defaults");
        assert_eq!((first.page(), first.limit(), first.offset()), (1, 10, 0));
        let third = Pagination::new(Some(3), Some(20)).expect("valid");
        assert_eq!(third.offset(), 40);
    }

    #[rstest]
    #[case(1.5)]
    #[case(-0.1)]
    #[case(f64::NAN)]
    fn verification_confidence_must_be_unit_interval(#[case] confidence: f64) {
        assert!(Verification::new(true, confidence, None).is_err());
    }
}
