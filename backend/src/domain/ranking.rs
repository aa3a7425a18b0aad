//! Deterministic orderings for suggestion lists, leaderboards and the feed.
//!
//! Every comparator ends in a total tie-break (creation time, then id) so two
//! calls over the same state return identical sequences.

use std::cmp::Ordering;

use crate::domain::community::{Pagination, PostFilter, PostPage, PostSort};
use crate::domain::{ContributorStanding, Post, RankedSuggestion};

/// Descending `(usefulness, positive feedback, author trust)`, then oldest
/// first.
#[must_use]
pub fn compare_suggestions(a: &RankedSuggestion, b: &RankedSuggestion) -> Ordering {
    b.suggestion
        .usefulness_score
        .cmp(&a.suggestion.usefulness_score)
        .then_with(|| {
            b.suggestion
                .positive_feedback_count
                .cmp(&a.suggestion.positive_feedback_count)
        })
        .then_with(|| b.author_trust_score.cmp(&a.author_trust_score))
        .then_with(|| a.suggestion.created_at.cmp(&b.suggestion.created_at))
        .then_with(|| a.suggestion.id.cmp(&b.suggestion.id))
}

/// Rank suggestions and keep at most `limit`.
#[must_use]
pub fn rank_suggestions(
    mut candidates: Vec<RankedSuggestion>,
    limit: Option<usize>,
) -> Vec<RankedSuggestion> {
    candidates.sort_by(compare_suggestions);
    if let Some(limit) = limit {
        candidates.truncate(limit);
    }
    candidates
}

/// Descending `(trust, accepted responses)`, then earliest account first.
#[must_use]
pub fn compare_contributors(a: &ContributorStanding, b: &ContributorStanding) -> Ordering {
    b.contributor
        .trust_score
        .cmp(&a.contributor.trust_score)
        .then_with(|| b.accepted_response_count.cmp(&a.accepted_response_count))
        .then_with(|| a.contributor.created_at.cmp(&b.contributor.created_at))
        .then_with(|| a.contributor.id.cmp(&b.contributor.id))
}

/// Rank a leaderboard.
#[must_use]
pub fn rank_contributors(mut standings: Vec<ContributorStanding>) -> Vec<ContributorStanding> {
    standings.sort_by(compare_contributors);
    standings
}

/// Feed comparator for `sort`. Newest first is the final key for every mode.
#[must_use]
pub fn compare_posts(sort: PostSort, a: &Post, b: &Post) -> Ordering {
    let primary = match sort {
        PostSort::Popular => b
            .response_count
            .cmp(&a.response_count)
            .then_with(|| b.view_count.cmp(&a.view_count)),
        PostSort::Trending => b.view_count.cmp(&a.view_count),
        PostSort::Recent => Ordering::Equal,
    };
    primary
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Filter, then sort, then paginate.
#[must_use]
pub fn rank_posts(
    posts: Vec<Post>,
    filter: &PostFilter,
    sort: PostSort,
    pagination: Pagination,
) -> PostPage {
    let mut matching: Vec<Post> = posts.into_iter().filter(|post| filter.matches(post)).collect();
    matching.sort_by(|a, b| compare_posts(sort, a, b));

    let total = matching.len();
    let offset = pagination.offset();
    let limit = usize::try_from(pagination.limit()).unwrap_or(usize::MAX);
    let page: Vec<Post> = matching.into_iter().skip(offset).take(limit).collect();
    let has_more = offset.saturating_add(page.len()) < total;

    PostPage {
        posts: page,
        page: pagination.page(),
        limit: pagination.limit(),
        total_count: u64::try_from(total).unwrap_or(u64::MAX),
        has_more,
    }
}

#[cfg(test)]
mod tests;
