//! Ordering and pagination coverage for the ranked views.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use rstest::{fixture, rstest};

use super::*;
use crate::domain::community::Resolution;
use crate::domain::{BoundedScore, Contributor, PostId, Suggestion, SuggestionId, UserId, UserRole};

#[fixture]
fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn suggestion(
    epoch: DateTime<Utc>,
    usefulness: f64,
    positive: u32,
    trust: f64,
    age_minutes: i64,
) -> RankedSuggestion {
    let mut suggestion = Suggestion::draft(
        SuggestionId::random(),
        UserId::random(),
        "rust",
        "apply sulphur",
        None,
        epoch + TimeDelta::minutes(age_minutes),
    )
    .expect("valid suggestion");
    suggestion.usefulness_score = BoundedScore::clamped(usefulness);
    suggestion.positive_feedback_count = positive;
    RankedSuggestion {
        suggestion,
        author_trust_score: BoundedScore::clamped(trust),
    }
}

fn standing(epoch: DateTime<Utc>, trust: f64, accepted: u32, age_days: i64) -> ContributorStanding {
    let mut contributor = Contributor::register(
        UserId::random(),
        "grower",
        UserRole::Farmer,
        epoch + TimeDelta::days(age_days),
    )
    .expect("valid contributor");
    contributor.trust_score = BoundedScore::clamped(trust);
    ContributorStanding {
        contributor,
        accepted_response_count: accepted,
    }
}

fn post(epoch: DateTime<Utc>, responses: u32, views: u32, age_hours: i64) -> Post {
    let mut post = Post::draft(
        PostId::random(),
        UserId::random(),
        "wilting",
        "leaves wilt at noon",
        Some("Brinjal"),
        &[],
        epoch + TimeDelta::hours(age_hours),
    )
    .expect("valid post");
    post.response_count = responses;
    post.view_count = views;
    post
}

fn ids(ranked: &[RankedSuggestion]) -> Vec<SuggestionId> {
    ranked.iter().map(|entry| entry.suggestion.id).collect()
}

#[rstest]
fn suggestions_order_by_usefulness_then_positive_then_trust(epoch: DateTime<Utc>) {
    let best = suggestion(epoch, 90.0, 1, 10.0, 5);
    let more_positive = suggestion(epoch, 70.0, 4, 10.0, 4);
    let trusted_author = suggestion(epoch, 70.0, 2, 95.0, 3);
    let plain = suggestion(epoch, 70.0, 2, 40.0, 2);
    let expected = ids(&[
        best.clone(),
        more_positive.clone(),
        trusted_author.clone(),
        plain.clone(),
    ]);

    let ranked = rank_suggestions(vec![plain, trusted_author, best, more_positive], None);

    assert_eq!(ids(&ranked), expected);
}

#[rstest]
fn full_ties_fall_back_to_oldest_first(epoch: DateTime<Utc>) {
    let newer = suggestion(epoch, 50.0, 0, 50.0, 10);
    let older = suggestion(epoch, 50.0, 0, 50.0, 1);
    let expected = ids(&[older.clone(), newer.clone()]);

    assert_eq!(ids(&rank_suggestions(vec![newer, older], None)), expected);
}

#[rstest]
fn suggestion_ranking_is_deterministic(epoch: DateTime<Utc>) {
    let candidates: Vec<_> = (0..6)
        .map(|n| suggestion(epoch, 50.0, n % 2, 50.0, 0))
        .collect();
    let first = rank_suggestions(candidates.clone(), None);
    let mut reversed = candidates;
    reversed.reverse();
    let second = rank_suggestions(reversed, None);

    assert_eq!(ids(&first), ids(&second));
}

#[rstest]
fn limit_truncates_after_ranking(epoch: DateTime<Utc>) {
    let low = suggestion(epoch, 20.0, 0, 50.0, 0);
    let high = suggestion(epoch, 80.0, 0, 50.0, 1);
    let high_id = high.suggestion.id;

    let ranked = rank_suggestions(vec![low, high], Some(1));

    assert_eq!(ids(&ranked), vec![high_id]);
}

#[rstest]
fn contributor_ties_on_trust_break_on_accepted_count(epoch: DateTime<Utc>) {
    let a = standing(epoch, 90.0, 2, 0);
    let b = standing(epoch, 90.0, 5, 1);
    let b_id = b.contributor.id;

    let ranked = rank_contributors(vec![a, b]);

    assert_eq!(ranked[0].contributor.id, b_id);
}

#[rstest]
fn contributor_full_ties_prefer_earliest_account(epoch: DateTime<Utc>) {
    let late = standing(epoch, 60.0, 1, 30);
    let early = standing(epoch, 60.0, 1, 2);
    let early_id = early.contributor.id;

    let ranked = rank_contributors(vec![late, early]);

    assert_eq!(ranked[0].contributor.id, early_id);
}

fn post_ids(page: &PostPage) -> Vec<PostId> {
    page.posts.iter().map(|post| post.id).collect()
}

#[rstest]
#[case(PostSort::Popular, [1, 0, 2])]
#[case(PostSort::Trending, [0, 2, 1])]
#[case(PostSort::Recent, [2, 1, 0])]
fn post_sorts(epoch: DateTime<Utc>, #[case] sort: PostSort, #[case] order: [usize; 3]) {
    let posts = vec![
        post(epoch, 1, 100, 0),
        post(epoch, 5, 10, 1),
        post(epoch, 1, 50, 2),
    ];
    let expected: Vec<PostId> = order.iter().map(|index| posts[*index].id).collect();

    let page = rank_posts(posts, &PostFilter::default(), sort, Pagination::default());

    assert_eq!(post_ids(&page), expected);
}

#[rstest]
fn popular_breaks_ties_on_views_then_newest(epoch: DateTime<Utc>) {
    let older_same = post(epoch, 2, 7, 0);
    let newer_same = post(epoch, 2, 7, 3);
    let more_views = post(epoch, 2, 9, 0);
    let expected = vec![more_views.id, newer_same.id, older_same.id];

    let page = rank_posts(
        vec![older_same, newer_same, more_views],
        &PostFilter::default(),
        PostSort::Popular,
        Pagination::default(),
    );

    assert_eq!(post_ids(&page), expected);
}

#[rstest]
fn filter_applies_before_pagination(epoch: DateTime<Utc>) {
    let mut posts: Vec<Post> = (0..5).map(|hour| post(epoch, 0, 0, hour)).collect();
    for resolved in posts.iter_mut().take(3) {
        resolved.is_resolved = true;
    }
    let filter = PostFilter {
        resolution: Resolution::Unresolved,
        ..PostFilter::default()
    };
    let expected = vec![posts[4].id];

    let page = rank_posts(
        posts,
        &filter,
        PostSort::Recent,
        Pagination::new(Some(1), Some(1)).expect("valid page"),
    );

    assert_eq!(post_ids(&page), expected);
    assert_eq!(page.total_count, 2);
    assert!(page.has_more);
}

#[rstest]
fn last_page_reports_no_more(epoch: DateTime<Utc>) {
    let posts: Vec<Post> = (0..5).map(|hour| post(epoch, 0, 0, hour)).collect();

    let page = rank_posts(
        posts,
        &PostFilter::default(),
        PostSort::Recent,
        Pagination::new(Some(3), Some(2)).expect("valid page"),
    );

    assert_eq!(page.posts.len(), 1);
    assert_eq!(page.total_count, 5);
    assert!(!page.has_more);
}

#[rstest]
fn page_past_the_end_is_empty(epoch: DateTime<Utc>) {
    let posts: Vec<Post> = (0..2).map(|hour| post(epoch, 0, 0, hour)).collect();

    let page = rank_posts(
        posts,
        &PostFilter::default(),
        PostSort::Recent,
        Pagination::new(Some(4), Some(10)).expect("valid page"),
    );

    assert!(page.posts.is_empty());
    assert!(!page.has_more);
}
