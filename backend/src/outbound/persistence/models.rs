//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions back into domain types return
//! `String` errors; each adapter maps them into its own query error.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    BoundedScore, Contributor, Feedback, FollowUpKey, FollowUpPrompt, Post, PostId, Rating,
    Response, ResponseId, Suggestion, SuggestionId, UserId, UserRole,
};

use super::schema::{feedback, follow_ups, posts, responses, suggestions, users};

/// Widen a non-negative database integer into a domain counter.
pub(crate) fn count_from_db(value: i32, column: &str) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("{column} is negative: {value}"))
}

/// Narrow a domain counter into a database integer, saturating.
pub(crate) fn count_to_db(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Narrow a `COUNT(*)` result into a domain counter, saturating.
pub(crate) fn count_star_to_u32(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(if value < 0 { 0 } else { u32::MAX })
}

pub(crate) fn rating_from_db(value: i16) -> Result<Rating, String> {
    let raw = u8::try_from(value).map_err(|_| format!("rating out of range: {value}"))?;
    Rating::new(raw).map_err(|err| err.to_string())
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub display_name: String,
    pub role: String,
    pub trust_score: f64,
    pub is_verified: bool,
    pub score_revision: i32,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for Contributor {
    type Error = String;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::from_uuid(row.id),
            display_name: row.display_name,
            role: row.role.parse::<UserRole>().map_err(|err| err.to_string())?,
            trust_score: BoundedScore::clamped(row.trust_score),
            is_verified: row.is_verified,
            score_revision: count_from_db(row.score_revision, "score_revision")?,
            created_at: row.created_at,
            last_active_at: row.last_active_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub display_name: &'a str,
    pub role: &'a str,
    pub trust_score: f64,
    pub is_verified: bool,
    pub score_revision: i32,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl<'a> From<&'a Contributor> for NewUserRow<'a> {
    fn from(contributor: &'a Contributor) -> Self {
        Self {
            id: *contributor.id.as_uuid(),
            display_name: &contributor.display_name,
            role: contributor.role.as_str(),
            trust_score: contributor.trust_score.value(),
            is_verified: contributor.is_verified,
            score_revision: count_to_db(contributor.score_revision),
            created_at: contributor.created_at,
            last_active_at: contributor.last_active_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Suggestions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = suggestions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SuggestionRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub disease_name: String,
    pub text: String,
    pub details: Option<String>,
    pub usefulness_score: f64,
    pub usage_count: i32,
    pub positive_feedback_count: i32,
    pub negative_feedback_count: i32,
    pub score_revision: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SuggestionRow> for Suggestion {
    type Error = String;

    fn try_from(row: SuggestionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: SuggestionId::from_uuid(row.id),
            author_id: UserId::from_uuid(row.author_id),
            disease_name: row.disease_name,
            text: row.text,
            details: row.details,
            usefulness_score: BoundedScore::clamped(row.usefulness_score),
            usage_count: count_from_db(row.usage_count, "usage_count")?,
            positive_feedback_count: count_from_db(
                row.positive_feedback_count,
                "positive_feedback_count",
            )?,
            negative_feedback_count: count_from_db(
                row.negative_feedback_count,
                "negative_feedback_count",
            )?,
            score_revision: count_from_db(row.score_revision, "score_revision")?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = suggestions)]
pub(crate) struct NewSuggestionRow<'a> {
    pub id: Uuid,
    pub author_id: Uuid,
    pub disease_name: &'a str,
    pub text: &'a str,
    pub details: Option<&'a str>,
    pub usefulness_score: f64,
    pub usage_count: i32,
    pub positive_feedback_count: i32,
    pub negative_feedback_count: i32,
    pub score_revision: i32,
    pub created_at: DateTime<Utc>,
}

impl<'a> From<&'a Suggestion> for NewSuggestionRow<'a> {
    fn from(suggestion: &'a Suggestion) -> Self {
        Self {
            id: *suggestion.id.as_uuid(),
            author_id: *suggestion.author_id.as_uuid(),
            disease_name: &suggestion.disease_name,
            text: &suggestion.text,
            details: suggestion.details.as_deref(),
            usefulness_score: suggestion.usefulness_score.value(),
            usage_count: count_to_db(suggestion.usage_count),
            positive_feedback_count: count_to_db(suggestion.positive_feedback_count),
            negative_feedback_count: count_to_db(suggestion.negative_feedback_count),
            score_revision: count_to_db(suggestion.score_revision),
            created_at: suggestion.created_at,
        }
    }
}

/// Cached aggregate columns plus the bumped revision.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = suggestions)]
pub(crate) struct SuggestionScoresUpdate {
    pub usefulness_score: f64,
    pub usage_count: i32,
    pub positive_feedback_count: i32,
    pub negative_feedback_count: i32,
    pub score_revision: i32,
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = feedback)]
pub(crate) struct NewFeedbackRow<'a> {
    pub id: Uuid,
    pub rater_id: Uuid,
    pub suggestion_id: Uuid,
    pub target_user_id: Uuid,
    pub rating: i16,
    pub comment: Option<&'a str>,
    pub context_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl<'a> From<&'a Feedback> for NewFeedbackRow<'a> {
    fn from(feedback: &'a Feedback) -> Self {
        Self {
            id: *feedback.id.as_uuid(),
            rater_id: *feedback.rater_id.as_uuid(),
            suggestion_id: *feedback.suggestion_id.as_uuid(),
            target_user_id: *feedback.target_user_id.as_uuid(),
            rating: i16::from(feedback.rating.value()),
            comment: feedback.comment.as_deref(),
            context_id: feedback.context_id,
            created_at: feedback.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Posts and responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PostRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub description: String,
    pub crop_name: Option<String>,
    pub tags: Vec<String>,
    pub is_resolved: bool,
    pub accepted_response_id: Option<Uuid>,
    pub view_count: i32,
    pub response_count: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PostRow> for Post {
    type Error = String;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PostId::from_uuid(row.id),
            author_id: UserId::from_uuid(row.author_id),
            title: row.title,
            description: row.description,
            crop_name: row.crop_name,
            tags: row.tags,
            is_resolved: row.is_resolved,
            accepted_response_id: row.accepted_response_id.map(ResponseId::from_uuid),
            view_count: count_from_db(row.view_count, "view_count")?,
            response_count: count_from_db(row.response_count, "response_count")?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = posts)]
pub(crate) struct NewPostRow<'a> {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: &'a str,
    pub description: &'a str,
    pub crop_name: Option<&'a str>,
    pub tags: &'a [String],
    pub is_resolved: bool,
    pub view_count: i32,
    pub response_count: i32,
    pub created_at: DateTime<Utc>,
}

impl<'a> From<&'a Post> for NewPostRow<'a> {
    fn from(post: &'a Post) -> Self {
        Self {
            id: *post.id.as_uuid(),
            author_id: *post.author_id.as_uuid(),
            title: &post.title,
            description: &post.description,
            crop_name: post.crop_name.as_deref(),
            tags: &post.tags,
            is_resolved: post.is_resolved,
            view_count: count_to_db(post.view_count),
            response_count: count_to_db(post.response_count),
            created_at: post.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = responses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ResponseRow {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub is_expert_advice: bool,
    pub is_verified: bool,
    pub verification_confidence: Option<f64>,
    pub verification_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ResponseRow> for Response {
    fn from(row: ResponseRow) -> Self {
        Self {
            id: ResponseId::from_uuid(row.id),
            post_id: PostId::from_uuid(row.post_id),
            author_id: UserId::from_uuid(row.author_id),
            content: row.content,
            is_expert_advice: row.is_expert_advice,
            is_verified: row.is_verified,
            verification_confidence: row.verification_confidence,
            verification_reason: row.verification_reason,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = responses)]
pub(crate) struct NewResponseRow<'a> {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: &'a str,
    pub is_expert_advice: bool,
    pub is_verified: bool,
    pub verification_confidence: Option<f64>,
    pub verification_reason: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

impl<'a> From<&'a Response> for NewResponseRow<'a> {
    fn from(response: &'a Response) -> Self {
        Self {
            id: *response.id.as_uuid(),
            post_id: *response.post_id.as_uuid(),
            author_id: *response.author_id.as_uuid(),
            content: &response.content,
            is_expert_advice: response.is_expert_advice,
            is_verified: response.is_verified,
            verification_confidence: response.verification_confidence,
            verification_reason: response.verification_reason.as_deref(),
            created_at: response.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Follow-ups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = follow_ups)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct FollowUpRow {
    pub user_id: Uuid,
    pub suggestion_id: Uuid,
    pub scheduled_for: DateTime<Utc>,
    pub context_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<FollowUpRow> for FollowUpPrompt {
    fn from(row: FollowUpRow) -> Self {
        Self {
            key: FollowUpKey {
                user_id: UserId::from_uuid(row.user_id),
                suggestion_id: SuggestionId::from_uuid(row.suggestion_id),
                scheduled_for: row.scheduled_for,
            },
            context_id: row.context_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = follow_ups)]
pub(crate) struct NewFollowUpRow {
    pub user_id: Uuid,
    pub suggestion_id: Uuid,
    pub scheduled_for: DateTime<Utc>,
    pub context_id: Option<Uuid>,
    pub cancelled: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&FollowUpPrompt> for NewFollowUpRow {
    fn from(prompt: &FollowUpPrompt) -> Self {
        Self {
            user_id: *prompt.key.user_id.as_uuid(),
            suggestion_id: *prompt.key.suggestion_id.as_uuid(),
            scheduled_for: prompt.key.scheduled_for,
            context_id: prompt.context_id,
            cancelled: false,
            created_at: prompt.created_at,
        }
    }
}
