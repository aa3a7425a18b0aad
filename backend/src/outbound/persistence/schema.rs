//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `migrations/` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Contributor profiles with the cached trust score.
    users (id) {
        id -> Uuid,
        /// Trimmed display name (max 64 characters).
        display_name -> Varchar,
        /// One of `farmer`, `expert`, `extension_worker`, `admin`.
        role -> Varchar,
        /// Cached trust score in `[0, 100]`.
        trust_score -> Float8,
        is_verified -> Bool,
        /// Optimistic concurrency counter for `trust_score`.
        score_revision -> Int4,
        created_at -> Timestamptz,
        last_active_at -> Timestamptz,
    }
}

diesel::table! {
    /// Disease-treatment advice with the cached usefulness aggregate.
    suggestions (id) {
        id -> Uuid,
        author_id -> Uuid,
        disease_name -> Varchar,
        text -> Text,
        details -> Nullable<Text>,
        usefulness_score -> Float8,
        usage_count -> Int4,
        positive_feedback_count -> Int4,
        negative_feedback_count -> Int4,
        /// Optimistic concurrency counter for the four cached columns above.
        score_revision -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Immutable ratings; unique per `(rater_id, suggestion_id)`.
    feedback (id) {
        id -> Uuid,
        rater_id -> Uuid,
        suggestion_id -> Uuid,
        target_user_id -> Uuid,
        rating -> Int2,
        comment -> Nullable<Text>,
        context_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Community questions.
    posts (id) {
        id -> Uuid,
        author_id -> Uuid,
        title -> Varchar,
        description -> Text,
        crop_name -> Nullable<Text>,
        tags -> Array<Text>,
        is_resolved -> Bool,
        accepted_response_id -> Nullable<Uuid>,
        view_count -> Int4,
        /// Display counter; reconciled against `responses`.
        response_count -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Answers to community questions.
    responses (id) {
        id -> Uuid,
        post_id -> Uuid,
        author_id -> Uuid,
        content -> Text,
        is_expert_advice -> Bool,
        is_verified -> Bool,
        verification_confidence -> Nullable<Float8>,
        verification_reason -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Deferred follow-up prompts.
    follow_ups (user_id, suggestion_id, scheduled_for) {
        user_id -> Uuid,
        suggestion_id -> Uuid,
        scheduled_for -> Timestamptz,
        context_id -> Nullable<Uuid>,
        cancelled -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(suggestions -> users (author_id));
diesel::joinable!(feedback -> suggestions (suggestion_id));
diesel::joinable!(responses -> posts (post_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    suggestions,
    feedback,
    posts,
    responses,
    follow_ups,
);
