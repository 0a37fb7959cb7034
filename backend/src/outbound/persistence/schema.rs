//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Learner accounts and their wallet balance.
    users (id) {
        /// Identity provider UUID.
        id -> Uuid,
        /// Name printed on certificates.
        display_name -> Varchar,
        /// Balance in minor currency units; `CHECK (balance >= 0)`.
        balance -> Int8,
    }
}

diesel::table! {
    /// Purchasable courses.
    courses (id) {
        id -> Int8,
        title -> Varchar,
        instructor -> Varchar,
        /// Price in minor currency units; `CHECK (price >= 0)`.
        price -> Int8,
    }
}

diesel::table! {
    /// Ordered course modules.
    ///
    /// `UNIQUE (course_id, position)`. Committed positions are `1..=N`; the
    /// check constraint only forbids zero so negative staging values can exist
    /// inside a renumbering transaction.
    modules (id) {
        id -> Int8,
        course_id -> Int8,
        title -> Varchar,
        position -> Int4,
    }
}

diesel::table! {
    /// One row per (user, course) purchase; `UNIQUE (user_id, course_id)`.
    purchases (id) {
        id -> Int8,
        user_id -> Uuid,
        course_id -> Int8,
        amount -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Per-user completion flags, keyed by (user, module).
    module_progress (user_id, module_id) {
        user_id -> Uuid,
        module_id -> Int8,
        is_completed -> Bool,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Issued certificates; `UNIQUE (user_id, course_id)`.
    certificates (id) {
        id -> Int8,
        user_id -> Uuid,
        course_id -> Int8,
        file_url -> Text,
        issued_at -> Timestamptz,
    }
}

diesel::joinable!(modules -> courses (course_id));
diesel::joinable!(module_progress -> modules (module_id));
diesel::joinable!(module_progress -> users (user_id));
diesel::joinable!(purchases -> courses (course_id));
diesel::joinable!(purchases -> users (user_id));
diesel::joinable!(certificates -> courses (course_id));
diesel::joinable!(certificates -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    certificates,
    courses,
    module_progress,
    modules,
    purchases,
    users,
);
