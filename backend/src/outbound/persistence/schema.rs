//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations/` exactly. When a
//! migration changes the schema, regenerate this file with
//! `diesel print-schema` or update it by hand.

diesel::table! {
    /// Registered accounts.
    users (id) {
        /// Store-assigned identifier.
        id -> Int8,
        /// Unique, case-sensitive login address (max 160 characters).
        email -> Varchar,
        /// Display name (max 100 characters).
        name -> Varchar,
        /// Argon2id PHC string.
        password_digest -> Varchar,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Expenses, each owned by exactly one user.
    expenses (id) {
        /// Store-assigned identifier; also the insertion order.
        id -> Int8,
        /// Owning account; rows cascade when it is deleted.
        user_id -> Int8,
        /// Positive amount, `decimal(10,2)`.
        amount -> Numeric,
        /// Free text, max 255 characters.
        description -> Varchar,
        /// One of the closed category names.
        category -> Varchar,
        /// Calendar date of the expense.
        date -> Date,
        /// ISO-style three-letter code.
        currency -> Varchar,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(expenses -> users (user_id));
diesel::allow_tables_to_appear_in_same_query!(users, expenses);
