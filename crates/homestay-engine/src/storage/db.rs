//! SQLite database for the Homestay workflow engine.

homestay_core::define_database!(Database, "Homestay database migrations complete");
