mod common;
mod upsert_tests;
