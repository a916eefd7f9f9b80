//! Integration tests for llm-relay
//!
//! These tests drive the full router against a mock upstream and verify
//! credential selection, path rewriting and response relaying end to end.

pub mod health;
pub mod openai;
