//! Unit tests for the session core.

mod guard_test;
mod mirror_test;
mod support;
