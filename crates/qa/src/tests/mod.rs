//! Shared test doubles and pipeline scenario tests.
