//! Shared integration test fixtures

#![allow(dead_code)]

pub mod test_utils;

pub use test_utils::{
    create_test_csv, daily_series, start, synthetic_values, TempTestFile,
    PREAMBLE_ROWS,
};
