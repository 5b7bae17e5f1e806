//! Integration tests entry point, following https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod cli;
mod scenarios;
mod tracing_utils;
