//! Integration tests for crashline-reporter
//!
//! Drives the public `Reporter` API against in-memory fake transports and
//! verifies trace capture, grouping, request context, concurrent
//! submission and the flush contract.

mod common;

mod test_delivery_failures;
mod test_report_contents;
