//! Integration tests for crashline-http
//!
//! Uses wiremock to simulate the item-ingestion endpoint and verifies the
//! posted payload, the mapping of HTTP outcomes to transport errors, and
//! end-to-end delivery through a `Reporter`.


mod test_delivery;
mod test_reporter_end_to_end;
