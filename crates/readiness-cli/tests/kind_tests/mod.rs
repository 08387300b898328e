//! Integration tests against a live cluster
//!
//! Tests are organized by the story they tell:
//!
//! - `certificate_issuance`: Stories about issuing a certificate, waiting for
//!   it to become ready and cleaning up afterwards, including the unhappy
//!   paths (issuer missing, certificate missing, run cancelled)

mod certificate_issuance;
mod helpers;
