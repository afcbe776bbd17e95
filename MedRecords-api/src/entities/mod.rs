// Public entities for the MedRecords API
// Request and response bodies come from the domain crate; this module only adds the
// error envelopes so they can be described in the OpenAPI document

pub mod common;
