//! AES-GCM sealing of flow definitions for export.
//!
//! Flow definitions can carry endpoint credentials, so exports are
//! encrypted with AES-256-GCM. The flow name is bound into the
//! authenticated data, which ties an envelope to the flow it was
//! exported from.

mod envelope;

pub use envelope::{EnvelopeCodec, FlowEnvelope};
