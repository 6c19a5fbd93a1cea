//! Generated protobuf types, compiled from `proto/notes.proto` by
//! `build.rs` via `prost-build`. Field numbers here are load-bearing: they
//! must match the wire format of the source store, not just the semantics
//! described in the data model.

include!(concat!(env!("OUT_DIR"), "/notecore.wire.rs"));
