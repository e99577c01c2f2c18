//! Protocol Buffer definitions and generated code for the coordination
//! service RPC contract.
//!
//! This module contains auto-generated Rust types from Protobuf definitions,
//! typically created using [`tonic-build`] or `protoc` compiler plugins.
//! The source definition lives in `proto/coordination.proto`.

pub mod v1 {
    include!("../generated/coordination.v1.rs");
}
