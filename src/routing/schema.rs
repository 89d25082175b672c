//! Protobuf descriptor loading.
//!
//! The gateway never compiles `.proto` files itself; it consumes a serialized
//! `FileDescriptorSet` produced by `protoc --descriptor_set_out --include_imports`.

use std::fs;
use std::path::{Path, PathBuf};

use prost_reflect::{DescriptorError, DescriptorPool, MethodDescriptor as ProtoMethod};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("no descriptor set configured (schema.descriptor_set)")]
    NotConfigured,

    #[error("failed to read descriptor set {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid descriptor set: {0}")]
    Decode(#[from] DescriptorError),
}

/// Load a descriptor pool from the configured file.
pub fn load_descriptor_pool(path: Option<&Path>) -> Result<DescriptorPool, SchemaError> {
    let path = path.ok_or(SchemaError::NotConfigured)?;
    let bytes = fs::read(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let pool = DescriptorPool::decode(bytes.as_slice())?;

    tracing::info!(
        path = %path.display(),
        services = pool.services().len(),
        "Descriptor set loaded"
    );
    Ok(pool)
}

/// Look up `package.Service/Method` in the pool.
pub fn find_rpc(pool: &DescriptorPool, rpc: &str) -> Option<ProtoMethod> {
    let (service, method) = rpc.rsplit_once('/')?;
    pool.get_service_by_name(service.trim_start_matches('/'))?
        .methods()
        .find(|m| m.name() == method)
}

/// Canonical `package.Service/Method` name of a method.
pub fn rpc_name(method: &ProtoMethod) -> String {
    format!("{}/{}", method.parent_service().full_name(), method.name())
}
