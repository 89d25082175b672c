//! Method registry: HTTP route → backend RPC lookup.
//!
//! # Responsibilities
//! - Bind each configured route to a method in the descriptor pool
//! - Reject duplicate and overlapping routes at registration time
//! - Resolve (verb, path) to a method descriptor plus path parameters
//!
//! # Design Decisions
//! - Built once at startup and shared via `Arc`; `register` needs `&mut self`,
//!   so nothing can be added once the registry is shared
//! - Verbs are matched exactly; an unknown verb on a known path is a plain miss
//! - Registration order only affects log output, never resolution

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Method;
use prost_reflect::{
    Cardinality, DescriptorPool, FieldDescriptor, Kind, MessageDescriptor,
    MethodDescriptor as ProtoMethod,
};
use thiserror::Error;

use crate::config::RouteConfig;
use crate::routing::schema::{find_rpc, rpc_name};
use crate::routing::template::{normalize_path, PathParams, PathTemplate, TemplateError};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("route {path:?}: unsupported HTTP method {method:?}")]
    InvalidVerb { method: String, path: String },

    #[error("route for {rpc}: {source}")]
    Template {
        rpc: String,
        #[source]
        source: TemplateError,
    },

    #[error("rpc {0:?} not found in descriptor set")]
    UnknownRpc(String),

    #[error("rpc {0} is streaming; only unary methods can be routed")]
    Streaming(String),

    #[error("{rpc}: request message {message} has no field {field:?}")]
    UnknownField {
        rpc: String,
        message: String,
        field: String,
    },

    #[error("{rpc}: path parameter {field:?} must be a singular scalar field")]
    UnsupportedParam { rpc: String, field: String },

    #[error("{rpc}: body field {field:?} must be a singular message field")]
    UnsupportedBody { rpc: String, field: String },

    #[error("duplicate route {verb} {path}")]
    Duplicate { verb: Method, path: String },

    #[error("route {verb} {path} overlaps {existing}")]
    Overlap {
        verb: Method,
        path: String,
        existing: String,
    },
}

/// Verbs a route may bind. `OPTIONS` belongs to CORS preflight.
pub const ROUTABLE_VERBS: [Method; 8] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::CONNECT,
    Method::TRACE,
];

/// Case-insensitive lookup in [`ROUTABLE_VERBS`]; extension methods are refused.
pub fn routable_verb(method: &str) -> Option<Method> {
    ROUTABLE_VERBS
        .iter()
        .find(|verb| verb.as_str().eq_ignore_ascii_case(method))
        .cloned()
}

/// Where the HTTP body goes in the request message.
#[derive(Debug, Clone)]
pub enum BodyMapping {
    /// The body is the request message.
    Whole,
    /// The body is the value of one top-level field.
    Field(FieldDescriptor),
    /// The body is ignored.
    Ignore,
}

/// One HTTP route bound to one backend method. Immutable once built.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    verb: Method,
    template: PathTemplate,
    rpc: ProtoMethod,
    rpc_name: String,
    body: BodyMapping,
    required: Vec<String>,
}

impl MethodDescriptor {
    /// Bind a route declaration against the descriptor pool.
    pub fn bind(pool: &DescriptorPool, route: &RouteConfig) -> Result<Self, RegistryError> {
        let verb = routable_verb(&route.method).ok_or_else(|| RegistryError::InvalidVerb {
                method: route.method.clone(),
                path: route.path.clone(),
            })?;

        let template = PathTemplate::parse(&route.path).map_err(|source| RegistryError::Template {
            rpc: route.rpc.clone(),
            source,
        })?;

        let rpc = find_rpc(pool, &route.rpc).ok_or_else(|| RegistryError::UnknownRpc(route.rpc.clone()))?;
        let rpc_name = rpc_name(&rpc);
        if rpc.is_client_streaming() || rpc.is_server_streaming() {
            return Err(RegistryError::Streaming(rpc_name));
        }

        let input = rpc.input();
        let lookup = |name: &str| {
            input
                .get_field_by_name(name)
                .ok_or_else(|| RegistryError::UnknownField {
                    rpc: rpc_name.clone(),
                    message: input.full_name().to_string(),
                    field: name.to_string(),
                })
        };

        let mut required: Vec<String> = Vec::new();
        for param in template.params() {
            let field = lookup(param)?;
            if field.is_list() || field.is_map() || matches!(field.kind(), Kind::Message(_)) {
                return Err(RegistryError::UnsupportedParam {
                    rpc: rpc_name.clone(),
                    field: param.to_string(),
                });
            }
            required.push(param.to_string());
        }

        let body = match route.body.as_str() {
            "*" => BodyMapping::Whole,
            "" => BodyMapping::Ignore,
            name => {
                let field = lookup(name)?;
                if field.is_list() || field.is_map() || !matches!(field.kind(), Kind::Message(_)) {
                    return Err(RegistryError::UnsupportedBody {
                        rpc: rpc_name.clone(),
                        field: name.to_string(),
                    });
                }
                BodyMapping::Field(field)
            }
        };

        for name in &route.required {
            lookup(name)?;
            required.push(name.clone());
        }
        required.extend(
            input
                .fields()
                .filter(|f| f.cardinality() == Cardinality::Required)
                .map(|f| f.name().to_string()),
        );
        required.sort();
        required.dedup();

        Ok(Self {
            verb,
            template,
            rpc,
            rpc_name,
            body,
            required,
        })
    }

    pub fn verb(&self) -> &Method {
        &self.verb
    }

    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    /// The backend method.
    pub fn rpc(&self) -> &ProtoMethod {
        &self.rpc
    }

    /// `package.Service/Method`.
    pub fn rpc_name(&self) -> &str {
        &self.rpc_name
    }

    pub fn request_schema(&self) -> MessageDescriptor {
        self.rpc.input()
    }

    pub fn body(&self) -> &BodyMapping {
        &self.body
    }

    /// Fields the client must supply (path params, declared, proto2 `required`).
    pub fn required_fields(&self) -> &[String] {
        &self.required
    }
}

/// A successful lookup.
#[derive(Debug, Clone)]
pub struct ResolvedMethod {
    pub descriptor: Arc<MethodDescriptor>,
    pub params: PathParams,
}

/// Immutable table of routes, keyed by verb.
#[derive(Debug, Default)]
pub struct MethodRegistry {
    by_verb: HashMap<Method, Vec<Arc<MethodDescriptor>>>,
    ordered: Vec<Arc<MethodDescriptor>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind and register every route, failing on the first bad one.
    pub fn from_routes(pool: &DescriptorPool, routes: &[RouteConfig]) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for route in routes {
            registry.register(MethodDescriptor::bind(pool, route)?)?;
        }
        tracing::info!(routes = registry.len(), "All routes registered");
        Ok(registry)
    }

    pub fn register(&mut self, descriptor: MethodDescriptor) -> Result<(), RegistryError> {
        let same_verb = self.by_verb.entry(descriptor.verb.clone()).or_default();

        for existing in same_verb.iter() {
            if existing.template.as_str() == descriptor.template.as_str() {
                return Err(RegistryError::Duplicate {
                    verb: descriptor.verb.clone(),
                    path: descriptor.template.to_string(),
                });
            }
            if existing.template.overlaps(&descriptor.template) {
                return Err(RegistryError::Overlap {
                    verb: descriptor.verb.clone(),
                    path: descriptor.template.to_string(),
                    existing: existing.template.to_string(),
                });
            }
        }

        tracing::info!(
            method = %descriptor.verb,
            path = %descriptor.template,
            rpc = %descriptor.rpc_name,
            "Route registered"
        );

        let descriptor = Arc::new(descriptor);
        same_verb.push(descriptor.clone());
        self.ordered.push(descriptor);
        Ok(())
    }

    pub fn resolve(&self, verb: &Method, path: &str) -> Option<ResolvedMethod> {
        let segments = normalize_path(path);
        self.by_verb.get(verb)?.iter().find_map(|descriptor| {
            descriptor.template.matches(&segments).map(|params| ResolvedMethod {
                descriptor: descriptor.clone(),
                params,
            })
        })
    }

    /// Descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.ordered.iter().map(|d| d.as_ref())
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
