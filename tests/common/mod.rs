//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use prost_reflect::{DescriptorPool, DynamicMessage, Value};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    MethodDescriptorProto, ServiceDescriptorProto,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tonic::Status;

use edge_gateway::backend::{BackendConnector, InvokeError, RpcBackend, RpcCall};
use edge_gateway::config::{GatewayConfig, RouteConfig};
use edge_gateway::lifecycle::ShutdownReport;
use edge_gateway::net::ListenerError;
use edge_gateway::{LifecycleState, Shutdown};

fn field(name: &str, number: i32, ty: Type, label: Label, type_name: Option<&str>) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(ty as i32),
        type_name: type_name.map(str::to_string),
        ..Default::default()
    }
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

fn method(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(input.to_string()),
        output_type: Some(output.to_string()),
        ..Default::default()
    }
}

/// Descriptor set for `item.ItemService`.
pub fn item_descriptor_set() -> FileDescriptorSet {
    use Label::{Optional, Repeated};

    let file = FileDescriptorProto {
        name: Some("item.proto".to_string()),
        package: Some("item".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![
            message(
                "Item",
                vec![
                    field("id", 1, Type::Int32, Optional, None),
                    field("name", 2, Type::String, Optional, None),
                    field("value", 3, Type::Double, Optional, None),
                    field("tags", 4, Type::String, Repeated, None),
                ],
            ),
            message("GetItemRequest", vec![field("id", 1, Type::Int32, Optional, None)]),
            message(
                "ListItemsRequest",
                vec![
                    field("page_size", 1, Type::Int32, Optional, None),
                    field("filter", 2, Type::String, Optional, None),
                ],
            ),
            message(
                "ListItemsResponse",
                vec![field("items", 1, Type::Message, Repeated, Some(".item.Item"))],
            ),
            message("DeleteItemResponse", vec![field("deleted", 1, Type::Bool, Optional, None)]),
        ],
        service: vec![ServiceDescriptorProto {
            name: Some("ItemService".to_string()),
            method: vec![
                method("GetItem", ".item.GetItemRequest", ".item.Item"),
                method("ListItems", ".item.ListItemsRequest", ".item.ListItemsResponse"),
                method("CreateItem", ".item.Item", ".item.Item"),
                method("DeleteItem", ".item.GetItemRequest", ".item.DeleteItemResponse"),
                method("Echo", ".item.Item", ".item.Item"),
            ],
            ..Default::default()
        }],
        ..Default::default()
    };

    FileDescriptorSet { file: vec![file] }
}

pub fn item_pool() -> DescriptorPool {
    DescriptorPool::from_file_descriptor_set(item_descriptor_set()).unwrap()
}

pub fn item_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig::new("GET", "/v1/items/{id}", "item.ItemService/GetItem"),
        RouteConfig::new("GET", "/v1/items", "item.ItemService/ListItems").with_body(""),
        RouteConfig::new("POST", "/v1/items", "item.ItemService/CreateItem").with_required(&["name"]),
        RouteConfig::new("DELETE", "/v1/items/{id}", "item.ItemService/DeleteItem"),
        RouteConfig::new("POST", "/v1/echo", "item.ItemService/Echo"),
    ]
}

/// Item store behind the item service's methods.
pub struct ItemStore {
    items: BTreeMap<i32, String>,
}

impl Default for ItemStore {
    fn default() -> Self {
        let mut items = BTreeMap::new();
        items.insert(42, "answer".to_string());
        items.insert(7, "lucky".to_string());
        Self { items }
    }
}

impl ItemStore {
    fn item(pool: &DescriptorPool, id: i32, name: &str) -> DynamicMessage {
        let mut item = DynamicMessage::new(pool.get_message_by_name("item.Item").unwrap());
        item.set_field_by_name("id", Value::I32(id));
        item.set_field_by_name("name", Value::String(name.to_string()));
        item
    }

    fn id_of(request: &DynamicMessage) -> i32 {
        request
            .get_field_by_name("id")
            .and_then(|v| v.as_i32())
            .unwrap_or_default()
    }

    /// Answer one call by method name.
    pub fn respond(
        &self,
        method: &prost_reflect::MethodDescriptor,
        request: &DynamicMessage,
        tenant: Option<&str>,
    ) -> Result<DynamicMessage, Status> {
        let pool = method.parent_pool();
        match method.name() {
            "GetItem" => {
                let id = Self::id_of(request);
                self.items
                    .get(&id)
                    .map(|name| Self::item(pool, id, name))
                    .ok_or_else(|| Status::not_found(format!("item {id} does not exist")))
            }
            "ListItems" => {
                let page_size = request
                    .get_field_by_name("page_size")
                    .and_then(|v| v.as_i32())
                    .filter(|n| *n > 0)
                    .unwrap_or(i32::MAX) as usize;
                let items = self
                    .items
                    .iter()
                    .take(page_size)
                    .map(|(id, name)| Value::Message(Self::item(pool, *id, name)))
                    .collect();
                let mut response = DynamicMessage::new(method.output());
                response.set_field_by_name("items", Value::List(items));
                Ok(response)
            }
            "CreateItem" => {
                let mut item = request.clone();
                item.set_field_by_name("id", Value::I32(100));
                Ok(item)
            }
            "DeleteItem" => {
                let mut response = DynamicMessage::new(method.output());
                let deleted = self.items.contains_key(&Self::id_of(request));
                response.set_field_by_name("deleted", Value::Bool(deleted));
                Ok(response)
            }
            "Echo" => {
                let mut item = request.clone();
                if let Some(tenant) = tenant {
                    item.set_field_by_name("name", Value::String(tenant.to_string()));
                }
                Ok(item)
            }
            other => Err(Status::unimplemented(other.to_string())),
        }
    }
}

/// In-process backend that records how often it was called.
#[derive(Default)]
pub struct ItemBackend {
    store: ItemStore,
    calls: AtomicUsize,
    delay: Duration,
}

impl ItemBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every call sleeps for `delay` before answering.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RpcBackend for ItemBackend {
    fn unary(&self, call: RpcCall) -> BoxFuture<'_, Result<DynamicMessage, InvokeError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            let tenant = call.metadata.get("x-tenant").and_then(|v| v.to_str().ok());
            self.store
                .respond(&call.method, &call.request, tenant)
                .map_err(InvokeError::from)
        })
    }
}

/// A gateway running on an ephemeral local port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub state: watch::Receiver<LifecycleState>,
    pub handle: JoinHandle<Result<ShutdownReport, ListenerError>>,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger draining and wait for the run to finish.
    pub async fn stop(self) -> ShutdownReport {
        self.shutdown.trigger();
        self.handle.await.unwrap().unwrap()
    }
}

pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.routes = item_routes();
    config
}

/// Start a gateway in front of `backend`.
pub async fn spawn_gateway(backend: Arc<dyn RpcBackend>, config: GatewayConfig) -> TestGateway {
    let connector = BackendConnector::with_backend(backend, "in-memory", config.backend.request_timeout());
    spawn_with_connector(connector, config).await
}

pub async fn spawn_with_connector(connector: BackendConnector, config: GatewayConfig) -> TestGateway {
    let gateway = edge_gateway::start_with(&config, &item_pool(), connector)
        .await
        .unwrap()
        .without_signal_handlers();

    let addr = gateway.local_addr();
    let shutdown = gateway.shutdown_handle();
    let state = gateway.state();
    let handle = tokio::spawn(gateway.run());

    TestGateway {
        addr,
        shutdown,
        state,
        handle,
    }
}

/// Client without connection pooling, so every request opens a fresh connection.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
