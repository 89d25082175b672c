//! Descriptor fixtures shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use futures_util::future::BoxFuture;
use prost_reflect::{DescriptorPool, DynamicMessage, ReflectMessage};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    MethodDescriptorProto, ServiceDescriptorProto,
};

use crate::backend::{InvokeError, RpcBackend, RpcCall};
use crate::config::RouteConfig;

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

fn method(name: &str, input: &str, output: &str, server_streaming: bool) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(input.to_string()),
        output_type: Some(output.to_string()),
        server_streaming: Some(server_streaming),
        ..Default::default()
    }
}

/// `item.proto` (proto3) plus a small proto2 `ticket.proto`.
pub fn item_pool() -> DescriptorPool {
    use Label::{Optional, Repeated, Required};

    let item = FileDescriptorProto {
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
                    field("tags", 3, Type::String, Repeated, None),
                    field("include_archived", 4, Type::Bool, Optional, None),
                ],
            ),
            message(
                "ListItemsResponse",
                vec![field("items", 1, Type::Message, Repeated, Some(".item.Item"))],
            ),
            message(
                "UpdateItemRequest",
                vec![
                    field("id", 1, Type::Int32, Optional, None),
                    field("item", 2, Type::Message, Optional, Some(".item.Item")),
                ],
            ),
            message("DeleteItemResponse", vec![field("deleted", 1, Type::Bool, Optional, None)]),
        ],
        service: vec![ServiceDescriptorProto {
            name: Some("ItemService".to_string()),
            method: vec![
                method("GetItem", ".item.GetItemRequest", ".item.Item", false),
                method("ListItems", ".item.ListItemsRequest", ".item.ListItemsResponse", false),
                method("CreateItem", ".item.Item", ".item.Item", false),
                method("UpdateItem", ".item.UpdateItemRequest", ".item.Item", false),
                method("DeleteItem", ".item.GetItemRequest", ".item.DeleteItemResponse", false),
                method("Echo", ".item.Item", ".item.Item", false),
                method("WatchItems", ".item.GetItemRequest", ".item.Item", true),
            ],
            ..Default::default()
        }],
        ..Default::default()
    };

    let ticket = FileDescriptorProto {
        name: Some("ticket.proto".to_string()),
        package: Some("ticket".to_string()),
        syntax: Some("proto2".to_string()),
        message_type: vec![message(
            "Ticket",
            vec![
                field("code", 1, Type::String, Required, None),
                field("note", 2, Type::String, Optional, None),
            ],
        )],
        service: vec![ServiceDescriptorProto {
            name: Some("TicketService".to_string()),
            method: vec![method("Redeem", ".ticket.Ticket", ".ticket.Ticket", false)],
            ..Default::default()
        }],
        ..Default::default()
    };

    DescriptorPool::from_file_descriptor_set(FileDescriptorSet {
        file: vec![item, ticket],
    })
    .expect("fixture descriptors are valid")
}

pub fn item_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig::new("GET", "/v1/items/{id}", "item.ItemService/GetItem"),
        RouteConfig::new("GET", "/v1/items", "item.ItemService/ListItems").with_body(""),
        RouteConfig::new("POST", "/v1/items", "item.ItemService/CreateItem").with_required(&["name"]),
        RouteConfig::new("PUT", "/v1/items/{id}", "item.ItemService/UpdateItem").with_body("item"),
        RouteConfig::new("DELETE", "/v1/items/{id}", "item.ItemService/DeleteItem"),
        RouteConfig::new("POST", "/v1/echo", "item.ItemService/Echo"),
    ]
}

/// Copies same-named request fields into the response and remembers the last call.
#[derive(Debug, Default)]
pub struct EchoBackend {
    calls: AtomicUsize,
    last: Mutex<Option<RpcCall>>,
}

impl EchoBackend {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_call(&self) -> Option<RpcCall> {
        self.last.lock().unwrap().take()
    }
}

impl RpcBackend for EchoBackend {
    fn unary(&self, call: RpcCall) -> BoxFuture<'_, Result<DynamicMessage, InvokeError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut response = DynamicMessage::new(call.method.output());
        for (field, value) in call.request.fields() {
            if let Some(target) = response.descriptor().get_field_by_name(field.name()) {
                if target.kind() == field.kind() && target.cardinality() == field.cardinality() {
                    response.set_field(&target, value.clone());
                }
            }
        }
        *self.last.lock().unwrap() = Some(call);

        Box::pin(async move { Ok(response) })
    }
}
