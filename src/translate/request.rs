//! JSON/query/path → RPC request message.
//!
//! # Data Flow
//! ```text
//! body bytes ──► JSON object (or value under the body field)
//! query pairs ─► coerced by field kind, override body
//! path params ─► coerced by field kind, override query
//!            └─► required-field check ─► DynamicMessage
//! ```
//!
//! # Design Decisions
//! - Unknown body fields and unknown query keys are dropped, never rejected
//! - The JSON decoder owns type checking; coercion only turns strings that
//!   clearly are numbers or booleans into JSON numbers or booleans

use prost_reflect::{DeserializeOptions, DynamicMessage, FieldDescriptor, Kind, MessageDescriptor};
use serde_json::{Map, Number, Value};

use crate::routing::{BodyMapping, MethodDescriptor, PathParams};
use crate::translate::error::GatewayError;

/// Build the backend request for a resolved route.
pub fn build_request(
    descriptor: &MethodDescriptor,
    params: &PathParams,
    query: Option<&str>,
    body: &[u8],
) -> Result<DynamicMessage, GatewayError> {
    let schema = descriptor.request_schema();
    let mut fields = body_fields(descriptor.body(), body)?;

    if let Some(query) = query {
        merge_query(&schema, &mut fields, query);
    }

    for (name, raw) in params {
        if let Some(field) = schema.get_field_by_name(name) {
            let value = coerce(&field, raw);
            set_field(&mut fields, &field, value);
        }
    }

    let missing: Vec<String> = descriptor
        .required_fields()
        .iter()
        .filter(|name| !is_supplied(&schema, &fields, name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(GatewayError::MissingFields(missing));
    }

    decode(schema, fields)
}

fn body_fields(mapping: &BodyMapping, body: &[u8]) -> Result<Map<String, Value>, GatewayError> {
    let is_empty = body.iter().all(u8::is_ascii_whitespace);

    match mapping {
        BodyMapping::Ignore => Ok(Map::new()),
        BodyMapping::Whole if is_empty => Ok(Map::new()),
        BodyMapping::Whole => match parse_json(body)? {
            Value::Object(map) => Ok(map),
            _ => Err(GatewayError::InvalidBody(
                "request body must be a JSON object".to_string(),
            )),
        },
        BodyMapping::Field(_) if is_empty => Ok(Map::new()),
        BodyMapping::Field(field) => {
            let mut map = Map::new();
            map.insert(field.name().to_string(), parse_json(body)?);
            Ok(map)
        }
    }
}

fn parse_json(body: &[u8]) -> Result<Value, GatewayError> {
    serde_json::from_slice(body).map_err(|e| GatewayError::InvalidBody(e.to_string()))
}

fn merge_query(schema: &MessageDescriptor, fields: &mut Map<String, Value>, query: &str) {
    let mut grouped: Vec<(FieldDescriptor, Vec<String>)> = Vec::new();

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let Some(field) = schema
            .get_field_by_name(&key)
            .or_else(|| schema.get_field_by_json_name(&key))
        else {
            continue;
        };
        if field.is_map() {
            continue;
        }
        match grouped.iter_mut().find(|(f, _)| *f == field) {
            Some((_, values)) => values.push(value.into_owned()),
            None => grouped.push((field, vec![value.into_owned()])),
        }
    }

    for (field, values) in grouped {
        let value = if field.is_list() {
            Value::Array(values.iter().map(|v| coerce(&field, v)).collect())
        } else {
            match values.last() {
                Some(last) => coerce(&field, last),
                None => continue,
            }
        };
        set_field(fields, &field, value);
    }
}

/// Insert under the proto name, dropping any camelCase alias from the body.
fn set_field(fields: &mut Map<String, Value>, field: &FieldDescriptor, value: Value) {
    if field.json_name() != field.name() {
        fields.remove(field.json_name());
    }
    fields.insert(field.name().to_string(), value);
}

fn is_supplied(schema: &MessageDescriptor, fields: &Map<String, Value>, name: &str) -> bool {
    let present = |key: &str| fields.get(key).is_some_and(|v| !v.is_null());
    if present(name) {
        return true;
    }
    schema
        .get_field_by_name(name)
        .is_some_and(|field| present(field.json_name()))
}

/// Turn a textual parameter into the JSON value the decoder expects.
fn coerce(field: &FieldDescriptor, raw: &str) -> Value {
    let parsed = match field.kind() {
        Kind::Bool => raw.parse::<bool>().ok().map(Value::Bool),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => raw.parse::<i32>().ok().map(Value::from),
        Kind::Uint32 | Kind::Fixed32 => raw.parse::<u32>().ok().map(Value::from),
        Kind::Float | Kind::Double => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        // 64-bit integers are strings in canonical JSON; enums, strings,
        // bytes and well-known types are all accepted as strings
        _ => None,
    };
    parsed.unwrap_or_else(|| Value::String(raw.to_string()))
}

fn decode(schema: MessageDescriptor, fields: Map<String, Value>) -> Result<DynamicMessage, GatewayError> {
    let options = DeserializeOptions::new().deny_unknown_fields(false);
    DynamicMessage::deserialize_with_options(schema, Value::Object(fields), &options)
        .map_err(|e| GatewayError::InvalidBody(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;
    use crate::test_support::item_pool;
    use prost_reflect::Value as ProtoValue;

    fn bind(route: RouteConfig) -> MethodDescriptor {
        MethodDescriptor::bind(&item_pool(), &route).unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> PathParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn get(message: &DynamicMessage, name: &str) -> ProtoValue {
        message.get_field_by_name(name).unwrap().into_owned()
    }

    #[test]
    fn test_path_param_coerced() {
        let route = bind(RouteConfig::new("GET", "/v1/items/{id}", "item.ItemService/GetItem"));
        let message = build_request(&route, &params(&[("id", "42")]), None, b"").unwrap();
        assert_eq!(get(&message, "id"), ProtoValue::I32(42));
    }

    #[test]
    fn test_unknown_body_fields_discarded() {
        let route = bind(RouteConfig::new("POST", "/v1/echo", "item.ItemService/Echo"));
        let body = br#"{"name": "widget", "colour": "blue"}"#;
        let message = build_request(&route, &params(&[]), None, body).unwrap();
        assert_eq!(get(&message, "name"), ProtoValue::String("widget".into()));
    }

    #[test]
    fn test_empty_body_is_empty_object() {
        let route = bind(RouteConfig::new("POST", "/v1/echo", "item.ItemService/Echo"));
        let message = build_request(&route, &params(&[]), None, b"  \n").unwrap();
        assert_eq!(get(&message, "id"), ProtoValue::I32(0));
    }

    #[test]
    fn test_non_object_body_rejected() {
        let route = bind(RouteConfig::new("POST", "/v1/echo", "item.ItemService/Echo"));
        let err = build_request(&route, &params(&[]), None, b"[1, 2]").unwrap_err();
        assert!(matches!(err, GatewayError::InvalidBody(_)));

        let err = build_request(&route, &params(&[]), None, b"{not json").unwrap_err();
        assert!(matches!(err, GatewayError::InvalidBody(_)));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let route = bind(RouteConfig::new("GET", "/v1/items/{id}", "item.ItemService/GetItem"));
        let err = build_request(&route, &params(&[("id", "abc")]), None, b"").unwrap_err();
        assert!(matches!(err, GatewayError::InvalidBody(_)));
    }

    #[test]
    fn test_missing_required_fields() {
        let route = bind(
            RouteConfig::new("POST", "/v1/items", "item.ItemService/CreateItem").with_required(&["name"]),
        );
        let err = build_request(&route, &params(&[]), None, br#"{"value": 1.5}"#).unwrap_err();
        match err {
            GatewayError::MissingFields(fields) => assert_eq!(fields, vec!["name".to_string()]),
            other => panic!("unexpected error: {other}"),
        }

        // Supplied through the query string instead
        let message = build_request(&route, &params(&[]), Some("name=widget"), b"").unwrap();
        assert_eq!(get(&message, "name"), ProtoValue::String("widget".into()));
    }

    #[test]
    fn test_proto2_required_field() {
        let route = bind(RouteConfig::new("POST", "/v1/tickets", "ticket.TicketService/Redeem"));
        let err = build_request(&route, &params(&[]), None, br#"{"note": "x"}"#).unwrap_err();
        assert!(matches!(err, GatewayError::MissingFields(_)));

        assert!(build_request(&route, &params(&[]), None, br#"{"code": "A1"}"#).is_ok());
    }

    #[test]
    fn test_query_parameters() {
        let route = bind(RouteConfig::new("GET", "/v1/items", "item.ItemService/ListItems").with_body(""));
        let query = "page_size=10&filter=blue%20things&tags=a&tags=b&includeArchived=true&unknown=1";
        let message = build_request(&route, &params(&[]), Some(query), b"{\"ignored\": true}").unwrap();

        assert_eq!(get(&message, "page_size"), ProtoValue::I32(10));
        assert_eq!(get(&message, "filter"), ProtoValue::String("blue things".into()));
        assert_eq!(
            get(&message, "tags"),
            ProtoValue::List(vec![
                ProtoValue::String("a".into()),
                ProtoValue::String("b".into())
            ])
        );
        assert_eq!(get(&message, "include_archived"), ProtoValue::Bool(true));
    }

    #[test]
    fn test_precedence_path_over_query_over_body() {
        let route = bind(RouteConfig::new("POST", "/v1/items/{id}", "item.ItemService/Echo"));
        let body = br#"{"id": 1, "name": "from-body", "value": 2.5}"#;
        let message = build_request(&route, &params(&[("id", "3")]), Some("id=2&name=from-query"), body).unwrap();

        assert_eq!(get(&message, "id"), ProtoValue::I32(3));
        assert_eq!(get(&message, "name"), ProtoValue::String("from-query".into()));
        assert_eq!(get(&message, "value"), ProtoValue::F64(2.5));
    }

    #[test]
    fn test_body_bound_to_field() {
        let route = bind(RouteConfig::new("PUT", "/v1/items/{id}", "item.ItemService/UpdateItem").with_body("item"));
        let body = br#"{"name": "renamed", "tags": ["x"]}"#;
        let message = build_request(&route, &params(&[("id", "7")]), None, body).unwrap();

        assert_eq!(get(&message, "id"), ProtoValue::I32(7));
        let item = get(&message, "item");
        let item = item.as_message().unwrap();
        assert_eq!(
            item.get_field_by_name("name").unwrap().into_owned(),
            ProtoValue::String("renamed".into())
        );
    }
}
