//! Built-in demo applications.

use serde_json::{Map, Value};

use crate::http::app::{application_fn, Application};
use crate::http::context::{ContextValue, RequestContext};
use crate::http::response::ResponseBody;

pub const HELLO_WORLD_BODY: &str = "Hello, World! This is a simple WSGI application.";

/// Plain-text greeting for every request.
pub fn hello_world() -> impl Application {
    application_fn(|_ctx, start| {
        start.start("200 OK", [("Content-Type", "text/plain")]);
        Ok(ResponseBody::once(HELLO_WORLD_BODY))
    })
}

/// Echo the request context back as JSON.
pub fn environ_dump() -> impl Application {
    application_fn(|ctx, start| {
        let body = serde_json::to_vec_pretty(&context_json(ctx))?;
        start.start("200 OK", [("Content-Type", "application/json")]);
        Ok(ResponseBody::once(body))
    })
}

/// JSON view of every context entry.
pub fn context_json(ctx: &RequestContext) -> Value {
    let mut map = Map::new();
    for (key, value) in ctx.iter() {
        let value = match value {
            ContextValue::Str(s) => Value::from(s),
            ContextValue::Bool(b) => Value::from(b),
            ContextValue::Version(major, minor) => Value::from(vec![major, minor]),
            ContextValue::Input(raw) => Value::from(String::from_utf8_lossy(raw).into_owned()),
            ContextValue::Errors => Value::from("<stderr>"),
        };
        map.insert(key.to_string(), value);
    }
    Value::Object(map)
}
