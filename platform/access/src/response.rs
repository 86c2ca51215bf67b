//! Response shaping: how much detail a payload may expose per level.

use serde_json::{Map, Value, json};

use crate::level::AccessLevel;
use crate::principal::Principal;

/// What kind of payload is being shaped.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ResourceKind {
    Imei,
    Device,
}

/// Strip a response payload down to what the caller may see.
///
/// Anonymous callers get the public fields only. Admins get the payload
/// untouched. In between, `Limited` and `Elevated` principals get device
/// detail on IMEI lookups, and `Limited` principals get a trimmed device
/// view. Operates on `serde_json::Value` so handlers can shape whatever
/// they assembled without a type per detail tier.
pub fn redact(principal: Option<&Principal>, kind: ResourceKind, data: &Value) -> Value {
    let Some(principal) = principal else {
        return match kind {
            ResourceKind::Imei => pick(data, &["imei", "found", "status", "message"]),
            ResourceKind::Device => pick(data, &["brand", "model"]),
        };
    };

    if principal.is_admin() {
        return data.clone();
    }

    match kind {
        ResourceKind::Imei => {
            let mut base = pick(data, &["imei", "found", "status", "message"]);
            if matches!(principal.level, AccessLevel::Limited | AccessLevel::Elevated) {
                if let Some(object) = base.as_object_mut() {
                    object.insert(
                        "device".into(),
                        data.get("device").cloned().unwrap_or_else(|| json!({})),
                    );
                    if let Some(logged) = data.get("search_logged") {
                        object.insert("search_logged".into(), logged.clone());
                    }
                }
            }
            base
        }
        ResourceKind::Device => {
            if principal.level == AccessLevel::Limited {
                pick(data, &["id", "brand", "model", "imeis"])
            } else {
                data.clone()
            }
        }
    }
}

fn pick(data: &Value, fields: &[&str]) -> Value {
    let mut object = Map::new();
    for field in fields {
        if let Some(value) = data.get(*field) {
            object.insert((*field).to_string(), value.clone());
        }
    }
    Value::Object(object)
}
