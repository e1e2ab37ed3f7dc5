use crate::registry::{ShutterHandle, ShutterRegistry};
use actix_web::http::StatusCode;
use serde::Serialize;
use std::collections::HashMap;
use tracing::*;

pub const ERROR_INTERNAL: &str = "internal";
pub const ERROR_NOT_IMPLEMENTED: &str = "not_implemented";
pub const ERROR_INVALID_OBJECT: &str = "invalid_object";
pub const ERROR_INVALID_ARGUMENT: &str = "invalid_argument";

/// Fallback body when a response fails to serialize.
const INTERNAL_ERROR_BODY: &[u8] = br#"{"error":"internal"}"#;

/// Status code and JSON body of one routed request.
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

fn json_reply<T: Serialize>(data: &T, status: StatusCode) -> Reply {
    match serde_json::to_vec(data) {
        Ok(body) => Reply { status, body },
        Err(err) => {
            error!("Failed to serialize response: {}", err);
            Reply {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: INTERNAL_ERROR_BODY.to_vec(),
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

pub fn error_reply(code: &'static str, status: StatusCode) -> Reply {
    json_reply(&ErrorBody { error: code }, status)
}

fn unknown_object(segment: &str) -> Reply {
    debug!("Unknown object {:?}", segment);
    error_reply(ERROR_INVALID_OBJECT, StatusCode::NOT_FOUND)
}

#[derive(Serialize)]
struct ArgumentDescriptor {
    name: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    range_from: f32,
    range_to: f32,
}

#[derive(Serialize)]
struct InvalidArgumentBody {
    error: &'static str,
    args: [ArgumentDescriptor; 1],
}

fn invalid_argument(name: &'static str, range_from: f32, range_to: f32) -> Reply {
    json_reply(
        &InvalidArgumentBody {
            error: ERROR_INVALID_ARGUMENT,
            args: [ArgumentDescriptor {
                name,
                kind: "float",
                range_from,
                range_to,
            }],
        },
        StatusCode::BAD_REQUEST,
    )
}

#[derive(Serialize)]
struct ChildrenBody {
    children: Vec<String>,
}

#[derive(Serialize)]
struct ShutterBody {
    name: String,
    children: Vec<String>,
    position: f32,
    angle: f32,
}

#[derive(Serialize)]
struct MoveBody {
    name: String,
    position: f32,
}

#[derive(Serialize)]
struct FlipBody {
    name: String,
    angle: f32,
}

/// One node of the static dispatch tree. Branch variants carry their child
/// table, leaf variants the handle of the shutter they act on.
enum Endpoint {
    Root {
        children: HashMap<String, Endpoint>,
    },
    Shutter {
        handle: ShutterHandle,
        children: HashMap<String, Endpoint>,
    },
    Move {
        handle: ShutterHandle,
    },
    Flip {
        handle: ShutterHandle,
    },
}

/// Resolves slash delimited request paths against a static tree built once
/// from the registry. An empty (or missing) segment makes the current node
/// describe itself or, on an action leaf, run the action; a non-empty
/// segment either descends into a child or is an unknown object.
pub struct Router {
    root: Endpoint,
}

impl Router {
    pub fn new(registry: &ShutterRegistry) -> Self {
        let mut children = HashMap::new();
        for (name, handle) in registry.iter() {
            let mut actions = HashMap::new();
            actions.insert(
                String::from("move"),
                Endpoint::Move {
                    handle: handle.clone(),
                },
            );
            actions.insert(
                String::from("flip"),
                Endpoint::Flip {
                    handle: handle.clone(),
                },
            );
            children.insert(
                name.clone(),
                Endpoint::Shutter {
                    handle: handle.clone(),
                    children: actions,
                },
            );
        }
        Self {
            root: Endpoint::Root { children },
        }
    }

    pub async fn dispatch(&self, path: &str, query: &HashMap<String, String>) -> Reply {
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let mut node = &self.root;
        let mut index = 0;
        loop {
            let segment = segments.get(index).copied().unwrap_or("");
            match node {
                Endpoint::Root { children } => {
                    if segment.is_empty() {
                        return json_reply(
                            &ChildrenBody {
                                children: children.keys().cloned().collect(),
                            },
                            StatusCode::OK,
                        );
                    }
                    match children.get(segment) {
                        Some(child) => node = child,
                        None => return unknown_object(segment),
                    }
                }
                Endpoint::Shutter { handle, children } => {
                    if segment.is_empty() {
                        return describe_shutter(handle).await;
                    }
                    match children.get(segment) {
                        Some(child) => node = child,
                        None => return unknown_object(segment),
                    }
                }
                Endpoint::Move { handle } => {
                    if !segment.is_empty() {
                        return unknown_object(segment);
                    }
                    return handle_move(handle, query).await;
                }
                Endpoint::Flip { handle } => {
                    if !segment.is_empty() {
                        return unknown_object(segment);
                    }
                    return handle_flip(handle, query).await;
                }
            }
            index += 1;
        }
    }
}

async fn describe_shutter(handle: &ShutterHandle) -> Reply {
    match handle.status().await {
        Ok(status) => json_reply(
            &ShutterBody {
                name: status.name,
                // move and flip are dispatchable but not enumerated
                children: Vec::new(),
                position: status.position,
                angle: status.angle,
            },
            StatusCode::OK,
        ),
        Err(err) => {
            error!("Failed to query shutter status: {}", err);
            error_reply(ERROR_INTERNAL, StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn handle_move(handle: &ShutterHandle, query: &HashMap<String, String>) -> Reply {
    match query.get("position").map(|raw| raw.parse::<f32>()) {
        Some(Ok(position)) => match handle.move_to(position).await {
            Ok(status) => json_reply(
                &MoveBody {
                    name: status.name,
                    position: status.position,
                },
                StatusCode::OK,
            ),
            Err(err) => {
                error!("Failed to move shutter: {}", err);
                error_reply(ERROR_INTERNAL, StatusCode::INTERNAL_SERVER_ERROR)
            }
        },
        invalid => {
            debug!("Invalid position argument: {:?}", invalid);
            invalid_argument("position", 0.0, 100.0)
        }
    }
}

async fn handle_flip(handle: &ShutterHandle, query: &HashMap<String, String>) -> Reply {
    match query.get("angle").map(|raw| raw.parse::<f32>()) {
        Some(Ok(angle)) => match handle.flip(angle).await {
            Ok(status) => json_reply(
                &FlipBody {
                    name: status.name,
                    angle: status.angle,
                },
                StatusCode::OK,
            ),
            Err(err) => {
                error!("Failed to flip shutter: {}", err);
                error_reply(ERROR_INTERNAL, StatusCode::INTERNAL_SERVER_ERROR)
            }
        },
        invalid => {
            debug!("Invalid angle argument: {:?}", invalid);
            invalid_argument("angle", 0.0, 1.0)
        }
    }
}
