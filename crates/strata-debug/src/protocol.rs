//! Debug protocol - JSON command/response definitions

use serde::{Deserialize, Serialize};

/// Queries sent by a debug client, one JSON object per line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "params")]
pub enum DebugCommand {
    /// Grid extents, chunk count and liquid totals
    GetWorldInfo,
    /// Solid and liquid density of one cell
    GetDensity { x: i32, z: i32, layer: i32 },
    /// Mesh state of one chunk in both fields
    GetChunkInfo { x: i32, layer: i32, z: i32 },
    /// Remesh and edit queues
    GetBacklog,
    /// Ping (health check)
    Ping,
}

/// Responses from debug server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum DebugResponse {
    #[serde(rename = "ok")]
    Ok { data: ResponseData },
    #[serde(rename = "error")]
    Error { message: String },
}

/// Response data variants
///
/// Untagged: variants with more fields come first so a client decoding a
/// response does not stop at a variant whose fields are a subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    None,
    WorldInfo {
        width: u32,
        depth: u32,
        layers: u32,
        chunk_dim: u32,
        cell_size: f32,
        cell_height: f32,
        chunk_count: u32,
        frame: u64,
        liquid_mass: f64,
        simulation_enabled: bool,
    },
    ChunkInfo {
        x: i32,
        layer: i32,
        z: i32,
        solid: ChunkMeshInfo,
        liquid: ChunkMeshInfo,
    },
    Backlog {
        solid_pending: u32,
        liquid_pending: u32,
        pending_edits: u32,
        liquid_active: bool,
        liquid_steps: u64,
    },
    Density {
        x: i32,
        z: i32,
        layer: i32,
        solid: f32,
        liquid: f32,
    },
    Pong { message: String },
}

/// Mesh state of one chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMeshInfo {
    pub empty: bool,
    pub solid_slab: bool,
    pub triangles: u32,
    pub vertices: u32,
    pub revision: u32,
    pub has_collision: bool,
}

impl DebugResponse {
    pub fn ok(data: ResponseData) -> Self {
        Self::Ok { data }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error {
            message: msg.into(),
        }
    }

    pub fn pong() -> Self {
        Self::ok(ResponseData::Pong {
            message: "pong".into(),
        })
    }

    pub fn none() -> Self {
        Self::ok(ResponseData::None)
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cmd: DebugCommand = serde_json::from_str(r#"{"cmd":"Ping"}"#).expect("ping");
        assert_eq!(cmd, DebugCommand::Ping);

        let cmd: DebugCommand =
            serde_json::from_str(r#"{"cmd":"GetDensity","params":{"x":3,"z":4,"layer":1}}"#)
                .expect("density");
        assert_eq!(cmd, DebugCommand::GetDensity { x: 3, z: 4, layer: 1 });

        let cmd: DebugCommand =
            serde_json::from_str(r#"{"cmd":"GetChunkInfo","params":{"x":0,"layer":2,"z":1}}"#)
                .expect("chunk");
        assert_eq!(cmd, DebugCommand::GetChunkInfo { x: 0, layer: 2, z: 1 });
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(serde_json::from_str::<DebugCommand>(r#"{"cmd":"SetDensity"}"#).is_err());
    }

    #[test]
    fn test_response_shape() {
        let json = serde_json::to_value(DebugResponse::pong()).expect("serialize");
        assert_eq!(json["status"], "ok");
        assert_eq!(json["data"]["message"], "pong");

        let json = serde_json::to_value(DebugResponse::error("cell out of range")).expect("serialize");
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "cell out of range");
    }

    #[test]
    fn test_density_response_fields() {
        let response = DebugResponse::ok(ResponseData::Density {
            x: 1,
            z: 2,
            layer: 0,
            solid: 1.0,
            liquid: 0.25,
        });
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["data"]["solid"], 1.0);
        assert_eq!(json["data"]["liquid"], 0.25);
        assert!(response.is_ok());
    }
}
