//! Debug server queries answered by a terrain world

use strata_debug::{ChunkMeshInfo, DebugCommand, DebugHandler, DebugResponse, ResponseData};

use crate::mesh::chunk::VoxelChunk;
use crate::terrain::world::TerrainWorld;
use crate::voxel::cell::{ChunkCoord, DensityCell};

fn mesh_info(chunk: &VoxelChunk) -> ChunkMeshInfo {
    ChunkMeshInfo {
        empty: chunk.is_empty,
        solid_slab: chunk.is_solid_slab,
        triangles: chunk.mesh.triangle_count() as u32,
        vertices: chunk.mesh.vertices.len() as u32,
        revision: chunk.revision,
        has_collision: chunk.collision.is_some(),
    }
}

impl DebugHandler for TerrainWorld {
    fn handle_command(&self, cmd: DebugCommand) -> DebugResponse {
        match cmd {
            DebugCommand::Ping => DebugResponse::pong(),

            DebugCommand::GetWorldInfo => {
                let dims = self.dims();
                let config = self.config();
                DebugResponse::ok(ResponseData::WorldInfo {
                    width: dims.width,
                    depth: dims.depth,
                    layers: dims.layers,
                    chunk_dim: dims.chunk_dim,
                    cell_size: config.cell_size,
                    cell_height: config.cell_height,
                    chunk_count: self.chunk_count() as u32,
                    frame: self.frame(),
                    liquid_mass: self.total_liquid_mass(),
                    simulation_enabled: self.is_simulation_enabled(),
                })
            }

            DebugCommand::GetDensity { x, z, layer } => {
                let cell = DensityCell::new(x, z, layer);
                match (self.solid_density_at(cell), self.liquid_density_at(cell)) {
                    (Some(solid), Some(liquid)) => DebugResponse::ok(ResponseData::Density {
                        x,
                        z,
                        layer,
                        solid,
                        liquid,
                    }),
                    _ => DebugResponse::error(format!("Cell ({}, {}, layer {}) is outside the grid", x, z, layer)),
                }
            }

            DebugCommand::GetChunkInfo { x, layer, z } => {
                let coord = ChunkCoord::new(x, layer, z);
                match (self.solid_mesher().chunk(coord), self.liquid_mesher().chunk(coord)) {
                    (Some(solid), Some(liquid)) => DebugResponse::ok(ResponseData::ChunkInfo {
                        x,
                        layer,
                        z,
                        solid: mesh_info(solid),
                        liquid: mesh_info(liquid),
                    }),
                    _ => DebugResponse::error(format!("Chunk ({}, {}, {}) does not exist", x, layer, z)),
                }
            }

            DebugCommand::GetBacklog => DebugResponse::ok(ResponseData::Backlog {
                solid_pending: self.solid_mesher().pending_count() as u32,
                liquid_pending: self.liquid_mesher().pending_count() as u32,
                pending_edits: self.pending_edit_count() as u32,
                liquid_active: self.liquid_solver().has_active_cells(),
                liquid_steps: self.liquid_solver().total_steps(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::TerrainConfig;
    use crate::core::types::Vec3;

    fn world() -> TerrainWorld {
        TerrainWorld::new(TerrainConfig {
            width: 16,
            depth: 16,
            layers: 3,
            chunk_dim: 8,
            ..Default::default()
        })
        .expect("valid config")
    }

    #[test]
    fn test_density_query() {
        let mut world = world();
        world.add_solid_density(Vec3::new(2.5, 0.5, 3.5), 1.0);
        world.tick(0.0);

        let response = world.handle_command(DebugCommand::GetDensity { x: 2, z: 3, layer: 0 });
        match response {
            DebugResponse::Ok { data: ResponseData::Density { solid, liquid, .. } } => {
                assert_eq!(solid, 1.0);
                assert_eq!(liquid, 0.0);
            }
            other => panic!("unexpected response {:?}", other),
        }

        let response = world.handle_command(DebugCommand::GetDensity { x: 16, z: 0, layer: 0 });
        assert!(!response.is_ok());
    }

    #[test]
    fn test_chunk_query() {
        let mut world = world();
        world.add_solid_density(Vec3::new(2.5, 0.5, 3.5), 1.0);
        world.tick(0.0);

        let response = world.handle_command(DebugCommand::GetChunkInfo { x: 0, layer: 0, z: 0 });
        match response {
            DebugResponse::Ok { data: ResponseData::ChunkInfo { solid, liquid, .. } } => {
                assert!(!solid.empty);
                assert!(solid.triangles > 0);
                assert_eq!(solid.revision, 1);
                assert!(liquid.empty);
            }
            other => panic!("unexpected response {:?}", other),
        }

        let response = world.handle_command(DebugCommand::GetChunkInfo { x: 2, layer: 0, z: 0 });
        assert!(!response.is_ok());
    }

    #[test]
    fn test_queries_do_not_mutate() {
        let mut world = world();
        world.add_liquid_density(Vec3::new(4.5, 1.5, 4.5), 1.0);
        let before = world.pending_edit_count();

        for cmd in [DebugCommand::Ping, DebugCommand::GetWorldInfo, DebugCommand::GetBacklog] {
            assert!(world.handle_command(cmd).is_ok());
        }
        assert_eq!(world.pending_edit_count(), before);
        assert_eq!(world.total_liquid_mass(), 0.0);
    }
}
