//! Mesh and texture data supplied by asset loaders
//!
//! The core never parses asset files. Loaders hand over plain attribute arrays
//! ([`MeshData`]) and RGBA8 pixels ([`TextureData`]); the backend turns them
//! into opaque handles. A couple of primitives are built in for tests, debug
//! geometry and highlight overlays.

use super::BackendError;

/// Indexed triangle mesh in separate attribute arrays
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    /// Vertex positions
    pub positions: Vec<[f32; 3]>,
    /// Vertex normals (empty or one per position)
    pub normals: Vec<[f32; 3]>,
    /// Texture coordinates (empty or one per position)
    pub uvs: Vec<[f32; 2]>,
    /// Triangle list indices
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of indices
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Check attribute array lengths and index bounds
    pub fn validate(&self) -> Result<(), BackendError> {
        let count = self.positions.len();
        if count == 0 {
            return Err(BackendError::ResourceCreation("mesh has no vertices".to_string()));
        }
        if !self.normals.is_empty() && self.normals.len() != count {
            return Err(BackendError::ResourceCreation(format!(
                "mesh has {} normals for {} positions",
                self.normals.len(),
                count
            )));
        }
        if !self.uvs.is_empty() && self.uvs.len() != count {
            return Err(BackendError::ResourceCreation(format!(
                "mesh has {} uvs for {} positions",
                self.uvs.len(),
                count
            )));
        }
        if self.indices.len() % 3 != 0 {
            return Err(BackendError::ResourceCreation(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        if let Some(bad) = self.indices.iter().find(|&&i| i as usize >= count) {
            return Err(BackendError::ResourceCreation(format!(
                "index {bad} out of range for {count} vertices"
            )));
        }
        Ok(())
    }

    /// Unit quad in the XY plane facing +Z
    pub fn quad() -> Self {
        Self {
            positions: vec![
                [-0.5, -0.5, 0.0],
                [0.5, -0.5, 0.0],
                [0.5, 0.5, 0.0],
                [-0.5, 0.5, 0.0],
            ],
            normals: vec![[0.0, 0.0, 1.0]; 4],
            uvs: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            indices: vec![0, 1, 2, 2, 3, 0],
        }
    }

    /// Cube spanning -1..1 on every axis with per-face normals
    pub fn cube() -> Self {
        // (normal, tangent u, tangent v) per face
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ];
        let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

        let mut mesh = Self::default();
        for (normal, u, v) in faces {
            let base = mesh.positions.len() as u32;
            for (cu, cv) in corners {
                mesh.positions.push([
                    normal[0] + u[0] * cu + v[0] * cv,
                    normal[1] + u[1] * cu + v[1] * cv,
                    normal[2] + u[2] * cu + v[2] * cv,
                ]);
                mesh.normals.push(normal);
                mesh.uvs.push([(cu + 1.0) * 0.5, (cv + 1.0) * 0.5]);
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }
        mesh
    }
}

/// RGBA8 texture pixels
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Tightly packed RGBA8 rows
    pub rgba: Vec<u8>,
}

impl TextureData {
    /// 1x1 texture of a single color
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            rgba: rgba.to_vec(),
        }
    }

    /// Texture of the given size filled with one color
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            width,
            height,
            rgba: rgba.repeat(width as usize * height as usize),
        }
    }

    /// Check that the pixel buffer matches the dimensions
    pub fn validate(&self) -> Result<(), BackendError> {
        let expected = self.width as usize * self.height as usize * 4;
        if self.width == 0 || self.height == 0 {
            return Err(BackendError::ResourceCreation("texture has zero size".to_string()));
        }
        if self.rgba.len() != expected {
            return Err(BackendError::ResourceCreation(format!(
                "texture {}x{} needs {} bytes, got {}",
                self.width,
                self.height,
                expected,
                self.rgba.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitives_are_valid() {
        let quad = MeshData::quad();
        assert!(quad.validate().is_ok());
        assert_eq!(quad.index_count(), 6);

        let cube = MeshData::cube();
        assert!(cube.validate().is_ok());
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.index_count(), 36);
    }

    #[test]
    fn test_cube_vertices_lie_on_unit_box() {
        let cube = MeshData::cube();
        for position in &cube.positions {
            assert!(position.iter().all(|c| c.abs() <= 1.0 + f32::EPSILON));
            assert!(position.iter().any(|c| (c.abs() - 1.0).abs() < f32::EPSILON));
        }
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let mut mesh = MeshData::quad();
        mesh.indices[5] = 9;
        assert!(matches!(mesh.validate(), Err(BackendError::ResourceCreation(_))));
    }

    #[test]
    fn test_texture_size_mismatch_is_rejected() {
        let texture = TextureData {
            width: 2,
            height: 2,
            rgba: vec![255; 8],
        };
        assert!(texture.validate().is_err());
        assert!(TextureData::solid([255, 0, 0, 255]).validate().is_ok());
    }
}
