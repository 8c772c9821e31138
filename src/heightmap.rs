use std::path::Path;

use anyhow::{Context, Result};
use log::warn;

/// Number of grid cells along each terrain edge.
pub const TERRAIN_DIVISOR: usize = 200;
/// World-space extent of the terrain along x and y, centered at the origin.
pub const TERRAIN_EXTENT: f32 = 4.0;
/// Scale applied to the height samples.
pub const HEIGHT_SCALE: f32 = 1.5;
/// Base offset of the terrain. The light pool's ground threshold is tuned to
/// this value.
pub const TERRAIN_BASE: f32 = -0.75;
/// Texture-space offset used for the central-difference slope estimate.
const SLOPE_OFFSET: f32 = 0.005;

/// Grayscale height field sampled from an image's red channel.
#[derive(Debug, Clone)]
pub struct Heightmap {
    width: usize,
    height: usize,
    samples: Vec<f32>,
}

impl Heightmap {
    /// Decodes a height-map image from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .with_context(|| format!("unable to open height map {}", path.display()))?
            .into_luma8();
        let (width, height) = image.dimensions();
        let samples = image
            .pixels()
            .map(|pixel| pixel.0[0] as f32 / 255.0)
            .collect();
        Ok(Self {
            width: width as usize,
            height: height as usize,
            samples,
        })
    }

    /// Loads a height map, degrading to flat terrain when the file is
    /// missing or unreadable.
    pub fn load_or_flat<P: AsRef<Path>>(path: Option<P>) -> Self {
        match path {
            Some(path) => match Self::load(&path) {
                Ok(map) => map,
                Err(err) => {
                    warn!("{err:?}; using flat terrain");
                    Self::flat()
                }
            },
            None => Self::flat(),
        }
    }

    /// A constant-zero height field.
    pub fn flat() -> Self {
        Self {
            width: 2,
            height: 2,
            samples: vec![0.0; 4],
        }
    }

    /// Bilinear sample at texture coordinates clamped to [0, 1].
    pub fn sample(&self, u: f32, v: f32) -> f32 {
        let x = u.clamp(0.0, 1.0) * (self.width - 1) as f32;
        let y = v.clamp(0.0, 1.0) * (self.height - 1) as f32;
        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;
        let at = |x: usize, y: usize| self.samples[y * self.width + x];
        let top = at(x0, y0) * (1.0 - fx) + at(x1, y0) * fx;
        let bottom = at(x0, y1) * (1.0 - fx) + at(x1, y1) * fx;
        top * (1.0 - fy) + bottom * fy
    }
}

/// Terrain geometry in the renderer's interleaved position+normal format.
#[derive(Debug, Clone)]
pub struct TerrainMesh {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

/// Builds the terrain grid: a `divisor`x`divisor` cell lattice over the
/// terrain extent, displaced by the height field and shaded with
/// central-difference normals.
pub fn terrain_mesh(map: &Heightmap, divisor: usize) -> TerrainMesh {
    let line = divisor + 1;
    let mut vertices = Vec::with_capacity(line * line * 6);

    for y in 0..line {
        for x in 0..line {
            let u = x as f32 / divisor as f32;
            let v = y as f32 / divisor as f32;
            let height = map.sample(u, v);

            let slope_x =
                HEIGHT_SCALE * (map.sample(u + SLOPE_OFFSET, v) - map.sample(u - SLOPE_OFFSET, v))
                    * 100.0;
            let slope_y =
                HEIGHT_SCALE * (map.sample(u, v + SLOPE_OFFSET) - map.sample(u, v - SLOPE_OFFSET))
                    * 100.0;
            let normal = glam::Vec3::new(TERRAIN_EXTENT, 0.0, slope_x)
                .cross(glam::Vec3::new(0.0, TERRAIN_EXTENT, slope_y))
                .normalize();

            vertices.extend_from_slice(&[
                TERRAIN_EXTENT * (u - 0.5),
                TERRAIN_EXTENT * (v - 0.5),
                height * HEIGHT_SCALE + TERRAIN_BASE,
                normal.x,
                normal.y,
                normal.z,
            ]);
        }
    }

    let mut indices = Vec::with_capacity(divisor * divisor * 6);
    for y in 0..divisor {
        let offset = (y * line) as u32;
        let next = offset + line as u32;
        for x in 0..divisor as u32 {
            indices.extend_from_slice(&[offset + x, offset + x + 1, next + x + 1]);
            indices.extend_from_slice(&[offset + x, next + x + 1, next + x]);
        }
    }

    TerrainMesh { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_map_samples_zero_everywhere() {
        let map = Heightmap::flat();
        assert_eq!(map.sample(0.0, 0.0), 0.0);
        assert_eq!(map.sample(0.5, 0.5), 0.0);
        assert_eq!(map.sample(1.0, 1.0), 0.0);
    }

    #[test]
    fn sample_clamps_outside_the_unit_square() {
        let map = Heightmap::flat();
        assert_eq!(map.sample(-1.0, 2.0), 0.0);
    }

    #[test]
    fn mesh_dimensions_follow_the_divisor() {
        let mesh = terrain_mesh(&Heightmap::flat(), 4);
        assert_eq!(mesh.vertices.len(), 5 * 5 * 6);
        assert_eq!(mesh.indices.len(), 4 * 4 * 6);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < 25));
    }

    #[test]
    fn flat_terrain_sits_at_the_base_with_up_normals() {
        let mesh = terrain_mesh(&Heightmap::flat(), 2);
        for vertex in mesh.vertices.chunks(6) {
            assert_eq!(vertex[2], TERRAIN_BASE);
            assert!((vertex[5] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn grid_spans_the_extent() {
        let mesh = terrain_mesh(&Heightmap::flat(), 2);
        let xs: Vec<f32> = mesh.vertices.chunks(6).map(|v| v[0]).collect();
        assert!((xs.iter().cloned().fold(f32::MAX, f32::min) + 2.0).abs() < 1e-6);
        assert!((xs.iter().cloned().fold(f32::MIN, f32::max) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn missing_file_falls_back_to_flat() {
        let map = Heightmap::load_or_flat(Some("/nonexistent/heights.png"));
        assert_eq!(map.sample(0.5, 0.5), 0.0);
    }
}
