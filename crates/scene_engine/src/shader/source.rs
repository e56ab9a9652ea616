//! Shader source text: built-in GLSL or files on disk

use std::path::Path;

use super::{ShaderError, ShaderProgram};
use crate::gpu::{GpuContext, StageKind};

/// Techniques whose GLSL ships with the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinShader {
    /// Textured, unlit-by-scene PBR albedo shader
    Pbr,
    /// Phong shading with point, spot and directional lights
    Phong,
    /// Flat-colored inflated shell for selection outlines
    Highlight,
    /// Compute pass compositing the overlay image onto the scene image
    OverlayBlend,
}

impl BuiltinShader {
    /// File stem used for the shipped sources and for overrides on disk
    pub fn file_stem(self) -> &'static str {
        match self {
            Self::Pbr => "pbr",
            Self::Phong => "phong",
            Self::Highlight => "highlight",
            Self::OverlayBlend => "overlay_blend",
        }
    }

    /// Stages the program links, in link order
    pub fn stage_kinds(self) -> &'static [StageKind] {
        match self {
            Self::OverlayBlend => &[StageKind::Compute],
            _ => &[StageKind::Vertex, StageKind::Fragment],
        }
    }

    fn sources(self) -> Vec<(StageKind, &'static str)> {
        match self {
            Self::Pbr => vec![
                (StageKind::Vertex, include_str!("../../shaders/pbr.vert")),
                (StageKind::Fragment, include_str!("../../shaders/pbr.frag")),
            ],
            Self::Phong => vec![
                (StageKind::Vertex, include_str!("../../shaders/phong.vert")),
                (StageKind::Fragment, include_str!("../../shaders/phong.frag")),
            ],
            Self::Highlight => vec![
                (StageKind::Vertex, include_str!("../../shaders/highlight.vert")),
                (StageKind::Fragment, include_str!("../../shaders/highlight.frag")),
            ],
            Self::OverlayBlend => vec![(
                StageKind::Compute,
                include_str!("../../shaders/overlay_blend.comp"),
            )],
        }
    }
}

/// Stage sources for one program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    /// Program name used in logs and errors
    pub name: String,
    /// `(kind, source)` per stage, in link order
    pub stages: Vec<(StageKind, String)>,
}

impl ShaderSource {
    /// Sources compiled into the crate
    pub fn builtin(shader: BuiltinShader) -> Self {
        Self {
            name: shader.file_stem().to_string(),
            stages: shader
                .sources()
                .into_iter()
                .map(|(kind, source)| (kind, source.to_string()))
                .collect(),
        }
    }

    /// Load `<stem>.<ext>` from `dir` for each stage, e.g. `phong.vert`
    pub fn from_dir(dir: &Path, stem: &str, kinds: &[StageKind]) -> Result<Self, ShaderError> {
        let stages = kinds
            .iter()
            .map(|kind| {
                let path = dir.join(format!("{stem}.{}", kind.extension()));
                std::fs::read_to_string(&path)
                    .map(|source| (*kind, source))
                    .map_err(|source| ShaderError::Io { path, source })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self {
            name: stem.to_string(),
            stages,
        })
    }

    /// Use sources from `dir` when it has the first stage's file, else the
    /// built-in ones
    pub fn resolve(dir: Option<&Path>, shader: BuiltinShader) -> Result<Self, ShaderError> {
        let stem = shader.file_stem();
        let kinds = shader.stage_kinds();
        let first = kinds.first().map_or("vert", |kind| kind.extension());
        match dir {
            Some(dir) if dir.join(format!("{stem}.{first}")).is_file() => {
                log::info!("Loading '{}' shader sources from {}", stem, dir.display());
                Self::from_dir(dir, stem, kinds)
            }
            _ => Ok(Self::builtin(shader)),
        }
    }

    /// Compile and link the stages into a program
    pub fn build(&self, gpu: &mut GpuContext) -> Result<ShaderProgram, ShaderError> {
        let stages: Vec<(StageKind, &str)> = self
            .stages
            .iter()
            .map(|(kind, source)| (*kind, source.as_str()))
            .collect();
        ShaderProgram::from_sources(gpu, self.name.clone(), &stages)
    }
}
