//! Command-recording backend
//!
//! `HeadlessBackend` implements the full [`GraphicsBackend`] contract without a
//! GPU. Every call is appended to a command log that tests and tools can
//! inspect. Shader stages are "compiled" by validating the source and
//! reflecting its uniform declarations, so a program only reports locations
//! for uniforms its GLSL actually declares.

use std::collections::{HashMap, HashSet};

use super::backend::{BackendResult, GraphicsBackend};
use super::reflect::UniformReflection;
use super::{
    BackendError, ClearTargets, GpuResource, ImageAccess, MeshData, MeshHandle, ProgramId,
    StageId, StageKind, TextureData, TextureHandle, UniformLocation, UniformValue,
};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    /// A stage compiled successfully
    CompileStage {
        /// New stage handle
        stage: StageId,
        /// Stage kind
        kind: StageKind,
    },
    /// A program linked successfully
    LinkProgram {
        /// New program handle
        program: ProgramId,
        /// Stages linked into it
        stages: Vec<StageId>,
    },
    /// Active program changed
    UseProgram(Option<ProgramId>),
    /// Uniform written to the active program
    SetUniform {
        /// Program owning the location
        program: ProgramId,
        /// Fully qualified uniform name
        name: String,
        /// Written value
        value: UniformValue,
    },
    /// Texture unit binding changed
    BindTexture {
        /// Texture unit
        unit: u32,
        /// Bound texture, `None` when cleared
        texture: Option<TextureHandle>,
    },
    /// Image unit binding changed
    BindImage {
        /// Image unit
        unit: u32,
        /// Bound texture, `None` when cleared
        image: Option<TextureHandle>,
        /// Access granted to the compute program
        access: ImageAccess,
    },
    /// Mesh uploaded
    CreateMesh(MeshHandle),
    /// Texture uploaded
    CreateTexture(TextureHandle),
    /// Mesh drawn with the active program
    Draw {
        /// Active program
        program: ProgramId,
        /// Drawn mesh
        mesh: MeshHandle,
    },
    /// Compute program dispatched
    Dispatch {
        /// Active compute program
        program: ProgramId,
        /// Work group counts
        groups: [u32; 3],
    },
    /// Framebuffer cleared
    Clear {
        /// Cleared targets
        targets: ClearTargets,
        /// Clear color
        color: [f32; 4],
    },
    /// Viewport set
    Viewport {
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
    /// Mesh or texture released
    Release(GpuResource),
    /// Program deleted
    DeleteProgram(ProgramId),
    /// Frame presented
    Present,
}

#[derive(Debug)]
struct Stage {
    kind: StageKind,
    source: String,
}

#[derive(Debug, Default)]
struct Program {
    locations: HashMap<String, UniformLocation>,
    compute: bool,
}

/// Backend that records commands instead of driving a GPU
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_handle: u64,
    next_location: i32,
    stages: HashMap<StageId, Stage>,
    programs: HashMap<ProgramId, Program>,
    location_names: HashMap<UniformLocation, (ProgramId, String)>,
    active_program: Option<ProgramId>,
    meshes: HashSet<MeshHandle>,
    textures: HashSet<TextureHandle>,
    failing_meshes: HashSet<MeshHandle>,
    commands: Vec<GpuCommand>,
    frames_presented: u64,
}

impl HeadlessBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command recorded so far
    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    /// Drain the command log
    pub fn take_commands(&mut self) -> Vec<GpuCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Forget recorded commands, keeping resources alive
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Values written to `name` in any program, oldest first
    pub fn uniform_writes(&self, name: &str) -> Vec<&UniformValue> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                GpuCommand::SetUniform { name: written, value, .. } if written == name => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Most recent value written to `name` in `program`
    pub fn last_uniform(&self, program: ProgramId, name: &str) -> Option<&UniformValue> {
        self.commands.iter().rev().find_map(|command| match command {
            GpuCommand::SetUniform { program: p, name: written, value }
                if *p == program && written == name =>
            {
                Some(value)
            }
            _ => None,
        })
    }

    /// Meshes drawn, in order
    pub fn draws(&self) -> Vec<MeshHandle> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                GpuCommand::Draw { mesh, .. } => Some(*mesh),
                _ => None,
            })
            .collect()
    }

    /// Compute dispatches, in order
    pub fn dispatches(&self) -> Vec<(ProgramId, [u32; 3])> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                GpuCommand::Dispatch { program, groups } => Some((*program, *groups)),
                _ => None,
            })
            .collect()
    }

    /// Sorted names of the active uniforms of a linked program
    pub fn uniform_names(&self, program: ProgramId) -> Option<Vec<String>> {
        self.programs.get(&program).map(|p| {
            let mut names: Vec<String> = p.locations.keys().cloned().collect();
            names.sort();
            names
        })
    }

    /// Whether a mesh or texture is still alive
    pub fn is_live(&self, resource: GpuResource) -> bool {
        match resource {
            GpuResource::Mesh(mesh) => self.meshes.contains(&mesh),
            GpuResource::Texture(texture) => self.textures.contains(&texture),
        }
    }

    /// Number of live programs
    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    /// Number of presented frames
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Make every subsequent draw of `mesh` fail
    pub fn fail_draws_for(&mut self, mesh: MeshHandle) {
        self.failing_meshes.insert(mesh);
    }

    fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

fn stage_error(source: &str) -> Option<String> {
    if source.trim().is_empty() {
        return Some("0:0: error: empty shader source".to_string());
    }
    source.lines().enumerate().find_map(|(line, text)| {
        text.trim()
            .strip_prefix("#error")
            .map(|message| format!("0:{}: error: {}", line + 1, message.trim()))
    })
}

impl GraphicsBackend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn compile_stage(&mut self, kind: StageKind, source: &str) -> BackendResult<StageId> {
        if let Some(log) = stage_error(source) {
            return Err(BackendError::CompileFailed(log));
        }
        let stage = StageId(self.next_handle() as u32);
        self.stages.insert(
            stage,
            Stage {
                kind,
                source: source.to_string(),
            },
        );
        self.commands.push(GpuCommand::CompileStage { stage, kind });
        Ok(stage)
    }

    fn link_program(&mut self, stages: &[StageId]) -> BackendResult<ProgramId> {
        let mut kinds = Vec::with_capacity(stages.len());
        let mut reflection = UniformReflection::default();
        for id in stages {
            let stage = self
                .stages
                .get(id)
                .ok_or_else(|| BackendError::LinkFailed(format!("unknown stage {id:?}")))?;
            if kinds.contains(&stage.kind) {
                return Err(BackendError::LinkFailed(format!(
                    "more than one {} stage",
                    stage.kind
                )));
            }
            kinds.push(stage.kind);
            reflection.add_source(&stage.source);
        }

        let has = |kind| kinds.contains(&kind);
        let valid = if has(StageKind::Compute) {
            kinds.len() == 1
        } else {
            has(StageKind::Vertex) && has(StageKind::Fragment)
        };
        if !valid {
            return Err(BackendError::LinkFailed(format!(
                "invalid stage combination {kinds:?}"
            )));
        }

        let program = ProgramId(self.next_handle() as u32);
        let mut names: Vec<String> = reflection.uniform_names().into_iter().collect();
        names.sort();
        let mut locations = HashMap::with_capacity(names.len());
        for name in names {
            let location = UniformLocation(self.next_location);
            self.next_location += 1;
            self.location_names.insert(location, (program, name.clone()));
            locations.insert(name, location);
        }
        log::trace!("Headless program {:?} exposes {} uniforms", program, locations.len());

        self.programs.insert(
            program,
            Program {
                locations,
                compute: has(StageKind::Compute),
            },
        );
        self.commands.push(GpuCommand::LinkProgram {
            program,
            stages: stages.to_vec(),
        });
        Ok(program)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.programs
            .get(&program)
            .and_then(|p| p.locations.get(name).copied())
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.active_program = program;
        self.commands.push(GpuCommand::UseProgram(program));
    }

    fn write_uniform(&mut self, location: UniformLocation, value: &UniformValue) {
        let Some((program, name)) = self.location_names.get(&location) else {
            log::warn!("Write to unknown uniform location {:?} ignored", location);
            return;
        };
        if self.active_program != Some(*program) {
            log::warn!(
                "Write to '{}' of program {:?} while {:?} is active ignored",
                name,
                program,
                self.active_program
            );
            return;
        }
        self.commands.push(GpuCommand::SetUniform {
            program: *program,
            name: name.clone(),
            value: value.clone(),
        });
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>) {
        self.commands.push(GpuCommand::BindTexture { unit, texture });
    }

    fn bind_image(&mut self, unit: u32, image: Option<TextureHandle>, access: ImageAccess) {
        if let Some(texture) = image {
            if !self.textures.contains(&texture) {
                log::warn!("Image unit {} bound to unknown texture {:?}", unit, texture);
            }
        }
        self.commands.push(GpuCommand::BindImage { unit, image, access });
    }

    fn create_mesh(&mut self, mesh: &MeshData) -> BackendResult<MeshHandle> {
        mesh.validate()?;
        let handle = MeshHandle(self.next_handle());
        self.meshes.insert(handle);
        self.commands.push(GpuCommand::CreateMesh(handle));
        Ok(handle)
    }

    fn create_texture(&mut self, texture: &TextureData) -> BackendResult<TextureHandle> {
        texture.validate()?;
        let handle = TextureHandle(self.next_handle());
        self.textures.insert(handle);
        self.commands.push(GpuCommand::CreateTexture(handle));
        Ok(handle)
    }

    fn draw_mesh(&mut self, mesh: MeshHandle) -> BackendResult<()> {
        let program = self
            .active_program
            .ok_or_else(|| BackendError::DrawFailed("no active program".to_string()))?;
        if !self.meshes.contains(&mesh) {
            return Err(BackendError::UnknownResource(format!("{mesh:?}")));
        }
        if self.failing_meshes.contains(&mesh) {
            return Err(BackendError::DrawFailed(format!("injected failure for {mesh:?}")));
        }
        self.commands.push(GpuCommand::Draw { program, mesh });
        Ok(())
    }

    fn dispatch_compute(&mut self, groups: [u32; 3]) -> BackendResult<()> {
        let program = self
            .active_program
            .ok_or_else(|| BackendError::DispatchFailed("no active program".to_string()))?;
        if !self.programs.get(&program).is_some_and(|p| p.compute) {
            return Err(BackendError::DispatchFailed(format!(
                "program {program:?} has no compute stage"
            )));
        }
        if groups.contains(&0) {
            return Err(BackendError::DispatchFailed(format!("empty work group grid {groups:?}")));
        }
        self.commands.push(GpuCommand::Dispatch { program, groups });
        Ok(())
    }

    fn clear(&mut self, targets: ClearTargets, color: [f32; 4]) {
        self.commands.push(GpuCommand::Clear { targets, color });
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.commands.push(GpuCommand::Viewport { width, height });
    }

    fn release(&mut self, resource: GpuResource) {
        let existed = match resource {
            GpuResource::Mesh(mesh) => self.meshes.remove(&mesh),
            GpuResource::Texture(texture) => self.textures.remove(&texture),
        };
        if !existed {
            log::warn!("Release of unknown resource {:?}", resource);
        }
        self.commands.push(GpuCommand::Release(resource));
    }

    fn delete_program(&mut self, program: ProgramId) {
        if let Some(removed) = self.programs.remove(&program) {
            for location in removed.locations.values() {
                self.location_names.remove(location);
            }
        }
        if self.active_program == Some(program) {
            self.active_program = None;
        }
        self.commands.push(GpuCommand::DeleteProgram(program));
    }

    fn present(&mut self) {
        self.frames_presented += 1;
        self.commands.push(GpuCommand::Present);
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
