//! Linked shader program with a uniform location cache

use std::collections::{HashMap, HashSet};

use super::{ShaderError, UniformStruct};
use crate::gpu::{
    GpuContext, ImageAccess, ProgramId, StageId, StageKind, TextureHandle, UniformLocation,
    UniformValue,
};

/// One compiled and linked shader program
///
/// Construction follows the classic sequence: add stages, link once, then
/// register the uniforms the technique writes. Plain uniforms are resolved
/// eagerly by [`add_uniform`](Self::add_uniform). Struct and struct-array
/// uniforms are registered by name and their fields resolve lazily the first
/// time a given `name[index].field` is written; the resolved location is
/// cached from then on.
///
/// All setters require this program to be the one bound in the
/// [`GpuContext`].
#[derive(Debug)]
pub struct ShaderProgram {
    name: String,
    stages: Vec<(StageKind, StageId)>,
    id: Option<ProgramId>,
    uniforms: HashMap<String, UniformLocation>,
    structs: HashSet<String>,
    arrays: HashMap<String, usize>,
    fields: HashMap<String, UniformLocation>,
}

impl ShaderProgram {
    /// Create an empty, unlinked program
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            id: None,
            uniforms: HashMap::new(),
            structs: HashSet::new(),
            arrays: HashMap::new(),
            fields: HashMap::new(),
        }
    }

    /// Compile and link a program from `(kind, source)` pairs
    pub fn from_sources(
        gpu: &mut GpuContext,
        name: impl Into<String>,
        sources: &[(StageKind, &str)],
    ) -> Result<Self, ShaderError> {
        let mut program = Self::new(name);
        for (kind, source) in sources {
            program.create_stage(gpu, *kind, source)?;
        }
        program.link(gpu)?;
        Ok(program)
    }

    /// Debug name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Linked program handle
    pub fn id(&self) -> Result<ProgramId, ShaderError> {
        self.id.ok_or_else(|| ShaderError::NotLinked(self.name.clone()))
    }

    /// Whether `link` succeeded
    pub fn is_linked(&self) -> bool {
        self.id.is_some()
    }

    /// Compile one stage and add it to the program
    pub fn create_stage(
        &mut self,
        gpu: &mut GpuContext,
        kind: StageKind,
        source: &str,
    ) -> Result<(), ShaderError> {
        if self.is_linked() {
            return Err(ShaderError::AlreadyLinked(self.name.clone()));
        }
        let stage = gpu
            .backend_mut()
            .compile_stage(kind, source)
            .map_err(|e| ShaderError::Compile {
                program: self.name.clone(),
                stage: kind,
                log: e.to_string(),
            })?;
        log::trace!("Compiled {} stage of '{}'", kind, self.name);
        self.stages.push((kind, stage));
        Ok(())
    }

    /// Link all added stages
    pub fn link(&mut self, gpu: &mut GpuContext) -> Result<ProgramId, ShaderError> {
        if self.is_linked() {
            return Err(ShaderError::AlreadyLinked(self.name.clone()));
        }
        if self.stages.is_empty() {
            return Err(ShaderError::NoStages(self.name.clone()));
        }
        let stages: Vec<StageId> = self.stages.iter().map(|(_, id)| *id).collect();
        let id = gpu
            .backend_mut()
            .link_program(&stages)
            .map_err(|e| ShaderError::Link {
                program: self.name.clone(),
                log: e.to_string(),
            })?;
        log::debug!("Linked shader program '{}' as {:?}", self.name, id);
        self.id = Some(id);
        Ok(id)
    }

    /// Resolve and cache the location of a plain uniform
    pub fn add_uniform(&mut self, gpu: &GpuContext, name: &str) -> Result<(), ShaderError> {
        let id = self.id()?;
        let location = gpu
            .backend()
            .uniform_location(id, name)
            .ok_or_else(|| ShaderError::UniformNotFound {
                program: self.name.clone(),
                name: name.to_string(),
            })?;
        self.uniforms.insert(name.to_string(), location);
        Ok(())
    }

    /// Register a struct uniform whose fields are written as `name.field`
    pub fn add_uniform_struct(&mut self, name: &str) -> Result<(), ShaderError> {
        self.id()?;
        self.structs.insert(name.to_string());
        Ok(())
    }

    /// Register a struct array written as `name[index].field` for
    /// `index < capacity`
    pub fn add_uniform_array(&mut self, name: &str, capacity: usize) -> Result<(), ShaderError> {
        self.id()?;
        self.arrays.insert(name.to_string(), capacity);
        Ok(())
    }

    /// Whether `name` was registered in any form
    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.contains_key(name)
            || self.structs.contains(name)
            || self.arrays.contains_key(name)
    }

    /// Registered capacity of a struct array
    pub fn array_capacity(&self, name: &str) -> Option<usize> {
        self.arrays.get(name).copied()
    }

    /// Make this program the active program
    pub fn bind(&self, gpu: &mut GpuContext) -> Result<(), ShaderError> {
        gpu.bind_program(self.id()?)?;
        Ok(())
    }

    /// Release the active program
    pub fn unbind(&self, gpu: &mut GpuContext) -> Result<(), ShaderError> {
        gpu.unbind_program(self.id()?)?;
        Ok(())
    }

    /// Write a registered plain uniform
    pub fn set_uniform(
        &self,
        gpu: &mut GpuContext,
        name: &str,
        value: impl Into<UniformValue>,
    ) -> Result<(), ShaderError> {
        let id = self.id()?;
        let location = *self
            .uniforms
            .get(name)
            .ok_or_else(|| ShaderError::UnregisteredUniform {
                program: self.name.clone(),
                name: name.to_string(),
            })?;
        gpu.require_bound(id)?;
        gpu.backend_mut().write_uniform(location, &value.into());
        Ok(())
    }

    /// Bind `texture` to `unit` and point the sampler uniform `name` at it
    pub fn set_texture(
        &self,
        gpu: &mut GpuContext,
        name: &str,
        unit: u32,
        texture: TextureHandle,
    ) -> Result<(), ShaderError> {
        gpu.require_bound(self.id()?)?;
        gpu.bind_texture(unit, texture);
        self.set_uniform(gpu, name, UniformValue::Int(unit as i32))
    }

    /// Bind `texture` to image `unit` for the next dispatch
    pub fn set_image(
        &self,
        gpu: &mut GpuContext,
        unit: u32,
        texture: TextureHandle,
        access: ImageAccess,
    ) -> Result<(), ShaderError> {
        gpu.require_bound(self.id()?)?;
        gpu.bind_image(unit, texture, access);
        Ok(())
    }

    /// Dispatch enough `local_size` work groups to cover a `width` x `height`
    /// image, returning the group counts
    pub fn dispatch(
        &self,
        gpu: &mut GpuContext,
        local_size: [u32; 2],
        (width, height): (u32, u32),
    ) -> Result<[u32; 3], ShaderError> {
        gpu.require_bound(self.id()?)?;
        let groups = [width.div_ceil(local_size[0]), height.div_ceil(local_size[1]), 1];
        gpu.backend_mut()
            .dispatch_compute(groups)
            .map_err(|e| ShaderError::Dispatch {
                program: self.name.clone(),
                log: e.to_string(),
            })?;
        Ok(groups)
    }

    /// Write every field of a registered struct uniform
    pub fn set_uniform_struct(
        &mut self,
        gpu: &mut GpuContext,
        name: &str,
        value: &dyn UniformStruct,
    ) -> Result<(), ShaderError> {
        if !self.structs.contains(name) {
            return Err(ShaderError::UnregisteredUniform {
                program: self.name.clone(),
                name: name.to_string(),
            });
        }
        self.write_fields(gpu, name, value)
    }

    /// Write every field of element `index` of a registered struct array
    pub fn set_uniform_element(
        &mut self,
        gpu: &mut GpuContext,
        array: &str,
        index: usize,
        value: &dyn UniformStruct,
    ) -> Result<(), ShaderError> {
        let capacity = self
            .array_capacity(array)
            .ok_or_else(|| ShaderError::UnregisteredUniform {
                program: self.name.clone(),
                name: array.to_string(),
            })?;
        if index >= capacity {
            return Err(ShaderError::IndexOutOfRange {
                name: array.to_string(),
                index,
                capacity,
            });
        }
        self.write_fields(gpu, &format!("{array}[{index}]"), value)
    }

    /// Delete the GPU program
    pub fn destroy(&mut self, gpu: &mut GpuContext) {
        if let Some(id) = self.id.take() {
            if gpu.bound_program() == Some(id) {
                log::warn!("Destroying '{}' while it is still bound", self.name);
                let _ = gpu.unbind_program(id);
            }
            gpu.backend_mut().delete_program(id);
            log::debug!("Destroyed shader program '{}'", self.name);
        }
        self.uniforms.clear();
        self.structs.clear();
        self.arrays.clear();
        self.fields.clear();
    }

    fn write_fields(
        &mut self,
        gpu: &mut GpuContext,
        prefix: &str,
        value: &dyn UniformStruct,
    ) -> Result<(), ShaderError> {
        let id = self.id()?;
        gpu.require_bound(id)?;
        for (field, field_value) in value.uniform_fields() {
            let full_name = format!("{prefix}.{field}");
            let location = match self.fields.get(&full_name) {
                Some(location) => *location,
                None => {
                    let location = gpu.backend().uniform_location(id, &full_name).ok_or_else(|| {
                        ShaderError::UniformNotFound {
                            program: self.name.clone(),
                            name: full_name.clone(),
                        }
                    })?;
                    self.fields.insert(full_name, location);
                    location
                }
            };
            gpu.backend_mut().write_uniform(location, &field_value);
        }
        Ok(())
    }
}
