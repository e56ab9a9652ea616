//! GPU context and binding register

use std::collections::BTreeMap;

use thiserror::Error;

use super::{GraphicsBackend, ImageAccess, ProgramId, TextureHandle};

/// Misuse of the bind/unbind protocol
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// A program was bound while another one was still active
    #[error("Cannot bind program {requested:?} while program {bound:?} is still bound")]
    Conflict {
        /// Program currently holding the register
        bound: ProgramId,
        /// Program that tried to bind
        requested: ProgramId,
    },

    /// A program was unbound (or written to) while it was not the active one
    #[error("Program {program:?} is not bound (active program: {active:?})")]
    NotBound {
        /// Program that expected to be active
        program: ProgramId,
        /// Program actually active, if any
        active: Option<ProgramId>,
    },
}

/// Rendering context: one graphics backend plus its binding register
///
/// The register tracks the active program and the texture and image units
/// bound for the current draw or dispatch. Only one program can be bound at a
/// time; every `bind` must be paired with an `unbind` of the same program
/// before another program binds. Units bound while a program is active are
/// cleared again when it unbinds.
pub struct GpuContext {
    backend: Box<dyn GraphicsBackend>,
    bound_program: Option<ProgramId>,
    bound_textures: BTreeMap<u32, TextureHandle>,
    bound_images: BTreeMap<u32, (TextureHandle, ImageAccess)>,
}

impl GpuContext {
    /// Create a context around a backend
    pub fn new(backend: impl GraphicsBackend + 'static) -> Self {
        Self::from_boxed(Box::new(backend))
    }

    /// Create a context around an already boxed backend
    pub fn from_boxed(backend: Box<dyn GraphicsBackend>) -> Self {
        log::debug!("Creating GPU context on backend '{}'", backend.name());
        Self {
            backend,
            bound_program: None,
            bound_textures: BTreeMap::new(),
            bound_images: BTreeMap::new(),
        }
    }

    /// Shared access to the backend
    pub fn backend(&self) -> &dyn GraphicsBackend {
        self.backend.as_ref()
    }

    /// Mutable access to the backend
    pub fn backend_mut(&mut self) -> &mut dyn GraphicsBackend {
        self.backend.as_mut()
    }

    /// Downcast the backend to its concrete type
    pub fn backend_as<T: 'static>(&self) -> Option<&T> {
        self.backend.as_any().downcast_ref::<T>()
    }

    /// Mutable downcast of the backend to its concrete type
    pub fn backend_as_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.backend.as_any_mut().downcast_mut::<T>()
    }

    /// Currently bound program
    pub fn bound_program(&self) -> Option<ProgramId> {
        self.bound_program
    }

    /// Make `program` the active program
    ///
    /// Binding the program that is already active is a no-op.
    pub fn bind_program(&mut self, program: ProgramId) -> Result<(), BindingError> {
        match self.bound_program {
            Some(bound) if bound == program => Ok(()),
            Some(bound) => Err(BindingError::Conflict { bound, requested: program }),
            None => {
                self.backend.use_program(Some(program));
                self.bound_program = Some(program);
                Ok(())
            }
        }
    }

    /// Release `program`, clearing any units bound while it was active
    pub fn unbind_program(&mut self, program: ProgramId) -> Result<(), BindingError> {
        self.require_bound(program)?;
        self.unbind_textures();
        self.unbind_images();
        self.backend.use_program(None);
        self.bound_program = None;
        Ok(())
    }

    /// Check that `program` holds the register
    pub fn require_bound(&self, program: ProgramId) -> Result<(), BindingError> {
        if self.bound_program == Some(program) {
            Ok(())
        } else {
            Err(BindingError::NotBound {
                program,
                active: self.bound_program,
            })
        }
    }

    /// Bind a texture to a texture unit for the current draw
    pub fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        self.backend.bind_texture(unit, Some(texture));
        self.bound_textures.insert(unit, texture);
    }

    /// Texture currently bound to `unit`
    pub fn bound_texture(&self, unit: u32) -> Option<TextureHandle> {
        self.bound_textures.get(&unit).copied()
    }

    /// Bind a texture to an image unit for the current dispatch
    pub fn bind_image(&mut self, unit: u32, texture: TextureHandle, access: ImageAccess) {
        self.backend.bind_image(unit, Some(texture), access);
        self.bound_images.insert(unit, (texture, access));
    }

    /// Texture and access currently bound to image `unit`
    pub fn bound_image(&self, unit: u32) -> Option<(TextureHandle, ImageAccess)> {
        self.bound_images.get(&unit).copied()
    }

    fn unbind_images(&mut self) {
        for (unit, (_, access)) in std::mem::take(&mut self.bound_images) {
            self.backend.bind_image(unit, None, access);
        }
    }

    fn unbind_textures(&mut self) {
        let units: Vec<u32> = self.bound_textures.keys().copied().collect();
        for unit in units {
            self.backend.bind_texture(unit, None);
        }
        self.bound_textures.clear();
    }
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("backend", &self.backend.name())
            .field("bound_program", &self.bound_program)
            .field("bound_textures", &self.bound_textures)
            .field("bound_images", &self.bound_images)
            .finish()
    }
}
