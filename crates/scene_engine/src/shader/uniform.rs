//! Struct-valued uniforms

use crate::gpu::UniformValue;

/// A value that maps onto a GLSL struct
///
/// Field names are relative to the struct (`"color"`, `"att.constant"`); the
/// program prefixes them with `name.` or `name[index].` when writing.
pub trait UniformStruct {
    /// Field names and values, in any order
    fn uniform_fields(&self) -> Vec<(&'static str, UniformValue)>;
}
