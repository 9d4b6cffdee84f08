use std::collections::HashMap;

use blake3::Hash;

use crate::constants::{ConstantRegistry, ShaderConstantSlots};
use crate::convert::{ConvertOptions, ShaderConverter};
use crate::error::ConvertError;
use crate::layout::SpirvShader;

#[derive(Debug, Clone)]
pub struct CachedShader {
    pub hash: Hash,
    pub shader: SpirvShader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderCacheLookupSource {
    /// The shader was already present in the in-memory cache.
    Memory,
    /// The converter ran and the output was inserted into the in-memory cache.
    Translated,
}

#[derive(Debug, Clone, Copy)]
pub struct ShaderCacheLookup<'a> {
    pub source: ShaderCacheLookupSource,
    shader: &'a CachedShader,
}

impl std::ops::Deref for ShaderCacheLookup<'_> {
    type Target = CachedShader;

    fn deref(&self) -> &Self::Target {
        self.shader
    }
}

/// In-memory cache of translated shaders keyed by the BLAKE3 hash of their bytecode.
pub struct ShaderCache<R = ShaderConstantSlots> {
    map: HashMap<Hash, CachedShader>,
    converter: ShaderConverter<R>,
}

impl ShaderCache {
    pub fn new(options: ConvertOptions) -> Self {
        Self::with_converter(ShaderConverter::new(options))
    }
}

impl<R: ConstantRegistry + Clone> ShaderCache<R> {
    pub fn with_converter(converter: ShaderConverter<R>) -> Self {
        Self {
            map: HashMap::new(),
            converter,
        }
    }

    pub fn options(&self) -> ConvertOptions {
        self.converter.options()
    }

    /// Changing the options invalidates every cached translation.
    pub fn set_options(&mut self, options: ConvertOptions) {
        if self.converter.options() != options {
            self.converter =
                ShaderConverter::with_registry(options, self.converter.registry().clone());
            self.map.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get_or_translate(
        &mut self,
        bytes: &[u8],
    ) -> Result<ShaderCacheLookup<'_>, ConvertError> {
        use std::collections::hash_map::Entry;

        let hash = blake3::hash(bytes);
        match self.map.entry(hash) {
            Entry::Occupied(e) => Ok(ShaderCacheLookup {
                source: ShaderCacheLookupSource::Memory,
                shader: e.into_mut(),
            }),
            Entry::Vacant(e) => {
                let shader = self.converter.translate_bytes(bytes)?;
                let hash = *e.key();
                Ok(ShaderCacheLookup {
                    source: ShaderCacheLookupSource::Translated,
                    shader: e.insert(CachedShader { hash, shader }),
                })
            }
        }
    }
}

impl Default for ShaderCache {
    fn default() -> Self {
        Self::new(ConvertOptions::default())
    }
}
