//! Shader cache seam.
//!
//! Compilation happens elsewhere; figures only look up already compiled
//! shaders by identity. A [`ShaderKey`] is a shader name plus a set of
//! defines, hashed with xxh3 so lookups never compare strings.

use std::collections::BTreeSet;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use xxhash_rust::xxh3::Xxh3;

/// Defines a figure may request, derived from its surface properties.
pub const KNOWN_DEFINES: [&str; 2] = ["SUBDIVISION", "PRECOMPUTED_SCATTERING"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderKey {
    name: String,
    defines: BTreeSet<String>,
    hash: u64,
}

impl ShaderKey {
    pub fn new(name: impl Into<String>) -> Self {
        let mut key = Self {
            name: name.into(),
            defines: BTreeSet::new(),
            hash: 0,
        };
        key.rehash();
        key
    }

    #[must_use]
    pub fn with_define(mut self, define: impl Into<String>) -> Self {
        self.defines.insert(define.into());
        self.rehash();
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn defines(&self) -> impl Iterator<Item = &str> {
        self.defines.iter().map(String::as_str)
    }

    /// Identity hash; equal for equal name and define set.
    #[inline]
    #[must_use]
    pub fn hash_value(&self) -> u64 {
        self.hash
    }

    fn rehash(&mut self) {
        let mut hasher = Xxh3::new();
        hasher.update(self.name.as_bytes());
        for define in &self.defines {
            // Separator keeps ("ab", "c") and ("a", "bc") apart
            hasher.update(&[0]);
            hasher.update(define.as_bytes());
        }
        self.hash = hasher.digest();
    }
}

impl std::fmt::Display for ShaderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)?;
        if !self.defines.is_empty() {
            let defines: Vec<_> = self.defines.iter().map(String::as_str).collect();
            write!(f, "[{}]", defines.join(","))?;
        }
        Ok(())
    }
}

/// Handle to a compiled shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub u32);

/// Lookup of compiled shaders.
pub trait ShaderCache: Send + Sync {
    fn fetch(&self, key: &ShaderKey) -> Option<ShaderHandle>;
}

/// Shader cache holding handles registered up front.
#[derive(Debug, Default)]
pub struct MemoryShaderCache {
    shaders: RwLock<FxHashMap<u64, ShaderHandle>>,
}

impl MemoryShaderCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache holding every combination of [`KNOWN_DEFINES`] for each name.
    pub fn with_variants<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cache = Self::new();
        for name in names {
            for mask in 0..(1_u32 << KNOWN_DEFINES.len()) {
                let key = KNOWN_DEFINES
                    .iter()
                    .enumerate()
                    .filter(|(bit, _)| mask & (1 << bit) != 0)
                    .fold(ShaderKey::new(name.as_ref()), |key, (_, define)| {
                        key.with_define(*define)
                    });
                cache.insert(&key);
            }
        }
        cache
    }

    /// Registers `key`, returning its handle. Re-registering returns the same handle.
    pub fn insert(&self, key: &ShaderKey) -> ShaderHandle {
        let mut shaders = self.shaders.write();
        let next = ShaderHandle(shaders.len() as u32);
        *shaders.entry(key.hash_value()).or_insert(next)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shaders.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ShaderCache for MemoryShaderCache {
    fn fetch(&self, key: &ShaderKey) -> Option<ShaderHandle> {
        let handle = self.shaders.read().get(&key.hash_value()).copied();
        if handle.is_none() {
            log::debug!("Shader cache miss for {key}");
        }
        handle
    }
}
