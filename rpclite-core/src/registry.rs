//! Method registry.
//!
//! An append-only list of callbacks keyed by the FNV-1a hash of their name.
//! Lookups scan in registration order, so when two names hash alike (or a
//! name is registered twice) the first entry shadows the later one. No
//! duplicate detection is performed; callers must keep names distinct.

use crate::error::{MethodError, RegistryError};
use rpclite_protocol::hash::method_hash;
use rpclite_protocol::{parse_signature, TypedValue};
use std::fmt;

/// A registered callback.
pub type Callback = Box<dyn Fn(&[TypedValue]) -> Result<(), MethodError> + Send + Sync>;

/// A named, typed callback.
pub struct RemoteMethod {
    name: String,
    hash: u64,
    signature: String,
    callback: Callback,
}

impl RemoteMethod {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Declared argument signature, e.g. `"isf"`.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Runs the callback with already-validated arguments.
    pub fn invoke(&self, args: &[TypedValue]) -> Result<(), MethodError> {
        (self.callback)(args)
    }
}

impl fmt::Debug for RemoteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteMethod")
            .field("name", &self.name)
            .field("hash", &format_args!("{:#018x}", self.hash))
            .field("signature", &self.signature)
            .finish()
    }
}

/// The set of methods one side of a connection can serve.
///
/// Built once during setup, then shared read-only (typically behind an
/// `Arc`) by every session.
#[derive(Debug, Default)]
pub struct MethodRegistry {
    methods: Vec<RemoteMethod>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` under `name` with the given argument signature.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        signature: impl Into<String>,
        callback: F,
    ) -> Result<&mut Self, RegistryError>
    where
        F: Fn(&[TypedValue]) -> Result<(), MethodError> + Send + Sync + 'static,
    {
        let name = name.into();
        let signature = signature.into();

        if let Err(source) = parse_signature(&signature) {
            return Err(RegistryError::InvalidSignature { name, source });
        }
        // A receiver rejects empty payloads, so no call could ever reach it.
        if signature.is_empty() {
            return Err(RegistryError::EmptySignature { name });
        }

        let hash = method_hash(&name);
        tracing::debug!("Registered method {} ({}) hash={:#018x}", name, signature, hash);
        self.methods.push(RemoteMethod {
            name,
            hash,
            signature,
            callback: Box::new(callback),
        });
        Ok(self)
    }

    /// Returns the first method registered under `hash`.
    pub fn resolve(&self, hash: u64) -> Option<&RemoteMethod> {
        self.methods.iter().find(|m| m.hash == hash)
    }

    /// Resolves by name, with the same first-match rule as [`resolve`](Self::resolve).
    pub fn resolve_name(&self, name: &str) -> Option<&RemoteMethod> {
        self.resolve(method_hash(name))
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Iterates methods in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RemoteMethod> {
        self.methods.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.methods.iter().map(|m| m.name()).collect()
    }
}
