//! Per-codec configuration

use crate::DEFAULT_MAX_DEPTH;

/// What the encoder does with an object whose type has no strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum UnknownTypeReaction {
    /// Abort the encode with `Error::UnsupportedType`
    #[default]
    Exception,
    /// Write structural and enumeration objects without notice
    Write,
    /// Like `Write`, logging a warning for every such object
    WriteAndWarning,
    /// Write a null chunk in place of the object
    WriteNull,
}

/// How the decoder treats a stream whose fingerprint differs from the registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FingerprintPolicy {
    /// Log a warning and keep decoding
    #[default]
    Warn,
    /// Abort with `Error::ProtocolMismatch` before reading any chunk
    Reject,
}

/// Codec configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Reaction to unregistered object types
    pub unknown_type_reaction: UnknownTypeReaction,
    /// Reaction to a fingerprint mismatch
    pub fingerprint_policy: FingerprintPolicy,
    /// Deepest chunk nesting accepted on encode and decode
    pub max_depth: usize,
    /// Initial size of the encode buffer in bytes
    pub initial_capacity: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            unknown_type_reaction: UnknownTypeReaction::default(),
            fingerprint_policy: FingerprintPolicy::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            initial_capacity: 256,
        }
    }
}

impl CodecConfig {
    /// Set the unknown-type reaction
    pub fn with_unknown_type_reaction(mut self, reaction: UnknownTypeReaction) -> Self {
        self.unknown_type_reaction = reaction;
        self
    }

    /// Set the fingerprint policy
    pub fn with_fingerprint_policy(mut self, policy: FingerprintPolicy) -> Self {
        self.fingerprint_policy = policy;
        self
    }

    /// Set the nesting limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
