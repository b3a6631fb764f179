//! Per-type encode/decode strategy contract

use alloc::boxed::Box;

use crate::engine::{GraphDecoder, GraphEncoder};
use crate::error::Result;
use crate::fingerprint::name_hash;
use crate::object::{Object, ObjId};

/// Encodes and reconstructs one registered type
///
/// Decoding happens in two phases. [`create`](Self::create) builds a minimal
/// instance; the engine stores it and registers it in the reference table;
/// then [`read`](Self::read) populates it.
///
/// `create` may read primitives only. It must never decode a nested chunk:
/// the outer object is registered in the reference table after `create`
/// returns, so a nested chunk read there would take the outer object's table
/// slot and shift every later back-reference. Nested chunks belong in `read`.
///
/// `write` emits only the payload. Tags and reference bookkeeping belong to
/// the engine.
pub trait Strategy: Send + Sync {
    /// Write the payload of object `id`
    fn write(&self, enc: &mut GraphEncoder<'_>, id: ObjId) -> Result<()>;

    /// Build a minimal instance from the primitives at the start of the payload
    ///
    /// Must not call [`GraphDecoder::read_chunk`].
    fn create(&self, dec: &mut GraphDecoder<'_>) -> Result<Box<dyn Object>>;

    /// Populate the instance stored at `id` from the rest of the payload
    fn read(&self, dec: &mut GraphDecoder<'_>, id: ObjId) -> Result<()> {
        let _ = (dec, id);
        Ok(())
    }

    /// Identity folded into the registry fingerprint
    ///
    /// Strategies whose layout depends on the shape of their type should fold
    /// in each field name and kind, so that drift between two registries shows
    /// up as a fingerprint mismatch.
    fn fingerprint(&self) -> u32 {
        name_hash(core::any::type_name::<Self>())
    }
}
