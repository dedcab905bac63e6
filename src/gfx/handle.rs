//! Typed keys for the GPU objects a device owns.
//!
//! Every object lives in a `SlotMap` keyed by one of these ids. A key carries
//! its slot version, so a stale id that outlived its object resolves to
//! "absent" instead of aliasing whatever object reused the slot.

use slotmap::new_key_type;

new_key_type! {
    /// A texture owned by the active device.
    pub struct TextureId;
    /// A render target (framebuffer plus its attachment textures).
    pub struct TargetId;
    /// A linked shader program with its reflected uniforms.
    pub struct ShaderId;
    /// A vertex array with its vertex, index and instance buffers.
    pub struct MeshId;
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::{Key, SlotMap};

    #[test]
    fn stale_id_is_absent_after_slot_reuse() {
        let mut textures: SlotMap<TextureId, &str> = SlotMap::with_key();
        let a = textures.insert("a");
        assert_eq!(textures.remove(a), Some("a"));
        let b = textures.insert("b");

        assert_ne!(a, b);
        assert!(textures.get(a).is_none());
        assert_eq!(textures.get(b), Some(&"b"));
        assert!(textures.remove(a).is_none());
        assert_eq!(textures.len(), 1);
    }

    #[test]
    fn draining_keeps_old_ids_dead() {
        let mut meshes: SlotMap<MeshId, u32> = SlotMap::with_key();
        let a = meshes.insert(1);
        let b = meshes.insert(2);
        assert_eq!(meshes.drain().map(|(_, v)| v).sum::<u32>(), 3);
        assert!(meshes.is_empty());

        let c = meshes.insert(3);
        let d = meshes.insert(4);
        assert!(meshes.get(a).is_none() && meshes.get(b).is_none());
        assert_eq!((meshes[c], meshes[d]), (3, 4));
    }

    #[test]
    fn default_id_never_resolves() {
        let mut shaders: SlotMap<ShaderId, ()> = SlotMap::with_key();
        shaders.insert(());
        assert!(ShaderId::default().is_null());
        assert!(!shaders.contains_key(ShaderId::default()));
    }
}
