//! Mesh Host boundary.
//!
//! The host owns mesh storage, modifier evaluation and OBJ interchange;
//! the engine only ever sees opaque handles and immutable snapshots.
//! Host failures are opaque (`anyhow`), converted to `MorphError::Host`
//! at the pipeline boundary.

use std::path::Path;

use crate::error::MorphResult;
use crate::mesh::MeshSnapshot;
use crate::subdiv::ModifierRecord;

/// Opaque identifier of a mesh living in the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// Operations the engine requires from the mesh-editing environment.
pub trait MeshHost {
    /// Mesh data at base resolution, no modifier evaluation.
    fn snapshot_raw(&self, mesh: MeshHandle) -> anyhow::Result<MeshSnapshot>;

    /// Mesh data with visible modifiers evaluated.
    fn snapshot_evaluated(&self, mesh: MeshHandle) -> anyhow::Result<MeshSnapshot>;

    fn copy_mesh(&mut self, mesh: MeshHandle) -> anyhow::Result<MeshHandle>;

    fn delete_mesh(&mut self, mesh: MeshHandle) -> anyhow::Result<()>;

    fn clear_modifiers(&mut self, mesh: MeshHandle) -> anyhow::Result<()>;

    fn apply_shape_keys(&mut self, mesh: MeshHandle) -> anyhow::Result<()>;

    fn remove_shape_keys(&mut self, mesh: MeshHandle) -> anyhow::Result<()>;

    /// Strip everything irrelevant to geometry interchange: UV layers,
    /// vertex groups, materials, parenting and world translation.
    fn strip_for_export(&mut self, mesh: MeshHandle) -> anyhow::Result<()>;

    /// The mesh's modifier stack, in stack order.
    fn modifiers(&self, mesh: MeshHandle) -> anyhow::Result<Vec<ModifierRecord>>;

    /// Per-modifier viewport visibility, parallel to [`Self::modifiers`].
    fn modifier_visibility(&self, mesh: MeshHandle) -> anyhow::Result<Vec<bool>>;

    fn set_modifier_visibility(
        &mut self,
        mesh: MeshHandle,
        visible: &[bool],
    ) -> anyhow::Result<()>;

    /// Add a fresh multiresolution modifier at level 0.
    fn add_multires(&mut self, mesh: MeshHandle) -> anyhow::Result<()>;

    /// Subdivide the mesh's multires modifier by one Catmull-Clark level.
    fn subdivide_catmull_clark(&mut self, mesh: MeshHandle) -> anyhow::Result<()>;

    /// Subdivide to `levels` with a modifier configured like `template`.
    fn subdivide_like(
        &mut self,
        mesh: MeshHandle,
        template: &ModifierRecord,
        levels: u32,
    ) -> anyhow::Result<()>;

    /// Rebuild multires levels from dense geometry (unsubdivide).
    fn rebuild_multires(&mut self, mesh: MeshHandle) -> anyhow::Result<()>;

    fn export_obj(
        &mut self,
        mesh: MeshHandle,
        path: &Path,
        apply_modifiers: bool,
    ) -> anyhow::Result<()>;

    fn import_obj(&mut self, path: &Path) -> anyhow::Result<MeshHandle>;

    /// Run `f` with exactly the modifiers selected by `predicate`
    /// visible, restoring the previous visibility on every exit path,
    /// including failure of `f` itself.
    fn with_modifiers_enabled<T>(
        &mut self,
        mesh: MeshHandle,
        predicate: &dyn Fn(&ModifierRecord) -> bool,
        f: impl FnOnce(&mut Self) -> MorphResult<T>,
    ) -> MorphResult<T>
    where
        Self: Sized,
    {
        let saved = self.modifier_visibility(mesh)?;
        let stack = self.modifiers(mesh)?;
        let selected: Vec<bool> = stack.iter().map(|m| predicate(m)).collect();
        self.set_modifier_visibility(mesh, &selected)?;

        let result = f(self);
        let restored = self.set_modifier_visibility(mesh, &saved);
        match (result, restored) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(e), _) => Err(e),
            (Ok(_), Err(e)) => Err(e.into()),
        }
    }
}
