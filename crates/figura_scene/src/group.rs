use std::sync::Arc;

use slotmap::{SlotMap, new_key_type};

use figura_core::{ControlVertexInfo, FiguraError, FrameUpdateParameters, Result};
use figura_render::{IblEnvironment, RenderDevice, RenderingPass};

use crate::deformer::ParentLink;
use crate::facade::FigureFacade;

new_key_type! {
    /// Handle of a facade stored in a [`FigureGroup`].
    pub struct FigureKey;
}

/// A root figure plus an ordered set of attached child figures, updated and
/// rendered as one unit.
///
/// The group owns every facade inserted into it. Only the root and the
/// current children are *members*: they take part in frames, in member order
/// (root first). Other stored facades wait to become children or to be taken
/// out for disposal.
#[derive(Debug)]
pub struct FigureGroup {
    figures: SlotMap<FigureKey, FigureFacade>,
    root: FigureKey,
    children: Vec<FigureKey>,
}

impl FigureGroup {
    pub fn new(root: FigureFacade) -> Self {
        let mut figures = SlotMap::with_key();
        let root = figures.insert(root);
        Self {
            figures,
            root,
            children: Vec::new(),
        }
    }

    /// Stores a facade. It is not a member until listed in
    /// [`set_child_figures`](Self::set_child_figures).
    pub fn insert(&mut self, facade: FigureFacade) -> FigureKey {
        self.figures.insert(facade)
    }

    /// Removes a stored facade, detaching it first if it is a child.
    ///
    /// The root cannot be taken.
    pub fn take(&mut self, key: FigureKey) -> Result<FigureFacade> {
        if key == self.root {
            return Err(FiguraError::UnknownFigure(format!(
                "{key:?} is the group root and cannot be removed"
            )));
        }
        let facade = self
            .figures
            .remove(key)
            .ok_or_else(|| FiguraError::UnknownFigure(format!("{key:?}")))?;
        self.children.retain(|&child| child != key);
        Ok(facade)
    }

    #[must_use]
    pub fn get(&self, key: FigureKey) -> Option<&FigureFacade> {
        self.figures.get(key)
    }

    pub fn get_mut(&mut self, key: FigureKey) -> Option<&mut FigureFacade> {
        self.figures.get_mut(key)
    }

    #[must_use]
    pub fn contains(&self, key: FigureKey) -> bool {
        self.figures.contains_key(key)
    }

    #[inline]
    #[must_use]
    pub fn root_key(&self) -> FigureKey {
        self.root
    }

    #[must_use]
    pub fn root(&self) -> &FigureFacade {
        &self.figures[self.root]
    }

    pub fn root_mut(&mut self) -> &mut FigureFacade {
        &mut self.figures[self.root]
    }

    #[must_use]
    pub fn children(&self) -> &[FigureKey] {
        &self.children
    }

    /// Member keys: the root, then the children in order.
    pub fn members(&self) -> impl Iterator<Item = FigureKey> + '_ {
        std::iter::once(self.root).chain(self.children.iter().copied())
    }

    #[must_use]
    pub fn member_count(&self) -> usize {
        1 + self.children.len()
    }

    /// Number of stored facades, members or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.figures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.figures.is_empty()
    }

    /// Replaces the child list.
    ///
    /// Every key must refer to a stored facade other than the root, and may
    /// appear once. On error the previous list is kept.
    pub fn set_child_figures(&mut self, keys: Vec<FigureKey>) -> Result<()> {
        for (index, &key) in keys.iter().enumerate() {
            if key == self.root {
                return Err(FiguraError::UnknownFigure(format!(
                    "{key:?} is the group root and cannot be a child"
                )));
            }
            if !self.figures.contains_key(key) {
                return Err(FiguraError::UnknownFigure(format!("{key:?}")));
            }
            if keys[..index].contains(&key) {
                return Err(FiguraError::UnknownFigure(format!(
                    "{key:?} listed more than once"
                )));
            }
        }
        log::debug!(
            "Group of '{}' now has {} children",
            self.root().name(),
            keys.len()
        );
        self.children = keys;
        Ok(())
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Updates the root, then every child against the root's same-frame state.
    ///
    /// The root's animator sees last frame's feedback of every member; each
    /// child's animator sees only its own.
    pub fn update(
        &mut self,
        device: &mut dyn RenderDevice,
        params: &FrameUpdateParameters,
        ibl: &IblEnvironment,
    ) -> Result<()> {
        let previous: Vec<ControlVertexInfo> = self
            .members()
            .map(|key| self.figures[key].feedback().clone())
            .collect();

        let root = &mut self.figures[self.root];
        root.update(device, params, ibl, None, &previous)?;
        let link = ParentLink {
            definition: Arc::clone(root.definition()),
            deformed: Arc::clone(root.deformed()),
            outputs: root.frame_outputs().clone(),
        };

        for (index, &key) in self.children.iter().enumerate() {
            let own = &previous[index + 1..=index + 1];
            self.figures[key].update(device, params, ibl, Some(&link), own)?;
        }
        Ok(())
    }

    /// Issues the draws of every member for one pass. Returns the draw count.
    pub fn render_pass(&self, device: &mut dyn RenderDevice, pass: RenderingPass) -> Result<usize> {
        let mut issued = 0;
        for key in self.members() {
            issued += self.figures[key].render_pass(device, pass)?;
        }
        Ok(issued)
    }

    /// Publishes every member's readback as feedback for the next frame.
    ///
    /// A failing member does not stop the others from publishing. The first
    /// error is returned; the failed member keeps its previous feedback.
    pub fn do_postwork(&mut self, device: &mut dyn RenderDevice) -> Result<()> {
        let members: Vec<FigureKey> = self.members().collect();
        let mut first_error = None;
        for key in members {
            let facade = &mut self.figures[key];
            if let Err(err) = facade.do_postwork(device) {
                log::error!("Postwork failed for '{}': {err}", facade.name());
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Disposes every stored facade. Keeps going past failures and returns the first.
    pub fn dispose(mut self, device: &mut dyn RenderDevice) -> Result<()> {
        let mut first_error = None;
        for (_, mut facade) in self.figures.drain() {
            if facade.is_disposed() {
                continue;
            }
            if let Err(err) = facade.dispose(device) {
                log::error!("Failed to dispose '{}': {err}", facade.name());
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figura_assets::AssetLibrary;
    use figura_assets::primitives::{self, HAIR_FIGURE, MAIN_FIGURE};
    use figura_render::{DeviceOp, HeadlessDevice, MemoryShaderCache};

    use crate::loader::FigureLoader;

    fn loader() -> FigureLoader {
        FigureLoader::new(
            Arc::new(AssetLibrary::new(primitives::demo_source())),
            Arc::new(MemoryShaderCache::with_variants(["skin", "hair", "cloth"])),
        )
    }

    fn group_with(children: &[&str], device: &mut HeadlessDevice) -> (FigureGroup, Vec<FigureKey>) {
        let loader = loader();
        let main = loader.load(device, MAIN_FIGURE, None).unwrap();
        let parent = Arc::clone(main.definition());
        let mut group = FigureGroup::new(main);
        let keys: Vec<FigureKey> = children
            .iter()
            .map(|name| {
                let facade = loader.load(device, name, Some(&parent)).unwrap();
                group.insert(facade)
            })
            .collect();
        group.set_child_figures(keys.clone()).unwrap();
        (group, keys)
    }

    #[test]
    fn members_start_with_the_root() {
        let mut device = HeadlessDevice::new();
        let (group, keys) = group_with(&[HAIR_FIGURE, "shirt"], &mut device);
        let members: Vec<FigureKey> = group.members().collect();
        assert_eq!(members[0], group.root_key());
        assert_eq!(&members[1..], keys.as_slice());
        assert_eq!(group.member_count(), 3);
    }

    #[test]
    fn invalid_child_lists_are_rejected_whole() {
        let mut device = HeadlessDevice::new();
        let (mut group, keys) = group_with(&[HAIR_FIGURE], &mut device);

        let root = group.root_key();
        assert!(group.set_child_figures(vec![root]).is_err());
        assert!(group.set_child_figures(vec![keys[0], keys[0]]).is_err());
        assert_eq!(group.children(), keys.as_slice());
    }

    #[test]
    fn taking_a_child_detaches_it() {
        let mut device = HeadlessDevice::new();
        let (mut group, keys) = group_with(&[HAIR_FIGURE, "skirt"], &mut device);
        let hair = group.take(keys[0]).unwrap();
        assert_eq!(hair.name(), HAIR_FIGURE);
        assert_eq!(group.children(), &keys[1..]);
        assert!(matches!(group.take(keys[0]), Err(FiguraError::UnknownFigure(_))));
        assert!(group.take(group.root_key()).is_err());
    }

    #[test]
    fn failed_readback_does_not_strand_siblings() {
        let mut device = HeadlessDevice::new();
        let (mut group, keys) = group_with(&[HAIR_FIGURE], &mut device);
        let params = FrameUpdateParameters::new(1, 0.0, 1.0 / 60.0);
        group
            .update(&mut device, &params, &IblEnvironment::default())
            .unwrap();

        device.fail_next(DeviceOp::Read);
        assert!(matches!(
            group.do_postwork(&mut device),
            Err(FiguraError::Gpu(_))
        ));

        assert_eq!(group.root().feedback().frame(), None);
        let hair = group.get(keys[0]).unwrap();
        assert_eq!(hair.feedback().frame(), Some(1));
        assert_eq!(hair.pending_readback(), None);
    }

    #[test]
    fn frame_issues_root_draws_first() {
        let mut device = HeadlessDevice::new();
        let (mut group, _) = group_with(&["shirt"], &mut device);
        group
            .update(
                &mut device,
                &FrameUpdateParameters::default(),
                &IblEnvironment::default(),
            )
            .unwrap();
        let draws = group.render_pass(&mut device, RenderingPass::Opaque).unwrap();
        assert_eq!(draws, device.draws().len());
        assert_eq!(&*device.draws()[0].figure, MAIN_FIGURE);
        assert_eq!(&*device.draws().last().unwrap().figure, "shirt");
    }

    #[test]
    fn child_shares_root_channels() {
        let mut device = HeadlessDevice::new();
        let (mut group, keys) = group_with(&["shirt"], &mut device);
        group.root_mut().set_shape("Rune").unwrap();
        group
            .update(
                &mut device,
                &FrameUpdateParameters::default(),
                &IblEnvironment::default(),
            )
            .unwrap();
        let shirt = group.get(keys[0]).unwrap();
        assert!((shirt.frame_outputs().get("belly") - 0.6).abs() < 1e-9);
        assert!(!shirt.frame_outputs().defines("arm-raise"));
    }

    #[test]
    fn dispose_releases_every_buffer() {
        let mut device = HeadlessDevice::new();
        let (mut group, _) = group_with(&[HAIR_FIGURE, "shirt", "skirt"], &mut device);
        let loose = loader().load(&mut device, MAIN_FIGURE, None).unwrap();
        group.insert(loose);
        group.dispose(&mut device).unwrap();
        assert_eq!(device.live_buffers(), 0);
    }
}
