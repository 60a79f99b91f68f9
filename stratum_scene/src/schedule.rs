// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Redraw coalescing.
//!
//! Each staged layer is either [`RedrawState::Idle`] or
//! [`RedrawState::Scheduled`]. Invalidations move a layer to `Scheduled`;
//! any number of further invalidations before the next frame are absorbed.
//! The host learns about pending work through a [`FrameRequester`], called
//! once when the first layer becomes scheduled, and delivers the frame by
//! calling [`Scene::on_animation_frame`].

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::error::{InvalidOperation, SceneError};
use crate::node::LayerSurfaces;
use crate::scene::Scene;
use crate::types::NodeId;

/// Redraw state of a layer.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum RedrawState {
    /// Nothing pending.
    #[default]
    Idle,
    /// A redraw will run on the next frame.
    Scheduled,
}

/// Host hook asking for [`Scene::on_animation_frame`] to be called soon.
pub trait FrameRequester {
    /// Requests one frame callback.
    fn request_frame(&mut self);
}

impl<F: FnMut()> FrameRequester for F {
    fn request_frame(&mut self) {
        self();
    }
}

#[derive(Default)]
pub(crate) struct Scheduler {
    requester: Option<Box<dyn FrameRequester>>,
    pending: bool,
    frames_requested: u64,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("has_requester", &self.requester.is_some())
            .field("pending", &self.pending)
            .field("frames_requested", &self.frames_requested)
            .finish()
    }
}

impl Scene {
    pub(crate) fn surfaces(&self, layer: NodeId) -> Result<&LayerSurfaces, SceneError> {
        self.live(layer)?
            .surfaces
            .as_deref()
            .ok_or_else(|| InvalidOperation::NotALayer(layer).into())
    }

    pub(crate) fn surfaces_mut(&mut self, layer: NodeId) -> Option<&mut LayerSurfaces> {
        self.get_mut(layer)?.surfaces.as_deref_mut()
    }

    pub(crate) fn schedule(&mut self, layer: NodeId) {
        if !self.layers.contains(&layer) {
            return;
        }
        let Some(surfaces) = self.surfaces_mut(layer) else {
            return;
        };
        if surfaces.state == RedrawState::Scheduled {
            return;
        }
        surfaces.state = RedrawState::Scheduled;
        tracing::trace!(?layer, "layer scheduled");
        let scheduler = &mut self.scheduler;
        if !scheduler.pending {
            scheduler.pending = true;
            scheduler.frames_requested += 1;
            if let Some(requester) = scheduler.requester.as_mut() {
                requester.request_frame();
            }
        }
    }

    /// Installs the host frame hook.
    pub fn set_frame_requester(&mut self, requester: impl FrameRequester + 'static) {
        self.scheduler.requester = Some(Box::new(requester));
    }

    /// Number of frame requests issued so far.
    #[must_use]
    pub fn frames_requested(&self) -> u64 {
        self.scheduler.frames_requested
    }

    /// Schedules a redraw of a staged layer for the next frame.
    pub fn batch_draw(&mut self, layer: NodeId) -> Result<(), SceneError> {
        self.surfaces(layer)?;
        self.schedule(layer);
        Ok(())
    }

    /// Redraws every scheduled layer, bottom to top, and returns them.
    pub fn on_animation_frame(&mut self) -> Vec<NodeId> {
        self.scheduler.pending = false;
        let due: Vec<NodeId> = self
            .layers
            .iter()
            .copied()
            .filter(|&l| {
                self.get(l)
                    .and_then(|n| n.surfaces.as_ref())
                    .is_some_and(|s| s.state == RedrawState::Scheduled)
            })
            .collect();
        for &layer in &due {
            self.render_layer(layer);
        }
        due
    }

    /// Redraws a layer now, absorbing any scheduled redraw.
    pub fn draw_layer(&mut self, layer: NodeId) -> Result<(), SceneError> {
        self.surfaces(layer)?;
        self.render_layer(layer);
        Ok(())
    }

    /// The layer's redraw state.
    pub fn redraw_state(&self, layer: NodeId) -> Result<RedrawState, SceneError> {
        Ok(self.surfaces(layer)?.state)
    }

    /// Number of times the layer has been redrawn.
    pub fn redraw_count(&self, layer: NodeId) -> Result<u64, SceneError> {
        Ok(self.surfaces(layer)?.redraws)
    }
}
