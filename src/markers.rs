//! Marker Projection
//!
//! One-directional sync from collection change events onto a drawing
//! surface. The projection indexes surface handles by local id, so each
//! event touches exactly one marker.

use std::collections::HashMap;

use crate::domain::{Coordinates, LocalId};
use crate::store::{CollectionEvent, WaypointCollection};

/// Zoom used when centering on a single waypoint
pub const SINGLE_POINT_ZOOM: u8 = 13;

/// Padding (pixels) around a fitted bounding box
pub const BOUNDS_PADDING: u32 = 50;

/// Where the camera should go after an import or selection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraTarget {
    Center { coordinates: Coordinates, zoom: u8 },
    Bounds { south_west: Coordinates, north_east: Coordinates, padding: u32 },
}

impl CameraTarget {
    /// Center on one point, fit a box around several, nothing for none
    pub fn covering(points: &[Coordinates]) -> Option<Self> {
        match points {
            [] => None,
            [only] => Some(CameraTarget::Center {
                coordinates: *only,
                zoom: SINGLE_POINT_ZOOM,
            }),
            [first, rest @ ..] => {
                let mut south_west = *first;
                let mut north_east = *first;
                for point in rest {
                    south_west.lat = south_west.lat.min(point.lat);
                    south_west.lng = south_west.lng.min(point.lng);
                    north_east.lat = north_east.lat.max(point.lat);
                    north_east.lng = north_east.lng.max(point.lng);
                }
                Some(CameraTarget::Bounds {
                    south_west,
                    north_east,
                    padding: BOUNDS_PADDING,
                })
            }
        }
    }
}

/// Drawing surface with a pin primitive. Implemented by the map engine.
pub trait MarkerSurface {
    type Handle;

    fn place(&mut self, coordinates: Coordinates, label: &str) -> Self::Handle;
    fn move_to(&mut self, handle: &Self::Handle, coordinates: Coordinates);
    fn relabel(&mut self, handle: &Self::Handle, label: &str);
    fn remove(&mut self, handle: Self::Handle);
    /// Highlight one marker, or clear the highlight
    fn highlight(&mut self, handle: Option<&Self::Handle>);
    fn focus(&mut self, target: CameraTarget);
}

pub struct MarkerProjection<S: MarkerSurface> {
    surface: S,
    handles: HashMap<LocalId, S::Handle>,
}

impl<S: MarkerSurface> MarkerProjection<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            handles: HashMap::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn marker_count(&self) -> usize {
        self.handles.len()
    }

    pub fn has_marker(&self, local_id: &LocalId) -> bool {
        self.handles.contains_key(local_id)
    }

    /// Drain the collection's pending events onto the surface
    pub fn sync(&mut self, collection: &mut WaypointCollection) {
        for event in collection.drain_events() {
            self.apply(&event, collection);
        }
    }

    fn apply(&mut self, event: &CollectionEvent, collection: &WaypointCollection) {
        match event {
            CollectionEvent::Added(id) => {
                // Records added and removed within one batch never reach the surface
                if let Some(waypoint) = collection.get(id) {
                    let handle = self.surface.place(waypoint.coordinates, &waypoint.name);
                    self.handles.insert(id.clone(), handle);
                }
            }
            CollectionEvent::Moved(id) => {
                if let (Some(handle), Some(waypoint)) = (self.handles.get(id), collection.get(id)) {
                    self.surface.move_to(handle, waypoint.coordinates);
                }
            }
            CollectionEvent::Relabeled(id) => {
                if let (Some(handle), Some(waypoint)) = (self.handles.get(id), collection.get(id)) {
                    self.surface.relabel(handle, &waypoint.name);
                }
            }
            CollectionEvent::Removed(id) => {
                if let Some(handle) = self.handles.remove(id) {
                    self.surface.remove(handle);
                }
            }
        }
    }

    pub fn highlight(&mut self, selected: Option<&LocalId>) {
        let handle = selected.and_then(|id| self.handles.get(id));
        self.surface.highlight(handle);
    }

    pub fn focus(&mut self, target: CameraTarget) {
        self.surface.focus(target);
    }
}

// ========================
// Headless surface
// ========================

/// Operation recorded by [`HeadlessSurface`]
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
    Place { handle: u64, coordinates: Coordinates, label: String },
    Move { handle: u64, coordinates: Coordinates },
    Relabel { handle: u64, label: String },
    Remove { handle: u64 },
    Highlight(Option<u64>),
    Focus(CameraTarget),
}

/// Operations a [`HeadlessSurface`] keeps before dropping the oldest
pub const DEFAULT_OP_LIMIT: usize = 1024;

/// Surface with no renderer behind it. Records the most recent operations,
/// which makes it usable from the CLI and in tests.
#[derive(Debug)]
pub struct HeadlessSurface {
    next_handle: u64,
    ops: Vec<SurfaceOp>,
    limit: usize,
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::with_limit(DEFAULT_OP_LIMIT)
    }
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `limit` operations; zero records nothing
    pub fn with_limit(limit: usize) -> Self {
        Self {
            next_handle: 0,
            ops: Vec::new(),
            limit,
        }
    }

    fn record(&mut self, op: SurfaceOp) {
        if self.limit == 0 {
            return;
        }
        if self.ops.len() >= self.limit {
            let excess = self.ops.len() + 1 - self.limit;
            self.ops.drain(..excess);
        }
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<SurfaceOp> {
        std::mem::take(&mut self.ops)
    }
}

impl MarkerSurface for HeadlessSurface {
    type Handle = u64;

    fn place(&mut self, coordinates: Coordinates, label: &str) -> u64 {
        self.next_handle += 1;
        self.record(SurfaceOp::Place {
            handle: self.next_handle,
            coordinates,
            label: label.to_string(),
        });
        self.next_handle
    }

    fn move_to(&mut self, handle: &u64, coordinates: Coordinates) {
        self.record(SurfaceOp::Move {
            handle: *handle,
            coordinates,
        });
    }

    fn relabel(&mut self, handle: &u64, label: &str) {
        self.record(SurfaceOp::Relabel {
            handle: *handle,
            label: label.to_string(),
        });
    }

    fn remove(&mut self, handle: u64) {
        self.record(SurfaceOp::Remove { handle });
    }

    fn highlight(&mut self, handle: Option<&u64>) {
        self.record(SurfaceOp::Highlight(handle.copied()));
    }

    fn focus(&mut self, target: CameraTarget) {
        self.record(SurfaceOp::Focus(target));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{WaypointDraft, WaypointPatch};
    use pretty_assertions::assert_eq;

    fn coords(lat: f64, lng: f64) -> Coordinates {
        Coordinates::new(lat, lng).unwrap()
    }

    #[test]
    fn test_added_records_are_placed_with_labels() {
        let mut collection = WaypointCollection::new();
        let mut projection = MarkerProjection::new(HeadlessSurface::new());
        collection.add(WaypointDraft::at(coords(1.0, 2.0)));
        collection.add(WaypointDraft::at(coords(3.0, 4.0)).named("Camp"));

        projection.sync(&mut collection);

        assert_eq!(
            projection.surface().ops(),
            &[
                SurfaceOp::Place { handle: 1, coordinates: coords(1.0, 2.0), label: "Point 1".into() },
                SurfaceOp::Place { handle: 2, coordinates: coords(3.0, 4.0), label: "Camp".into() },
            ]
        );
        assert_eq!(projection.marker_count(), 2);
    }

    #[test]
    fn test_headless_surface_keeps_recent_ops() {
        let mut surface = HeadlessSurface::with_limit(2);
        for _ in 0..5 {
            surface.highlight(None);
        }
        surface.focus(CameraTarget::covering(&[coords(1.0, 1.0)]).unwrap());
        assert_eq!(surface.ops().len(), 2);
        assert_eq!(surface.ops()[0], SurfaceOp::Highlight(None));
        assert!(matches!(surface.ops()[1], SurfaceOp::Focus(_)));

        let mut silent = HeadlessSurface::with_limit(0);
        assert_eq!(silent.place(coords(1.0, 1.0), "Point 1"), 1);
        assert!(silent.ops().is_empty());
    }

    #[test]
    fn test_move_touches_one_marker() {
        let mut collection = WaypointCollection::new();
        let mut projection = MarkerProjection::new(HeadlessSurface::new());
        collection.add(WaypointDraft::at(coords(1.0, 2.0)));
        let b = collection.add(WaypointDraft::at(coords(3.0, 4.0)));
        projection.sync(&mut collection);
        projection.surface_mut().take_ops();

        collection.update(&b, &WaypointPatch::coordinates(coords(5.0, 5.0))).unwrap();
        projection.sync(&mut collection);

        assert_eq!(
            projection.surface().ops(),
            &[SurfaceOp::Move { handle: 2, coordinates: coords(5.0, 5.0) }]
        );
    }

    #[test]
    fn test_remove_relabels_followers() {
        let mut collection = WaypointCollection::new();
        let mut projection = MarkerProjection::new(HeadlessSurface::new());
        let a = collection.add(WaypointDraft::at(coords(1.0, 1.0)));
        collection.add(WaypointDraft::at(coords(2.0, 2.0)));
        projection.sync(&mut collection);
        projection.surface_mut().take_ops();

        collection.remove(&a).unwrap();
        projection.sync(&mut collection);

        assert_eq!(
            projection.surface().ops(),
            &[
                SurfaceOp::Remove { handle: 1 },
                SurfaceOp::Relabel { handle: 2, label: "Point 1".into() },
            ]
        );
        assert!(!projection.has_marker(&a));
    }

    #[test]
    fn test_camera_target_covering() {
        assert_eq!(CameraTarget::covering(&[]), None);
        assert_eq!(
            CameraTarget::covering(&[coords(1.0, 2.0)]),
            Some(CameraTarget::Center { coordinates: coords(1.0, 2.0), zoom: 13 })
        );
        assert_eq!(
            CameraTarget::covering(&[coords(1.0, 5.0), coords(-2.0, 3.0), coords(0.0, 9.0)]),
            Some(CameraTarget::Bounds {
                south_west: coords(-2.0, 3.0),
                north_east: coords(1.0, 9.0),
                padding: BOUNDS_PADDING,
            })
        );
    }
}
