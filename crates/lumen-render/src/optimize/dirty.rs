use crate::config::DEFAULT_MAX_DIRTY_RECTS;
use crate::coords::Rect;

/// Union of changed screen area as a list of disjoint rects.
///
/// Overlapping inserts merge into their bounding box. Once the list grows
/// past `max_rects` it collapses into a single bounding rect, trading fill
/// rate for fewer scissor/draw calls.
#[derive(Debug, Clone, PartialEq)]
pub struct DirtyRegion {
    rects: Vec<Rect>,
    max_rects: usize,
}

impl DirtyRegion {
    pub fn new(max_rects: usize) -> Self {
        Self { rects: Vec::new(), max_rects: max_rects.max(1) }
    }

    pub fn add(&mut self, rect: Rect) {
        let mut merged = rect.normalized();
        if merged.is_empty() || !merged.is_finite() {
            return;
        }

        // Absorbing one rect can grow `merged` into another, so rescan until stable.
        while let Some(i) = self.rects.iter().position(|r| r.intersects(merged)) {
            merged = merged.union(self.rects.swap_remove(i));
        }
        self.rects.push(merged);

        if self.rects.len() > self.max_rects {
            let bounds = self.bounding_rect();
            log::trace!("dirty region: {} rects collapsed to {bounds:?}", self.rects.len());
            self.rects.clear();
            if let Some(b) = bounds {
                self.rects.push(b);
            }
        }
    }

    /// Bounding box of everything dirty, or `None` when clean.
    pub fn bounding_rect(&self) -> Option<Rect> {
        self.rects.iter().copied().reduce(Rect::union)
    }

    pub fn intersects(&self, rect: Rect) -> bool {
        self.rects.iter().any(|r| r.intersects(rect))
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn max_rects(&self) -> usize {
        self.max_rects
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }
}

impl Default for DirtyRegion {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DIRTY_RECTS)
    }
}
